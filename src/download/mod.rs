//! Download orchestration and delivery

pub mod delivery;
pub mod error;
pub mod extractor;
pub mod messages;
pub mod pipeline;
pub mod playlist;
pub mod source;
pub mod status;
pub mod thumbnail;
pub mod upload;
pub mod workspace;
pub mod ytdlp;

// Re-exports for convenience
pub use delivery::{DeliveryOutcome, DeliveryRouter};
pub use error::ExtractionFailure;
pub use extractor::{ArtifactExtractor, ExtractOptions, Extractor, MediaArtifact, ProgressSink};
pub use pipeline::{JobError, JobIntent, LinkOutcome, Relay};
pub use playlist::{BatchState, BatchSummary};
pub use source::SourceKind;
pub use status::{OutboundArtifact, StatusHandle, StatusSurface};
pub use upload::{GofileClient, RemoteUploader, UploadError};
pub use workspace::{Workspace, WorkspaceManager};
