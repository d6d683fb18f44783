//! URL classification.
//!
//! A link is classified once when it enters the system; everything
//! downstream switches on [`SourceKind`].

use lazy_regex::{regex, regex_is_match};

/// What kind of source a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// youtube.com / youtu.be, possibly a playlist
    Video,
    /// music.youtube.com, delivered as audio
    Audio,
    /// instagram.com posts and reels
    SocialPost,
    Unrecognized,
}

impl SourceKind {
    /// Classifies a link by its host.
    ///
    /// ```
    /// use mediarelay::download::source::SourceKind;
    ///
    /// assert_eq!(SourceKind::classify("https://music.youtube.com/watch?v=x"), SourceKind::Audio);
    /// assert_eq!(SourceKind::classify("https://youtu.be/x"), SourceKind::Video);
    /// ```
    pub fn classify(url: &str) -> Self {
        if regex_is_match!(r"(?i)music\.youtube\.com/", url) {
            SourceKind::Audio
        } else if regex_is_match!(r"(?i)(youtube\.com|youtu\.be)", url) {
            SourceKind::Video
        } else if regex_is_match!(r"(?i)instagram\.com", url) {
            SourceKind::SocialPost
        } else {
            SourceKind::Unrecognized
        }
    }

    pub fn is_supported(self) -> bool {
        self != SourceKind::Unrecognized
    }
}

/// Pulls the first http(s) link out of a chat message.
pub fn extract_url(text: &str) -> Option<&str> {
    regex!(r"https?://\S+").find(text).map(|m| m.as_str())
}
