use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use mediarelay::cli::{Cli, Commands, ConsoleStatus};
use mediarelay::core::{init_logger, log_credentials_configuration, Config};
use mediarelay::download::source::SourceKind;
use mediarelay::download::{JobIntent, Relay};
use mediarelay::telegram::{create_bot, run_bot};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation) or a
/// local `probe`/`fetch` run fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    // Config parsing logs warnings
    init_logger(&Config::log_file_path_from_env())?;
    let config = Arc::new(Config::from_env());
    log_credentials_configuration(&config);

    let relay = Arc::new(Relay::from_config(Arc::clone(&config)));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            log::info!("Starting bot...");
            let bot = create_bot(&config)?;
            run_bot(bot, relay).await;
            Ok(())
        }
        Commands::Probe { url } => probe(&relay, &url).await,
        Commands::Fetch { url, audio, output } => {
            let intent = if audio {
                JobIntent::SingleAudio
            } else {
                JobIntent::SingleVideo
            };
            let status = ConsoleStatus::new(output);
            let outcome = relay
                .run_single_job(&status, &url, intent, config.credentials_path.as_deref())
                .await?;
            if !outcome.is_delivered() {
                anyhow::bail!("delivery failed: {:?}", outcome);
            }
            Ok(())
        }
    }
}

async fn probe(relay: &Relay, url: &str) -> Result<()> {
    let kind = SourceKind::classify(url);
    println!("Source kind: {}", kind);
    if !kind.is_supported() {
        return Ok(());
    }

    let manifest = relay.probe(url).await?;
    println!(
        "{}: {} ({} entries)",
        if manifest.is_playlist() { "Playlist" } else { "Single" },
        manifest.title.as_deref().unwrap_or("-"),
        manifest.entries.len()
    );
    for (i, entry) in manifest.entries.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            i + 1,
            entry.title.as_deref().unwrap_or("-"),
            entry.source_url().unwrap_or("(no url)")
        );
    }
    Ok(())
}
