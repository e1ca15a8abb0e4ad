mod app;
mod backend;
mod cli;
mod logging;
mod markup;
mod model;
mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    if let Some(target) = args.log_target() {
        // Logging is best effort; the app is usable without it.
        if let Err(e) = logging::init(target) {
            eprintln!("warning: {e:#}");
        }
    }

    match cli::run(args).await {
        Ok(()) => {
            // Exit explicitly so a blocked stdin reader cannot hold the process open.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            Err(e)
        }
    }
}
