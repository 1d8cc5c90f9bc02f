use std::path::PathBuf;

use anyhow::Context;
use bookstore_app::App;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookstore service administration
#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about)]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Create the database tables and exit
    InitDb,
    /// Print the merged OpenAPI document
    Openapi,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(cli.config_dir)
        .with_context(|| "failed to load bookstore settings")?;

    match cli.command {
        Command::Serve => {
            bookstore_telemetry::init(&settings.telemetry)?;
            bookstore_app::app::serve(settings).await
        }
        Command::InitDb => {
            bookstore_telemetry::init(&settings.telemetry)?;
            let app = App::from_settings(settings)?;
            let applied = app.apply_schema().await?;
            tracing::info!(applied, "database initialized");
            Ok(())
        }
        Command::Openapi => {
            // No subscriber here: stdout carries the document
            let app = App::new(settings, bookstore_app::app::in_memory_database()?)?;
            let document = serde_json::to_string_pretty(&app.openapi())?;
            println!("{document}");
            Ok(())
        }
    }
}
