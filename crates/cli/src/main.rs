mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use folio_client::App;
use folio_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Maintenance commands for folio content and media")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find links the site lost and copy them back from the source site
    RepairLinks {
        /// Site whose content is scanned (e.g. https://www.example.org)
        #[arg(long)]
        site_url: String,

        /// Site the missing files are copied from
        #[arg(long)]
        src_url: String,

        /// App to scan; repeat for several. Defaults to all apps
        #[arg(long = "app")]
        apps: Vec<App>,

        /// Regex locating links; the `link` group (or the last group) is the link
        #[arg(long)]
        pattern: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a resized copy of a stored file
    Resize {
        file_id: i64,

        /// Target size as WIDTHxHEIGHT; either side may be 0
        size: String,

        #[arg(long)]
        crop: bool,

        #[arg(long)]
        constrain: bool,

        #[arg(long, default_value_t = 90)]
        quality: u8,

        /// Skip the image cache
        #[arg(long)]
        no_cache: bool,

        /// Write the JPEG here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect or clear the resized-image cache
    Cache {
        #[command(subcommand)]
        command: commands::cache::CacheCommand,
    },
    /// Manage API users
    User {
        #[command(subcommand)]
        command: commands::users::UserCommand,
    },
    /// Manage calendar exports
    Ics {
        #[command(subcommand)]
        command: commands::ics::IcsCommand,
    },
    /// Manage content records
    Content {
        #[command(subcommand)]
        command: commands::content::ContentCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::RepairLinks { site_url, src_url, apps, pattern, json } => {
            let args = commands::repair::RepairArgs { site_url, src_url, apps, pattern, json };
            commands::repair::run(&config, args).await
        }
        Commands::Resize { file_id, size, crop, constrain, quality, no_cache, output } => {
            let args = commands::resize::ResizeArgs { file_id, size, crop, constrain, quality, cache: !no_cache, output };
            commands::resize::run(&config, args).await
        }
        Commands::Cache { command } => commands::cache::run(&config, command).await,
        Commands::User { command } => commands::users::run(&config, command).await,
        Commands::Ics { command } => commands::ics::run(&config, command).await,
        Commands::Content { command } => commands::content::run(&config, command).await,
    }
}
