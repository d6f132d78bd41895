use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use folio_core::AppConfig;

#[derive(Subcommand)]
pub enum IcsCommand {
    /// Register a pending export and print its id
    Create {
        file_name: String,

        #[arg(long)]
        user_id: Option<i64>,
    },
    /// Attach the generated calendar to an export
    Complete {
        id: i64,

        /// Path to the .ics file
        payload: PathBuf,
    },
}

pub async fn run(config: &AppConfig, command: IcsCommand) -> Result<()> {
    let store = super::open_store(config).await?;

    match command {
        IcsCommand::Create { file_name, user_id } => {
            let id = store.create_export(&file_name, user_id).await?;
            println!("{id}");
        }
        IcsCommand::Complete { id, payload } => {
            let content = tokio::fs::read(&payload)
                .await
                .with_context(|| format!("reading {}", payload.display()))?;
            let bytes = content.len();
            store.complete_export(id, content).await?;
            tracing::info!(id, bytes, "export completed");
        }
    }
    Ok(())
}
