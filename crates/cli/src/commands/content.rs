use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use folio_core::{AppConfig, ContentItem, Store};

#[derive(Subcommand)]
pub enum ContentCommand {
    /// Insert or replace records from a JSON array
    Import { path: PathBuf },
}

pub async fn run(config: &AppConfig, command: ContentCommand) -> Result<()> {
    let store = super::open_store(config).await?;

    match command {
        ContentCommand::Import { path } => {
            let count = import(&store, &path).await?;
            println!("imported {count} records");
        }
    }
    Ok(())
}

async fn import(store: &Store, path: &Path) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let items: Vec<ContentItem> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    for item in &items {
        store.upsert_content(item).await?;
        tracing::debug!(kind = %item.kind, id = item.id, "imported record");
    }
    Ok(items.len())
}
