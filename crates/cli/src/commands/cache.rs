use anyhow::Result;
use clap::Subcommand;
use folio_core::AppConfig;

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Remove expired entries, or every entry under the configured prefix
    Purge {
        #[arg(long)]
        all: bool,
    },
    /// Number of live entries
    Stats,
}

pub async fn run(config: &AppConfig, command: CacheCommand) -> Result<()> {
    let store = super::open_store(config).await?;

    match command {
        CacheCommand::Purge { all } => {
            let removed = if all {
                store.purge_images_by_prefix(&format!("{}.", config.cache_pre_key)).await?
            } else {
                store.purge_expired_images().await?
            };
            tracing::info!(removed, all, "image cache purged");
            println!("removed {removed} cached images");
        }
        CacheCommand::Stats => {
            println!("{} cached images", store.count_cached_images().await?);
        }
    }
    Ok(())
}
