use std::path::PathBuf;

use anyhow::{Context, Result};
use folio_core::image::{FILE_IMAGE_PRE_KEY, ImageBuilder, ImageOptions, SourceFile, aspect_ratio, parse_size};
use folio_core::{AppConfig, storage};

pub struct ResizeArgs {
    pub file_id: i64,
    pub size: String,
    pub crop: bool,
    pub constrain: bool,
    pub quality: u8,
    pub cache: bool,
    pub output: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, args: ResizeArgs) -> Result<()> {
    let store = super::open_store(config).await?;
    let storage = storage::from_config(config).await?;
    let images = ImageBuilder::new(store.clone(), storage, &config.cache_pre_key);

    let requested = parse_size(&args.size)?;
    let file = store
        .get_file(args.file_id)
        .await?
        .with_context(|| format!("file {} does not exist", args.file_id))?;
    let source = SourceFile::from(&file);

    let options = ImageOptions {
        crop: args.crop,
        quality: args.quality,
        cache: args.cache,
        unique_key: None,
        constrain: args.constrain,
    };
    let original = images.original_dimensions(&source).await?;
    let target = aspect_ratio(original, requested, options.constrain);

    let image = images
        .get_image(&source, target, FILE_IMAGE_PRE_KEY, &options)
        .await?
        .context("resized image could not be decoded")?;

    println!(
        "{} {}x{} -> {}x{} ({} bytes)",
        file.file.name,
        original.0,
        original.1,
        image.width,
        image.height,
        image.bytes.len()
    );
    if options.cache {
        println!("cache key: {}", images.cache_key(&source, target, FILE_IMAGE_PRE_KEY, &options));
    }

    if let Some(output) = args.output {
        tokio::fs::write(&output, &image.bytes)
            .await
            .with_context(|| format!("writing {}", output.display()))?;
        println!("wrote {}", output.display());
    }
    Ok(())
}
