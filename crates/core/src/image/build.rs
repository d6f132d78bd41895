//! Resized image construction with a cache in front.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};

use super::key::generate_image_cache_key;
use super::size::validate_image_size;
use super::{ImageOptions, SourceFile, normalize_quality};
use crate::Error;
use crate::storage::MediaStorage;
use crate::store::{IMAGE_CACHE_TTL, Store};

/// A resized JPEG that decoded successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Builds resized images from originals held by a storage backend and
/// caches the encoded JPEG in the record store.
#[derive(Clone)]
pub struct ImageBuilder {
    store: Store,
    storage: Arc<dyn MediaStorage>,
    cache_pre_key: String,
}

impl ImageBuilder {
    pub fn new(store: Store, storage: Arc<dyn MediaStorage>, cache_pre_key: impl Into<String>) -> Self {
        Self { store, storage, cache_pre_key: cache_pre_key.into() }
    }

    pub fn storage(&self) -> &Arc<dyn MediaStorage> {
        &self.storage
    }

    pub fn cache_key(&self, file: &SourceFile, size: (u32, u32), pre_key: &str, options: &ImageOptions) -> String {
        generate_image_cache_key(&self.cache_pre_key, pre_key, file, Some(size), options)
    }

    /// Return the resized image from cache, or build it.
    ///
    /// The size is clamped to the maximum first. A binary that fails to
    /// decode (a corrupt cache entry, say) yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ImageBuilder::build_image`] and the store.
    pub async fn get_image(
        &self, file: &SourceFile, size: (u32, u32), pre_key: &str, options: &ImageOptions,
    ) -> Result<Option<RenderedImage>, Error> {
        let size = validate_image_size(size);

        let mut binary = None;
        if options.cache {
            let key = self.cache_key(file, size, pre_key, options);
            binary = match self.store.get_cached_image(&key).await? {
                Some(cached) if cached.is_empty() => {
                    // an empty entry would block the rebuilt payload
                    self.store.delete_cached_image(&key).await?;
                    None
                }
                Some(cached) => {
                    tracing::debug!(key = %key, "image cache hit");
                    Some(cached)
                }
                None => None,
            };
        }

        let binary = match binary {
            Some(binary) => binary,
            None => self.build_image(file, size, pre_key, options).await?,
        };

        let decoded = tokio::task::spawn_blocking(move || {
            let dimensions = ImageReader::new(Cursor::new(&binary))
                .with_guessed_format()
                .map_err(|e| Error::Image(e.to_string()))?
                .decode()?;
            Ok::<_, Error>(RenderedImage { width: dimensions.width(), height: dimensions.height(), bytes: binary })
        })
        .await
        .map_err(|e| Error::Image(format!("decode task failed: {e}")))?;

        match decoded {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "resized image did not decode");
                Ok(None)
            }
        }
    }

    /// Build a resized JPEG from the original file.
    ///
    /// The original is converted to RGB, then either cropped to fill `size`
    /// (`options.crop`) or resized to exactly `size`. When `options.cache` is
    /// set the result is added to the image cache for 30 days.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the original is missing from local storage
    /// - `Error::InvalidInput` if either side of `size` is zero
    /// - `Error::Image` if the original cannot be decoded or encoded
    pub async fn build_image(
        &self, file: &SourceFile, size: (u32, u32), pre_key: &str, options: &ImageOptions,
    ) -> Result<Vec<u8>, Error> {
        let quality = normalize_quality(options.quality);

        if !self.storage.is_remote() && !self.storage.exists(&file.name).await? {
            return Err(Error::NotFound(file.name.clone()));
        }

        if size.0 == 0 || size.1 == 0 {
            return Err(Error::InvalidInput(format!("cannot resize to {}x{}", size.0, size.1)));
        }

        let content = self.storage.read(&file.name).await?;
        let crop = options.crop;
        let binary = tokio::task::spawn_blocking(move || render_jpeg(&content, size, crop, quality))
            .await
            .map_err(|e| Error::Image(format!("resize task failed: {e}")))??;

        if options.cache {
            let key = self.cache_key(file, size, pre_key, options);
            let added = self.store.add_cached_image(&key, &binary, IMAGE_CACHE_TTL).await?;
            tracing::debug!(key = %key, added, bytes = binary.len(), "cached resized image");
        }

        Ok(binary)
    }

    /// Width and height of the original file.
    pub async fn original_dimensions(&self, file: &SourceFile) -> Result<(u32, u32), Error> {
        let content = self.storage.read(&file.name).await?;
        tokio::task::spawn_blocking(move || {
            ImageReader::new(Cursor::new(content))
                .with_guessed_format()
                .map_err(|e| Error::Image(e.to_string()))?
                .into_dimensions()
                .map_err(Error::from)
        })
        .await
        .map_err(|e| Error::Image(format!("dimension task failed: {e}")))?
    }
}

fn render_jpeg(content: &[u8], size: (u32, u32), crop: bool, quality: u8) -> Result<Vec<u8>, Error> {
    // JPEG cannot carry palette or alpha modes
    let original = image::load_from_memory(content)?.into_rgb8();

    let resized = if crop {
        image_rescale(&original, size)
    } else {
        imageops::resize(&original, size.0, size.1, FilterType::Lanczos3)
    };

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality).encode_image(&resized)?;
    Ok(output)
}

/// Crop to the target aspect ratio, then scale to exactly `size`.
///
/// Wide sources lose equal margins left and right; tall sources keep the
/// upper part, losing a third of the excess above and two thirds below.
pub fn image_rescale(image: &RgbImage, size: (u32, u32)) -> RgbImage {
    let (src_width, src_height) = image.dimensions();
    let (dst_width, dst_height) = size;
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return image.clone();
    }

    let src_ratio = src_width as f64 / src_height as f64;
    let dst_ratio = dst_width as f64 / dst_height as f64;

    let (x, y, crop_width, crop_height) = if dst_ratio < src_ratio {
        let crop_width = ((src_height as f64 * dst_ratio) as u32).clamp(1, src_width);
        ((src_width - crop_width) / 2, 0, crop_width, src_height)
    } else {
        let crop_height = ((src_width as f64 / dst_ratio) as u32).clamp(1, src_height);
        (0, (src_height - crop_height) / 3, src_width, crop_height)
    };

    let cropped = imageops::crop_imm(image, x, y, crop_width, crop_height).to_image();
    imageops::resize(&cropped, dst_width, dst_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::FILE_IMAGE_PRE_KEY;
    use crate::storage::FsStorage;
    use image::{GrayImage, Luma, Rgb};

    struct Fixture {
        _dir: tempfile::TempDir,
        builder: ImageBuilder,
        store: Store,
        file: SourceFile,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files/page/1/banner.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(400, 300, Rgb([200, 30, 30])).save(&path).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();

        let store = Store::open_in_memory().await.unwrap();
        let storage: Arc<dyn MediaStorage> = Arc::new(FsStorage::new(dir.path()));
        let builder = ImageBuilder::new(store.clone(), storage, "folio");
        let file = SourceFile { name: "files/page/1/banner.png".into(), size };
        Fixture { _dir: dir, builder, store, file }
    }

    fn decode(bytes: &[u8]) -> image::DynamicImage {
        image::load_from_memory(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_build_missing_local_file_is_not_found() {
        let fx = fixture().await;
        let missing = SourceFile { name: "files/page/1/nope.png".into(), size: 0 };
        let result = fx
            .builder
            .build_image(&missing, (100, 100), FILE_IMAGE_PRE_KEY, &ImageOptions::default())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_build_resizes_to_exact_size() {
        let fx = fixture().await;
        let jpeg = fx
            .builder
            .build_image(&fx.file, (200, 50), FILE_IMAGE_PRE_KEY, &ImageOptions::default())
            .await
            .unwrap();
        let image = decode(&jpeg);
        assert_eq!((image.width(), image.height()), (200, 50));
        assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_build_crop_fills_box() {
        let fx = fixture().await;
        let options = ImageOptions { crop: true, ..Default::default() };
        let jpeg = fx.builder.build_image(&fx.file, (100, 100), FILE_IMAGE_PRE_KEY, &options).await.unwrap();
        let image = decode(&jpeg);
        assert_eq!((image.width(), image.height()), (100, 100));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_dimension() {
        let fx = fixture().await;
        let result = fx
            .builder
            .build_image(&fx.file, (100, 0), FILE_IMAGE_PRE_KEY, &ImageOptions::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_build_without_cache_leaves_cache_empty() {
        let fx = fixture().await;
        fx.builder
            .build_image(&fx.file, (40, 30), FILE_IMAGE_PRE_KEY, &ImageOptions::default())
            .await
            .unwrap();
        assert_eq!(fx.store.count_cached_images().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_build_converts_grayscale_to_rgb_jpeg() {
        let fx = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        GrayImage::from_pixel(64, 64, Luma([128])).save(dir.path().join("gray.png")).unwrap();
        let builder = ImageBuilder::new(fx.store.clone(), Arc::new(FsStorage::new(dir.path())), "folio");
        let file = SourceFile { name: "gray.png".into(), size: 1 };

        let jpeg = builder.build_image(&file, (32, 32), FILE_IMAGE_PRE_KEY, &ImageOptions::default()).await.unwrap();
        assert_eq!(decode(&jpeg).color(), image::ColorType::Rgb8);
    }

    #[tokio::test]
    async fn test_get_image_populates_and_reuses_cache() {
        let fx = fixture().await;
        let options = ImageOptions { cache: true, ..Default::default() };

        let first = fx.builder.get_image(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options).await.unwrap().unwrap();
        assert_eq!((first.width, first.height), (80, 60));
        assert_eq!(fx.store.count_cached_images().await.unwrap(), 1);

        let key = fx.builder.cache_key(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options);
        assert_eq!(fx.store.get_cached_image(&key).await.unwrap().unwrap(), first.bytes);

        let second = fx.builder.get_image(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options).await.unwrap().unwrap();
        assert_eq!(second, first);
        assert_eq!(fx.store.count_cached_images().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_image_clamps_size() {
        let fx = fixture().await;
        let image = fx
            .builder
            .get_image(&fx.file, (5000, 10), FILE_IMAGE_PRE_KEY, &ImageOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((image.width, image.height), (2048, 10));
    }

    #[tokio::test]
    async fn test_get_image_with_corrupt_cache_entry_is_empty() {
        let fx = fixture().await;
        let options = ImageOptions { cache: true, ..Default::default() };
        let key = fx.builder.cache_key(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options);
        fx.store.add_cached_image(&key, b"not an image", IMAGE_CACHE_TTL).await.unwrap();

        let result = fx.builder.get_image(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_image_rebuilds_empty_cache_entry() {
        let fx = fixture().await;
        let options = ImageOptions { cache: true, ..Default::default() };
        let key = fx.builder.cache_key(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options);
        fx.store.add_cached_image(&key, b"", IMAGE_CACHE_TTL).await.unwrap();

        let image = fx.builder.get_image(&fx.file, (80, 60), FILE_IMAGE_PRE_KEY, &options).await.unwrap().unwrap();

        assert_eq!((image.width, image.height), (80, 60));
        assert_eq!(fx.store.get_cached_image(&key).await.unwrap().unwrap(), image.bytes);
    }

    #[tokio::test]
    async fn test_build_accepts_bmp_tiff_webp_originals() {
        let fx = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        let source = RgbImage::from_pixel(60, 40, Rgb([10, 120, 200]));
        let builder = ImageBuilder::new(fx.store.clone(), Arc::new(FsStorage::new(dir.path())), "folio");

        for (name, format) in [
            ("scan.bmp", image::ImageFormat::Bmp),
            ("scan.tiff", image::ImageFormat::Tiff),
            ("scan.webp", image::ImageFormat::WebP),
        ] {
            source.save_with_format(dir.path().join(name), format).unwrap();
            let file = SourceFile { name: name.into(), size: 1 };

            let jpeg = builder.build_image(&file, (30, 20), FILE_IMAGE_PRE_KEY, &ImageOptions::default()).await.unwrap();

            let image = decode(&jpeg);
            assert_eq!((image.width(), image.height()), (30, 20), "{name}");
        }
    }

    #[tokio::test]
    async fn test_original_dimensions() {
        let fx = fixture().await;
        assert_eq!(fx.builder.original_dimensions(&fx.file).await.unwrap(), (400, 300));
    }

    #[test]
    fn test_image_rescale_wide_and_tall() {
        let wide = RgbImage::new(400, 100);
        assert_eq!(image_rescale(&wide, (50, 50)).dimensions(), (50, 50));

        let tall = RgbImage::new(100, 400);
        assert_eq!(image_rescale(&tall, (80, 20)).dimensions(), (80, 20));
    }
}
