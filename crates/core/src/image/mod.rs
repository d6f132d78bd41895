//! Resized-image helpers.
//!
//! - [`size`]: dimension clamping and aspect-ratio math
//! - [`key`]: deterministic cache keys for resized binaries
//! - [`build`]: decode, resize or crop, JPEG-encode and cache

pub mod build;
pub mod key;
pub mod size;

pub use build::{ImageBuilder, RenderedImage};
pub use key::generate_image_cache_key;
pub use size::{MAX_IMAGE_SIZE, aspect_ratio, constrain_size, parse_size, validate_image_size};

use crate::store::FileRecord;

/// Cache namespace for file-attached images.
pub const FILE_IMAGE_PRE_KEY: &str = "file_image";

/// Cache namespace for photo-album images.
pub const PHOTO_PRE_KEY: &str = "photo";

/// JPEG quality used when none (or an out-of-range one) is given.
pub const DEFAULT_QUALITY: u8 = 90;

/// Identity of an original image: its storage key and byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Storage key, e.g. `files/article/3/young.gif`.
    pub name: String,
    pub size: u64,
}

impl From<&FileRecord> for SourceFile {
    fn from(record: &FileRecord) -> Self {
        Self { name: record.file.path.clone(), size: record.file.size }
    }
}

/// How a resized image is produced and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    /// Crop to fill the target box instead of stretching to it.
    pub crop: bool,
    pub quality: u8,
    /// Read from and populate the image cache.
    pub cache: bool,
    /// Caller-supplied token replacing the file identity in the cache key.
    pub unique_key: Option<String>,
    pub constrain: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { crop: false, quality: DEFAULT_QUALITY, cache: false, unique_key: None, constrain: false }
    }
}

/// Quality accepted by the JPEG encoder; anything outside 1..=100 falls back
/// to [`DEFAULT_QUALITY`].
pub fn normalize_quality(quality: u8) -> u8 {
    if (1..=100).contains(&quality) { quality } else { DEFAULT_QUALITY }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quality() {
        assert_eq!(normalize_quality(75), 75);
        assert_eq!(normalize_quality(100), 100);
        assert_eq!(normalize_quality(0), DEFAULT_QUALITY);
        assert_eq!(normalize_quality(101), DEFAULT_QUALITY);
    }
}
