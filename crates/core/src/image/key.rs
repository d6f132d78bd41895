//! Deterministic cache keys for resized images.

use super::{ImageOptions, SourceFile};

/// Build the cache key of a resized image.
///
/// The key joins, with `.`: the global `prefix`, the caller's `pre_key`
/// namespace, the file identity (`unique_key` when given, else byte size and
/// name), `WIDTHxHEIGHT`, `cropped` or nothing, the quality, and `constrain`
/// or nothing. Spaces become `_` so the key is valid for any backend.
///
/// ```
/// use folio_core::image::{ImageOptions, SourceFile, generate_image_cache_key};
///
/// let file = SourceFile { name: "files/page/1/logo.png".into(), size: 5120 };
/// let key = generate_image_cache_key("folio", "file_image", &file, Some((200, 300)), &ImageOptions::default());
/// assert_eq!(key, "folio.file_image.5120.files/page/1/logo.png.200x300..90.");
/// ```
pub fn generate_image_cache_key(
    prefix: &str, pre_key: &str, file: &SourceFile, size: Option<(u32, u32)>, options: &ImageOptions,
) -> String {
    let size = size.map(|(w, h)| format!("{w}x{h}")).unwrap_or_default();
    let crop = if options.crop { "cropped" } else { "" };
    let constrain = if options.constrain { "constrain" } else { "" };
    let quality = options.quality.to_string();

    let file_size = file.size.to_string();

    let mut parts = vec![prefix, pre_key];
    match options.unique_key.as_deref() {
        Some(unique) => parts.push(unique),
        None => parts.extend([file_size.as_str(), file.name.as_str()]),
    }
    parts.extend([size.as_str(), crop, quality.as_str(), constrain]);

    // spaces are not valid in memcached-style keys
    parts.join(".").replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> SourceFile {
        SourceFile { name: "files/article/3/spring gala.jpg".into(), size: 48213 }
    }

    #[test]
    fn test_key_is_deterministic() {
        let options = ImageOptions { crop: true, ..Default::default() };
        let a = generate_image_cache_key("folio", "file_image", &file(), Some((200, 300)), &options);
        let b = generate_image_cache_key("folio", "file_image", &file(), Some((200, 300)), &options);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_has_no_spaces() {
        let options = ImageOptions { unique_key: Some("album 7 cover".into()), ..Default::default() };
        let with_unique = generate_image_cache_key("my site", "photo", &file(), Some((10, 10)), &options);
        let with_file = generate_image_cache_key("my site", "photo", &file(), Some((10, 10)), &ImageOptions::default());
        assert!(!with_unique.contains(' '));
        assert!(!with_file.contains(' '));
        assert!(with_file.contains("spring_gala.jpg"));
    }

    #[test]
    fn test_key_layout_with_file_identity() {
        let options = ImageOptions { crop: true, quality: 80, constrain: true, ..Default::default() };
        let key = generate_image_cache_key("folio", "file_image", &file(), Some((200, 300)), &options);
        assert_eq!(key, "folio.file_image.48213.files/article/3/spring_gala.jpg.200x300.cropped.80.constrain");
    }

    #[test]
    fn test_key_layout_with_unique_key() {
        let options = ImageOptions { unique_key: Some("1294851570".into()), ..Default::default() };
        let key = generate_image_cache_key("folio", "photo", &file(), Some((640, 0)), &options);
        assert_eq!(key, "folio.photo.1294851570.640x0..90.");
    }

    #[test]
    fn test_key_without_size() {
        let key = generate_image_cache_key("folio", "photo", &file(), None, &ImageOptions::default());
        assert!(key.contains("jpg...90."));
    }

    #[test]
    fn test_key_distinguishes_flags() {
        let plain = generate_image_cache_key("p", "k", &file(), Some((1, 1)), &ImageOptions::default());
        let cropped = generate_image_cache_key(
            "p",
            "k",
            &file(),
            Some((1, 1)),
            &ImageOptions { crop: true, ..Default::default() },
        );
        let constrained = generate_image_cache_key(
            "p",
            "k",
            &file(),
            Some((1, 1)),
            &ImageOptions { constrain: true, ..Default::default() },
        );
        assert_ne!(plain, cropped);
        assert_ne!(plain, constrained);
        assert_ne!(cropped, constrained);
    }
}
