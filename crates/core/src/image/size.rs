//! Dimension clamping and aspect-ratio math.

use crate::Error;

/// Largest width and height a resized image may have.
pub const MAX_IMAGE_SIZE: (u32, u32) = (2048, 2048);

/// Clamp a requested size componentwise to [`MAX_IMAGE_SIZE`].
pub fn validate_image_size(size: (u32, u32)) -> (u32, u32) {
    (size.0.min(MAX_IMAGE_SIZE.0), size.1.min(MAX_IMAGE_SIZE.1))
}

/// Target size for resizing an image of `image_size` to `new_size`.
///
/// A zero component means "unspecified". With only one side given the other
/// is derived from the original aspect ratio. With both given and
/// `constrain` unset the request is returned as is. Otherwise the result fits
/// inside `new_size`: the width-driven candidate wins when its height fits,
/// else the height-driven one.
pub fn aspect_ratio(image_size: (u32, u32), new_size: (u32, u32), constrain: bool) -> (u32, u32) {
    let (w, h) = new_size;

    if !constrain && w > 0 && h > 0 {
        return (w, h);
    }

    if (w > 0) != (h > 0) {
        return if w > 0 { constrain_size(image_size, (w, 0)) } else { constrain_size(image_size, (0, h)) };
    }

    let (w1, h1) = constrain_size(image_size, (w, 0));
    let (w2, h2) = constrain_size(image_size, (0, h));

    if h1 <= h { (w1, h1) } else { (w2, h2) }
}

/// Scale on the larger of the two requested components, deriving the other
/// from the original proportions. Fractions are truncated.
///
/// An original with a zero side leaves the request untouched.
pub fn constrain_size(image_size: (u32, u32), new_size: (u32, u32)) -> (u32, u32) {
    let (w, h) = new_size;
    let (ow, oh) = image_size;
    if ow == 0 || oh == 0 {
        return new_size;
    }

    let ratio = oh as f64 / ow as f64;
    if w >= h {
        (w, (ratio * w as f64) as u32)
    } else {
        ((h as f64 / ratio) as u32, h)
    }
}

/// Parse a `WIDTHxHEIGHT` size such as `200x300` or `200x0`.
pub fn parse_size(input: &str) -> Result<(u32, u32), Error> {
    let (w, h) = input
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::InvalidInput(format!("size must look like WIDTHxHEIGHT: {input}")))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| Error::InvalidInput(format!("invalid size component {s:?}: {e}")))
    };
    Ok((parse(w)?, parse(h)?))
}
