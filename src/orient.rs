// this_file: src/orient.rs
//! Landscape orientation normalization.
//!
//! Compositing assumes a landscape source. A portrait photo is rotated
//! 90 degrees clockwise, then pushed through a PNG encode/decode round
//! trip so downstream stages receive a fresh decoded handle, exactly as
//! if the rotated image had been supplied in the first place. Square
//! and landscape inputs pass through untouched.

use log::debug;

use crate::decode::{decode, RasterImage};
use crate::error::{Error, Result};

/// Rotate a bitmap 90 degrees clockwise
///
/// A `w x h` input maps to `h x w`; the source pixel `(x, y)` lands at
/// `(h - 1 - y, x)`.
pub fn rotate_clockwise(image: &RasterImage) -> RasterImage {
    RasterImage::new(image.inner().rotate90())
}

/// Ensure an image is landscape-oriented (width >= height)
///
/// Portrait inputs are rotated clockwise and re-decoded; all others are
/// returned unchanged, square frames included.
pub async fn normalize_landscape(image: RasterImage) -> Result<RasterImage> {
    let (width, height) = (image.width(), image.height());
    if width >= height {
        debug!("orientation pass-through: {}x{} is landscape", width, height);
        return Ok(image);
    }

    let encoded = tokio::task::spawn_blocking(move || rotate_clockwise(&image).encode_png())
        .await
        .map_err(|e| Error::Runtime(format!("rotation task failed: {}", e)))??;
    debug!(
        "rotated portrait {}x{} to landscape {}x{}",
        width, height, height, width
    );
    decode(encoded).await
}
