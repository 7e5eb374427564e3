// this_file: src/front.rs
//! Front panel composition: aspect-fill a photo onto the print canvas.
//!
//! The photo is center-cropped to the card's aspect ratio (never
//! letterboxed, never distorted) and scaled to the exact device pixel
//! dimensions of the card at the requested density. The result is a
//! fresh PNG payload; the same inputs always produce identical bytes.

use image::imageops::FilterType;
use log::debug;

use crate::decode::{EncodedImage, RasterImage};
use crate::error::{Error, Result};
use crate::geometry::{aspect_fill_crop, Dpi, PhysicalSize};

/// Compose the front panel from a landscape-normalized photo
///
/// The output raster is exactly `round(width * dpi)` by
/// `round(height * dpi)` pixels.
pub fn compose_front(photo: RasterImage, size: PhysicalSize, dpi: Dpi) -> Result<EncodedImage> {
    let target_width = size.pixel_width(dpi);
    let target_height = size.pixel_height(dpi);
    if target_width == 0 || target_height == 0 {
        return Err(Error::InvalidParameter(format!(
            "card {} at {} dpi rounds to an empty canvas",
            size, dpi
        )));
    }

    let region = aspect_fill_crop(photo.width(), photo.height(), size.aspect())?;
    let (x, y, crop_width, crop_height) = region.rounded(photo.width(), photo.height());
    debug!(
        "front crop: {}x{}+{}+{} of {}x{} -> {}x{}",
        crop_width,
        crop_height,
        x,
        y,
        photo.width(),
        photo.height(),
        target_width,
        target_height
    );

    let cropped = photo.inner().crop_imm(x, y, crop_width, crop_height);
    let scaled = cropped.resize_exact(target_width, target_height, FilterType::Lanczos3);
    RasterImage::new(scaled).encode_png()
}
