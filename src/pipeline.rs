// this_file: src/pipeline.rs
//! End-to-end order flow: decode, normalize, compose, submit.
//!
//! These entry points wire the stages together for library callers and
//! the CLI. Each stage owns its inputs and returns fresh payloads;
//! failures propagate immediately instead of degrading the order.

use log::{debug, info};

use crate::back::{compose_back, Message};
use crate::decode::{decode, EncodedImage};
use crate::error::{Error, Result};
use crate::front::compose_front;
use crate::geometry::{Dpi, PhysicalSize};
use crate::logging::Timer;
use crate::orient::normalize_landscape;
use crate::submit::{Address, FulfillmentClient, PostcardOrder, SubmissionResult};

/// Render the front panel from an encoded photo payload
///
/// Decodes the payload, rotates portrait photos to landscape, and
/// aspect-fills the card canvas at the requested density.
pub async fn render_front(
    photo: EncodedImage,
    size: PhysicalSize,
    dpi: Dpi,
) -> Result<EncodedImage> {
    let _timer = Timer::new("front panel pipeline");
    debug!("front pipeline: decoding {} byte payload", photo.len());
    let decoded = decode(photo).await?;
    let landscape = normalize_landscape(decoded).await?;
    let front = tokio::task::spawn_blocking(move || compose_front(landscape, size, dpi))
        .await
        .map_err(|e| Error::Runtime(format!("front composition task failed: {}", e)))??;
    info!("front panel composed: {} bytes of {}", front.len(), front.media_type);
    Ok(front)
}

/// Render the back panel from the sender's message
pub async fn render_back(
    message: Message,
    size: PhysicalSize,
    dpi: Dpi,
) -> Result<EncodedImage> {
    let _timer = Timer::new("back panel pipeline");
    let back = compose_back(message, size, dpi).await?;
    info!("back panel composed: {} bytes of {}", back.len(), back.media_type);
    Ok(back)
}

/// Compose both panels and submit the order to fulfillment
///
/// The two panels render concurrently; the order goes out only when
/// both composed cleanly.
pub async fn submit_order(
    client: &FulfillmentClient,
    photo: EncodedImage,
    message: Message,
    to: Address,
    from: Address,
    size: PhysicalSize,
    dpi: Dpi,
) -> Result<SubmissionResult> {
    let _timer = Timer::new("order pipeline");
    let (front, back) = tokio::try_join!(
        render_front(photo, size, dpi),
        render_back(message, size, dpi)
    )?;
    let order = PostcardOrder {
        to,
        from,
        size,
        front,
        back,
    };
    client.submit(order).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_blocking;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded_photo(width: u32, height: u32) -> EncodedImage {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 30])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        EncodedImage::png(bytes)
    }

    #[tokio::test]
    async fn test_portrait_photo_renders_full_front() {
        let size = PhysicalSize::new(6.0, 4.0).unwrap();
        let dpi = Dpi::new(50).unwrap();
        let front = render_front(encoded_photo(200, 300), size, dpi)
            .await
            .unwrap();
        let raster = decode_blocking(&front).unwrap();
        assert_eq!((raster.width(), raster.height()), (300, 200));
    }

    #[tokio::test]
    async fn test_malformed_photo_fails_before_compositing() {
        let size = PhysicalSize::new(6.0, 4.0).unwrap();
        let dpi = Dpi::new(50).unwrap();
        let result = render_front(EncodedImage::png(vec![1, 2, 3]), size, dpi).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_back_renders_at_density() {
        let size = PhysicalSize::new(6.0, 4.0).unwrap();
        let dpi = Dpi::new(25).unwrap();
        let message = Message::new("hello from the pipeline", "Georgia", 16.0).unwrap();
        let back = render_back(message, size, dpi).await.unwrap();
        let raster = decode_blocking(&back).unwrap();
        assert_eq!((raster.width(), raster.height()), (150, 100));
    }
}
