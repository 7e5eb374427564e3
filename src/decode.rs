// this_file: src/decode.rs
//! Encoded image payloads and the asynchronous decoder.
//!
//! Payloads travel through the pipeline as [`EncodedImage`] values: raw
//! container bytes plus a declared media type, convertible to and from
//! `data:` URIs. Decoding accepts both raster containers (PNG, JPEG via
//! the `image` crate) and vector documents (SVG via `usvg`/`resvg`,
//! rasterized at the document's native pixel size). Decoding is CPU
//! bound, so the async entry point hops onto a blocking worker.

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::debug;

use crate::error::{Error, Result};

/// PNG media type
pub const MIME_PNG: &str = "image/png";
/// SVG media type
pub const MIME_SVG: &str = "image/svg+xml";

/// An encoded image payload: container bytes plus declared media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Raw container bytes (PNG, JPEG, SVG text, ...)
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
}

impl EncodedImage {
    /// Wrap raw bytes with a declared media type
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Wrap PNG container bytes
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MIME_PNG)
    }

    /// Wrap an SVG document
    pub fn svg(text: String) -> Self {
        Self::new(text.into_bytes(), MIME_SVG)
    }

    /// Parse a `data:` URI into its payload bytes and media type
    ///
    /// Accepts both base64 payloads (`data:image/png;base64,...`) and
    /// verbatim/percent-encoded text payloads (`data:image/svg+xml,<svg...`).
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::Decode(format!("not a data URI: '{}'", truncate(uri, 32))))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::Decode("data URI is missing its payload".to_string()))?;

        let mut media_type = "text/plain";
        let mut is_base64 = false;
        for (i, part) in meta.split(';').enumerate() {
            if i == 0 {
                if !part.is_empty() {
                    media_type = part;
                }
            } else if part.eq_ignore_ascii_case("base64") {
                is_base64 = true;
            }
        }

        let bytes = if is_base64 {
            STANDARD
                .decode(payload)
                .map_err(|e| Error::Decode(format!("invalid base64 payload: {}", e)))?
        } else {
            percent_decode(payload)
        };

        Ok(Self::new(bytes, media_type))
    }

    /// Serialize as a base64 `data:` URI
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            STANDARD.encode(&self.bytes)
        )
    }

    /// Whether this payload should take the vector decoding path
    ///
    /// Routing follows the declared media type, with a content sniff for
    /// payloads delivered under a generic type.
    pub fn is_vector(&self) -> bool {
        if self.media_type.contains("svg") {
            return true;
        }
        let head = String::from_utf8_lossy(&self.bytes[..self.bytes.len().min(256)]);
        let text = head.trim_start();
        text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A decoded bitmap ready for compositing
///
/// Handles are produced by the decoder (or rotation) and moved, never
/// shared, into the stage that consumes them.
#[derive(Debug, Clone)]
pub struct RasterImage {
    inner: DynamicImage,
}

impl RasterImage {
    /// Wrap an already-decoded bitmap
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Borrow the underlying bitmap
    pub fn inner(&self) -> &DynamicImage {
        &self.inner
    }

    /// Unwrap the underlying bitmap
    pub fn into_inner(self) -> DynamicImage {
        self.inner
    }

    /// Encode as a PNG payload
    pub fn encode_png(&self) -> Result<EncodedImage> {
        let mut bytes = Vec::new();
        self.inner
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| Error::Render(format!("png encode failed: {}", e)))?;
        Ok(EncodedImage::png(bytes))
    }
}

/// Decode an encoded payload into a bitmap
///
/// Runs the container parse on a blocking worker; malformed payloads
/// surface as [`Error::Decode`].
pub async fn decode(payload: EncodedImage) -> Result<RasterImage> {
    tokio::task::spawn_blocking(move || decode_blocking(&payload))
        .await
        .map_err(|e| Error::Runtime(format!("decode task failed: {}", e)))?
}

/// Synchronous decode used by the blocking worker and by compositors
/// that are already off the async runtime.
pub fn decode_blocking(payload: &EncodedImage) -> Result<RasterImage> {
    if payload.is_empty() {
        return Err(Error::Decode("empty image payload".to_string()));
    }
    if payload.is_vector() {
        rasterize_svg(&payload.bytes)
    } else {
        let inner = image::load_from_memory(&payload.bytes).map_err(|e| {
            Error::Decode(format!(
                "unable to decode {} payload: {}",
                payload.media_type, e
            ))
        })?;
        debug!(
            "decoded {} payload: {}x{}",
            payload.media_type,
            inner.width(),
            inner.height()
        );
        Ok(RasterImage::new(inner))
    }
}

/// System font database shared across vector decodes
fn shared_fontdb() -> Arc<usvg::fontdb::Database> {
    static FONTDB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTDB
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            debug!("loaded {} font faces for vector text", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Parse an SVG document and rasterize it at its native pixel size
fn rasterize_svg(bytes: &[u8]) -> Result<RasterImage> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("svg payload is not valid UTF-8: {}", e)))?;

    let options = usvg::Options {
        fontdb: shared_fontdb(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(text, &options)
        .map_err(|e| Error::Decode(format!("unable to parse svg document: {}", e)))?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        Error::Render(format!(
            "unable to allocate {}x{} vector surface",
            width, height
        ))
    })?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    debug!("rasterized svg document: {}x{}", width, height);

    // Pixmap stores premultiplied RGBA; compositing expects straight alpha.
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let buffer = RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| Error::Render("vector surface has inconsistent dimensions".to_string()))?;
    Ok(RasterImage::new(DynamicImage::ImageRgba8(buffer)))
}

/// Decode `%XX` escapes, passing other bytes through verbatim
fn percent_decode(payload: &str) -> Vec<u8> {
    let src = payload.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] == b'%' && i + 2 < src.len() {
            let hi = (src[i + 1] as char).to_digit(16);
            let lo = (src[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(src[i]);
        i += 1;
    }
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
