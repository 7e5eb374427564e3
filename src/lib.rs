// this_file: src/lib.rs
//! Cardpress - print-ready postcard compositing and fulfillment
//!
//! This library provides functionality for:
//! - Decoding raster and vector photo payloads
//! - Normalizing photos to landscape orientation
//! - Aspect-fill composition of the card front at print density
//! - Typesetting the message side as a rasterized vector document
//! - Submitting finished orders to the fulfillment API

pub mod back;
pub mod decode;
pub mod error;
pub mod front;
pub mod geometry;
pub mod logging;
pub mod orient;
pub mod pipeline;
pub mod prefs;
pub mod submit;

// Re-export commonly used types
pub use back::{compose_back, Message, PanelStyle};
pub use decode::{decode, EncodedImage, RasterImage};
pub use error::{Error, Result};
pub use front::compose_front;
pub use geometry::{Dpi, PhysicalSize};
pub use orient::normalize_landscape;
pub use pipeline::{render_back, render_front, submit_order};
pub use prefs::Preferences;
pub use submit::{Address, FulfillmentClient, PostcardOrder, SubmissionResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
