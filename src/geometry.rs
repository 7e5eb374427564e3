// this_file: src/geometry.rs
//! Physical print dimensions and aspect-fill crop math.
//!
//! All card dimensions are carried in inches and converted to device
//! pixels only at composition time. Crop solving is pure math so the
//! compositors stay deterministic and testable without image data.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Physical card size in inches (width x height)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSize {
    width: f64,
    height: f64,
}

impl PhysicalSize {
    /// Create a validated physical size
    ///
    /// Both extents must be finite and strictly positive.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !width.is_finite() || !height.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "card size must be finite, got {}x{}",
                width, height
            )));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "card size must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Width in inches
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in inches
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Width / height ratio
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Device pixel width at the given density, rounded to nearest
    pub fn pixel_width(&self, dpi: Dpi) -> u32 {
        (self.width * f64::from(dpi.value())).round() as u32
    }

    /// Device pixel height at the given density, rounded to nearest
    pub fn pixel_height(&self, dpi: Dpi) -> u32 {
        (self.height * f64::from(dpi.value())).round() as u32
    }

    /// Form-field label, e.g. `6x4` or `6x4.25`
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for PhysicalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PhysicalSize {
    type Err = Error;

    /// Parse a `WxH` label such as `6x4` or `6x4.25`
    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s.split_once(&['x', 'X'][..]).ok_or_else(|| {
            Error::InvalidParameter(format!("expected WxH size label, got '{}'", s))
        })?;
        let width: f64 = w.trim().parse().map_err(|_| {
            Error::InvalidParameter(format!("invalid width in size label '{}'", s))
        })?;
        let height: f64 = h.trim().parse().map_err(|_| {
            Error::InvalidParameter(format!("invalid height in size label '{}'", s))
        })?;
        Self::new(width, height)
    }
}

/// Print density in dots per inch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dpi(u32);

impl Dpi {
    /// Create a validated density (must be at least 1)
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidParameter(
                "dpi must be at least 1".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Raw dots-per-inch value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Dpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Dpi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidParameter(format!("invalid dpi '{}'", s)))?;
        Self::new(value)
    }
}

/// Axis-aligned crop window in source pixel coordinates
///
/// Coordinates stay fractional until the crop is applied; rounding once
/// at application time keeps the solver exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// Width / height ratio of the window
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Round to whole pixels, clamped to the source bounds
    pub fn rounded(&self, src_width: u32, src_height: u32) -> (u32, u32, u32, u32) {
        let x = self.x.round().max(0.0) as u32;
        let y = self.y.round().max(0.0) as u32;
        let w = (self.width.round() as u32).clamp(1, src_width.saturating_sub(x).max(1));
        let h = (self.height.round() as u32).clamp(1, src_height.saturating_sub(y).max(1));
        (x, y, w, h)
    }
}

/// Solve the centered aspect-fill crop of a source image for a target
/// aspect ratio.
///
/// A source wider than the target loses equal strips from the left and
/// right edges; a taller source loses equal strips from the top and
/// bottom. A source already at the target aspect maps to its full frame.
pub fn aspect_fill_crop(
    src_width: u32,
    src_height: u32,
    target_aspect: f64,
) -> Result<CropRegion> {
    if src_width == 0 || src_height == 0 {
        return Err(Error::InvalidParameter(format!(
            "source image has degenerate dimensions {}x{}",
            src_width, src_height
        )));
    }
    if !target_aspect.is_finite() || target_aspect <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "target aspect must be positive and finite, got {}",
            target_aspect
        )));
    }

    let src_w = f64::from(src_width);
    let src_h = f64::from(src_height);
    let src_aspect = src_w / src_h;

    let region = if src_aspect > target_aspect {
        // Source is wider than the target: full height, trimmed sides.
        let width = target_aspect * src_h;
        CropRegion {
            x: (src_w - width) / 2.0,
            y: 0.0,
            width,
            height: src_h,
        }
    } else {
        // Source is taller (or equal): full width, trimmed top/bottom.
        let height = src_w / target_aspect;
        CropRegion {
            x: 0.0,
            y: (src_h - height) / 2.0,
            width: src_w,
            height,
        }
    };

    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_size_rejects_degenerate() {
        assert!(PhysicalSize::new(0.0, 4.0).is_err());
        assert!(PhysicalSize::new(6.0, -4.0).is_err());
        assert!(PhysicalSize::new(f64::NAN, 4.0).is_err());
        assert!(PhysicalSize::new(6.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_pixel_dimensions_round() {
        let size = PhysicalSize::new(6.0, 4.0).unwrap();
        let dpi = Dpi::new(300).unwrap();
        assert_eq!(size.pixel_width(dpi), 1800);
        assert_eq!(size.pixel_height(dpi), 1200);

        let tall = PhysicalSize::new(6.0, 4.25).unwrap();
        assert_eq!(tall.pixel_height(dpi), 1275);

        // Fractional products round to nearest, not truncate
        let odd = PhysicalSize::new(3.505, 2.0).unwrap();
        let dpi100 = Dpi::new(100).unwrap();
        assert_eq!(odd.pixel_width(dpi100), 351);
    }

    #[test]
    fn test_size_label_trims_trailing_zeros() {
        assert_eq!(PhysicalSize::new(6.0, 4.0).unwrap().label(), "6x4");
        assert_eq!(PhysicalSize::new(6.0, 4.25).unwrap().label(), "6x4.25");
    }

    #[test]
    fn test_size_parse_roundtrip() {
        let size: PhysicalSize = "6x4".parse().unwrap();
        assert_relative_eq!(size.width(), 6.0);
        assert_relative_eq!(size.height(), 4.0);
        assert_eq!(size.label(), "6x4");

        let size: PhysicalSize = "6X4.25".parse().unwrap();
        assert_relative_eq!(size.height(), 4.25);

        assert!("6".parse::<PhysicalSize>().is_err());
        assert!("0x4".parse::<PhysicalSize>().is_err());
        assert!("ax4".parse::<PhysicalSize>().is_err());
    }

    #[test]
    fn test_dpi_rejects_zero() {
        assert!(Dpi::new(0).is_err());
        assert_eq!(Dpi::new(300).unwrap().value(), 300);
        assert!("0".parse::<Dpi>().is_err());
        assert_eq!("72".parse::<Dpi>().unwrap().value(), 72);
    }

    #[test]
    fn test_crop_matching_aspect_is_full_frame() {
        let region = aspect_fill_crop(1800, 1200, 1.5).unwrap();
        assert_relative_eq!(region.x, 0.0);
        assert_relative_eq!(region.y, 0.0);
        assert_relative_eq!(region.width, 1800.0);
        assert_relative_eq!(region.height, 1200.0);
    }

    #[test]
    fn test_crop_wider_source_trims_sides() {
        let region = aspect_fill_crop(2400, 1200, 1.5).unwrap();
        assert_relative_eq!(region.width, 1800.0);
        assert_relative_eq!(region.height, 1200.0);
        assert_relative_eq!(region.x, 300.0);
        assert_relative_eq!(region.y, 0.0);
    }

    #[test]
    fn test_crop_taller_source_trims_top_and_bottom() {
        let region = aspect_fill_crop(1200, 1800, 1.5).unwrap();
        assert_relative_eq!(region.width, 1200.0);
        assert_relative_eq!(region.height, 800.0);
        assert_relative_eq!(region.x, 0.0);
        assert_relative_eq!(region.y, 500.0);
    }

    #[test]
    fn test_crop_is_centered_and_aspect_exact() {
        // Sweep a range of source shapes against a few targets: the
        // window must sit centered and carry the target aspect exactly.
        let targets = [1.5, 6.0 / 4.25, 1.0, 0.75];
        for &target in &targets {
            for src_w in [100u32, 640, 1200, 2400] {
                for src_h in [80u32, 480, 1800] {
                    let region = aspect_fill_crop(src_w, src_h, target).unwrap();
                    assert_relative_eq!(region.aspect(), target, max_relative = 1e-9);
                    assert_relative_eq!(
                        region.x * 2.0 + region.width,
                        f64::from(src_w),
                        max_relative = 1e-9
                    );
                    assert_relative_eq!(
                        region.y * 2.0 + region.height,
                        f64::from(src_h),
                        max_relative = 1e-9
                    );
                    assert!(region.width <= f64::from(src_w) + 1e-9);
                    assert!(region.height <= f64::from(src_h) + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_crop_rejects_degenerate_input() {
        assert!(aspect_fill_crop(0, 100, 1.5).is_err());
        assert!(aspect_fill_crop(100, 0, 1.5).is_err());
        assert!(aspect_fill_crop(100, 100, 0.0).is_err());
        assert!(aspect_fill_crop(100, 100, f64::NAN).is_err());
    }

    #[test]
    fn test_rounded_clamps_to_source() {
        let region = CropRegion {
            x: 299.6,
            y: 0.0,
            width: 1800.4,
            height: 1200.0,
        };
        let (x, y, w, h) = region.rounded(2400, 1200);
        assert_eq!((x, y), (300, 0));
        assert!(x + w <= 2400);
        assert_eq!(h, 1200);
    }
}
