// this_file: src/back.rs
//! Back panel composition: typeset the message into a vector document
//! and rasterize it onto the print canvas.
//!
//! The panel is described as an SVG document sized to the card's device
//! pixel dimensions. It carries two style blocks: the embedded reset
//! stylesheet and a computed block whose pixel values scale with the
//! requested density. Message text is escaped, never injected as
//! markup, and every line becomes its own positioned element. The
//! document is rasterized at native size and drawn 1:1 onto an opaque
//! white canvas, so the encoded output is always exactly
//! `round(width * dpi)` by `round(height * dpi)` pixels.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::decode::{decode_blocking, EncodedImage, RasterImage};
use crate::error::{Error, Result};
use crate::geometry::{Dpi, PhysicalSize};

/// Baseline stylesheet shipped with the crate
const RESET_CSS: &str = include_str!("../assets/reset.css");

/// Text column width in inches, including padding
const COLUMN_WIDTH_IN: f64 = 2.75;
/// Padding inside the text column, inches per side
const COLUMN_PADDING_IN: f64 = 0.2;
/// Line advance as a multiple of the font size
const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Nominal first-line ascent as a multiple of the font size
const BASELINE_FACTOR: f64 = 0.8;
/// Average glyph advance estimate, em fraction, used for wrapping
const ADVANCE_ESTIMATE_EM: f64 = 0.5;

/// The sender's message and its typesetting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message body; newlines are honored as explicit line breaks
    pub content: String,
    /// Font family requested for the message text
    pub font_family: String,
    /// Font size in hundredths of an inch (16 sets a 0.16in em)
    pub font_size: f64,
}

impl Message {
    /// Create a message with validated typesetting parameters
    pub fn new(
        content: impl Into<String>,
        font_family: impl Into<String>,
        font_size: f64,
    ) -> Result<Self> {
        let message = Self {
            content: content.into(),
            font_family: font_family.into(),
            font_size,
        };
        message.validate()?;
        Ok(message)
    }

    /// Check typesetting parameters
    pub fn validate(&self) -> Result<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if self.font_family.trim().is_empty() {
            return Err(Error::InvalidParameter(
                "font family must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Class names used by the back panel markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelClasses {
    /// Full-panel background element
    pub container: &'static str,
    /// Text column group
    pub text_container: &'static str,
    /// Message text element
    pub message: &'static str,
}

/// Computed panel styling: stylesheet text plus the class names it
/// addresses, as plain data
#[derive(Debug, Clone, PartialEq)]
pub struct PanelStyle {
    pub css_text: String,
    pub classes: PanelClasses,
}

/// Resolved text column geometry in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    /// Left edge of the wrapped text, pixels from the panel origin
    pub column_x: f64,
    /// Usable column width after padding on both sides
    pub column_width: f64,
    /// Font size in pixels
    pub font_px: f64,
    /// Baseline-to-baseline advance in pixels
    pub line_height: f64,
    /// Baseline of the first line, pixels from the panel top
    pub first_baseline: f64,
}

/// Compute the panel stylesheet for a density and message
///
/// Pure data out: the caller decides where the css lands. Pixel values
/// scale linearly with the density, mirroring the physical layout.
pub fn compute_panel_style(dpi: Dpi, message: &Message) -> PanelStyle {
    let d = f64::from(dpi.value());
    let css_text = format!(
        ".container {{ fill: #ffffff; }} \
         .text-container {{ width: {}px; padding: {}px; box-sizing: border-box; }} \
         .message {{ font-family: {}; font-size: {}px; fill: #1f1f1f; }}",
        COLUMN_WIDTH_IN * d,
        COLUMN_PADDING_IN * d,
        message.font_family,
        message.font_size / 100.0 * d
    );
    PanelStyle {
        css_text,
        classes: PanelClasses {
            container: "container",
            text_container: "text-container",
            message: "message",
        },
    }
}

/// Compute the text column geometry for a density and message
pub fn compute_panel_layout(dpi: Dpi, message: &Message) -> PanelLayout {
    let d = f64::from(dpi.value());
    let font_px = message.font_size / 100.0 * d;
    PanelLayout {
        column_x: COLUMN_PADDING_IN * d,
        column_width: (COLUMN_WIDTH_IN - 2.0 * COLUMN_PADDING_IN) * d,
        font_px,
        line_height: font_px * LINE_HEIGHT_FACTOR,
        first_baseline: COLUMN_PADDING_IN * d + font_px * BASELINE_FACTOR,
    }
}

/// Build the back panel SVG document
///
/// The document is a single line of markup: explicit newlines in the
/// message become positioned `tspan` elements, never raw characters.
pub fn build_back_document(message: &Message, size: PhysicalSize, dpi: Dpi) -> Result<String> {
    message.validate()?;
    let width = size.pixel_width(dpi);
    let height = size.pixel_height(dpi);
    if width == 0 || height == 0 {
        return Err(Error::InvalidParameter(format!(
            "card {} at {} dpi rounds to an empty canvas",
            size, dpi
        )));
    }

    let style = compute_panel_style(dpi, message);
    let layout = compute_panel_layout(dpi, message);
    let lines = layout_lines(&message.content, &layout);

    let mut spans = String::new();
    for line in &lines {
        if line.text.is_empty() {
            continue;
        }
        spans.push_str(&format!(
            "<tspan x=\"{}\" y=\"{}\">{}</tspan>",
            layout.column_x,
            line.baseline,
            xml_escape(&line.text)
        ));
    }

    let document = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
         viewBox=\"0 0 {w} {h}\">\
         <style>{reset}</style>\
         <style>{computed}</style>\
         <rect class=\"{container}\" x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\"/>\
         <g class=\"{text_container}\"><text class=\"{message_class}\">{spans}</text></g>\
         </svg>",
        w = width,
        h = height,
        reset = xml_escape(&compact_css(RESET_CSS)),
        computed = xml_escape(&style.css_text),
        container = style.classes.container,
        text_container = style.classes.text_container,
        message_class = style.classes.message,
        spans = spans,
    );
    Ok(document)
}

/// Compose the back panel into an encoded PNG
pub fn compose_back_blocking(
    message: &Message,
    size: PhysicalSize,
    dpi: Dpi,
) -> Result<EncodedImage> {
    let width = size.pixel_width(dpi);
    let height = size.pixel_height(dpi);
    let document = build_back_document(message, size, dpi)?;
    let overlay = decode_blocking(&EncodedImage::svg(document))?;
    debug!(
        "back panel rasterized at {}x{} for {} at {} dpi",
        overlay.width(),
        overlay.height(),
        size,
        dpi
    );

    // Fresh opaque canvas; untouched document pixels must print white.
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &overlay.inner().to_rgba8(), 0, 0);
    RasterImage::new(DynamicImage::ImageRgba8(canvas)).encode_png()
}

/// Async wrapper moving the composition onto a blocking worker
pub async fn compose_back(
    message: Message,
    size: PhysicalSize,
    dpi: Dpi,
) -> Result<EncodedImage> {
    tokio::task::spawn_blocking(move || compose_back_blocking(&message, size, dpi))
        .await
        .map_err(|e| Error::Runtime(format!("back composition task failed: {}", e)))?
}

/// A typeset line with its resolved baseline
#[derive(Debug, Clone, PartialEq)]
struct TypesetLine {
    text: String,
    baseline: f64,
}

/// Split the message into typeset lines
///
/// Explicit newlines always break; an empty explicit line keeps its
/// vertical slot. Lines wider than the column are wrapped greedily at
/// word boundaries using an average-advance estimate.
fn layout_lines(content: &str, layout: &PanelLayout) -> Vec<TypesetLine> {
    let max_chars = ((layout.column_width / (layout.font_px * ADVANCE_ESTIMATE_EM)).floor()
        as usize)
        .max(1);

    let mut lines = Vec::new();
    let mut slot = 0usize;
    for paragraph in content.split('\n') {
        let wrapped = wrap_paragraph(paragraph, max_chars);
        for text in wrapped {
            lines.push(TypesetLine {
                text,
                baseline: layout.first_baseline + slot as f64 * layout.line_height,
            });
            slot += 1;
        }
    }
    lines
}

/// Greedy word wrap of a single paragraph
///
/// An empty paragraph yields one empty line so blank message lines keep
/// their spacing. Words longer than the limit are split hard.
fn wrap_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let trimmed = paragraph.trim_end();
    if trimmed.trim().is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in trimmed.split_whitespace() {
        let mut word = word;
        // Hard-split words that cannot fit on any line.
        while word.chars().count() > max_chars {
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(word.len());
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape text for XML element content and attribute values
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse a stylesheet to a single line, dropping comments
fn compact_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn message(content: &str) -> Message {
        Message::new(content, "Georgia", 16.0).unwrap()
    }

    fn size_6x4() -> PhysicalSize {
        PhysicalSize::new(6.0, 4.0).unwrap()
    }

    #[test]
    fn test_style_scales_with_density() {
        let msg = message("hi");
        let at_300 = compute_panel_style(Dpi::new(300).unwrap(), &msg);
        assert!(at_300.css_text.contains("font-size: 48px"));
        assert!(at_300.css_text.contains("width: 825px"));
        assert!(at_300.css_text.contains("padding: 60px"));
        assert!(at_300.css_text.contains("font-family: Georgia"));

        let at_150 = compute_panel_style(Dpi::new(150).unwrap(), &msg);
        assert!(at_150.css_text.contains("font-size: 24px"));
        assert!(at_150.css_text.contains("width: 412.5px"));
    }

    #[test]
    fn test_style_class_names_are_stable() {
        let style = compute_panel_style(Dpi::new(300).unwrap(), &message("x"));
        assert_eq!(style.classes.container, "container");
        assert_eq!(style.classes.text_container, "text-container");
        assert_eq!(style.classes.message, "message");
    }

    #[test]
    fn test_layout_geometry() {
        let layout = compute_panel_layout(Dpi::new(300).unwrap(), &message("x"));
        assert_relative_eq!(layout.column_x, 60.0, epsilon = 1e-9);
        assert_relative_eq!(layout.column_width, 705.0, epsilon = 1e-9);
        assert_relative_eq!(layout.font_px, 48.0, epsilon = 1e-9);
        assert_relative_eq!(layout.line_height, 57.6, epsilon = 1e-9);
        assert_relative_eq!(layout.first_baseline, 98.4, epsilon = 1e-9);
    }

    #[test]
    fn test_document_breaks_lines_into_tspans() {
        let doc =
            build_back_document(&message("first\nsecond"), size_6x4(), Dpi::new(300).unwrap())
                .unwrap();
        assert!(!doc.contains('\n'));
        assert_eq!(doc.matches("<tspan").count(), 2);
        assert!(doc.contains(">first</tspan>"));
        assert!(doc.contains(">second</tspan>"));
    }

    #[test]
    fn test_document_escapes_markup_characters() {
        let doc = build_back_document(
            &message("Fish & <Chips>"),
            size_6x4(),
            Dpi::new(300).unwrap(),
        )
        .unwrap();
        assert!(doc.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(!doc.contains("<Chips>"));
    }

    #[test]
    fn test_blank_line_keeps_its_slot() {
        let dpi = Dpi::new(300).unwrap();
        let msg = message("a\n\nb");
        let layout = compute_panel_layout(dpi, &msg);
        let lines = layout_lines(&msg.content, &layout);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "");
        assert_relative_eq!(
            lines[2].baseline - lines[0].baseline,
            2.0 * layout.line_height,
            epsilon = 1e-9
        );

        // The blank line holds a slot without emitting an element.
        let doc = build_back_document(&msg, size_6x4(), dpi).unwrap();
        assert_eq!(doc.matches("<tspan").count(), 2);
    }

    #[test]
    fn test_long_paragraph_wraps_to_column() {
        let dpi = Dpi::new(300).unwrap();
        let msg = message(
            "Greetings from the coast, wish you were here to see the light on the water",
        );
        let layout = compute_panel_layout(dpi, &msg);
        let max_chars = ((layout.column_width / (layout.font_px * ADVANCE_ESTIMATE_EM)).floor()
            as usize)
            .max(1);
        let lines = layout_lines(&msg.content, &layout);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(
                line.text.chars().count() <= max_chars,
                "line '{}' exceeds {} chars",
                line.text,
                max_chars
            );
        }
    }

    #[test]
    fn test_wrap_splits_oversized_words() {
        let lines = wrap_paragraph("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);

        let lines = wrap_paragraph("hi abcdefghij bye", 4);
        assert!(lines.iter().all(|l| l.chars().count() <= 4));
        assert_eq!(lines.concat(), "hiabcdefghijbye");
    }

    #[test]
    fn test_document_embeds_both_style_blocks() {
        let doc = build_back_document(&message("x"), size_6x4(), Dpi::new(300).unwrap()).unwrap();
        assert_eq!(doc.matches("<style>").count(), 2);
        assert!(doc.contains("text-anchor: start"));
        assert!(doc.contains("font-size: 48px"));
    }

    #[test]
    fn test_compose_back_has_exact_dimensions_and_white_ground() {
        let dpi = Dpi::new(25).unwrap();
        let back = compose_back_blocking(&message("hello\nworld"), size_6x4(), dpi).unwrap();
        let rgba = decode_blocking(&back).unwrap().into_inner().into_rgba8();
        assert_eq!(rgba.dimensions(), (150, 100));
        assert_eq!(rgba.get_pixel(149, 99).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_compose_back_is_deterministic() {
        let dpi = Dpi::new(25).unwrap();
        let msg = message("same text");
        let first = compose_back_blocking(&msg, size_6x4(), dpi).unwrap();
        let second = compose_back_blocking(&msg, size_6x4(), dpi).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_message_validation() {
        assert!(Message::new("x", "Georgia", 0.0).is_err());
        assert!(Message::new("x", "Georgia", f64::NAN).is_err());
        assert!(Message::new("x", "  ", 16.0).is_err());
        assert!(Message::new("", "Georgia", 16.0).is_ok());
    }

    #[test]
    fn test_compact_css_strips_comments() {
        let css = "/* note */ a { x: 1; }\n  b { y: 2; }";
        assert_eq!(compact_css(css), "a { x: 1; } b { y: 2; }");
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
        assert_eq!(xml_escape("plain"), "plain");
    }
}
