//! # Font Management
//!
//! The report is set entirely in the standard PDF Helvetica family, which
//! readers provide themselves, so nothing is embedded. This module maps a
//! [`FontWeight`] to the concrete standard font and measures text with its
//! metrics.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use crate::style::FontWeight;

/// The standard PDF fonts the report draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// Every font the writer registers, in resource order (`/F0`, `/F1`).
    pub const ALL: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::HelveticaBold];

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn for_weight(weight: FontWeight) -> Self {
        match weight {
            FontWeight::Regular => Self::Helvetica,
            FontWeight::Bold => Self::HelveticaBold,
        }
    }

    /// Resource index used in content streams.
    pub fn resource_index(&self) -> usize {
        match self {
            Self::Helvetica => 0,
            Self::HelveticaBold => 1,
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica => &metrics::HELVETICA,
            Self::HelveticaBold => &metrics::HELVETICA_BOLD,
        }
    }
}

/// Shared font context used by text layout and the canvas.
#[derive(Debug, Clone, Default)]
pub struct FontContext;

impl FontContext {
    pub fn new() -> Self {
        Self
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, weight: FontWeight, font_size: f64) -> f64 {
        StandardFont::for_weight(weight)
            .metrics()
            .char_width(ch, font_size)
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, weight: FontWeight, font_size: f64) -> f64 {
        StandardFont::for_weight(weight)
            .metrics()
            .measure_string(text, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.measure_string("Compliance", FontWeight::Regular, 12.0);
        let bold = ctx.measure_string("Compliance", FontWeight::Bold, 12.0);
        assert!(bold > regular, "Bold text should be wider than regular");
    }

    #[test]
    fn test_resource_indices_match_order() {
        for (i, font) in StandardFont::ALL.iter().enumerate() {
            assert_eq!(font.resource_index(), i);
        }
    }
}
