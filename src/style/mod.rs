//! # Report Styling
//!
//! Colors and text styles used by the block renderer. The status and priority
//! color mappings are part of the report's presentation contract: readers scan
//! the answer column by color, so every renderer goes through
//! [`status_color`] and [`priority_color`] rather than picking its own.

use crate::model::{AnswerStatus, Priority};
use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb8(0, 0, 0);
    pub const WHITE: Color = Color::rgb8(255, 255, 255);

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to 0.0 - 1.0, as PDF color operators expect.
    pub fn unit(&self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    /// Parse `#rrggbb` or `#rgb`. Malformed components fall back to 0.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return Self::BLACK;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
        match hex.len() {
            3 => Self::rgb8(
                channel(&hex[0..1].repeat(2)),
                channel(&hex[1..2].repeat(2)),
                channel(&hex[2..3].repeat(2)),
            ),
            6 => Self::rgb8(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            _ => Self::BLACK,
        }
    }
}

/// The report palette.
pub mod palette {
    use super::Color;

    pub const PRIMARY: Color = Color::rgb8(0x00, 0x7b, 0xff);
    pub const TEXT: Color = Color::rgb8(0x22, 0x22, 0x22);
    pub const COMPLIANT: Color = Color::rgb8(0x28, 0xa7, 0x45);
    pub const NON_COMPLIANT: Color = Color::rgb8(0xdc, 0x35, 0x45);
    pub const NOT_APPLICABLE: Color = Color::rgb8(0x6c, 0x75, 0x7d);
    pub const AMBER: Color = Color::rgb8(0xff, 0xc1, 0x07);
    pub const PANEL: Color = Color::rgb8(0xf8, 0xf9, 0xfa);
    pub const SECTION: Color = Color::rgb8(0xe9, 0xec, 0xef);
    pub const DIVIDER: Color = Color::rgb8(0xde, 0xe2, 0xe6);
    pub const PLACEHOLDER: Color = Color::rgb8(0xe6, 0xe6, 0xe6);
}

/// Color of an answer label. Unanswered and unrecognized answers are gray.
pub fn status_color(status: Option<&AnswerStatus>) -> Color {
    match status {
        Some(AnswerStatus::Compliant) => palette::COMPLIANT,
        Some(AnswerStatus::NonCompliant) => palette::NON_COMPLIANT,
        Some(AnswerStatus::NotApplicable) | Some(AnswerStatus::Unrecognized(_)) | None => {
            palette::NOT_APPLICABLE
        }
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => palette::NON_COMPLIANT,
        Priority::Medium => palette::AMBER,
        Priority::Low => palette::COMPLIANT,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// Everything needed to measure and draw a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub weight: FontWeight,
    pub color: Color,
    pub align: TextAlign,
    /// Line height as a multiplier of font size.
    pub line_height: f64,
}

impl TextStyle {
    pub fn new(font_size: f64, color: Color) -> Self {
        Self {
            font_size,
            weight: FontWeight::Regular,
            color,
            align: TextAlign::Left,
            line_height: 1.25,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn centered(mut self) -> Self {
        self.align = TextAlign::Center;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Height of one line of this style in points.
    pub fn line_advance(&self) -> f64 {
        self.font_size * self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Color::hex("#ffffff"), Color::WHITE);
        assert_eq!(Color::hex("#000"), Color::BLACK);
        assert_eq!(Color::hex("#28a745"), palette::COMPLIANT);
    }

    #[test]
    fn test_status_colors_are_distinct() {
        let green = status_color(Some(&AnswerStatus::Compliant));
        let red = status_color(Some(&AnswerStatus::NonCompliant));
        let gray = status_color(Some(&AnswerStatus::NotApplicable));
        assert_ne!(green, red);
        assert_ne!(red, gray);
        assert_ne!(green, gray);
        assert_eq!(status_color(None), gray);
    }

    #[test]
    fn test_priority_colors() {
        assert_eq!(priority_color(Priority::High), palette::NON_COMPLIANT);
        assert_eq!(priority_color(Priority::Medium), palette::AMBER);
        assert_eq!(priority_color(Priority::Low), palette::COMPLIANT);
    }
}
