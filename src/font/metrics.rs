//! Advance widths for the standard PDF fonts the report uses.
//!
//! Widths are in 1/1000 em, taken from the Adobe Font Metrics files for
//! Helvetica and Helvetica-Bold. Only printable ASCII is tabulated; other
//! characters measure as the font's average glyph width.

/// Per-font width table.
pub struct StandardFontMetrics {
    /// Widths for U+0020 ..= U+007E.
    ascii_widths: &'static [u16; 95],
    default_width: u16,
}

impl StandardFontMetrics {
    /// Advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let code = ch as u32;
        let w = if (0x20..=0x7E).contains(&code) {
            self.ascii_widths[(code - 0x20) as usize]
        } else {
            self.default_width
        };
        w as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

pub static HELVETICA: StandardFontMetrics = StandardFontMetrics {
    ascii_widths: &HELVETICA_WIDTHS,
    default_width: 556,
};

pub static HELVETICA_BOLD: StandardFontMetrics = StandardFontMetrics {
    ascii_widths: &HELVETICA_BOLD_WIDTHS,
    default_width: 611,
};

#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_width() {
        assert!((HELVETICA.char_width(' ', 12.0) - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_table_alignment() {
        // Spot-check a few entries to catch an off-by-one in the tables.
        assert_eq!(HELVETICA.char_width('A', 1000.0), 667.0);
        assert_eq!(HELVETICA.char_width('i', 1000.0), 222.0);
        assert_eq!(HELVETICA.char_width('~', 1000.0), 584.0);
        assert_eq!(HELVETICA_BOLD.char_width('m', 1000.0), 889.0);
        assert_eq!(HELVETICA_BOLD.char_width('z', 1000.0), 500.0);
    }

    #[test]
    fn test_non_ascii_uses_default() {
        assert_eq!(HELVETICA.char_width('é', 1000.0), 556.0);
    }
}
