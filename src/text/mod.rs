//! # Text Layout
//!
//! Greedy line breaking against real font metrics. Break opportunities come
//! from UAX#14; a word that is wider than the whole line is hyphenated at a
//! syllable boundary when one fits, and hard-split otherwise, so wrapping
//! always terminates and never produces a line wider than `max_width` unless
//! a single character is.

use crate::font::FontContext;
use crate::style::FontWeight;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub text: String,
    /// Width of the line excluding trailing spaces.
    pub width: f64,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Returns a vec of length `text.chars().count()`. Each entry is the break
/// opportunity *before* that character position. Index 0 is always `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields byte offsets of the start of the next segment.
    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    fonts: FontContext,
}

impl TextLayout {
    pub fn new(fonts: FontContext) -> Self {
        Self { fonts }
    }

    /// Break a string into lines that fit within `max_width`.
    ///
    /// Empty input yields no lines.
    pub fn break_into_lines(
        &self,
        text: &str,
        max_width: f64,
        font_size: f64,
        weight: FontWeight,
    ) -> Vec<BrokenLine> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let widths: Vec<f64> = chars
            .iter()
            .map(|&ch| self.fonts.char_width(ch, weight, font_size))
            .collect();
        let hyphen_width = self.fonts.char_width('-', weight, font_size);
        let break_opps = compute_break_opportunities(text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break_point: Option<usize> = None;

        for (i, &ch) in chars.iter().enumerate() {
            if i > 0 {
                match break_opps[i] {
                    Some(BreakOpportunity::Mandatory) => {
                        lines.push(make_line(&chars[line_start..i], &widths[line_start..i]));
                        line_start = i;
                        line_width = 0.0;
                        last_break_point = None;
                    }
                    Some(BreakOpportunity::Allowed) => last_break_point = Some(i - 1),
                    None => {}
                }
            }

            if is_newline(ch) {
                continue;
            }

            let char_width = widths[i];
            // Trailing spaces hang past the edge; make_line trims them.
            if ch == ' ' {
                line_width += char_width;
                continue;
            }

            if line_width + char_width > max_width && line_start < i {
                // Break after the last opportunity on this line if there is one.
                if let Some(bp) = last_break_point.filter(|&bp| bp >= line_start) {
                    let break_at = bp + 1;
                    lines.push(make_line(
                        &chars[line_start..break_at],
                        &widths[line_start..break_at],
                    ));
                    line_start = break_at;
                    line_width = widths[line_start..=i].iter().sum();
                    last_break_point = None;
                    continue;
                }

                if let Some((line, new_start)) = self.try_hyphenate_word(
                    &chars,
                    &widths,
                    line_start,
                    i,
                    max_width,
                    hyphen_width,
                ) {
                    lines.push(line);
                    line_start = new_start;
                    line_width = widths[line_start..=i].iter().sum();
                    last_break_point = None;
                    continue;
                }

                lines.push(make_line(&chars[line_start..i], &widths[line_start..i]));
                line_start = i;
                line_width = char_width;
                last_break_point = None;
                continue;
            }

            line_width += char_width;
        }

        if line_start < chars.len() {
            lines.push(make_line(&chars[line_start..], &widths[line_start..]));
        }

        lines
    }

    /// Measure the width of a string on a single line.
    pub fn measure_width(&self, text: &str, font_size: f64, weight: FontWeight) -> f64 {
        self.fonts.measure_string(text, weight, font_size)
    }

    /// Split the word overflowing at `overflow_at` at the rightmost English
    /// syllable boundary that still fits, appending a visible hyphen.
    fn try_hyphenate_word(
        &self,
        chars: &[char],
        widths: &[f64],
        line_start: usize,
        overflow_at: usize,
        max_width: f64,
        hyphen_width: f64,
    ) -> Option<(BrokenLine, usize)> {
        let mut word_start = overflow_at;
        while word_start > line_start && !chars[word_start - 1].is_whitespace() {
            word_start -= 1;
        }
        if overflow_at <= word_start {
            return None;
        }

        let word: String = chars[word_start..overflow_at].iter().collect();
        let syllables: Vec<&str> = hypher::hyphenate(&word, hypher::Lang::English).collect();
        if syllables.len() < 2 {
            return None;
        }

        let prefix_width: f64 = widths[line_start..word_start].iter().sum();
        let mut best_break = None;
        let mut offset = word_start;
        for syllable in &syllables[..syllables.len() - 1] {
            offset += syllable.chars().count();
            let part_width: f64 = widths[word_start..offset].iter().sum();
            if prefix_width + part_width + hyphen_width <= max_width {
                best_break = Some(offset);
            }
        }

        let break_at = best_break?;
        let mut line = make_line(&chars[line_start..break_at], &widths[line_start..break_at]);
        line.text.push('-');
        line.width += hyphen_width;
        Some((line, break_at))
    }
}

/// Create a BrokenLine, dropping trailing spaces and line terminators.
fn make_line(chars: &[char], widths: &[f64]) -> BrokenLine {
    let mut end = chars.len();
    while end > 0 && (chars[end - 1] == ' ' || is_newline(chars[end - 1])) {
        end -= 1;
    }
    BrokenLine {
        text: chars[..end].iter().collect(),
        width: widths[..end].iter().sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tl() -> TextLayout {
        TextLayout::new(FontContext::new())
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(tl().break_into_lines("", 100.0, 12.0, FontWeight::Regular).is_empty());
    }

    #[test]
    fn test_short_text_single_line() {
        let lines = tl().break_into_lines("Guard fitted", 300.0, 12.0, FontWeight::Regular);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Guard fitted");
    }

    #[test]
    fn test_wraps_at_spaces() {
        let text = "Is the equipment suitable for the purpose for which it is used";
        let lines = tl().break_into_lines(text, 120.0, 11.0, FontWeight::Regular);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width <= 120.0, "line '{}' is {} wide", line.text, line.width);
            assert!(!line.text.ends_with(' '));
        }
        let rejoined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn test_mandatory_break() {
        let lines = tl().break_into_lines("first\nsecond", 300.0, 12.0, FontWeight::Regular);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_unbreakable_run_is_force_split() {
        let text = "x".repeat(200);
        let lines = tl().break_into_lines(&text, 50.0, 12.0, FontWeight::Regular);
        assert!(lines.len() > 1);
        let total: usize = lines
            .iter()
            .map(|l| l.text.trim_end_matches('-').chars().count())
            .sum();
        assert_eq!(total, 200);
        for line in &lines {
            assert!(line.width <= 50.0);
        }
    }

    #[test]
    fn test_long_word_hyphenates() {
        let lines = tl().break_into_lines("extraordinarily", 50.0, 12.0, FontWeight::Regular);
        assert!(lines.len() >= 2);
        assert!(lines[0].text.ends_with('-'), "got '{}'", lines[0].text);
    }

    #[test]
    fn test_bold_wraps_sooner() {
        let text = "Maintenance records are kept up to date";
        let regular = tl().break_into_lines(text, 150.0, 12.0, FontWeight::Regular);
        let bold = tl().break_into_lines(text, 150.0, 12.0, FontWeight::Bold);
        assert!(bold.len() >= regular.len());
    }
}
