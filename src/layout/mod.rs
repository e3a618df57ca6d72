//! # Page Layout
//!
//! Layout happens in two halves that never look at each other's state:
//!
//! - [`cursor::PageFlowCursor`] owns the vertical write position and is the
//!   only thing that decides where a page ends.
//! - A [`Surface`] receives drawing primitives at positions the cursor handed
//!   out. [`PageCanvas`] is the surface used for real output: it records
//!   primitives per page as [`LayoutElement`]s for the PDF writer.
//!
//! [`render::BlockRenderer`] sits between the two, turning content blocks
//! into reserve-then-draw calls.
//!
//! Coordinates here are points with the origin at the top-left of the page.
//! The PDF writer flips them.

pub mod cursor;
pub mod render;

use std::sync::Arc;

use crate::font::FontContext;
use crate::image_loader::NormalizedImage;
use crate::style::{Color, TextAlign, TextStyle};
use crate::text::{BrokenLine, TextLayout};

/// A single page of positioned draw commands.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned draw command.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner on the page.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Filled rectangle, with rounded corners when `radius > 0`.
    Rect { color: Color, radius: f64 },
    /// Text lines; each line carries its own position.
    Text { lines: Vec<TextLine>, style: TextStyle },
    Image { image: Arc<NormalizedImage> },
    /// Stand-in for a photo that could not be loaded.
    ImagePlaceholder { label: String },
}

/// A line of text placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    /// Baseline offset from the top of the page.
    pub baseline: f64,
    pub text: String,
    pub width: f64,
}

/// Drawing primitives the block renderer needs.
///
/// `page` is the zero-based page index from a cursor slot; `y` is the top of
/// the drawn shape.
pub trait Surface {
    /// Break text into lines no wider than `width`.
    fn wrap(&self, text: &str, width: f64, style: &TextStyle) -> Vec<BrokenLine>;

    fn measure(&self, text: &str, style: &TextStyle) -> f64;

    /// Height that `text` wrapped to `width` will occupy.
    fn text_height(&self, text: &str, width: f64, style: &TextStyle) -> f64 {
        self.wrap(text, width, style).len() as f64 * style.line_advance()
    }

    fn fill_rect(&mut self, page: usize, x: f64, y: f64, width: f64, height: f64, color: Color);

    fn fill_rounded_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        color: Color,
    );

    /// Draw already-wrapped lines starting at `y`. Returns the height used.
    fn lines(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        lines: &[BrokenLine],
        style: &TextStyle,
    ) -> f64;

    /// Wrap `text` to `width` and draw it. Returns the height used.
    fn text(&mut self, page: usize, x: f64, y: f64, width: f64, text: &str, style: &TextStyle) -> f64 {
        let lines = self.wrap(text, width, style);
        self.lines(page, x, y, width, &lines, style)
    }

    /// Place an image at its own pixel size.
    fn image(&mut self, page: usize, x: f64, y: f64, image: Arc<NormalizedImage>);

    fn placeholder(&mut self, page: usize, x: f64, y: f64, width: f64, height: f64, label: &str);
}

/// Records draw commands into pages, creating pages on first use.
#[derive(Debug, Clone)]
pub struct PageCanvas {
    width: f64,
    height: f64,
    pages: Vec<LayoutPage>,
    text_layout: TextLayout,
}

impl PageCanvas {
    pub fn new(width: f64, height: f64, fonts: FontContext) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
            text_layout: TextLayout::new(fonts),
        }
    }

    /// Finish recording. Always returns at least `page_count` pages so a
    /// page the cursor opened but nothing drew on still exists.
    pub fn into_pages(mut self, page_count: usize) -> Vec<LayoutPage> {
        if page_count > 0 {
            self.page_mut(page_count - 1);
        }
        self.pages
    }

    fn page_mut(&mut self, page: usize) -> &mut LayoutPage {
        while self.pages.len() <= page {
            self.pages.push(LayoutPage {
                width: self.width,
                height: self.height,
                elements: Vec::new(),
            });
        }
        &mut self.pages[page]
    }

    fn push(&mut self, page: usize, element: LayoutElement) {
        self.page_mut(page).elements.push(element);
    }
}

/// Baseline of line `index` in a block whose top is at `top`.
fn baseline(top: f64, index: usize, style: &TextStyle) -> f64 {
    let advance = style.line_advance();
    top + index as f64 * advance + (advance - style.font_size) / 2.0 + style.font_size * 0.8
}

impl Surface for PageCanvas {
    fn wrap(&self, text: &str, width: f64, style: &TextStyle) -> Vec<BrokenLine> {
        self.text_layout
            .break_into_lines(text, width, style.font_size, style.weight)
    }

    fn measure(&self, text: &str, style: &TextStyle) -> f64 {
        self.text_layout
            .measure_width(text, style.font_size, style.weight)
    }

    fn fill_rect(&mut self, page: usize, x: f64, y: f64, width: f64, height: f64, color: Color) {
        self.fill_rounded_rect(page, x, y, width, height, 0.0, color);
    }

    fn fill_rounded_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        color: Color,
    ) {
        self.push(
            page,
            LayoutElement {
                x,
                y,
                width,
                height,
                draw: DrawCommand::Rect { color, radius },
            },
        );
    }

    fn lines(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        lines: &[BrokenLine],
        style: &TextStyle,
    ) -> f64 {
        if lines.is_empty() {
            return 0.0;
        }
        let placed = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let offset = match style.align {
                    TextAlign::Left => 0.0,
                    TextAlign::Center => ((width - line.width) / 2.0).max(0.0),
                };
                TextLine {
                    x: x + offset,
                    baseline: baseline(y, i, style),
                    text: line.text.clone(),
                    width: line.width,
                }
            })
            .collect();
        let height = lines.len() as f64 * style.line_advance();
        self.push(
            page,
            LayoutElement {
                x,
                y,
                width,
                height,
                draw: DrawCommand::Text {
                    lines: placed,
                    style: *style,
                },
            },
        );
        height
    }

    fn image(&mut self, page: usize, x: f64, y: f64, image: Arc<NormalizedImage>) {
        let (width, height) = image.size();
        self.push(
            page,
            LayoutElement {
                x,
                y,
                width,
                height,
                draw: DrawCommand::Image { image },
            },
        );
    }

    fn placeholder(&mut self, page: usize, x: f64, y: f64, width: f64, height: f64, label: &str) {
        self.push(
            page,
            LayoutElement {
                x,
                y,
                width,
                height,
                draw: DrawCommand::ImagePlaceholder {
                    label: label.to_string(),
                },
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::palette;

    fn canvas() -> PageCanvas {
        PageCanvas::new(595.28, 841.89, FontContext::new())
    }

    #[test]
    fn test_pages_created_on_demand() {
        let mut c = canvas();
        c.fill_rect(2, 0.0, 0.0, 10.0, 10.0, palette::PANEL);
        let pages = c.into_pages(3);
        assert_eq!(pages.len(), 3);
        assert!(pages[0].elements.is_empty());
        assert_eq!(pages[2].elements.len(), 1);
    }

    #[test]
    fn test_into_pages_pads_blank_trailing_pages() {
        let pages = canvas().into_pages(2);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_text_returns_consumed_height() {
        let mut c = canvas();
        let style = TextStyle::new(10.0, palette::TEXT);
        let h = c.text(0, 30.0, 100.0, 60.0, "Guards are fitted and maintained", &style);
        let lines = c.wrap("Guards are fitted and maintained", 60.0, &style);
        assert!(lines.len() > 1);
        assert_eq!(h, lines.len() as f64 * style.line_advance());
    }

    #[test]
    fn test_baselines_descend() {
        let mut c = canvas();
        let style = TextStyle::new(12.0, palette::TEXT);
        c.text(0, 0.0, 50.0, 40.0, "one two three four", &style);
        let pages = c.into_pages(1);
        let DrawCommand::Text { lines, .. } = &pages[0].elements[0].draw else {
            panic!("expected text");
        };
        assert!(lines[0].baseline > 50.0 && lines[0].baseline < 50.0 + style.line_advance());
        for pair in lines.windows(2) {
            assert!(pair[1].baseline > pair[0].baseline);
        }
    }

    #[test]
    fn test_centered_text_is_offset() {
        let mut c = canvas();
        let style = TextStyle::new(12.0, palette::TEXT).centered();
        c.text(0, 0.0, 0.0, 400.0, "Summary", &style);
        let pages = c.into_pages(1);
        let DrawCommand::Text { lines, .. } = &pages[0].elements[0].draw else {
            panic!("expected text");
        };
        assert!(lines[0].x > 100.0);
    }
}
