//! # Page Flow Cursor
//!
//! The only place page breaks are decided. Renderers ask for vertical space
//! with [`PageFlowCursor::reserve`] and draw wherever the returned [`Slot`]
//! says; they never compare offsets against the page bottom themselves.
//!
//! Offsets are measured from the top edge of the page, in points.

use tracing::debug;

use crate::model::{Edges, PageConfig};

/// Where a reserved block should be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    /// Zero-based page index.
    pub page: usize,
    /// Top of the reserved band, from the top edge of the page.
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct PageFlowCursor {
    page: usize,
    y: f64,
    page_width: f64,
    page_height: f64,
    margin: Edges,
    /// Whether anything has been reserved on the current page.
    touched: bool,
}

impl PageFlowCursor {
    pub fn new(config: &PageConfig) -> Self {
        let (page_width, page_height) = config.size.dimensions();
        Self {
            page: 0,
            y: config.margin.top,
            page_width,
            page_height,
            margin: config.margin,
            touched: false,
        }
    }

    /// Reserve `height` points of vertical space and return where to draw.
    ///
    /// A block that does not fit on the current page moves to the next one.
    /// A block taller than a whole page gets the top of a fresh page (or of
    /// the current page, if nothing is on it yet) and the page is then
    /// considered full; callers that can split such content should do so
    /// in page-sized pieces instead.
    pub fn reserve(&mut self, height: f64) -> Slot {
        let height = height.max(0.0);

        if height > self.printable_height() {
            if self.touched {
                self.advance_page();
            }
            let slot = self.slot();
            debug!(page = self.page, height, "block taller than a page");
            self.y = self.bottom_limit();
            self.touched = true;
            return slot;
        }

        if self.y + height > self.bottom_limit() {
            self.advance_page();
        }

        let slot = self.slot();
        self.y += height;
        self.touched = true;
        slot
    }

    /// Leave a gap below the last block. Gaps never open a page and are
    /// dropped at the top of a fresh one.
    pub fn skip(&mut self, height: f64) {
        if self.touched {
            self.y = (self.y + height.max(0.0)).min(self.bottom_limit());
        }
    }

    /// Force a page break.
    pub fn advance_page(&mut self) {
        self.page += 1;
        self.y = self.margin.top;
        self.touched = false;
        debug!(page = self.page, "page break");
    }

    /// Break to a new page if less than `min_space` remains on a page that
    /// already has content.
    pub fn ensure_space(&mut self, min_space: f64) {
        if self.touched && self.remaining() < min_space {
            self.advance_page();
        }
    }

    /// Vertical space left before the bottom margin.
    pub fn remaining(&self) -> f64 {
        (self.bottom_limit() - self.y).max(0.0)
    }

    pub fn printable_height(&self) -> f64 {
        self.page_height - self.margin.vertical()
    }

    pub fn content_left(&self) -> f64 {
        self.margin.left
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - self.margin.horizontal()
    }

    /// Offset of the bottom margin from the top edge.
    pub fn bottom_limit(&self) -> f64 {
        self.page_height - self.margin.bottom
    }

    pub fn top(&self) -> f64 {
        self.margin.top
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Current write offset.
    pub fn offset(&self) -> f64 {
        self.y
    }

    /// Number of pages the cursor has opened.
    pub fn page_count(&self) -> usize {
        self.page + 1
    }

    pub fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn slot(&self) -> Slot {
        Slot {
            page: self.page,
            y: self.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageSize;

    fn cursor() -> PageFlowCursor {
        PageFlowCursor::new(&PageConfig {
            size: PageSize::Custom {
                width: 400.0,
                height: 300.0,
            },
            margin: Edges::symmetric(20.0, 10.0),
        })
    }

    #[test]
    fn test_reserve_advances_offset() {
        let mut c = cursor();
        assert_eq!(c.reserve(50.0), Slot { page: 0, y: 20.0 });
        assert_eq!(c.reserve(30.0), Slot { page: 0, y: 70.0 });
        assert_eq!(c.offset(), 100.0);
    }

    #[test]
    fn test_reserve_breaks_when_block_does_not_fit() {
        let mut c = cursor();
        c.reserve(200.0);
        // 60pt left on the page
        let slot = c.reserve(80.0);
        assert_eq!(slot, Slot { page: 1, y: 20.0 });
        assert_eq!(c.page_count(), 2);
    }

    #[test]
    fn test_exact_fit_stays_on_page() {
        let mut c = cursor();
        let slot = c.reserve(c.printable_height());
        assert_eq!(slot.page, 0);
        assert_eq!(c.remaining(), 0.0);
    }

    #[test]
    fn test_reserved_band_never_crosses_bottom_margin() {
        let mut c = cursor();
        let printable = c.printable_height();
        // Deterministic pseudo-random heights in (0, printable]
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let h = ((seed >> 33) % 1000) as f64 / 1000.0 * printable + 0.5;
            let h = h.min(printable);
            let slot = c.reserve(h);
            assert!(slot.y >= c.top());
            assert!(
                slot.y + h <= c.bottom_limit() + 1e-9,
                "band {}..{} crosses {}",
                slot.y,
                slot.y + h,
                c.bottom_limit()
            );
            assert!(c.offset() >= c.top() && c.offset() <= c.bottom_limit());
        }
    }

    #[test]
    fn test_oversize_block_gets_fresh_page() {
        let mut c = cursor();
        c.reserve(10.0);
        let slot = c.reserve(c.printable_height() + 100.0);
        assert_eq!(slot, Slot { page: 1, y: 20.0 });
        assert!(c.offset() <= c.bottom_limit());
        assert_eq!(c.remaining(), 0.0);

        // The next block starts on the following page
        assert_eq!(c.reserve(10.0).page, 2);
    }

    #[test]
    fn test_oversize_block_on_untouched_page_does_not_skip_a_page() {
        let mut c = cursor();
        let slot = c.reserve(1000.0);
        assert_eq!(slot.page, 0);
        assert_eq!(slot.y, c.top());
    }

    #[test]
    fn test_pages_are_monotonic() {
        let mut c = cursor();
        let mut last = 0;
        for h in [100.0, 250.0, 10.0, 400.0, 5.0, 260.0] {
            let slot = c.reserve(h);
            assert!(slot.page >= last);
            last = slot.page;
        }
    }

    #[test]
    fn test_skip_never_breaks_a_page() {
        let mut c = cursor();
        c.skip(50.0);
        assert_eq!(c.offset(), c.top(), "gap at the top of a page is dropped");

        c.reserve(250.0);
        c.skip(50.0);
        assert_eq!(c.page(), 0);
        assert_eq!(c.offset(), c.bottom_limit());
    }

    #[test]
    fn test_ensure_space() {
        let mut c = cursor();
        c.ensure_space(70.0);
        assert_eq!(c.page(), 0, "empty page must not be skipped");

        c.reserve(200.0);
        c.ensure_space(50.0);
        assert_eq!(c.page(), 0);
        c.ensure_space(70.0);
        assert_eq!(c.page(), 1);
        assert_eq!(c.offset(), c.top());
    }
}
