//! # Block Renderer
//!
//! One handler per block kind. Every handler follows the same shape: measure
//! how tall the block will be, ask the cursor for that much space, draw at the
//! slot it returns. Handlers keep no state of their own apart from which photo
//! group comes next.
//!
//! Blocks taller than a page (a question with pages of comments, an essay of
//! a recommendation) are drawn one line band at a time so the cursor can
//! carry them across page boundaries.

use std::slice;

use tracing::debug;

use crate::config::ReportConfig;
use crate::content::{Block, PhotoGroupKind, Response, Summary};
use crate::layout::cursor::PageFlowCursor;
use crate::layout::Surface;
use crate::model::{Photo, Recommendation};
use crate::photo::{box_for, PreparedImages};
use crate::style::{palette, priority_color, status_color, Color, TextStyle};
use crate::text::BrokenLine;

/// Label drawn in place of a photo that failed to load.
pub const PHOTO_PLACEHOLDER: &str = "Photo could not be loaded";

const BLOCK_GAP: f64 = 12.0;
const CELL_PAD: f64 = 4.0;
const BANNER_HEIGHT: f64 = 28.0;
const LEGEND_HEIGHT: f64 = 18.0;
const SUMMARY_HEIGHT: f64 = 60.0;
const DETAIL_LINE_HEIGHT: f64 = 18.0;
const PLACEHOLDER_HEIGHT: f64 = 24.0;

/// Horizontal layout of the question table.
#[derive(Debug, Clone, Copy)]
struct Columns {
    reg_x: f64,
    reg_w: f64,
    question_x: f64,
    question_w: f64,
    answer_x: f64,
    answer_w: f64,
    comments_x: f64,
    comments_w: f64,
}

impl Columns {
    fn new(left: f64, width: f64) -> Self {
        Self {
            reg_x: left,
            reg_w: 55.0,
            question_x: left + 60.0,
            question_w: width - 240.0,
            answer_x: left + width - 170.0,
            answer_w: 60.0,
            comments_x: left + width - 105.0,
            comments_w: 95.0,
        }
    }
}

pub struct BlockRenderer<'a> {
    config: &'a ReportConfig,
    images: &'a PreparedImages,
    banner: Color,
    /// Ordinal of the next photo group, matching `PreparedImages`.
    next_group: usize,
}

impl<'a> BlockRenderer<'a> {
    pub fn new(config: &'a ReportConfig, images: &'a PreparedImages) -> Self {
        Self {
            config,
            images,
            banner: config.report.banner(),
            next_group: 0,
        }
    }

    /// Render every block in order, then the page footers.
    pub fn render_all<S: Surface>(
        &mut self,
        blocks: &[Block<'_>],
        cursor: &mut PageFlowCursor,
        surface: &mut S,
    ) {
        for block in blocks {
            self.render(block, cursor, surface);
        }
        if self.config.layout.page_numbers {
            self.page_numbers(cursor, surface);
        }
        debug!(
            blocks = blocks.len(),
            pages = cursor.page_count(),
            "blocks rendered"
        );
    }

    pub fn render<S: Surface>(&mut self, block: &Block<'_>, cursor: &mut PageFlowCursor, surface: &mut S) {
        match block {
            Block::PageHeader { title } => self.page_header(title, cursor, surface),
            Block::EquipmentDetails {
                lines,
                nameplate_info,
            } => self.equipment_details(lines, *nameplate_info, cursor, surface),
            Block::MetadataSummary(summary) => self.summary(summary, cursor, surface),
            Block::SectionHeader { section } => self.section_header(section, cursor, surface),
            Block::QuestionRow {
                regulation,
                text,
                response,
            } => self.question_row(regulation, text, response, cursor, surface),
            Block::PhotoGroup { photos, kind } => self.photo_group(photos, *kind, cursor, surface),
            Block::RecommendationsHeader => self.recommendations_header(cursor, surface),
            Block::RecommendationRow(rec) => self.recommendation_row(rec, cursor, surface),
            Block::EmptyState { message } => self.empty_state(message, cursor, surface),
        }
    }

    fn body(&self) -> TextStyle {
        TextStyle::new(self.config.layout.body_font_size, palette::TEXT)
    }

    fn small(&self) -> TextStyle {
        TextStyle::new(self.config.layout.body_font_size - 1.0, palette::TEXT)
    }

    fn page_header<S: Surface>(&self, title: &str, cursor: &mut PageFlowCursor, surface: &mut S) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let height = self.config.layout.header_height;
        let slot = cursor.reserve(height);

        surface.fill_rect(slot.page, left, slot.y, width, height, self.banner);
        let style = TextStyle::new(22.0, Color::WHITE).bold().centered();
        let text_h = surface.text_height(title, width - 20.0, &style);
        let y = slot.y + ((height - text_h) / 2.0).max(0.0);
        surface.text(slot.page, left + 10.0, y, width - 20.0, title, &style);
        cursor.skip(BLOCK_GAP);
    }

    fn equipment_details<S: Surface>(
        &self,
        lines: &[(&'static str, String)],
        nameplate_info: Option<&str>,
        cursor: &mut PageFlowCursor,
        surface: &mut S,
    ) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let label_style = TextStyle::new(12.0, palette::TEXT).bold();
        let value_style = TextStyle::new(12.0, palette::TEXT);

        for (label, value) in lines {
            let label = format!("{}:", label);
            let label_w = surface.measure(&label, &label_style) + 6.0;
            let (value_x, value_w) = (left + label_w, width - label_w);
            let value_lines = surface.wrap(value, value_w, &value_style);

            // Label and first value line share a band; the rest may run on.
            let (first, rest) = match value_lines.split_first() {
                Some((first, rest)) => (Some(first), rest),
                None => (None, &[][..]),
            };
            let band_h = if rest.is_empty() {
                DETAIL_LINE_HEIGHT.max(value_style.line_advance())
            } else {
                value_style.line_advance()
            };
            let slot = cursor.reserve(band_h);
            surface.text(slot.page, left, slot.y, label_w, &label, &label_style);
            if let Some(first) = first {
                surface.lines(slot.page, value_x, slot.y, value_w, slice::from_ref(first), &value_style);
            }
            flow_lines(cursor, surface, value_x, value_w, rest, &value_style);
        }

        if let Some(info) = nameplate_info {
            cursor.skip(6.0);
            let slot = cursor.reserve(DETAIL_LINE_HEIGHT);
            surface.text(slot.page, left, slot.y, width, "Nameplate / Machine Info:", &label_style);
            let lines = surface.wrap(info, width, &self.body());
            flow_lines(cursor, surface, left, width, &lines, &self.body());
        }
        cursor.skip(BLOCK_GAP);
    }

    fn summary<S: Surface>(&self, summary: &Summary, cursor: &mut PageFlowCursor, surface: &mut S) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let slot = cursor.reserve(SUMMARY_HEIGHT);
        let (page, y) = (slot.page, slot.y);

        surface.fill_rounded_rect(page, left, y, width, SUMMARY_HEIGHT, 6.0, palette::PANEL);
        surface.text(page, left + 12.0, y + 8.0, 150.0, "Summary", &TextStyle::new(14.0, palette::TEXT).bold());
        surface.text(
            page,
            left + 12.0,
            y + 32.0,
            150.0,
            &format!("Completion: {}%", summary.completion_percent),
            &TextStyle::new(12.0, palette::TEXT),
        );

        let stats = [
            ("Compliant", summary.compliant, palette::COMPLIANT),
            ("Non-Compliant", summary.non_compliant, palette::NON_COMPLIANT),
            ("N/A", summary.not_applicable, palette::NOT_APPLICABLE),
        ];
        let stats_x = left + 170.0;
        let col_w = (width - 180.0) / stats.len() as f64;
        for (i, (label, count, color)) in stats.iter().enumerate() {
            let style = TextStyle::new(12.0, *color).bold();
            let x = stats_x + i as f64 * col_w;
            surface.text(page, x, y + 32.0, col_w, &format!("{}: {}", label, count), &style);
        }
        cursor.skip(BLOCK_GAP);
    }

    fn section_header<S: Surface>(&self, section: &str, cursor: &mut PageFlowCursor, surface: &mut S) {
        // Never leave a header stranded without room for its first row.
        let header_h = BANNER_HEIGHT + CELL_PAD + LEGEND_HEIGHT;
        let layout = &self.config.layout;
        cursor.ensure_space(layout.section_min_space.max(header_h + layout.row_min_height));
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let cols = Columns::new(left, width);

        let slot = cursor.reserve(header_h);
        let (page, y) = (slot.page, slot.y);

        surface.fill_rounded_rect(page, left, y, width, BANNER_HEIGHT, 4.0, palette::SECTION);
        let title = TextStyle::new(14.0, self.banner).bold();
        let title_y = y + (BANNER_HEIGHT - title.line_advance()) / 2.0;
        surface.text(page, left + 10.0, title_y, width - 20.0, &format!("Section {}", section), &title);

        let legend = TextStyle::new(10.0, palette::NOT_APPLICABLE).bold();
        let legend_y = y + BANNER_HEIGHT + CELL_PAD;
        for (x, w, label) in [
            (cols.reg_x, cols.reg_w, "Reg."),
            (cols.question_x, cols.question_w, "Question"),
            (cols.answer_x, cols.answer_w, "Answer"),
            (cols.comments_x, cols.comments_w, "Comments"),
        ] {
            surface.text(page, x, legend_y, w, label, &legend);
        }
        surface.fill_rect(page, left, legend_y + LEGEND_HEIGHT - 1.0, width, 0.5, palette::DIVIDER);
    }

    fn question_row<S: Surface>(
        &self,
        regulation: &str,
        text: &str,
        response: &Response<'_>,
        cursor: &mut PageFlowCursor,
        surface: &mut S,
    ) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let cols = Columns::new(left, width);
        let body = self.body();
        let reg_style = body.bold();
        let comment_style = self.small();
        let label_style = body.bold().colored(status_color(response.status()));

        let reg_lines = surface.wrap(regulation, cols.reg_w, &reg_style);
        let question_lines = surface.wrap(text, cols.question_w, &body);
        let label_lines = surface.wrap(&response.label(), cols.answer_w, &label_style);
        let comment_lines = surface.wrap(response.comments(), cols.comments_w, &comment_style);

        let content_h = (reg_lines.len() as f64 * reg_style.line_advance())
            .max(question_lines.len() as f64 * body.line_advance())
            .max(label_lines.len() as f64 * label_style.line_advance())
            .max(comment_lines.len() as f64 * comment_style.line_advance());
        let row_h = (content_h + 2.0 * CELL_PAD).max(self.config.layout.row_min_height);

        if row_h <= cursor.printable_height() {
            let slot = cursor.reserve(row_h);
            let (page, y) = (slot.page, slot.y + CELL_PAD);
            surface.lines(page, cols.reg_x, y, cols.reg_w, &reg_lines, &reg_style);
            surface.lines(page, cols.question_x, y, cols.question_w, &question_lines, &body);
            surface.lines(page, cols.answer_x, y, cols.answer_w, &label_lines, &label_style);
            surface.lines(page, cols.comments_x, y, cols.comments_w, &comment_lines, &comment_style);
            surface.fill_rect(page, left, slot.y + row_h - 0.5, width, 0.5, palette::DIVIDER);
            return;
        }

        debug!(regulation, height = row_h, "question row spans pages");
        let band_h = body.line_advance().max(comment_style.line_advance());
        let bands = reg_lines
            .len()
            .max(question_lines.len())
            .max(label_lines.len())
            .max(comment_lines.len());
        for i in 0..bands {
            let slot = cursor.reserve(band_h);
            let (page, y) = (slot.page, slot.y);
            if let Some(line) = reg_lines.get(i) {
                surface.lines(page, cols.reg_x, y, cols.reg_w, slice::from_ref(line), &reg_style);
            }
            if let Some(line) = question_lines.get(i) {
                surface.lines(page, cols.question_x, y, cols.question_w, slice::from_ref(line), &body);
            }
            if let Some(line) = label_lines.get(i) {
                surface.lines(page, cols.answer_x, y, cols.answer_w, slice::from_ref(line), &label_style);
            }
            if let Some(line) = comment_lines.get(i) {
                surface.lines(page, cols.comments_x, y, cols.comments_w, slice::from_ref(line), &comment_style);
            }
        }
        let slot = cursor.reserve(CELL_PAD);
        surface.fill_rect(slot.page, left, slot.y + CELL_PAD - 0.5, width, 0.5, palette::DIVIDER);
    }

    fn photo_group<S: Surface>(
        &mut self,
        photos: &[Photo],
        kind: PhotoGroupKind,
        cursor: &mut PageFlowCursor,
        surface: &mut S,
    ) {
        let group = self.next_group;
        self.next_group += 1;

        let (left, width) = (cursor.content_left(), cursor.content_width());
        let photo_config = &self.config.photos;
        let bounds = box_for(kind, photo_config);
        let indent = match kind {
            PhotoGroupKind::Nameplate => {
                let slot = cursor.reserve(DETAIL_LINE_HEIGHT);
                let caption = TextStyle::new(12.0, palette::TEXT).bold();
                surface.text(slot.page, left, slot.y, width, "Nameplate / Machine Info Photos", &caption);
                0.0
            }
            PhotoGroupKind::Evidence => Columns::new(left, width).question_x - left,
        };
        let origin_x = left + indent;
        let available = width - indent;

        let items: Vec<_> = (0..photos.len())
            .map(|i| match self.images.get(group, i) {
                Some(Ok(image)) => {
                    let (w, h) = image.size();
                    (w, h, Some(image.clone()))
                }
                _ => (bounds.width, PLACEHOLDER_HEIGHT, None),
            })
            .collect();

        // Left to right, wrapping before an image that would cross the margin.
        let mut rows: Vec<Vec<usize>> = Vec::new();
        let mut row_w = 0.0;
        for (i, (w, _, _)) in items.iter().enumerate() {
            match rows.last_mut() {
                Some(row) if row_w + photo_config.gap_x + w <= available => {
                    row.push(i);
                    row_w += photo_config.gap_x + w;
                }
                _ => {
                    rows.push(vec![i]);
                    row_w = *w;
                }
            }
        }

        for row in rows {
            let row_h = row.iter().map(|&i| items[i].1).fold(0.0, f64::max);
            let slot = cursor.reserve(row_h + photo_config.gap_y);
            let mut x = origin_x;
            for i in row {
                let (w, h, image) = &items[i];
                match image {
                    Some(image) => surface.image(slot.page, x, slot.y, image.clone()),
                    None => surface.placeholder(slot.page, x, slot.y, *w, *h, PHOTO_PLACEHOLDER),
                }
                x += w + photo_config.gap_x;
            }
        }
    }

    fn recommendations_header<S: Surface>(&self, cursor: &mut PageFlowCursor, surface: &mut S) {
        cursor.skip(BLOCK_GAP);
        cursor.ensure_space(self.config.layout.section_min_space);
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let slot = cursor.reserve(BANNER_HEIGHT);

        surface.fill_rounded_rect(slot.page, left, slot.y, width, BANNER_HEIGHT, 4.0, self.banner);
        let title = TextStyle::new(14.0, Color::WHITE).bold();
        let y = slot.y + (BANNER_HEIGHT - title.line_advance()) / 2.0;
        surface.text(slot.page, left + 10.0, y, width - 20.0, "Recommendations", &title);
        cursor.skip(8.0);
    }

    fn recommendation_row<S: Surface>(
        &self,
        rec: &Recommendation,
        cursor: &mut PageFlowCursor,
        surface: &mut S,
    ) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let (inner_x, inner_w) = (left + 12.0, width - 24.0);
        let body = self.body();
        let meta = self.small();

        let text_lines = surface.wrap(&rec.text, inner_w, &body);
        let details = format!(
            "Assignee: {}    Due: {}",
            crate::model::non_blank(Some(rec.assignee.as_str())).unwrap_or("N/A"),
            rec.due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        );
        let detail_lines = surface.wrap(&details, inner_w, &meta);

        let text_h = text_lines.len() as f64 * body.line_advance();
        let meta_h = (1 + detail_lines.len()) as f64 * meta.line_advance();
        let card_h = 8.0 + text_h + 4.0 + meta_h + 8.0;
        let stripe = priority_color(rec.priority);

        if card_h <= cursor.printable_height() {
            let slot = cursor.reserve(card_h);
            let (page, y) = (slot.page, slot.y);
            surface.fill_rounded_rect(page, left, y, width, card_h, 4.0, palette::PANEL);
            surface.fill_rect(page, left, y, 4.0, card_h, stripe);
            surface.lines(page, inner_x, y + 8.0, inner_w, &text_lines, &body);
            self.recommendation_meta(rec, &detail_lines, page, (inner_x, y + 8.0 + text_h + 4.0), inner_w, surface);
        } else {
            debug!(recommendation = %rec.id, height = card_h, "recommendation spans pages");
            flow_lines(cursor, surface, inner_x, inner_w, &text_lines, &body);
            let slot = cursor.reserve(meta_h + 4.0);
            surface.fill_rect(slot.page, left, slot.y, 4.0, meta_h + 4.0, stripe);
            self.recommendation_meta(rec, &detail_lines, slot.page, (inner_x, slot.y + 4.0), inner_w, surface);
        }
        cursor.skip(8.0);
    }

    /// "Priority: <label>" then the wrapped assignee and due date.
    fn recommendation_meta<S: Surface>(
        &self,
        rec: &Recommendation,
        detail_lines: &[BrokenLine],
        page: usize,
        (x, y): (f64, f64),
        width: f64,
        surface: &mut S,
    ) {
        let meta = self.small();
        let prefix = "Priority:";
        let prefix_w = surface.measure(prefix, &meta) + 4.0;
        surface.text(page, x, y, prefix_w, prefix, &meta);

        let label_style = meta.bold().colored(priority_color(rec.priority));
        let label = rec.priority.label();
        let label_w = surface.measure(label, &label_style) + 4.0;
        surface.text(page, x + prefix_w, y, label_w, label, &label_style);

        surface.lines(page, x, y + meta.line_advance(), width, detail_lines, &meta);
    }

    fn empty_state<S: Surface>(&self, message: &str, cursor: &mut PageFlowCursor, surface: &mut S) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let style = TextStyle::new(self.config.layout.body_font_size, palette::NOT_APPLICABLE);
        let lines = surface.wrap(message, width, &style);
        cursor.skip(CELL_PAD);
        flow_lines(cursor, surface, left, width, &lines, &style);
        cursor.skip(CELL_PAD);
    }

    /// "Page n of N" centered in the bottom margin of every page.
    fn page_numbers<S: Surface>(&self, cursor: &PageFlowCursor, surface: &mut S) {
        let (left, width) = (cursor.content_left(), cursor.content_width());
        let (_, page_h) = cursor.page_size();
        let style = TextStyle::new(9.0, palette::NOT_APPLICABLE).centered();
        let margin = page_h - cursor.bottom_limit();
        let y = cursor.bottom_limit() + ((margin - style.line_advance()) / 2.0).max(0.0);

        let total = cursor.page_count();
        for page in 0..total {
            let label = format!("Page {} of {}", page + 1, total);
            surface.text(page, left, y, width, &label, &style);
        }
    }
}

/// Draw lines one band at a time so they can continue on the next page.
/// Consecutive lines that land on the same page are drawn as one run.
fn flow_lines<S: Surface>(
    cursor: &mut PageFlowCursor,
    surface: &mut S,
    x: f64,
    width: f64,
    lines: &[BrokenLine],
    style: &TextStyle,
) {
    let mut run: Option<(usize, crate::layout::cursor::Slot)> = None;
    for i in 0..lines.len() {
        let slot = cursor.reserve(style.line_advance());
        match run {
            Some((_, start)) if start.page == slot.page => {}
            _ => {
                if let Some((first, start)) = run {
                    surface.lines(start.page, x, start.y, width, &lines[first..i], style);
                }
                run = Some((i, slot));
            }
        }
    }
    if let Some((first, start)) = run {
        surface.lines(start.page, x, start.y, width, &lines[first..], style);
    }
}
