//! # PDF Serializer
//!
//! Takes the laid-out pages and writes a PDF 1.7 file.
//!
//! The writer is from scratch and deliberately small: the report only needs
//! filled rectangles, text in the two standard Helvetica faces, and baseline
//! JPEG images, so there is no font embedding and no image re-encoding here.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- Catalog
//! 2 0 obj ... endobj  <- Pages tree
//! 3 0 obj ...         <- fonts, images, then content stream + page per page
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root and info objects
//! %%EOF
//! ```
//!
//! Output depends only on the pages and metadata: no timestamps or random
//! ids are written, so identical input gives identical bytes.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use chrono::NaiveDate;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::font::StandardFont;
use crate::image_loader::NormalizedImage;
use crate::layout::{DrawCommand, LayoutElement, LayoutPage};
use crate::model::Assessment;
use crate::style::{palette, Color, TextStyle};

/// Values for the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Collects rendered pages and serializes them as one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    pages: Vec<LayoutPage>,
    metadata: DocumentMetadata,
}

impl DocumentAssembler {
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            pages: Vec::new(),
            metadata,
        }
    }

    pub fn add_pages(&mut self, pages: impl IntoIterator<Item = LayoutPage>) {
        self.pages.extend(pages);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The finished PDF bytes.
    pub fn serialize(&self) -> Vec<u8> {
        PdfWriter::new().write(&self.pages, &self.metadata)
    }
}

/// `{prefix}_{equipment name}_{YYYY-MM-DD}.pdf` using today's local date.
pub fn suggested_filename(prefix: &str, assessment: &Assessment) -> String {
    suggested_filename_on(prefix, assessment, chrono::Local::now().date_naive())
}

/// Like [`suggested_filename`] for a given date. The equipment name is
/// reduced to ASCII letters, digits, `-` and `_`; anything else becomes `_`.
/// A missing or blank name becomes `Unnamed`.
pub fn suggested_filename_on(prefix: &str, assessment: &Assessment, date: NaiveDate) -> String {
    let name = assessment
        .equipment_details
        .display_name()
        .map(sanitize_filename_part)
        .unwrap_or_else(|| "Unnamed".to_string());
    format!("{}_{}_{}.pdf", prefix, name, date.format("%Y-%m-%d"))
}

fn sanitize_filename_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Object ids of `/F0`, `/F1`, ... in [`StandardFont::ALL`] order.
    font_objects: Vec<usize>,
    /// XObject ids for images, indexed as /Im0, /Im1, ...
    image_objects: Vec<usize>,
    /// Maps (page_index, element_index) to an index into `image_objects`.
    image_index_map: HashMap<(usize, usize), usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(&self, pages: &[LayoutPage], metadata: &DocumentMetadata) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            image_objects: Vec::new(),
            image_index_map: HashMap::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: vec![] });
        }

        for font in StandardFont::ALL {
            let id = builder.objects.len();
            let dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            builder.objects.push(PdfObject {
                data: dict.into_bytes(),
            });
            builder.font_objects.push(id);
        }

        self.register_images(&mut builder, pages);

        let font_resources: String = builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for (page_idx, page) in pages.iter().enumerate() {
            let content = self.build_content_stream_for_page(page, page_idx, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let xobject_resources = self.build_xobject_resource_dict(page_idx, page, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!(
                    "/Font << {} >> /XObject << {} >>",
                    font_resources, xobject_resources
                )
            };
            let page_obj_id = builder.objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.objects.len();
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", encode_pdf_text(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", encode_pdf_text(author));
        }
        let _ = write!(
            info,
            "/Producer (puwer-report {}) >>",
            env!("CARGO_PKG_VERSION")
        );
        builder.objects.push(PdfObject {
            data: info.into_bytes(),
        });

        self.serialize(&builder, info_obj_id)
    }

    /// Write every distinct image as a DCTDecode XObject.
    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        // The same photo drawn twice shares one XObject.
        let mut seen: Vec<(*const NormalizedImage, usize)> = Vec::new();

        for (page_idx, page) in pages.iter().enumerate() {
            for (element_idx, element) in page.elements.iter().enumerate() {
                let DrawCommand::Image { image } = &element.draw else {
                    continue;
                };
                let key = std::sync::Arc::as_ptr(image);
                let image_idx = match seen.iter().find(|(ptr, _)| *ptr == key) {
                    Some((_, idx)) => *idx,
                    None => {
                        let obj_id = Self::write_image_xobject(builder, image);
                        builder.image_objects.push(obj_id);
                        let idx = builder.image_objects.len() - 1;
                        seen.push((key, idx));
                        idx
                    }
                };
                builder
                    .image_index_map
                    .insert((page_idx, element_idx), image_idx);
            }
        }
    }

    fn write_image_xobject(builder: &mut PdfBuilder, image: &NormalizedImage) -> usize {
        let obj_id = builder.objects.len();
        let mut obj_data: Vec<u8> = Vec::new();
        let _ = write!(
            obj_data,
            "<< /Type /XObject /Subtype /Image \
             /Width {} /Height {} \
             /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 \
             /Filter /DCTDecode \
             /Length {} >>\nstream\n",
            image.width_px,
            image.height_px,
            image.jpeg.len()
        );
        obj_data.extend_from_slice(&image.jpeg);
        obj_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject { data: obj_data });
        obj_id
    }

    fn build_xobject_resource_dict(
        &self,
        page_idx: usize,
        page: &LayoutPage,
        builder: &PdfBuilder,
    ) -> String {
        let mut used: Vec<usize> = (0..page.elements.len())
            .filter_map(|i| builder.image_index_map.get(&(page_idx, i)).copied())
            .collect();
        used.sort_unstable();
        used.dedup();
        used.iter()
            .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx]))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream_for_page(
        &self,
        page: &LayoutPage,
        page_idx: usize,
        builder: &PdfBuilder,
    ) -> String {
        let mut stream = String::new();
        for (element_idx, element) in page.elements.iter().enumerate() {
            let image_idx = builder.image_index_map.get(&(page_idx, element_idx)).copied();
            self.write_element(&mut stream, element, page.height, image_idx);
        }
        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        image_idx: Option<usize>,
    ) {
        // PDF y runs up from the bottom edge.
        let x = element.x;
        let y = page_height - element.y - element.height;
        let (w, h) = (element.width, element.height);

        match &element.draw {
            DrawCommand::Rect { color, radius } => {
                self.write_fill(stream, x, y, w, h, *radius, *color);
            }

            DrawCommand::Text { lines, style } => {
                let font = StandardFont::for_weight(style.weight);
                let (r, g, b) = style.color.unit();
                let _ = write!(
                    stream,
                    "BT\n/F{} {:.1} Tf\n{:.3} {:.3} {:.3} rg\n",
                    font.resource_index(),
                    style.font_size,
                    r,
                    g,
                    b
                );
                for line in lines {
                    let _ = write!(
                        stream,
                        "1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\n",
                        line.x,
                        page_height - line.baseline,
                        encode_pdf_text(&line.text)
                    );
                }
                stream.push_str("ET\n");
            }

            DrawCommand::Image { .. } => {
                if let Some(idx) = image_idx {
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        w, h, x, y, idx
                    );
                }
            }

            DrawCommand::ImagePlaceholder { label } => {
                self.write_fill(stream, x, y, w, h, 0.0, palette::PLACEHOLDER);
                let style = TextStyle::new(9.0, palette::NON_COMPLIANT);
                let font = StandardFont::for_weight(style.weight);
                let text_w = font.metrics().measure_string(label, style.font_size);
                let text_x = x + ((w - text_w) / 2.0).max(4.0);
                let text_y = y + (h - style.font_size) / 2.0 + 2.0;
                let (r, g, b) = style.color.unit();
                let _ = write!(
                    stream,
                    "BT\n/F{} {:.1} Tf\n{:.3} {:.3} {:.3} rg\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
                    font.resource_index(),
                    style.font_size,
                    r,
                    g,
                    b,
                    text_x,
                    text_y,
                    encode_pdf_text(label)
                );
            }
        }
    }

    fn write_fill(
        &self,
        stream: &mut String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        radius: f64,
        color: Color,
    ) {
        let (r, g, b) = color.unit();
        let _ = write!(stream, "q\n{:.3} {:.3} {:.3} rg\n", r, g, b);
        if radius > 0.0 {
            self.write_rounded_rect(stream, x, y, w, h, radius);
        } else {
            let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, y, w, h);
        }
        stream.push_str("f\nQ\n");
    }

    /// Trace a rectangle with circular corners using cubic Bezier arcs.
    fn write_rounded_rect(&self, stream: &mut String, x: f64, y: f64, w: f64, h: f64, radius: f64) {
        let k = 0.5522847498;
        let r = radius.min(w / 2.0).min(h / 2.0);
        let c = r - r * k;

        let _ = writeln!(stream, "{:.2} {:.2} m", x + r, y);
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w - r, y);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w - c, y, x + w, y + c, x + w, y + r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w, y + h - r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w, y + h - c, x + w - c, y + h, x + w - r, y + h
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + r, y + h);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + c, y + h, x, y + h - c, x, y + h - r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x, y + r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x, y + c, x + c, y, x + r, y
        );
        stream.push_str("h\n");
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

/// Encode text for a literal PDF string in WinAnsiEncoding.
///
/// Delimiters are escaped; bytes outside printable ASCII are written as
/// octal escapes; characters WinAnsi cannot represent become `?`.
fn encode_pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match unicode_to_winansi(ch).unwrap_or(b'?') {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b @ 0x20..=0x7E => out.push(b as char),
            b => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252. Most codepoints in 0x20..=0x7E
/// and 0xA0..=0xFF map directly; 0x80..=0x9F holds smart quotes, dashes and
/// the like.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98),
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TextLine;
    use crate::model::EquipmentDetails;
    use std::sync::Arc;

    fn blank_page() -> LayoutPage {
        LayoutPage {
            width: 595.28,
            height: 841.89,
            elements: vec![],
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_encode_pdf_text() {
        assert_eq!(encode_pdf_text("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(encode_pdf_text("back\\slash"), "back\\\\slash");
        assert_eq!(encode_pdf_text("caf\u{e9}"), "caf\\351");
        assert_eq!(encode_pdf_text("\u{2014}"), "\\227");
        assert_eq!(encode_pdf_text("\u{4e2d}"), "?");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = PdfWriter::new().write(&[blank_page()], &DocumentMetadata::default());

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, b"%%EOF"));
        assert!(contains(&bytes, b"xref"));
        assert!(contains(&bytes, b"trailer"));
        assert!(contains(&bytes, b"/Count 1"));
        assert!(contains(&bytes, b"/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = DocumentMetadata {
            title: Some("PUWER Assessment Report - Press 4".to_string()),
            author: Some("J. Smith".to_string()),
        };
        let bytes = PdfWriter::new().write(&[blank_page()], &metadata);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (PUWER Assessment Report - Press 4)"));
        assert!(text.contains("/Author (J. Smith)"));
        assert!(!text.contains("CreationDate"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = PdfWriter::new().write(&[blank_page(), blank_page()], &DocumentMetadata::default());
        // Compressed streams are not UTF-8, so work on raw bytes.
        let xref_start = bytes
            .windows(5)
            .rposition(|w| w == b"xref\n")
            .unwrap();
        let table = std::str::from_utf8(&bytes[xref_start..]).unwrap();
        let entries: Vec<usize> = table
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert!(!entries.is_empty());
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(
                bytes[*offset..].starts_with(expected.as_bytes()),
                "object {} misplaced",
                i + 1
            );
        }
    }

    #[test]
    fn test_image_embedded_once_as_dct() {
        let image = Arc::new(NormalizedImage {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width_px: 10,
            height_px: 5,
        });
        let mut page = blank_page();
        for x in [0.0, 50.0] {
            page.elements.push(LayoutElement {
                x,
                y: 100.0,
                width: 10.0,
                height: 5.0,
                draw: DrawCommand::Image {
                    image: image.clone(),
                },
            });
        }
        let bytes = PdfWriter::new().write(&[page], &DocumentMetadata::default());
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Filter /DCTDecode").count(), 1);
        assert!(text.contains("/Im0"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut page = blank_page();
        page.elements.push(LayoutElement {
            x: 30.0,
            y: 40.0,
            width: 100.0,
            height: 20.0,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x: 30.0,
                    baseline: 55.0,
                    text: "Section 1".to_string(),
                    width: 50.0,
                }],
                style: TextStyle::new(14.0, palette::PRIMARY).bold(),
            },
        });
        page.elements.push(LayoutElement {
            x: 30.0,
            y: 80.0,
            width: 180.0,
            height: 24.0,
            draw: DrawCommand::ImagePlaceholder {
                label: "Photo could not be loaded".to_string(),
            },
        });
        let a = PdfWriter::new().write(&[page.clone()], &DocumentMetadata::default());
        let b = PdfWriter::new().write(&[page], &DocumentMetadata::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggested_filename() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let mut assessment = Assessment::new(EquipmentDetails {
            name: Some("Press #4 / Line B".to_string()),
            ..Default::default()
        });
        assert_eq!(
            suggested_filename_on("PUWER_Assessment", &assessment, date),
            "PUWER_Assessment_Press__4___Line_B_2025-03-14.pdf"
        );

        assessment.equipment_details.name = None;
        assert_eq!(
            suggested_filename_on("PUWER_Assessment", &assessment, date),
            "PUWER_Assessment_Unnamed_2025-03-14.pdf"
        );
    }

    #[test]
    fn test_assembler_collects_pages() {
        let mut assembler = DocumentAssembler::new(DocumentMetadata::default());
        assembler.add_pages(vec![blank_page(), blank_page(), blank_page()]);
        assert_eq!(assembler.page_count(), 3);
        assert!(contains(&assembler.serialize(), b"/Count 3"));
    }
}
