//! # Image Normalization
//!
//! Photos arrive as whatever the camera or browser produced: JPEG or PNG,
//! any resolution, possibly sideways with an EXIF orientation tag, possibly
//! transparent. Everything leaves as an upright baseline JPEG scaled to fit
//! its bounding box, so the PDF writer only ever embeds one kind of image
//! (DCTDecode, DeviceRGB).
//!
//! One output pixel is one point on the page.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::error::ImageError;

/// A photo ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    /// Baseline JPEG bytes.
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl NormalizedImage {
    /// Display size in points.
    pub fn size(&self) -> (f64, f64) {
        (self.width_px as f64, self.height_px as f64)
    }
}

#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    quality: u8,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(85)
    }
}

impl ImageNormalizer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Decode, orient, scale and re-encode one photo payload.
    pub fn normalize(
        &self,
        photo_id: &str,
        data: &[u8],
        max_width: f64,
        max_height: f64,
    ) -> Result<NormalizedImage, ImageError> {
        let img = decode_image_bytes(data).map_err(|e| ImageError::decode(photo_id, e))?;

        let img = if is_jpeg(data) {
            match read_exif_orientation(data) {
                Some(orientation) => apply_orientation(img, orientation),
                None => img,
            }
        } else {
            img
        };

        let (width, height) = fit_dimensions(img.width(), img.height(), max_width, max_height);
        let rgb = flatten_onto_white(&img);
        let rgb = if (rgb.width(), rgb.height()) == (width, height) {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        let mut jpeg = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        image::ImageEncoder::write_image(
            encoder,
            rgb.as_raw(),
            width,
            height,
            image::ColorType::Rgb8,
        )
        .map_err(|e| ImageError::decode(photo_id, format!("JPEG encode failed: {}", e)))?;

        Ok(NormalizedImage {
            jpeg,
            width_px: width,
            height_px: height,
        })
    }
}

/// Scale `(width, height)` into a `max_width` x `max_height` box.
///
/// Landscape and square sources are fitted by width, portrait sources by
/// height, never upscaled. If the other side still overflows its limit it is
/// clamped and the fitted side shrinks to keep the aspect ratio, so the
/// result always fits the box.
pub fn fit_dimensions(width: u32, height: u32, max_width: f64, max_height: f64) -> (u32, u32) {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let max_w = max_width.floor().max(1.0);
    let max_h = max_height.floor().max(1.0);

    let (mut out_w, mut out_h) = if w >= h {
        let out_w = w.min(max_w);
        (out_w, (h * out_w / w).round())
    } else {
        let out_h = h.min(max_h);
        ((w * out_h / h).round(), out_h)
    };

    if out_h > max_h {
        out_h = max_h;
        out_w = (w * out_h / h).round();
    }
    if out_w > max_w {
        out_w = max_w;
        out_h = (h * out_w / w).round();
    }

    ((out_w as u32).max(1), (out_h as u32).max(1))
}

/// Decode an embedded payload: a `data:image/...;base64,` URI or raw base64.
pub fn decode_embedded(src: &str) -> Result<Vec<u8>, String> {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("data:") {
        let comma_pos = rest
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        if !rest[..comma_pos].ends_with(";base64") {
            return Err("Invalid data URI: only base64 payloads are supported".to_string());
        }
        return base64_decode(&rest[comma_pos + 1..]);
    }
    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| format!("Base64 decode error: {}", e))
}

/// Detect image format from magic bytes and decode accordingly.
fn decode_image_bytes(data: &[u8]) -> Result<DynamicImage, String> {
    if data.len() < 4 {
        return Err("Image data too short".to_string());
    }
    if !is_jpeg(data) && !is_png(data) {
        return Err("Unsupported image format (expected JPEG or PNG)".to_string());
    }

    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Format detection error: {}", e))?
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// Composite any alpha channel over white and drop it.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = p[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

/// Find the EXIF Orientation tag (0x0112) in a JPEG's APP1 segment.
fn read_exif_orientation(data: &[u8]) -> Option<u16> {
    let mut i = 2; // skip SOI
    while i + 3 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        // Start of scan: no more metadata
        if marker == 0xDA {
            return None;
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let segment = data.get(i + 4..i + 2 + seg_len)?;
        if marker == 0xE1 && segment.starts_with(b"Exif\0\0") {
            return tiff_orientation(&segment[6..]);
        }
        i += 2 + seg_len;
    }
    None
}

fn tiff_orientation(tiff: &[u8]) -> Option<u16> {
    let little_endian = match tiff.get(0..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    let u16_at = |off: usize| -> Option<u16> {
        let b = tiff.get(off..off + 2)?;
        Some(if little_endian {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        })
    };
    let u32_at = |off: usize| -> Option<u32> {
        let b = tiff.get(off..off + 4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Some(if little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    };

    let ifd = u32_at(4)? as usize;
    let count = u16_at(ifd)? as usize;
    (0..count)
        .map(|n| ifd + 2 + n * 12)
        .find(|&entry| u16_at(entry) == Some(0x0112))
        .and_then(|entry| u16_at(entry + 8))
}

fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
