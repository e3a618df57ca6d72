//! Report configuration.
//!
//! Defaults live on the structs so `ReportConfig::default()` needs no I/O.
//! `load` layers an optional file and `REPORT__*` environment variables on
//! top of them.

use std::path::Path;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::model::PageConfig;
use crate::style::{palette, Color};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub layout: LayoutConfig,
    pub photos: PhotoConfig,
    pub report: ReportText,
    pub log_level: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            photos: PhotoConfig::default(),
            report: ReportText::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page: PageConfig,
    /// Do not start a section header with less vertical space than this.
    pub section_min_space: f64,
    pub row_min_height: f64,
    pub body_font_size: f64,
    pub header_height: f64,
    /// Draw "Page n of N" in the bottom margin.
    pub page_numbers: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            section_min_space: 70.0,
            row_min_height: 28.0,
            body_font_size: 11.0,
            header_height: 60.0,
            page_numbers: true,
        }
    }
}

/// Width and height of a bounding box in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub question_box: BoxSize,
    pub nameplate_box: BoxSize,
    pub gap_x: f64,
    pub gap_y: f64,
    pub jpeg_quality: u8,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            question_box: BoxSize::new(180.0, 135.0),
            nameplate_box: BoxSize::new(140.0, 105.0),
            gap_x: 20.0,
            gap_y: 10.0,
            jpeg_quality: 85,
            fetch_timeout_secs: 15,
            max_concurrent_fetches: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportText {
    pub title: String,
    pub filename_prefix: String,
    /// `#rrggbb` color of the page header and banners.
    pub banner_color: String,
}

impl Default for ReportText {
    fn default() -> Self {
        Self {
            title: "PUWER Assessment Report".to_string(),
            filename_prefix: "PUWER_Assessment".to_string(),
            banner_color: "#007bff".to_string(),
        }
    }
}

impl ReportText {
    pub fn banner(&self) -> Color {
        if self.banner_color.trim().is_empty() {
            palette::PRIMARY
        } else {
            Color::hex(&self.banner_color)
        }
    }
}

impl ReportConfig {
    /// Load configuration: struct defaults, then `path` (or `report.*` in the
    /// working directory if present), then `REPORT__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().set_default("log_level", "info")?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("report").required(false)),
        };

        let config = builder
            // e.g. REPORT__LAYOUT__ROW_MIN_HEIGHT=32
            .add_source(Environment::with_prefix("REPORT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.layout.section_min_space, 70.0);
        assert_eq!(config.layout.row_min_height, 28.0);
        assert_eq!(config.photos.question_box, BoxSize::new(180.0, 135.0));
        assert_eq!(config.photos.nameplate_box, BoxSize::new(140.0, 105.0));
        assert_eq!(config.photos.jpeg_quality, 85);
        assert_eq!(config.report.banner(), palette::PRIMARY);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[layout]\nrow_min_height = 32.0\n\n[report]\ntitle = \"Site Audit\""
        )
        .unwrap();

        let config = ReportConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.layout.row_min_height, 32.0);
        assert_eq!(config.report.title, "Site Audit");
        // Untouched keys keep their defaults
        assert_eq!(config.layout.section_min_space, 70.0);
        assert_eq!(config.photos.max_concurrent_fetches, 4);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(ReportConfig::load(Some(&missing)).is_err());
    }
}
