//! # PUWER Report
//!
//! Turns a completed equipment compliance assessment into a paginated PDF.
//!
//! The report is laid out *into* A4 pages. Content is first flattened into an
//! ordered list of blocks, each block asks a page cursor for space before it
//! draws, and the cursor alone decides where a page ends. Nothing is sliced
//! after the fact.
//!
//! ## Architecture
//!
//! ```text
//! Assessment + Question bank
//!       ↓
//!   [content]       : ordered render blocks, summary statistics
//!       ↓
//!   [photo]         : resolve + normalize photos (async, ordered, cancellable)
//!       ↓
//!   [layout]        : page cursor + block renderer → positioned draw commands
//!       ↓
//!   [pdf]           : serialize to PDF bytes, suggest a filename
//! ```
//!
//! Collaborators live beside the pipeline: [`questions`] loads the question
//! bank, [`store`] persists assessments, [`session`] owns preview files for
//! photos picked on the capture side.

pub mod config;
pub mod content;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod photo;
pub mod questions;
pub mod session;
pub mod store;
pub mod style;
pub mod text;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub use config::ReportConfig;
pub use error::{ImageError, ReportError};
pub use model::{Answer, AnswerStatus, Assessment, EquipmentDetails, Photo, Question, Recommendation};
pub use photo::{DefaultPhotoStore, PhotoStore};
pub use questions::{CsvQuestionBank, QuestionBank};
pub use store::{AssessmentStore, MemoryStore, StoreError};

use content::ContentModelBuilder;
use font::FontContext;
use image_loader::ImageNormalizer;
use layout::cursor::PageFlowCursor;
use layout::render::BlockRenderer;
use layout::{LayoutPage, PageCanvas};
use pdf::{suggested_filename, DocumentAssembler, DocumentMetadata};
use photo::{prepare_images, PreparedImages};

/// A finished report, ready to be written out.
#[derive(Debug, Clone)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
}

/// Generates reports. One generator can serve many concurrent requests;
/// every call builds its own cursor, canvas and assembler.
pub struct ReportGenerator<S: PhotoStore = DefaultPhotoStore> {
    config: ReportConfig,
    store: S,
    normalizer: ImageNormalizer,
}

impl ReportGenerator<DefaultPhotoStore> {
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let timeout = Duration::from_secs(config.photos.fetch_timeout_secs);
        let store = DefaultPhotoStore::new(timeout)?;
        Ok(Self::with_store(config, store))
    }
}

impl<S: PhotoStore> ReportGenerator<S> {
    pub fn with_store(config: ReportConfig, store: S) -> Self {
        let normalizer = ImageNormalizer::new(config.photos.jpeg_quality);
        Self {
            config,
            store,
            normalizer,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Render `assessment` against `questions`.
    ///
    /// Photo failures never fail the report; they become placeholders. The
    /// only errors are cancellation and collaborator failures. When `cancel`
    /// fires, in-flight fetches stop and no partial output is returned.
    #[instrument(skip_all, fields(assessment_id = %assessment.id))]
    pub async fn generate(
        &self,
        assessment: &Assessment,
        questions: &[Question],
        cancel: &CancellationToken,
    ) -> Result<Report, ReportError> {
        info!(questions = questions.len(), "generating report");

        let blocks = ContentModelBuilder::new(&self.config.report.title).build(assessment, questions);
        let images = prepare_images(
            &blocks,
            &self.store,
            &self.normalizer,
            &self.config.photos,
            cancel,
        )
        .await?;
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let pages = layout_report(&self.config, assessment, questions, &images);
        let mut assembler = DocumentAssembler::new(document_metadata(&self.config, assessment));
        assembler.add_pages(pages);
        let page_count = assembler.page_count();
        let bytes = assembler.serialize();

        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let filename = suggested_filename(&self.config.report.filename_prefix, assessment);
        info!(
            pages = page_count,
            bytes = bytes.len(),
            photo_failures = images.failures(),
            %filename,
            "report generated"
        );
        Ok(Report {
            bytes,
            filename,
            page_count,
        })
    }

    /// Load an assessment through `store` and render it.
    pub async fn generate_from_store<A: AssessmentStore + ?Sized>(
        &self,
        store: &A,
        assessment_id: &str,
        questions: &[Question],
        cancel: &CancellationToken,
    ) -> Result<Report, ReportError> {
        let assessment = store.get(assessment_id).await?;
        self.generate(&assessment, questions, cancel).await
    }
}

/// Lay out a report whose photos are already prepared. Synchronous and
/// infallible: blocks too tall for a page span pages.
pub fn layout_report(
    config: &ReportConfig,
    assessment: &Assessment,
    questions: &[Question],
    images: &PreparedImages,
) -> Vec<LayoutPage> {
    let blocks = ContentModelBuilder::new(&config.report.title).build(assessment, questions);
    let mut cursor = PageFlowCursor::new(&config.layout.page);
    let (width, height) = cursor.page_size();
    let mut canvas = PageCanvas::new(width, height, FontContext::new());
    BlockRenderer::new(config, images).render_all(&blocks, &mut cursor, &mut canvas);
    canvas.into_pages(cursor.page_count())
}

/// Parse an assessment from its JSON export.
pub fn parse_assessment(json: &str) -> Result<Assessment, ReportError> {
    Ok(serde_json::from_str(json)?)
}

fn document_metadata(config: &ReportConfig, assessment: &Assessment) -> DocumentMetadata {
    let title = match assessment.equipment_details.display_name() {
        Some(name) => format!("{} - {}", config.report.title, name),
        None => config.report.title.clone(),
    };
    DocumentMetadata {
        title: Some(title),
        author: model::non_blank(assessment.equipment_details.assessor.as_deref())
            .map(str::to_string),
    }
}
