//! Concurrency and collaborator behaviour of report generation: photo order
//! under out-of-order completion, cooperative cancellation, and how store
//! failures surface to the caller.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use puwer_report::content::ContentModelBuilder;
use puwer_report::image_loader::ImageNormalizer;
use puwer_report::model::PhotoSource;
use puwer_report::photo::prepare_images;
use puwer_report::store::AssessmentPatch;
use puwer_report::*;

// ─── Mock collaborators ─────────────────────────────────────────

/// Serves generated PNGs after a per-photo delay and counts calls.
struct DelayedStore {
    photos: HashMap<String, (Vec<u8>, Duration)>,
    calls: AtomicUsize,
}

impl DelayedStore {
    fn new() -> Self {
        Self {
            photos: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, id: &str, width: u32, height: u32, delay: Duration) -> Self {
        self.photos.insert(id.to_string(), (png_bytes(width, height), delay));
        self
    }
}

#[async_trait]
impl PhotoStore for DelayedStore {
    async fn resolve(&self, photo: &Photo) -> Result<Vec<u8>, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (bytes, delay) = self
            .photos
            .get(&photo.id)
            .ok_or_else(|| ImageError::fetch(&photo.id, "unknown photo"))?;
        tokio::time::sleep(*delay).await;
        Ok(bytes.clone())
    }
}

/// A persistence backend that is down.
struct OfflineStore;

#[async_trait]
impl AssessmentStore for OfflineStore {
    async fn create(&self, _equipment: EquipmentDetails) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Assessment, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update(&self, _id: &str, _patch: AssessmentPatch) -> Result<Assessment, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

// ─── Helpers ────────────────────────────────────────────────────

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 60]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

fn remote(id: &str) -> Photo {
    Photo {
        id: id.to_string(),
        source: PhotoSource::Remote {
            url: format!("https://photos.invalid/{id}.png"),
        },
        name: format!("{id}.png"),
        mime_type: "image/png".to_string(),
        size: 0,
        timestamp: Utc::now(),
    }
}

fn assessment_with_photos(ids: &[&str]) -> (Assessment, Vec<Question>) {
    let mut assessment = Assessment::new(EquipmentDetails::default());
    assessment.save_answer(
        "1.1",
        Answer::new(AnswerStatus::Compliant).with_photos(ids.iter().map(|id| remote(id)).collect()),
    );
    (assessment, vec![Question::new("1.1", "Is the guard fitted?")])
}

// ─── Ordering ───────────────────────────────────────────────────

#[tokio::test]
async fn test_photos_rejoin_in_source_order() {
    // The first photo finishes last.
    let store = DelayedStore::new()
        .with("a", 100, 50, Duration::from_millis(120))
        .with("b", 110, 50, Duration::from_millis(60))
        .with("c", 120, 50, Duration::from_millis(10));
    let (assessment, questions) = assessment_with_photos(&["a", "b", "c"]);
    let blocks = ContentModelBuilder::new("Report").build(&assessment, &questions);

    let mut config = ReportConfig::default();
    config.photos.max_concurrent_fetches = 3;
    let prepared = prepare_images(
        &blocks,
        &store,
        &ImageNormalizer::default(),
        &config.photos,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let widths: Vec<u32> = (0..3)
        .map(|i| prepared.get(0, i).unwrap().as_ref().unwrap().width_px)
        .collect();
    assert_eq!(widths, vec![100, 110, 120]);
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unknown_photo_fails_alone() {
    let store = DelayedStore::new().with("known", 40, 40, Duration::ZERO);
    let (assessment, questions) = assessment_with_photos(&["known", "missing"]);

    let report = ReportGenerator::with_store(ReportConfig::default(), store)
        .generate(&assessment, &questions, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.page_count, 1);
}

// ─── Cancellation ───────────────────────────────────────────────

#[tokio::test]
async fn test_cancellation_mid_flight_discards_output() {
    let store = DelayedStore::new()
        .with("slow-1", 50, 50, Duration::from_secs(30))
        .with("slow-2", 50, 50, Duration::from_secs(30));
    let (assessment, questions) = assessment_with_photos(&["slow-1", "slow-2"]);
    let generator = ReportGenerator::with_store(ReportConfig::default(), store);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = generator.generate(&assessment, &questions, &cancel).await;

    assert!(matches!(result, Err(ReportError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let store = DelayedStore::new();
    let assessment = Assessment::new(EquipmentDetails::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = ReportGenerator::with_store(ReportConfig::default(), store)
        .generate(&assessment, &[], &cancel)
        .await;
    assert!(matches!(result, Err(ReportError::Cancelled)));
}

// ─── Store failures ─────────────────────────────────────────────

#[tokio::test]
async fn test_generate_from_memory_store() {
    let store = MemoryStore::new();
    let id = store
        .create(EquipmentDetails {
            name: Some("Bench Grinder".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let generator = ReportGenerator::with_store(ReportConfig::default(), DelayedStore::new());
    let report = generator
        .generate_from_store(&store, &id, &[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.filename.starts_with("PUWER_Assessment_Bench_Grinder_"));
}

#[tokio::test]
async fn test_missing_assessment_is_not_retriable() {
    let generator = ReportGenerator::with_store(ReportConfig::default(), DelayedStore::new());
    let err = generator
        .generate_from_store(&MemoryStore::new(), "nope", &[], &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::GenerationFailed { retriable: false, .. }));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn test_unavailable_store_is_retriable() {
    let generator = ReportGenerator::with_store(ReportConfig::default(), DelayedStore::new());
    let err = generator
        .generate_from_store(&OfflineStore, "any", &[], &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::GenerationFailed { retriable: true, .. }));
    assert!(err.is_retriable());
}
