//! # Photo Resolution
//!
//! [`PhotoStore`] hides where a photo's bytes live. [`prepare_images`] walks
//! every photo group in a block list, resolves and normalizes the photos
//! with bounded concurrency, and hands the results back in source order.
//!
//! Individual failures are kept as [`ImageError`] values so the renderer can
//! draw a placeholder; only cancellation aborts preparation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{BoxSize, PhotoConfig};
use crate::content::{Block, PhotoGroupKind};
use crate::error::{ImageError, ReportError};
use crate::image_loader::{decode_embedded, ImageNormalizer, NormalizedImage};
use crate::model::{Photo, PhotoSource};

pub type PhotoOutcome = Result<Arc<NormalizedImage>, ImageError>;

/// Resolves a photo to its raw encoded bytes.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn resolve(&self, photo: &Photo) -> Result<Vec<u8>, ImageError>;
}

/// Resolves embedded payloads in place, remote URLs over HTTP and local
/// paths from disk.
#[derive(Debug, Clone)]
pub struct DefaultPhotoStore {
    client: reqwest::Client,
}

impl DefaultPhotoStore {
    pub fn new(timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::GenerationFailed {
                retriable: false,
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    async fn fetch(&self, photo: &Photo, url: &str) -> Result<Vec<u8>, ImageError> {
        let fetch_err = |e: reqwest::Error| ImageError::fetch(&photo.id, e.to_string());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?;
        let bytes = response.bytes().await.map_err(fetch_err)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PhotoStore for DefaultPhotoStore {
    async fn resolve(&self, photo: &Photo) -> Result<Vec<u8>, ImageError> {
        match &photo.source {
            PhotoSource::Embedded { data_url } => {
                decode_embedded(data_url).map_err(|e| ImageError::decode(&photo.id, e))
            }
            // Some capture clients put data URIs in the url field
            PhotoSource::Remote { url } if url.starts_with("data:") => {
                decode_embedded(url).map_err(|e| ImageError::decode(&photo.id, e))
            }
            PhotoSource::Remote { url } => self.fetch(photo, url).await,
            PhotoSource::Local { path } => tokio::fs::read(path)
                .await
                .map_err(|e| ImageError::fetch(&photo.id, format!("{}: {}", path.display(), e))),
        }
    }
}

/// Normalized photos for every photo group of a block list, indexed by
/// group ordinal then by position within the group.
#[derive(Debug, Clone, Default)]
pub struct PreparedImages {
    pub(crate) groups: Vec<Vec<PhotoOutcome>>,
}

impl PreparedImages {
    pub fn get(&self, group: usize, index: usize) -> Option<&PhotoOutcome> {
        self.groups.get(group)?.get(index)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn failures(&self) -> usize {
        self.groups.iter().flatten().filter(|o| o.is_err()).count()
    }
}

/// The bounding box photos in a group are scaled into.
pub fn box_for(kind: PhotoGroupKind, config: &PhotoConfig) -> BoxSize {
    match kind {
        PhotoGroupKind::Nameplate => config.nameplate_box,
        PhotoGroupKind::Evidence => config.question_box,
    }
}

/// The photo groups of a block list, in block order.
pub fn photo_groups<'a>(blocks: &'a [Block<'a>]) -> impl Iterator<Item = (&'a [Photo], PhotoGroupKind)> {
    blocks.iter().filter_map(|block| match block {
        Block::PhotoGroup { photos, kind } => Some((*photos, *kind)),
        _ => None,
    })
}

/// Resolve and normalize every photo referenced by `blocks`.
///
/// At most `config.max_concurrent_fetches` photos are in flight at once.
/// Results are re-joined in source order regardless of which fetch finishes
/// first. Cancelling `cancel` stops outstanding work and returns
/// [`ReportError::Cancelled`].
pub async fn prepare_images<S: PhotoStore + ?Sized>(
    blocks: &[Block<'_>],
    store: &S,
    normalizer: &ImageNormalizer,
    config: &PhotoConfig,
    cancel: &CancellationToken,
) -> Result<PreparedImages, ReportError> {
    let mut groups: Vec<Vec<PhotoOutcome>> = Vec::new();
    let mut jobs = Vec::new();
    for (group, (photos, kind)) in photo_groups(blocks).enumerate() {
        groups.push(Vec::with_capacity(photos.len()));
        let bounds = box_for(kind, config);
        jobs.extend(photos.iter().map(|photo| (group, photo, bounds)));
    }
    debug!(photos = jobs.len(), groups = groups.len(), "preparing photos");

    let outcomes: Vec<(usize, Option<PhotoOutcome>)> = stream::iter(jobs)
        .map(|(group, photo, bounds)| async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = load_photo(store, normalizer, photo, bounds) => Some(outcome),
            };
            (group, outcome)
        })
        .buffered(config.max_concurrent_fetches.max(1))
        .collect()
        .await;

    if cancel.is_cancelled() {
        return Err(ReportError::Cancelled);
    }

    for (group, outcome) in outcomes {
        let Some(outcome) = outcome else {
            return Err(ReportError::Cancelled);
        };
        if let Err(err) = &outcome {
            warn!(photo_id = %err.photo_id(), error = %err, "photo will be replaced by a placeholder");
        }
        groups[group].push(outcome);
    }

    Ok(PreparedImages { groups })
}

async fn load_photo<S: PhotoStore + ?Sized>(
    store: &S,
    normalizer: &ImageNormalizer,
    photo: &Photo,
    bounds: BoxSize,
) -> PhotoOutcome {
    let bytes = store.resolve(photo).await?;
    let normalizer = normalizer.clone();
    let photo_id = photo.id.clone();

    tokio::task::spawn_blocking(move || {
        normalizer.normalize(&photo_id, &bytes, bounds.width, bounds.height)
    })
    .await
    .map_err(|e| ImageError::decode(&photo.id, format!("decoder task failed: {}", e)))?
    .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, AnswerStatus, Assessment, EquipmentDetails, Question};
    use crate::content::ContentModelBuilder;
    use chrono::Utc;

    fn embedded_png(id: &str, width: u32, height: u32) -> Photo {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgb8)
            .unwrap();
        use base64::Engine;
        Photo {
            id: id.to_string(),
            source: PhotoSource::Embedded {
                data_url: format!(
                    "data:image/png;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&buf)
                ),
            },
            name: format!("{id}.png"),
            mime_type: "image/png".to_string(),
            size: buf.len() as u64,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_embedded_photos_prepare_in_order() {
        let mut assessment = Assessment::new(EquipmentDetails::default());
        assessment.save_answer(
            "1.1",
            Answer::new(AnswerStatus::Compliant).with_photos(vec![
                embedded_png("wide", 400, 100),
                embedded_png("tall", 100, 400),
            ]),
        );
        let questions = vec![Question::new("1.1", "Guarding")];
        let blocks = ContentModelBuilder::new("t").build(&assessment, &questions);

        let store = DefaultPhotoStore::new(Duration::from_secs(1)).unwrap();
        let prepared = prepare_images(
            &blocks,
            &store,
            &ImageNormalizer::default(),
            &PhotoConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(prepared.group_count(), 1);
        let wide = prepared.get(0, 0).unwrap().as_ref().unwrap();
        let tall = prepared.get(0, 1).unwrap().as_ref().unwrap();
        assert_eq!((wide.width_px, wide.height_px), (180, 45));
        assert_eq!((tall.width_px, tall.height_px), (34, 135));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_a_fetch_error() {
        let photo = Photo {
            id: "gone".to_string(),
            source: PhotoSource::Local {
                path: "/nonexistent/puwer/photo.jpg".into(),
            },
            name: String::new(),
            mime_type: String::new(),
            size: 0,
            timestamp: Utc::now(),
        };
        let store = DefaultPhotoStore::new(Duration::from_secs(1)).unwrap();
        let err = store.resolve(&photo).await.unwrap_err();
        assert!(matches!(err, ImageError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut assessment = Assessment::new(EquipmentDetails::default());
        assessment.save_answer(
            "1.1",
            Answer::new(AnswerStatus::Compliant).with_photos(vec![embedded_png("p", 8, 8)]),
        );
        let questions = vec![Question::new("1.1", "Guarding")];
        let blocks = ContentModelBuilder::new("t").build(&assessment, &questions);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let store = DefaultPhotoStore::new(Duration::from_secs(1)).unwrap();
        let result = prepare_images(
            &blocks,
            &store,
            &ImageNormalizer::default(),
            &PhotoConfig::default(),
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(ReportError::Cancelled)));
    }
}
