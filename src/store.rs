//! Assessment persistence.
//!
//! [`AssessmentStore`] is the one contract every backend implements. Report
//! generation only ever reads through it; the rest of the trait exists for
//! the capture side. [`MemoryStore`] is the in-process backend used by the
//! CLI and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::{Answer, Assessment, EquipmentDetails, Recommendation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("assessment {0} not found")]
    NotFound(String),
    /// The backend could not be reached. Retrying may help.
    #[error("assessment store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid assessment: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// A partial update. Fields left as `None` are not touched; present fields
/// replace the stored value whole.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPatch {
    pub equipment_details: Option<EquipmentDetails>,
    pub answers: Option<BTreeMap<String, Answer>>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub completed: Option<bool>,
}

impl AssessmentPatch {
    fn is_empty(&self) -> bool {
        self.equipment_details.is_none()
            && self.answers.is_none()
            && self.recommendations.is_none()
            && self.completed.is_none()
    }

    fn apply(self, assessment: &mut Assessment) {
        if let Some(details) = self.equipment_details {
            assessment.equipment_details = details;
        }
        if let Some(answers) = self.answers {
            assessment.answers = answers;
        }
        if let Some(recommendations) = self.recommendations {
            assessment.recommendations = recommendations;
        }
        if let Some(completed) = self.completed {
            assessment.completed = completed;
        }
        assessment.touch();
    }
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Create an empty assessment and return its new id.
    async fn create(&self, equipment: EquipmentDetails) -> Result<String, StoreError>;

    async fn get(&self, id: &str) -> Result<Assessment, StoreError>;

    /// Merge `patch` into the stored assessment and return the result.
    async fn update(&self, id: &str, patch: AssessmentPatch) -> Result<Assessment, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All assessments, newest first.
    async fn list(&self) -> Result<Vec<Assessment>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    assessments: RwLock<HashMap<String, Assessment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an existing assessment, e.g. one read from a JSON export.
    pub async fn insert(&self, assessment: Assessment) -> Result<(), StoreError> {
        if assessment.id.trim().is_empty() {
            return Err(StoreError::Invalid("assessment id is empty".to_string()));
        }
        let mut assessments = self.assessments.write().await;
        if assessments.contains_key(&assessment.id) {
            return Err(StoreError::Invalid(format!(
                "assessment {} already exists",
                assessment.id
            )));
        }
        assessments.insert(assessment.id.clone(), assessment);
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn create(&self, equipment: EquipmentDetails) -> Result<String, StoreError> {
        let assessment = Assessment::new(equipment);
        let id = assessment.id.clone();
        self.assessments
            .write()
            .await
            .insert(id.clone(), assessment);
        debug!(assessment_id = %id, "assessment created");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Assessment, StoreError> {
        self.assessments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: AssessmentPatch) -> Result<Assessment, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Invalid("update contains no fields".to_string()));
        }
        let mut assessments = self.assessments.write().await;
        let assessment = assessments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(assessment);
        Ok(assessment.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.assessments
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        let mut all: Vec<Assessment> = self.assessments.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    }
}

/// Build a patch that only marks an assessment completed.
pub fn completion_patch() -> AssessmentPatch {
    AssessmentPatch {
        completed: Some(true),
        ..Default::default()
    }
}
