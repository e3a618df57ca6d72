//! # Assessment Model
//!
//! The input representation for report generation. An assessment records the
//! answers given against a question bank for one piece of equipment, the
//! photographic evidence attached to those answers, and the remediation
//! recommendations raised during the inspection.
//!
//! The model serializes to the same camelCase JSON shape the capture form
//! produces, so assessments exported from the form deserialize directly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One equipment inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    #[serde(default)]
    pub equipment_details: EquipmentDetails,
    /// Answers keyed by question id. At most one answer per question.
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    /// Recommendations in the order they were raised.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

impl Assessment {
    /// Start a fresh, empty assessment for the given equipment.
    pub fn new(equipment_details: EquipmentDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            equipment_details,
            answers: BTreeMap::new(),
            recommendations: Vec::new(),
            created_at: now,
            modified_at: now,
            completed: false,
        }
    }

    /// Record the answer to a question, replacing any previous answer whole.
    pub fn save_answer(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.answers.insert(question_id.into(), answer);
        self.touch();
    }

    /// Append a recommendation and return the stored copy.
    pub fn add_recommendation(&mut self, draft: RecommendationDraft) -> &Recommendation {
        self.recommendations.push(Recommendation {
            id: Uuid::new_v4().to_string(),
            text: draft.text,
            priority: draft.priority,
            assignee: draft.assignee,
            due_date: draft.due_date,
            created_at: Utc::now(),
        });
        self.touch();
        &self.recommendations[self.recommendations.len() - 1]
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.touch();
    }

    /// Look up the answer recorded for a question, if any.
    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub(crate) fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// Identification of the inspected equipment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDetails {
    pub name: Option<String>,
    pub location: Option<String>,
    pub reference: Option<String>,
    pub assessor: Option<String>,
    /// Free-text nameplate / machine information.
    pub nameplate_info: Option<String>,
    #[serde(default)]
    pub nameplate_photos: Vec<Photo>,
}

impl EquipmentDetails {
    /// The equipment name, treating blank strings as absent.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A question from the bank. The id doubles as the regulation number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Dotted hierarchical regulation number, e.g. `"3.2"`.
    pub id: String,
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// The section this question belongs to: the first dotted component of its id.
    pub fn section(&self) -> &str {
        self.id.split('.').next().unwrap_or(&self.id)
    }
}

/// The response given to one question.
///
/// An answer is replaced whole whenever its status, comments, or photos change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(rename = "answer")]
    pub status: AnswerStatus,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl Answer {
    pub fn new(status: AnswerStatus) -> Self {
        Self {
            status,
            comments: String::new(),
            photos: Vec::new(),
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_photos(mut self, photos: Vec<Photo>) -> Self {
        self.photos = photos;
        self
    }
}

/// Compliance status of an answer.
///
/// Stored as the form's raw values `"yes"`, `"no"` and `"na"`. Anything else
/// is kept verbatim as [`AnswerStatus::Unrecognized`] so a stray value never
/// fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnswerStatus {
    Compliant,
    NonCompliant,
    NotApplicable,
    Unrecognized(String),
}

impl AnswerStatus {
    /// The raw stored value.
    pub fn as_str(&self) -> &str {
        match self {
            AnswerStatus::Compliant => "yes",
            AnswerStatus::NonCompliant => "no",
            AnswerStatus::NotApplicable => "na",
            AnswerStatus::Unrecognized(raw) => raw,
        }
    }

    /// The label printed in the report's answer column.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl From<String> for AnswerStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => AnswerStatus::Compliant,
            "no" => AnswerStatus::NonCompliant,
            "na" | "n/a" => AnswerStatus::NotApplicable,
            _ => AnswerStatus::Unrecognized(raw),
        }
    }
}

impl From<AnswerStatus> for String {
    fn from(status: AnswerStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A photo attached to an answer or to the nameplate list.
///
/// Photos are owned by exactly one list. Their ids are unique within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    /// Where the image bytes live.
    #[serde(flatten)]
    pub source: PhotoSource,
    /// Original filename.
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    pub timestamp: DateTime<Utc>,
}

/// How a photo's payload is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoSource {
    /// Inline payload: a `data:image/...;base64,` URI or raw base64.
    Embedded {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    /// Remotely hosted image.
    Remote { url: String },
    /// A file on the local filesystem, e.g. a preview handle.
    Local { path: PathBuf },
}

/// A remediation action raised during the inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// The user-supplied fields of a new recommendation.
#[derive(Debug, Clone)]
pub struct RecommendationDraft {
    pub text: String,
    pub priority: Priority,
    pub assignee: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// Page geometry used for layout and serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default)]
    pub size: PageSize,
    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
        }
    }
}

fn default_margin() -> Edges {
    Edges::symmetric(40.0, 30.0)
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_is_first_component() {
        assert_eq!(Question::new("3.2", "q").section(), "3");
        assert_eq!(Question::new("12.4.1", "q").section(), "12");
        assert_eq!(Question::new("7", "q").section(), "7");
    }

    #[test]
    fn test_answer_status_from_form_values() {
        assert_eq!(AnswerStatus::from("yes".to_string()), AnswerStatus::Compliant);
        assert_eq!(AnswerStatus::from("NO".to_string()), AnswerStatus::NonCompliant);
        assert_eq!(AnswerStatus::from("na".to_string()), AnswerStatus::NotApplicable);
        assert_eq!(
            AnswerStatus::from("maybe".to_string()),
            AnswerStatus::Unrecognized("maybe".to_string())
        );
    }

    #[test]
    fn test_answer_json_shape() {
        let json = r#"{"answer":"no","comments":"guard missing","photos":[]}"#;
        let answer: Answer = serde_json::from_str(json).unwrap();
        assert_eq!(answer.status, AnswerStatus::NonCompliant);
        assert_eq!(answer.comments, "guard missing");

        let back = serde_json::to_value(&answer).unwrap();
        assert_eq!(back["answer"], "no");
    }

    #[test]
    fn test_photo_source_variants() {
        let embedded: Photo = serde_json::from_str(
            r#"{"id":"p1","dataUrl":"data:image/png;base64,AAAA","name":"a.png","type":"image/png","size":3,"timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(embedded.source, PhotoSource::Embedded { .. }));
        assert_eq!(embedded.mime_type, "image/png");

        let remote: Photo = serde_json::from_str(
            r#"{"id":"p2","url":"https://example.com/a.jpg","timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            remote.source,
            PhotoSource::Remote {
                url: "https://example.com/a.jpg".to_string()
            }
        );
    }

    #[test]
    fn test_save_answer_replaces_whole_answer() {
        let mut assessment = Assessment::new(EquipmentDetails::default());
        assessment.save_answer(
            "1.1",
            Answer::new(AnswerStatus::Compliant).with_comments("first"),
        );
        assessment.save_answer("1.1", Answer::new(AnswerStatus::NonCompliant));

        assert_eq!(assessment.answers.len(), 1);
        let answer = assessment.answer_for("1.1").unwrap();
        assert_eq!(answer.status, AnswerStatus::NonCompliant);
        assert!(answer.comments.is_empty());
    }

    #[test]
    fn test_add_recommendation_appends_in_order() {
        let mut assessment = Assessment::new(EquipmentDetails::default());
        for text in ["fit guard", "replace cable"] {
            assessment.add_recommendation(RecommendationDraft {
                text: text.to_string(),
                priority: Priority::High,
                assignee: String::new(),
                due_date: None,
            });
        }
        let texts: Vec<&str> = assessment
            .recommendations
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, vec!["fit guard", "replace cable"]);
        assert_ne!(assessment.recommendations[0].id, assessment.recommendations[1].id);
    }

    #[test]
    fn test_priority_accepts_lowercase() {
        let p: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, Priority::High);
        let p: Priority = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(p, Priority::Medium);
    }

    #[test]
    fn test_display_name_ignores_blank() {
        let details = EquipmentDetails {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(details.display_name(), None);
    }
}
