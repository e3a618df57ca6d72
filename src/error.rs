//! Error types for report generation.
//!
//! Image failures are recovered where they happen: the renderer substitutes a
//! placeholder and carries on. Everything a caller can see collapses into
//! [`ReportError`], which only distinguishes whether a retry could help.

use thiserror::Error;

use crate::store::StoreError;

/// A photo that could not be turned into an embeddable image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The payload is corrupt or not a supported raster format.
    #[error("photo {photo_id} could not be decoded: {reason}")]
    Decode { photo_id: String, reason: String },
    /// The payload could not be retrieved.
    #[error("photo {photo_id} could not be fetched: {reason}")]
    Fetch { photo_id: String, reason: String },
}

impl ImageError {
    pub fn decode(photo_id: &str, reason: impl Into<String>) -> Self {
        ImageError::Decode {
            photo_id: photo_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn fetch(photo_id: &str, reason: impl Into<String>) -> Self {
        ImageError::Fetch {
            photo_id: photo_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn photo_id(&self) -> &str {
        match self {
            ImageError::Decode { photo_id, .. } | ImageError::Fetch { photo_id, .. } => photo_id,
        }
    }
}

/// The unified error type returned by the public generation API.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Assessment JSON failed to parse.
    #[error("failed to parse assessment: {source}{}", hint_suffix(.hint))]
    ParseError {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller abandoned the request; partial output was discarded.
    #[error("report generation was cancelled")]
    Cancelled,

    #[error("report generation failed: {reason}")]
    GenerationFailed { retriable: bool, reason: String },
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl ReportError {
    /// Whether the same request might succeed if issued again.
    pub fn is_retriable(&self) -> bool {
        match self {
            ReportError::GenerationFailed { retriable, .. } => *retriable,
            ReportError::Io(_) | ReportError::Cancelled => true,
            ReportError::ParseError { .. } | ReportError::Config(_) => false,
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the assessment schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the file truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ReportError::ParseError { source: e, hint }
    }
}

impl From<StoreError> for ReportError {
    fn from(e: StoreError) -> Self {
        ReportError::GenerationFailed {
            retriable: e.is_transient(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_hint() {
        let err: ReportError = serde_json::from_str::<serde_json::Value>("{\"a\":1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint:"), "got: {msg}");
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_store_errors_keep_retriability() {
        let transient: ReportError = StoreError::Unavailable("backend down".into()).into();
        assert!(transient.is_retriable());
        let permanent: ReportError = StoreError::NotFound("a-1".into()).into();
        assert!(!permanent.is_retriable());
    }

    #[test]
    fn test_image_error_names_photo() {
        let err = ImageError::decode("photo_7", "bad magic");
        assert_eq!(err.photo_id(), "photo_7");
        assert!(err.to_string().contains("photo_7"));
    }
}
