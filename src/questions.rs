//! Question bank loading.
//!
//! The bank is a CSV file with a `Regulation Number` column and a question
//! text column (`PUWER Question`, or plain `Question`). Loading never fails:
//! rows missing either field are dropped, and an unreadable or malformed
//! file yields an empty bank, which the report renders as "No questions
//! loaded."

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::model::Question;

const REGULATION_HEADER: &str = "regulation number";
const QUESTION_HEADERS: [&str; 2] = ["puwer question", "question"];

/// Source of the ordered question list.
pub trait QuestionBank {
    fn load(&self) -> Vec<Question>;
}

#[derive(Debug, Clone)]
pub struct CsvQuestionBank {
    path: PathBuf,
}

impl CsvQuestionBank {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a bank from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Vec<Question> {
        match parse(reader) {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "failed to parse question bank");
                Vec::new()
            }
        }
    }
}

impl QuestionBank for CsvQuestionBank {
    fn load(&self) -> Vec<Question> {
        match std::fs::File::open(&self.path) {
            Ok(file) => {
                let questions = Self::from_reader(file);
                debug!(path = %self.path.display(), count = questions.len(), "question bank loaded");
                questions
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open question bank");
                Vec::new()
            }
        }
    }
}

impl QuestionBank for Vec<Question> {
    fn load(&self) -> Vec<Question> {
        self.clone()
    }
}

fn parse<R: Read>(reader: R) -> Result<Vec<Question>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let find = |names: &[&str]| {
        headers.iter().position(|h| {
            let h = h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase();
            names.contains(&h.as_str())
        })
    };
    let (Some(reg_col), Some(text_col)) = (
        find(&[REGULATION_HEADER]),
        QUESTION_HEADERS.iter().find_map(|name| find(&[*name])),
    ) else {
        warn!(headers = ?headers, "question bank is missing the regulation or question column");
        return Ok(Vec::new());
    };

    let mut questions = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        match (record.get(reg_col), record.get(text_col)) {
            (Some(id), Some(text)) if !id.is_empty() && !text.is_empty() => {
                questions.push(Question::new(id, text));
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped incomplete question rows");
    }
    Ok(questions)
}
