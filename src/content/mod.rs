//! # Content Model
//!
//! Turns an assessment and the active question bank into the ordered list of
//! [`Block`]s the renderer draws. Pure and deterministic: the same inputs
//! always produce the same blocks, and nothing here does I/O.
//!
//! Sections appear in the order their first question appears in the bank,
//! never sorted. Answers whose question is missing from the bank are ignored
//! for both rendering and statistics.

use std::collections::HashMap;

use crate::model::{Answer, AnswerStatus, Assessment, Photo, Question, Recommendation};

pub const NO_QUESTIONS: &str = "No questions loaded.";
pub const NO_RECOMMENDATIONS: &str = "No recommendations recorded.";

/// One render-ready unit of report content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    PageHeader {
        title: &'a str,
    },
    EquipmentDetails {
        /// `(label, value)` pairs, already defaulted.
        lines: Vec<(&'static str, String)>,
        nameplate_info: Option<&'a str>,
    },
    MetadataSummary(Summary),
    SectionHeader {
        section: &'a str,
    },
    QuestionRow {
        regulation: &'a str,
        text: &'a str,
        response: Response<'a>,
    },
    PhotoGroup {
        photos: &'a [Photo],
        kind: PhotoGroupKind,
    },
    RecommendationsHeader,
    RecommendationRow(&'a Recommendation),
    EmptyState {
        message: &'static str,
    },
}

/// What a QuestionRow shows in its answer and comments columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response<'a> {
    Answered(&'a Answer),
    Unanswered,
}

impl<'a> Response<'a> {
    pub fn status(&self) -> Option<&'a AnswerStatus> {
        match self {
            Response::Answered(answer) => Some(&answer.status),
            Response::Unanswered => None,
        }
    }

    /// Label for the answer column.
    pub fn label(&self) -> String {
        match self {
            Response::Answered(answer) => answer.status.label(),
            Response::Unanswered => "N/A".to_string(),
        }
    }

    pub fn comments(&self) -> &'a str {
        match self {
            Response::Answered(answer) => answer.comments.as_str(),
            Response::Unanswered => "",
        }
    }
}

/// Which photo box and indentation a group uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoGroupKind {
    /// Under the equipment details, with a caption.
    Nameplate,
    /// Under a question row, indented beneath the question text.
    Evidence,
}

/// Completion statistics over the active question bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub compliant: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    /// Questions in the bank that have an answer of any status.
    pub answered: usize,
    pub total: usize,
    /// `answered / total`, rounded to the nearest integer percent.
    pub completion_percent: u32,
}

impl Summary {
    pub fn compute(assessment: &Assessment, questions: &[Question]) -> Self {
        let mut summary = Summary {
            total: questions.len(),
            ..Default::default()
        };

        for question in questions {
            let Some(answer) = assessment.answer_for(&question.id) else {
                continue;
            };
            summary.answered += 1;
            match answer.status {
                AnswerStatus::Compliant => summary.compliant += 1,
                AnswerStatus::NonCompliant => summary.non_compliant += 1,
                AnswerStatus::NotApplicable => summary.not_applicable += 1,
                AnswerStatus::Unrecognized(_) => {}
            }
        }

        summary.completion_percent = if summary.total == 0 {
            0
        } else {
            ((summary.answered * 100 + summary.total / 2) / summary.total) as u32
        };
        summary
    }
}

/// Group questions by section, keeping first-seen section order and the
/// bank's order within each section.
pub fn group_by_section(questions: &[Question]) -> Vec<(&str, Vec<&Question>)> {
    let mut groups: Vec<(&str, Vec<&Question>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for question in questions {
        let section = question.section();
        let slot = *index.entry(section).or_insert_with(|| {
            groups.push((section, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(question);
    }

    groups
}

#[derive(Debug, Clone)]
pub struct ContentModelBuilder<'a> {
    title: &'a str,
}

impl<'a> ContentModelBuilder<'a> {
    pub fn new(title: &'a str) -> Self {
        Self { title }
    }

    /// Build the block sequence for one report.
    pub fn build(&self, assessment: &'a Assessment, questions: &'a [Question]) -> Vec<Block<'a>> {
        let details = &assessment.equipment_details;
        let mut blocks = vec![Block::PageHeader { title: self.title }];

        let or_unspecified = |value: &Option<String>| {
            crate::model::non_blank(value.as_deref())
                .unwrap_or("Not specified")
                .to_string()
        };
        blocks.push(Block::EquipmentDetails {
            lines: vec![
                ("Equipment", or_unspecified(&details.name)),
                ("Location", or_unspecified(&details.location)),
                ("Reference", or_unspecified(&details.reference)),
                ("Assessor", or_unspecified(&details.assessor)),
                (
                    "Date",
                    assessment.created_at.format("%Y-%m-%d").to_string(),
                ),
            ],
            nameplate_info: crate::model::non_blank(details.nameplate_info.as_deref()),
        });
        if !details.nameplate_photos.is_empty() {
            blocks.push(Block::PhotoGroup {
                photos: &details.nameplate_photos,
                kind: PhotoGroupKind::Nameplate,
            });
        }

        blocks.push(Block::MetadataSummary(Summary::compute(assessment, questions)));

        if questions.is_empty() {
            blocks.push(Block::EmptyState {
                message: NO_QUESTIONS,
            });
        }
        for (section, members) in group_by_section(questions) {
            blocks.push(Block::SectionHeader { section });
            for question in members {
                let answer = assessment.answer_for(&question.id);
                blocks.push(Block::QuestionRow {
                    regulation: &question.id,
                    text: &question.text,
                    response: answer.map_or(Response::Unanswered, Response::Answered),
                });
                if let Some(answer) = answer.filter(|a| !a.photos.is_empty()) {
                    blocks.push(Block::PhotoGroup {
                        photos: &answer.photos,
                        kind: PhotoGroupKind::Evidence,
                    });
                }
            }
        }

        blocks.push(Block::RecommendationsHeader);
        if assessment.recommendations.is_empty() {
            blocks.push(Block::EmptyState {
                message: NO_RECOMMENDATIONS,
            });
        }
        blocks.extend(
            assessment
                .recommendations
                .iter()
                .map(Block::RecommendationRow),
        );

        blocks
    }
}
