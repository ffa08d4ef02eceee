// src/models/quiz.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::{
    question::{AcceptedAnswer, AnswerOption, Question, QuestionSpec},
    validate_tags, validate_url_string,
};

/// How a quiz is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuizType {
    Live,
    Scheduled,
    Anytime,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,

    /// Time limit for one attempt, in minutes. Zero means untimed.
    pub time_limit: i64,

    pub quiz_type: QuizType,

    /// Stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    pub owner_id: i64,

    /// Bumped on every successful replace; used for lost-update detection.
    pub version: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'quiz_questions' link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct QuizQuestionLink {
    pub quiz_id: i64,
    pub question_id: i64,
    pub position: i64,
}

/// Desired state of a quiz, used by both create and full replace.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizSpec {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub time_limit: i64,
    pub quiz_type: QuizType,
    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,

    /// When set, a replace only proceeds if the stored version still matches.
    #[serde(default)]
    pub expected_version: Option<i64>,

    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuestionSpec>,
}

impl QuizSpec {
    pub fn new(title: impl Into<String>, quiz_type: QuizType) -> Self {
        Self {
            title: title.into(),
            description: None,
            image_url: None,
            time_limit: 0,
            quiz_type,
            tags: Vec::new(),
            expected_version: None,
            questions: Vec::new(),
        }
    }

    pub fn with_time_limit(mut self, time_limit: i64) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_question(mut self, question: QuestionSpec) -> Self {
        self.questions.push(question);
        self
    }

    pub fn expecting_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Returns the first question id referenced more than once, if any.
    pub fn duplicate_question_id(&self) -> Option<i64> {
        let mut seen = HashSet::new();
        self.questions
            .iter()
            .filter_map(|q| q.id)
            .find(|id| !seen.insert(*id))
    }
}

/// Sub-entities of one question, shaped by its type.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QuestionContent {
    Mcq { options: Vec<AnswerOption> },
    TrueFalse { options: Vec<AnswerOption> },
    TypeIn { accepted_answers: Vec<AcceptedAnswer> },
}

impl QuestionContent {
    /// Options of a choice question; empty for type-in questions.
    pub fn options(&self) -> &[AnswerOption] {
        match self {
            QuestionContent::Mcq { options } | QuestionContent::TrueFalse { options } => options,
            QuestionContent::TypeIn { .. } => &[],
        }
    }

    /// Accepted answers of a type-in question; empty for choice questions.
    pub fn accepted_answers(&self) -> &[AcceptedAnswer] {
        match self {
            QuestionContent::TypeIn { accepted_answers } => accepted_answers,
            QuestionContent::Mcq { .. } | QuestionContent::TrueFalse { .. } => &[],
        }
    }
}

/// A question together with its type-specific sub-entities.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionGraph {
    #[serde(flatten)]
    pub question: Question,
    #[serde(flatten)]
    pub content: QuestionContent,
}

/// A question as it appears inside one quiz.
#[derive(Debug, Clone, Serialize)]
pub struct QuizGraphQuestion {
    pub position: i64,
    #[serde(flatten)]
    pub graph: QuestionGraph,
}

/// The full quiz aggregate: metadata plus ordered questions.
#[derive(Debug, Clone, Serialize)]
pub struct QuizGraph {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuizGraphQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{OptionSpec, QuestionBody};

    #[test]
    fn quiz_spec_parses_nested_payload() {
        let spec: QuizSpec = serde_json::from_value(serde_json::json!({
            "title": "T",
            "time_limit": 10,
            "quiz_type": "anytime",
            "questions": [
                {"text": "2+2?", "type": "mcq", "options": [
                    {"text": "3", "is_correct": false},
                    {"text": "4", "is_correct": true}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(spec.quiz_type, QuizType::Anytime);
        assert_eq!(spec.time_limit, 10);
        assert_eq!(spec.questions.len(), 1);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn unknown_quiz_type_is_rejected() {
        let result: Result<QuizSpec, _> = serde_json::from_value(serde_json::json!({
            "title": "T",
            "quiz_type": "weekly"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_title_and_negative_limit_fail_validation() {
        let spec = QuizSpec::new("", QuizType::Live).with_time_limit(-1);
        let errors = spec.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("time_limit"));
    }

    #[test]
    fn duplicate_question_ids_are_detected() {
        let question = |id| {
            QuestionSpec::new(
                "Q",
                QuestionBody::Mcq {
                    options: vec![OptionSpec::new("A", true)],
                },
            )
            .with_id(id)
        };
        let spec = QuizSpec::new("T", QuizType::Anytime)
            .with_question(question(1))
            .with_question(question(2));
        assert_eq!(spec.duplicate_question_id(), None);

        let spec = spec.with_question(question(1));
        assert_eq!(spec.duplicate_question_id(), Some(1));
    }
}
