// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::aggregate::QuizError;
use crate::models::{validate_tags, validate_url_string};

/// Question type as stored in the `question_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    TypeIn,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::TrueFalse => "true_false",
            QuestionType::TypeIn => "type_in",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'questions' table in the database.
///
/// Questions live in a shared pool and can be linked into many quizzes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub text: String,

    pub image_url: Option<String>,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    pub owner_id: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'options' table. Only valid under `mcq` and `true_false` questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Represents the 'accepted_answers' table. Only valid under `type_in` questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AcceptedAnswer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
}

/// One answer option as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OptionSpec {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl OptionSpec {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// Type-specific payload of a question.
///
/// Options and accepted answers are mutually exclusive, so each question
/// type carries exactly the sub-entity list it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuestionBody {
    Mcq { options: Vec<OptionSpec> },
    TrueFalse { options: Vec<OptionSpec> },
    TypeIn { accepted_answers: Vec<String> },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionBody::Mcq { .. } => QuestionType::Mcq,
            QuestionBody::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionBody::TypeIn { .. } => QuestionType::TypeIn,
        }
    }
}

/// Wire shape of a question inside a quiz payload.
///
/// The declared `type` decides which of `options` / `accepted_answers`
/// must be present; the conversion into [`QuestionSpec`] rejects mismatches.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPayload {
    /// Existing question to reuse. Only honoured by a full replace.
    pub id: Option<i64>,
    pub text: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Option<Vec<OptionSpec>>,
    pub accepted_answers: Option<Vec<String>>,
}

/// A question inside a `QuizSpec`, with its body already matched to its type.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(try_from = "QuestionPayload")]
pub struct QuestionSpec {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
    #[validate(custom(function = validate_body))]
    pub body: QuestionBody,
}

impl QuestionSpec {
    pub fn new(text: impl Into<String>, body: QuestionBody) -> Self {
        Self {
            id: None,
            text: text.into(),
            image_url: None,
            tags: Vec::new(),
            body,
        }
    }

    /// Marks this spec as referring to an already persisted question.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn question_type(&self) -> QuestionType {
        self.body.question_type()
    }
}

impl TryFrom<QuestionPayload> for QuestionSpec {
    type Error = QuizError;

    fn try_from(payload: QuestionPayload) -> Result<Self, Self::Error> {
        let body = match (payload.question_type, payload.options, payload.accepted_answers) {
            (QuestionType::Mcq, Some(options), None) => QuestionBody::Mcq { options },
            (QuestionType::TrueFalse, Some(options), None) => QuestionBody::TrueFalse { options },
            (QuestionType::TypeIn, None, Some(accepted_answers)) => {
                QuestionBody::TypeIn { accepted_answers }
            }
            (QuestionType::TypeIn, Some(_), _) => {
                return Err(QuizError::Validation(
                    "type_in questions take accepted_answers, not options".to_string(),
                ));
            }
            (question_type, _, Some(_)) => {
                return Err(QuizError::Validation(format!(
                    "{question_type} questions take options, not accepted_answers"
                )));
            }
            (question_type, None, None) => {
                return Err(QuizError::Validation(format!(
                    "{question_type} question is missing its answer payload"
                )));
            }
        };

        Ok(Self {
            id: payload.id,
            text: payload.text,
            image_url: payload.image_url,
            tags: payload.tags,
            body,
        })
    }
}

fn validate_body(body: &QuestionBody) -> Result<(), validator::ValidationError> {
    match body {
        QuestionBody::Mcq { options } | QuestionBody::TrueFalse { options } => {
            if options.is_empty() {
                return Err(validator::ValidationError::new("options_cannot_be_empty"));
            }
            for opt in options {
                if opt.text.is_empty() || opt.text.len() > 500 {
                    return Err(validator::ValidationError::new("invalid_option_length"));
                }
            }
        }
        QuestionBody::TypeIn { accepted_answers } => {
            if accepted_answers.is_empty() {
                return Err(validator::ValidationError::new(
                    "accepted_answers_cannot_be_empty",
                ));
            }
            for answer in accepted_answers {
                if answer.is_empty() || answer.len() > 500 {
                    return Err(validator::ValidationError::new("invalid_answer_length"));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> Result<QuestionSpec, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn mcq_payload_becomes_mcq_body() {
        let spec = payload(serde_json::json!({
            "text": "2+2?",
            "type": "mcq",
            "options": [{"text": "3", "is_correct": false}, {"text": "4", "is_correct": true}]
        }))
        .unwrap();

        assert_eq!(spec.question_type(), QuestionType::Mcq);
        assert_eq!(
            spec.body,
            QuestionBody::Mcq {
                options: vec![OptionSpec::new("3", false), OptionSpec::new("4", true)]
            }
        );
    }

    #[test]
    fn type_in_payload_keeps_answers() {
        let spec = payload(serde_json::json!({
            "id": 7,
            "text": "Capital of India?",
            "type": "type_in",
            "accepted_answers": ["Delhi", "New Delhi"]
        }))
        .unwrap();

        assert_eq!(spec.id, Some(7));
        assert_eq!(
            spec.body,
            QuestionBody::TypeIn {
                accepted_answers: vec!["Delhi".to_string(), "New Delhi".to_string()]
            }
        );
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let err = QuestionSpec::try_from(QuestionPayload {
            id: None,
            text: "Capital?".to_string(),
            image_url: None,
            tags: vec![],
            question_type: QuestionType::TypeIn,
            options: Some(vec![OptionSpec::new("Delhi", true)]),
            accepted_answers: None,
        })
        .unwrap_err();
        assert!(matches!(err, QuizError::Validation(_)));

        let err = payload(serde_json::json!({
            "text": "True?",
            "type": "true_false",
            "options": [{"text": "True", "is_correct": true}],
            "accepted_answers": ["True"]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("not accepted_answers"));

        assert!(payload(serde_json::json!({"text": "Empty", "type": "mcq"})).is_err());
    }

    #[test]
    fn empty_option_list_fails_validation() {
        let spec = QuestionSpec::new("Pick one", QuestionBody::Mcq { options: vec![] });
        let errors = spec.validate().unwrap_err();
        let body_errors = errors.field_errors();
        let body_errors = body_errors.get("body").expect("body should be reported");
        assert_eq!(body_errors[0].code, "options_cannot_be_empty");
        assert!(body_errors[0].params.contains_key("value"));

        let spec = QuestionSpec::new(
            "Pick one",
            QuestionBody::TrueFalse {
                options: vec![OptionSpec::new("True", true), OptionSpec::new("False", false)],
            },
        );
        assert!(spec.validate().is_ok());
    }
}
