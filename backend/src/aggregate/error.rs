// src/aggregate/error.rs

use thiserror::Error;

/// Outcome taxonomy of the quiz aggregate operations.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The quiz, or a question referenced by a replace, does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The payload is inconsistent with its declared question type or
    /// otherwise malformed.
    #[error("invalid quiz payload: {0}")]
    Validation(String),

    /// A storage step failed; the whole unit of work was rolled back.
    #[error("storage failure: {0}")]
    Transaction(#[from] sqlx::Error),

    /// The quiz moved to another version since the caller read it.
    #[error("quiz {quiz_id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrencyConflict {
        quiz_id: i64,
        expected: i64,
        actual: i64,
    },
}

pub type QuizResult<T> = Result<T, QuizError>;

impl QuizError {
    pub fn quiz_not_found(id: i64) -> Self {
        QuizError::NotFound { entity: "quiz", id }
    }

    pub fn question_not_found(id: i64) -> Self {
        QuizError::NotFound {
            entity: "question",
            id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QuizError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity() {
        assert_eq!(QuizError::quiz_not_found(4).to_string(), "quiz 4 not found");
        assert_eq!(
            QuizError::question_not_found(9).to_string(),
            "question 9 not found"
        );
        assert!(QuizError::quiz_not_found(1).is_not_found());
        assert!(!QuizError::Validation("x".to_string()).is_not_found());
    }

    #[test]
    fn storage_errors_keep_their_source() {
        let err = QuizError::from(sqlx::Error::RowNotFound);
        assert!(std::error::Error::source(&err).is_some());
    }
}
