// src/aggregate/content.rs
//
// Question rows and their answer sub-entities, shared by the writer and
// the reconciler. Every function runs on the caller's transaction.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, types::Json};

use super::error::{QuizError, QuizResult};
use crate::models::{
    question::{OptionSpec, QuestionBody, QuestionSpec},
    quiz::QuizSpec,
};

/// Rejects specs the engine must not persist even if upstream validation
/// was skipped.
pub fn ensure_well_formed(spec: &QuizSpec) -> QuizResult<()> {
    if spec.title.trim().is_empty() {
        return Err(QuizError::Validation("quiz title is blank".to_string()));
    }
    if spec.time_limit < 0 {
        return Err(QuizError::Validation(format!(
            "time limit must not be negative, got {}",
            spec.time_limit
        )));
    }
    if let Some(id) = spec.duplicate_question_id() {
        return Err(QuizError::Validation(format!(
            "question {id} appears more than once"
        )));
    }

    for (index, question) in spec.questions.iter().enumerate() {
        if question.text.trim().is_empty() {
            return Err(QuizError::Validation(format!(
                "question at position {index} has blank text"
            )));
        }
        match &question.body {
            QuestionBody::Mcq { options } | QuestionBody::TrueFalse { options } => {
                if options.is_empty() {
                    return Err(QuizError::Validation(format!(
                        "{} question at position {index} has no options",
                        question.question_type()
                    )));
                }
                if options.iter().any(|o| o.text.trim().is_empty()) {
                    return Err(QuizError::Validation(format!(
                        "question at position {index} has a blank option"
                    )));
                }
            }
            QuestionBody::TypeIn { accepted_answers } => {
                if accepted_answers.is_empty() {
                    return Err(QuizError::Validation(format!(
                        "type_in question at position {index} has no accepted answers"
                    )));
                }
                if accepted_answers.iter().any(|a| a.trim().is_empty()) {
                    return Err(QuizError::Validation(format!(
                        "question at position {index} has a blank accepted answer"
                    )));
                }
            }
        }
    }
    Ok(())
}

pub async fn insert_question(
    conn: &mut SqliteConnection,
    spec: &QuestionSpec,
    owner_id: i64,
    now: DateTime<Utc>,
) -> QuizResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions
        (text, image_url, question_type, tags, owner_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING id
        "#,
    )
    .bind(&spec.text)
    .bind(&spec.image_url)
    .bind(spec.question_type())
    .bind(Json(&spec.tags))
    .bind(owner_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert question: {:?}", e);
        e
    })?;

    Ok(id)
}

/// Overwrites the question's own columns. Ownership and creation time stay.
pub async fn update_question(
    conn: &mut SqliteConnection,
    id: i64,
    spec: &QuestionSpec,
    now: DateTime<Utc>,
) -> QuizResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE questions
        SET text = $1, image_url = $2, question_type = $3, tags = $4, updated_at = $5
        WHERE id = $6
        "#,
    )
    .bind(&spec.text)
    .bind(&spec.image_url)
    .bind(spec.question_type())
    .bind(Json(&spec.tags))
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question {}: {:?}", id, e);
        e
    })?;

    if result.rows_affected() == 0 {
        return Err(QuizError::question_not_found(id));
    }
    Ok(())
}

/// Deletes both sub-entity sets, so a question whose type changed never
/// keeps rows of its old shape.
pub async fn clear_answers(conn: &mut SqliteConnection, question_id: i64) -> QuizResult<()> {
    sqlx::query("DELETE FROM options WHERE question_id = $1")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM accepted_answers WHERE question_id = $1")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Bulk-inserts the sub-entities matching the question's type.
pub async fn insert_answers(
    conn: &mut SqliteConnection,
    question_id: i64,
    body: &QuestionBody,
) -> QuizResult<()> {
    match body {
        QuestionBody::Mcq { options } | QuestionBody::TrueFalse { options } => {
            insert_options(conn, question_id, options).await
        }
        QuestionBody::TypeIn { accepted_answers } => {
            insert_accepted_answers(conn, question_id, accepted_answers).await
        }
    }
}

async fn insert_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    options: &[OptionSpec],
) -> QuizResult<()> {
    if options.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO options (question_id, text, is_correct) ");
    builder.push_values(options, |mut row, option| {
        row.push_bind(question_id)
            .push_bind(option.text.clone())
            .push_bind(option.is_correct);
    });

    builder.build().execute(&mut *conn).await.map_err(|e| {
        tracing::error!("Failed to insert options for question {}: {:?}", question_id, e);
        e
    })?;
    Ok(())
}

async fn insert_accepted_answers(
    conn: &mut SqliteConnection,
    question_id: i64,
    answers: &[String],
) -> QuizResult<()> {
    if answers.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO accepted_answers (question_id, text) ");
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(question_id).push_bind(answer.clone());
    });

    builder.build().execute(&mut *conn).await.map_err(|e| {
        tracing::error!(
            "Failed to insert accepted answers for question {}: {:?}",
            question_id,
            e
        );
        e
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuizType;

    fn mcq(text: &str) -> QuestionSpec {
        QuestionSpec::new(
            text,
            QuestionBody::Mcq {
                options: vec![OptionSpec::new("3", false), OptionSpec::new("4", true)],
            },
        )
    }

    #[test]
    fn accepts_well_formed_spec() {
        let spec = QuizSpec::new("T", QuizType::Anytime)
            .with_time_limit(10)
            .with_question(mcq("2+2?"))
            .with_question(QuestionSpec::new(
                "Capital?",
                QuestionBody::TypeIn {
                    accepted_answers: vec!["Delhi".to_string()],
                },
            ));
        assert!(ensure_well_formed(&spec).is_ok());
    }

    #[test]
    fn rejects_empty_sub_entity_lists() {
        let spec = QuizSpec::new("T", QuizType::Live).with_question(QuestionSpec::new(
            "Capital?",
            QuestionBody::TypeIn {
                accepted_answers: vec![],
            },
        ));
        assert!(matches!(
            ensure_well_formed(&spec),
            Err(QuizError::Validation(msg)) if msg.contains("no accepted answers")
        ));

        let spec = QuizSpec::new("T", QuizType::Live).with_question(QuestionSpec::new(
            "True?",
            QuestionBody::TrueFalse { options: vec![] },
        ));
        assert!(matches!(ensure_well_formed(&spec), Err(QuizError::Validation(_))));
    }

    #[test]
    fn rejects_blank_text_and_repeated_ids() {
        let spec = QuizSpec::new("  ", QuizType::Scheduled);
        assert!(ensure_well_formed(&spec).is_err());

        let spec = QuizSpec::new("T", QuizType::Scheduled).with_question(mcq(" "));
        assert!(ensure_well_formed(&spec).is_err());

        let spec = QuizSpec::new("T", QuizType::Scheduled)
            .with_question(mcq("a").with_id(3))
            .with_question(mcq("b").with_id(3));
        assert!(matches!(
            ensure_well_formed(&spec),
            Err(QuizError::Validation(msg)) if msg.contains("question 3")
        ));
    }
}
