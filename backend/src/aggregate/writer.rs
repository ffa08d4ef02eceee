// src/aggregate/writer.rs

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool, types::Json};

use super::{
    content,
    error::{QuizError, QuizResult},
    links,
    tx,
};
use crate::models::quiz::QuizSpec;

/// Creates a quiz together with all of its questions, links and answers.
///
/// Either every row is written or none is. Questions in a create payload
/// are always new; linking existing pool questions goes through a replace.
#[tracing::instrument(skip(pool, spec), fields(title = %spec.title, questions = spec.questions.len()))]
pub async fn create_quiz(pool: &SqlitePool, spec: &QuizSpec, owner_id: i64) -> QuizResult<i64> {
    content::ensure_well_formed(spec)?;
    if let Some(id) = spec.questions.iter().find_map(|q| q.id) {
        return Err(QuizError::Validation(format!(
            "question {id} cannot be referenced when creating a quiz"
        )));
    }

    let mut tx = tx::begin_write(pool).await?;
    let result = write_quiz(&mut tx, spec, owner_id).await;
    let quiz_id = tx::finish(tx, "create_quiz", result).await?;

    tracing::info!(quiz_id, owner_id, "Quiz created");
    Ok(quiz_id)
}

async fn write_quiz(conn: &mut SqliteConnection, spec: &QuizSpec, owner_id: i64) -> QuizResult<i64> {
    let now = Utc::now();
    let quiz_id = insert_quiz(conn, spec, owner_id, now).await?;

    for (index, question) in spec.questions.iter().enumerate() {
        let question_id = content::insert_question(conn, question, owner_id, now).await?;
        links::insert_link(conn, quiz_id, question_id, index as i64).await?;
        content::insert_answers(conn, question_id, &question.body).await?;
    }

    Ok(quiz_id)
}

async fn insert_quiz(
    conn: &mut SqliteConnection,
    spec: &QuizSpec,
    owner_id: i64,
    now: DateTime<Utc>,
) -> QuizResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes
        (title, description, image_url, time_limit, quiz_type, tags, owner_id, version, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $8)
        RETURNING id
        "#,
    )
    .bind(&spec.title)
    .bind(&spec.description)
    .bind(&spec.image_url)
    .bind(spec.time_limit)
    .bind(spec.quiz_type)
    .bind(Json(&spec.tags))
    .bind(owner_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert quiz: {:?}", e);
        e
    })?;

    Ok(id)
}
