// src/aggregate/reconciler.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool, types::Json};

use super::{
    content,
    error::{QuizError, QuizResult},
    links, reader, tx,
};
use crate::models::quiz::QuizSpec;

/// Behaviour switches for [`replace_quiz`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// When a payload references a question id that no longer exists,
    /// insert the question as new instead of failing with `NotFound`.
    pub recreate_missing_questions: bool,
}

/// Summary of a successful replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    pub quiz_id: i64,
    /// Version after the replace.
    pub version: i64,
    pub removed: usize,
    pub added: usize,
    pub reordered: usize,
    /// Stale question ids that were re-inserted as new questions.
    pub recreated: usize,
}

/// Makes the stored quiz match `spec`: metadata, question order, and the
/// content and answers of every listed question.
///
/// Questions dropped from the list are only detached; their rows stay in
/// the shared pool. The whole replace is one transaction.
#[tracing::instrument(skip(pool, spec, options), fields(questions = spec.questions.len()))]
pub async fn replace_quiz(
    pool: &SqlitePool,
    quiz_id: i64,
    spec: &QuizSpec,
    actor_id: i64,
    options: &ReconcileOptions,
) -> QuizResult<ReplaceOutcome> {
    content::ensure_well_formed(spec)?;

    let mut tx = tx::begin_write(pool).await?;
    let result = reconcile(&mut tx, quiz_id, spec, actor_id, options).await;
    let outcome = tx::finish(tx, "replace_quiz", result).await?;

    tracing::info!(
        quiz_id,
        version = outcome.version,
        removed = outcome.removed,
        added = outcome.added,
        reordered = outcome.reordered,
        "Quiz replaced"
    );
    Ok(outcome)
}

async fn reconcile(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    spec: &QuizSpec,
    actor_id: i64,
    options: &ReconcileOptions,
) -> QuizResult<ReplaceOutcome> {
    let stored = reader::load_quiz(conn, quiz_id).await?;
    if let Some(expected) = spec.expected_version {
        if expected != stored.version {
            return Err(QuizError::ConcurrencyConflict {
                quiz_id,
                expected,
                actual: stored.version,
            });
        }
    }

    let now = Utc::now();
    let version = update_metadata(conn, quiz_id, stored.version, spec, now).await?;

    let mut desired = Vec::with_capacity(spec.questions.len());
    let mut recreated = 0;
    for question in &spec.questions {
        let question_id = match question.id {
            None => content::insert_question(conn, question, actor_id, now).await?,
            Some(id) => match content::update_question(conn, id, question, now).await {
                Ok(()) => {
                    content::clear_answers(conn, id).await?;
                    id
                }
                Err(err) if err.is_not_found() && options.recreate_missing_questions => {
                    let new_id = content::insert_question(conn, question, actor_id, now).await?;
                    tracing::warn!(
                        quiz_id,
                        stale_id = id,
                        new_id,
                        "Referenced question no longer exists, inserted as new"
                    );
                    recreated += 1;
                    new_id
                }
                Err(err) => return Err(err),
            },
        };
        content::insert_answers(conn, question_id, &question.body).await?;
        desired.push(question_id);
    }

    let current = links::load_links(conn, quiz_id).await?;
    let diff = links::diff_links(&current, &desired);
    if !diff.is_empty() {
        tracing::debug!(quiz_id, ?diff, "Link diff");
        links::apply_diff(conn, quiz_id, &diff).await?;
    }

    Ok(ReplaceOutcome {
        quiz_id,
        version,
        removed: diff.remove.len(),
        added: diff.add.len(),
        reordered: diff.reorder.len(),
        recreated,
    })
}

/// Overwrites quiz metadata and bumps the version.
///
/// The version guard in the WHERE clause turns a concurrent bump between
/// our read and this write into a conflict instead of a lost update.
async fn update_metadata(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    current_version: i64,
    spec: &QuizSpec,
    now: DateTime<Utc>,
) -> QuizResult<i64> {
    let version = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE quizzes
        SET title = $1, description = $2, image_url = $3, time_limit = $4,
            quiz_type = $5, tags = $6, version = version + 1, updated_at = $7
        WHERE id = $8 AND version = $9
        RETURNING version
        "#,
    )
    .bind(&spec.title)
    .bind(&spec.description)
    .bind(&spec.image_url)
    .bind(spec.time_limit)
    .bind(spec.quiz_type)
    .bind(Json(&spec.tags))
    .bind(now)
    .bind(quiz_id)
    .bind(current_version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update quiz {}: {:?}", quiz_id, e);
        e
    })?;

    match version {
        Some(version) => Ok(version),
        None => {
            let actual = sqlx::query_scalar::<_, i64>("SELECT version FROM quizzes WHERE id = $1")
                .bind(quiz_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(QuizError::quiz_not_found(quiz_id))?;
            Err(QuizError::ConcurrencyConflict {
                quiz_id,
                expected: current_version,
                actual,
            })
        }
    }
}
