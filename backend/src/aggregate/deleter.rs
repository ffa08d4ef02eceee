// src/aggregate/deleter.rs

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::{
    content,
    error::{QuizError, QuizResult},
    links, tx,
};

/// Summary of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub quiz_id: i64,
    pub cascaded: bool,
    /// Links removed from the deleted quiz.
    pub detached: usize,
    /// Questions permanently removed from the pool (cascade only).
    pub purged: usize,
}

/// Deletes a quiz and its links.
///
/// With `cascade_questions` the linked questions are purged from the shared
/// pool as well, which also unlinks them from every other quiz. Those
/// quizzes get their positions compacted and their version bumped.
#[tracing::instrument(skip(pool))]
pub async fn delete_quiz(
    pool: &SqlitePool,
    quiz_id: i64,
    cascade_questions: bool,
) -> QuizResult<DeleteOutcome> {
    let mut tx = tx::begin_write(pool).await?;
    let result = remove_quiz(&mut tx, quiz_id, cascade_questions).await;
    let outcome = tx::finish(tx, "delete_quiz", result).await?;

    tracing::info!(
        quiz_id,
        cascaded = outcome.cascaded,
        detached = outcome.detached,
        purged = outcome.purged,
        "Quiz deleted"
    );
    Ok(outcome)
}

async fn remove_quiz(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    cascade_questions: bool,
) -> QuizResult<DeleteOutcome> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(QuizError::quiz_not_found(quiz_id))?;

    let question_ids: Vec<i64> = links::load_links(conn, quiz_id)
        .await?
        .into_iter()
        .map(|link| link.question_id)
        .collect();

    sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(&mut *conn)
        .await?;

    let mut purged = 0;
    if cascade_questions && !question_ids.is_empty() {
        let affected = quizzes_sharing(conn, &question_ids).await?;

        for question_id in &question_ids {
            purged += purge_question(conn, *question_id).await?;
        }

        let now = Utc::now();
        for other_quiz in affected {
            links::compact_positions(conn, other_quiz).await?;
            sqlx::query("UPDATE quizzes SET version = version + 1, updated_at = $1 WHERE id = $2")
                .bind(now)
                .bind(other_quiz)
                .execute(&mut *conn)
                .await?;
            tracing::info!(quiz_id = other_quiz, "Questions purged by cascade, positions compacted");
        }
    }

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz {}: {:?}", quiz_id, e);
            e
        })?;

    Ok(DeleteOutcome {
        quiz_id,
        cascaded: cascade_questions,
        detached: question_ids.len(),
        purged,
    })
}

/// Other quizzes that still link any of the given questions.
async fn quizzes_sharing(conn: &mut SqliteConnection, question_ids: &[i64]) -> QuizResult<Vec<i64>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT DISTINCT quiz_id FROM quiz_questions WHERE question_id IN (",
    );
    let mut separated = builder.separated(",");
    for id in question_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY quiz_id");

    let quiz_ids = builder
        .build_query_scalar::<i64>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(quiz_ids)
}

/// Removes a question with its answers and remaining links.
///
/// Returns 1 if the question row was deleted.
async fn purge_question(conn: &mut SqliteConnection, question_id: i64) -> QuizResult<usize> {
    content::clear_answers(conn, question_id).await?;
    sqlx::query("DELETE FROM quiz_questions WHERE question_id = $1")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to purge question {}: {:?}", question_id, e);
            e
        })?;

    Ok(result.rows_affected() as usize)
}
