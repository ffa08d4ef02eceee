// src/aggregate/reader.rs

use sqlx::{SqliteConnection, SqlitePool};

use super::{
    error::{QuizError, QuizResult},
    tx,
};
use crate::models::{
    question::{AcceptedAnswer, AnswerOption, Question, QuestionType},
    quiz::{QuestionContent, QuestionGraph, Quiz, QuizGraph, QuizGraphQuestion},
};

/// Joined row of `quiz_questions` and `questions`.
#[derive(sqlx::FromRow)]
struct LinkedQuestion {
    position: i64,
    #[sqlx(flatten)]
    question: Question,
}

/// Loads the full quiz graph: metadata plus ordered questions with their
/// type-specific sub-entities.
///
/// All reads share one transaction, so a concurrent replace is observed
/// either entirely or not at all.
#[tracing::instrument(skip(pool))]
pub async fn get_full_quiz(pool: &SqlitePool, quiz_id: i64) -> QuizResult<QuizGraph> {
    let mut tx = tx::begin(pool).await?;
    let result = load_graph(&mut tx, quiz_id).await;
    tx::finish(tx, "get_full_quiz", result).await
}

/// Loads one question from the shared pool with its sub-entities.
#[tracing::instrument(skip(pool))]
pub async fn get_question(pool: &SqlitePool, question_id: i64) -> QuizResult<QuestionGraph> {
    let mut tx = tx::begin(pool).await?;
    let result = load_question(&mut tx, question_id).await;
    tx::finish(tx, "get_question", result).await
}

pub(crate) async fn load_quiz(conn: &mut SqliteConnection, quiz_id: i64) -> QuizResult<Quiz> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT
            id, title, description, image_url, time_limit, quiz_type,
            tags, owner_id, version, created_at, updated_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
        e
    })?
    .ok_or(QuizError::quiz_not_found(quiz_id))
}

async fn load_graph(conn: &mut SqliteConnection, quiz_id: i64) -> QuizResult<QuizGraph> {
    let quiz = load_quiz(conn, quiz_id).await?;

    let linked = sqlx::query_as::<_, LinkedQuestion>(
        r#"
        SELECT
            qq.position,
            q.id, q.text, q.image_url, q.question_type, q.tags,
            q.owner_id, q.created_at, q.updated_at
        FROM quiz_questions qq
        JOIN questions q ON q.id = qq.question_id
        WHERE qq.quiz_id = $1
        ORDER BY qq.position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions of quiz {}: {:?}", quiz_id, e);
        e
    })?;

    let mut questions = Vec::with_capacity(linked.len());
    for LinkedQuestion { position, question } in linked {
        let content = load_content(conn, &question).await?;
        questions.push(QuizGraphQuestion {
            position,
            graph: QuestionGraph { question, content },
        });
    }

    Ok(QuizGraph { quiz, questions })
}

async fn load_question(conn: &mut SqliteConnection, question_id: i64) -> QuizResult<QuestionGraph> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, text, image_url, question_type, tags, owner_id, created_at, updated_at
        FROM questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(QuizError::question_not_found(question_id))?;

    let content = load_content(conn, &question).await?;
    Ok(QuestionGraph { question, content })
}

async fn load_content(conn: &mut SqliteConnection, question: &Question) -> QuizResult<QuestionContent> {
    let content = match question.question_type {
        QuestionType::Mcq => QuestionContent::Mcq {
            options: load_options(conn, question.id).await?,
        },
        QuestionType::TrueFalse => QuestionContent::TrueFalse {
            options: load_options(conn, question.id).await?,
        },
        QuestionType::TypeIn => QuestionContent::TypeIn {
            accepted_answers: load_accepted_answers(conn, question.id).await?,
        },
    };
    Ok(content)
}

async fn load_options(conn: &mut SqliteConnection, question_id: i64) -> QuizResult<Vec<AnswerOption>> {
    let options = sqlx::query_as::<_, AnswerOption>(
        "SELECT id, question_id, text, is_correct FROM options WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(options)
}

async fn load_accepted_answers(
    conn: &mut SqliteConnection,
    question_id: i64,
) -> QuizResult<Vec<AcceptedAnswer>> {
    let answers = sqlx::query_as::<_, AcceptedAnswer>(
        "SELECT id, question_id, text FROM accepted_answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(answers)
}
