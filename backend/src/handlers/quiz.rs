// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    aggregate,
    config::Config,
    error::AppError,
    models::quiz::QuizSpec,
    utils::jwt::Claims,
};

/// Creates a quiz with its full question list.
///
/// * Validates the payload shape and field lengths.
/// * The caller becomes the owner of the quiz and every new question.
/// * Returns 201 Created with the new quiz id.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<QuizSpec>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let owner_id = claims.user_id()?;
    let id = aggregate::create_quiz(&pool, &payload, owner_id).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Returns the full quiz graph: metadata plus ordered questions with
/// their options or accepted answers.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let graph = aggregate::get_full_quiz(&pool, id).await?;
    Ok(Json(graph))
}

/// Replaces a quiz's metadata and question list.
///
/// Questions carrying an `id` are updated in place; questions left out are
/// detached from this quiz only. Send `expected_version` to fail with 409
/// instead of overwriting someone else's change.
pub async fn replace_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    payload: Result<Json<QuizSpec>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let actor_id = claims.user_id()?;
    let outcome =
        aggregate::replace_quiz(&pool, id, &payload, actor_id, &config.reconcile_options()).await?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuizParams {
    #[serde(default)]
    pub cascade: bool,
}

/// Deletes a quiz.
///
/// `?cascade=true` also purges the linked questions from the shared pool.
/// That is destructive across quizzes, so it is admin only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteQuizParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.cascade && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may purge questions with a quiz".to_string(),
        ));
    }

    let outcome = aggregate::delete_quiz(&pool, id, params.cascade).await?;
    Ok(Json(outcome))
}
