// src/aggregate/tx.rs

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::error::QuizResult;

/// One aggregate operation's unit of work.
///
/// Dropping it without calling [`finish`] rolls the transaction back, so
/// early returns never leave a half-applied write behind.
pub type UnitOfWork = Transaction<'static, Sqlite>;

/// Opens a read-only unit of work.
///
/// In WAL mode a deferred transaction pins one snapshot for all of its
/// reads, so readers never see a half-applied write.
pub async fn begin(pool: &SqlitePool) -> QuizResult<UnitOfWork> {
    pool.begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {:?}", e);
        e.into()
    })
}

/// Opens a unit of work that will write.
///
/// `BEGIN IMMEDIATE` takes the write lock before the first read. A deferred
/// transaction that reads first fails with SQLITE_BUSY on upgrade instead
/// of waiting out the busy timeout.
pub async fn begin_write(pool: &SqlitePool) -> QuizResult<UnitOfWork> {
    pool.begin_with("BEGIN IMMEDIATE").await.map_err(|e| {
        tracing::error!("Failed to open write transaction: {:?}", e);
        e.into()
    })
}

/// Commits on success, rolls back on failure, and hands back the result.
///
/// The connection returns to the pool on both paths.
pub async fn finish<T>(tx: UnitOfWork, operation: &'static str, result: QuizResult<T>) -> QuizResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                tracing::error!(operation, "Failed to commit: {:?}", e);
                e
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(operation, "Rollback failed: {:?}", rollback_err);
            }
            tracing::warn!(operation, error = %err, "Rolled back");
            Err(err)
        }
    }
}
