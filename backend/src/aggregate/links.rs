// src/aggregate/links.rs
//
// Quiz-to-question links. The reconciler never rewrites the whole link
// list; it computes a LinkDiff against what is stored and applies that.

use std::collections::HashMap;

use sqlx::SqliteConnection;

use super::error::QuizResult;
use crate::models::quiz::QuizQuestionLink;

/// The minimal set of link changes turning the stored list into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDiff {
    /// Question ids to detach from the quiz.
    pub remove: Vec<i64>,
    /// `(question_id, position)` pairs to link.
    pub add: Vec<(i64, i64)>,
    /// `(question_id, new_position)` pairs for links that stay but move.
    pub reorder: Vec<(i64, i64)>,
}

impl LinkDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty() && self.reorder.is_empty()
    }
}

/// Compares stored links with the desired question order (index = position).
///
/// `desired` must not contain the same question twice.
pub fn diff_links(current: &[QuizQuestionLink], desired: &[i64]) -> LinkDiff {
    let stored: HashMap<i64, i64> = current
        .iter()
        .map(|link| (link.question_id, link.position))
        .collect();
    let wanted: HashMap<i64, i64> = desired
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i64))
        .collect();

    let mut diff = LinkDiff::default();

    for link in current {
        if !wanted.contains_key(&link.question_id) {
            diff.remove.push(link.question_id);
        }
    }

    for (index, question_id) in desired.iter().enumerate() {
        let position = index as i64;
        match stored.get(question_id) {
            None => diff.add.push((*question_id, position)),
            Some(old) if *old != position => diff.reorder.push((*question_id, position)),
            Some(_) => {}
        }
    }

    diff
}

pub async fn load_links(conn: &mut SqliteConnection, quiz_id: i64) -> QuizResult<Vec<QuizQuestionLink>> {
    let links = sqlx::query_as::<_, QuizQuestionLink>(
        r#"
        SELECT quiz_id, question_id, position
        FROM quiz_questions
        WHERE quiz_id = $1
        ORDER BY position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(links)
}

/// Applies a diff: detach, then move, then link.
///
/// Moved links pass through negative positions first so that
/// `UNIQUE(quiz_id, position)` holds after every single statement.
pub async fn apply_diff(conn: &mut SqliteConnection, quiz_id: i64, diff: &LinkDiff) -> QuizResult<()> {
    for question_id in &diff.remove {
        sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = $1 AND question_id = $2")
            .bind(quiz_id)
            .bind(question_id)
            .execute(&mut *conn)
            .await?;
    }

    if !diff.reorder.is_empty() {
        for (question_id, position) in &diff.reorder {
            sqlx::query(
                "UPDATE quiz_questions SET position = $1 WHERE quiz_id = $2 AND question_id = $3",
            )
            .bind(-(position + 1))
            .bind(quiz_id)
            .bind(question_id)
            .execute(&mut *conn)
            .await?;
        }
        sqlx::query(
            "UPDATE quiz_questions SET position = -position - 1 WHERE quiz_id = $1 AND position < 0",
        )
        .bind(quiz_id)
        .execute(&mut *conn)
        .await?;
    }

    for (question_id, position) in &diff.add {
        insert_link(conn, quiz_id, *question_id, *position).await?;
    }

    Ok(())
}

pub async fn insert_link(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    question_id: i64,
    position: i64,
) -> QuizResult<()> {
    sqlx::query("INSERT INTO quiz_questions (quiz_id, question_id, position) VALUES ($1, $2, $3)")
        .bind(quiz_id)
        .bind(question_id)
        .bind(position)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to link question {} into quiz {}: {:?}",
                question_id,
                quiz_id,
                e
            );
            e
        })?;
    Ok(())
}

/// Renumbers a quiz's remaining links to `0..N-1`, keeping their order.
///
/// Returns how many links moved.
pub async fn compact_positions(conn: &mut SqliteConnection, quiz_id: i64) -> QuizResult<usize> {
    let links = load_links(conn, quiz_id).await?;
    let mut moved = 0;
    for (index, link) in links.iter().enumerate() {
        let position = index as i64;
        if link.position == position {
            continue;
        }
        // Ascending order means the target slot is always already free.
        sqlx::query(
            "UPDATE quiz_questions SET position = $1 WHERE quiz_id = $2 AND question_id = $3",
        )
        .bind(position)
        .bind(quiz_id)
        .bind(link.question_id)
        .execute(&mut *conn)
        .await?;
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(pairs: &[(i64, i64)]) -> Vec<QuizQuestionLink> {
        pairs
            .iter()
            .map(|(question_id, position)| QuizQuestionLink {
                quiz_id: 1,
                question_id: *question_id,
                position: *position,
            })
            .collect()
    }

    #[test]
    fn unchanged_list_has_empty_diff() {
        let diff = diff_links(&links(&[(10, 0), (11, 1)]), &[10, 11]);
        assert!(diff.is_empty());
    }

    #[test]
    fn dropped_question_is_removed_and_followers_move_up() {
        let diff = diff_links(&links(&[(10, 0), (11, 1), (12, 2)]), &[10, 12]);
        assert_eq!(diff.remove, vec![11]);
        assert_eq!(diff.reorder, vec![(12, 1)]);
        assert!(diff.add.is_empty());
    }

    #[test]
    fn swap_and_append() {
        let diff = diff_links(&links(&[(10, 0), (11, 1)]), &[11, 10, 20]);
        assert!(diff.remove.is_empty());
        assert_eq!(diff.reorder, vec![(11, 0), (10, 1)]);
        assert_eq!(diff.add, vec![(20, 2)]);
    }

    #[test]
    fn empty_desired_list_removes_everything() {
        let diff = diff_links(&links(&[(10, 0), (11, 1)]), &[]);
        assert_eq!(diff.remove, vec![10, 11]);
        assert!(diff.add.is_empty() && diff.reorder.is_empty());
    }
}
