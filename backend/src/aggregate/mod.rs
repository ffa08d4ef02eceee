// src/aggregate/mod.rs
//
// Persistence engine for the quiz aggregate: a quiz, its ordered questions
// and each question's options or accepted answers. Every public operation
// runs as exactly one transaction on the pool it is handed.

mod content;
pub mod deleter;
pub mod error;
pub mod links;
pub mod reader;
pub mod reconciler;
mod tx;
pub mod writer;

pub use deleter::{DeleteOutcome, delete_quiz};
pub use error::{QuizError, QuizResult};
pub use reader::{get_full_quiz, get_question};
pub use reconciler::{ReconcileOptions, ReplaceOutcome, replace_quiz};
pub use writer::create_quiz;
