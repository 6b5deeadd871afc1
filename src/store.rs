//! SQLite persistence for the question bank

mod database;
mod error;
mod questions;
mod schema;

pub use database::Database;
pub use error::StoreError;
pub use questions::{NewQuestion, QuestionRecord, QuestionRepo};
