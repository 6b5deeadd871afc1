use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::database::Database;
use super::error::StoreError;

/// A question as stored in the bank
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub text: String,
    pub correct_answer: String,
    pub points: i64,
    pub answers: Vec<String>,
    pub set_number: u32,
    pub question_number: u32,
}

/// Fields required to create a question
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewQuestion {
    pub text: String,
    pub correct_answer: String,
    pub points: i64,
    pub answers: Vec<String>,
    pub set_number: u32,
    pub question_number: u32,
}

/// Question records keyed by (set number, question number)
#[derive(Clone)]
pub struct QuestionRepo {
    db: Database,
}

impl QuestionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a question and return the stored row
    #[instrument(skip(self, question), fields(set = question.set_number, number = question.question_number))]
    pub fn create(&self, question: &NewQuestion) -> Result<QuestionRecord, StoreError> {
        let answers = serde_json::to_string(&question.answers)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO questions (text, correct_answer, points, answers, set_number, question_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    question.text,
                    question.correct_answer,
                    question.points,
                    answers,
                    question.set_number,
                    question.question_number
                ],
            )?;

            Ok(QuestionRecord {
                id: conn.last_insert_rowid(),
                text: question.text.clone(),
                correct_answer: question.correct_answer.clone(),
                points: question.points,
                answers: question.answers.clone(),
                set_number: question.set_number,
                question_number: question.question_number,
            })
        })
    }

    /// First question matching (set, number)
    #[instrument(skip(self))]
    pub fn get(&self, set_number: u32, question_number: u32) -> Result<QuestionRecord, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, text, correct_answer, points, answers, set_number, question_number
                 FROM questions WHERE set_number = ?1 AND question_number = ?2",
                params![set_number, question_number],
                row_to_record,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!(
                    "question {question_number} in set {set_number}"
                )),
                other => StoreError::Database(other.to_string()),
            })
        })
    }

    /// Delete a question; Ok(true) when a record existed
    #[instrument(skip(self))]
    pub fn delete(&self, set_number: u32, question_number: u32) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM questions WHERE set_number = ?1 AND question_number = ?2",
                params![set_number, question_number],
            )?;
            Ok(affected > 0)
        })
    }

    /// Highest set number in the bank, -1 when empty
    #[instrument(skip(self))]
    pub fn max_set_number(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            let max: Option<i64> =
                conn.query_row("SELECT MAX(set_number) FROM questions", [], |row| row.get(0))?;
            Ok(max.unwrap_or(-1))
        })
    }

    /// Number of questions in a set
    #[instrument(skip(self))]
    pub fn set_size(&self, set_number: u32) -> Result<u32, StoreError> {
        self.db.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM questions WHERE set_number = ?1",
                params![set_number],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Distinct set numbers, ascending
    #[instrument(skip(self))]
    pub fn set_numbers(&self) -> Result<Vec<u32>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT set_number FROM questions ORDER BY set_number")?;
            let numbers = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<u32>, _>>()?;
            Ok(numbers)
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuestionRecord> {
    let answers_json: String = row.get(4)?;
    let answers = serde_json::from_str(&answers_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(QuestionRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        correct_answer: row.get(2)?,
        points: row.get(3)?,
        answers,
        set_number: row.get(5)?,
        question_number: row.get(6)?,
    })
}
