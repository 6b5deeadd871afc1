/// SQL DDL for the question bank.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

/// `answers` holds the option list as a JSON-encoded TEXT column.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    points INTEGER NOT NULL,
    answers TEXT NOT NULL,
    set_number INTEGER NOT NULL,
    question_number INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_set ON questions(set_number);
CREATE INDEX IF NOT EXISTS idx_questions_set_question
    ON questions(set_number, question_number);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
