//! HTTP surface for the question bank.
//!
//! Thin handlers over [`QuestionRepo`]; the session coordinator is never
//! touched from here.

use std::io;
use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::store::{NewQuestion, QuestionRepo, StoreError};

pub const DEFAULT_API_PORT: u16 = 8000;

/// Question bank API server
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    pub async fn bind(addr: &str, repo: QuestionRepo) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("question bank API listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            router: build_router(repo),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

/// Build the router with all question bank routes.
/// CORS is permissive; the quiz frontends are browser apps on other origins.
pub fn build_router(repo: QuestionRepo) -> Router {
    Router::new()
        .route("/api/max", get(max_set_number))
        .route("/api/size/{set_number}", get(set_size))
        .route(
            "/api/question/{set_number}/{question_number}",
            get(get_question).delete(delete_question),
        )
        .route("/api/new", post(create_question))
        .route("/api/setNumbers", get(set_numbers))
        .with_state(repo)
        .layer(CorsLayer::permissive())
}

/// Wire shape of a new question, matching the browser clients' field names
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionIn {
    pub text: String,
    pub correct_answer: String,
    pub points: i64,
    pub answers: Vec<String>,
    pub set_number: u32,
    pub question_number: u32,
}

/// Wire shape of a fetched question
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub text: String,
    pub correct_answer: String,
    pub points: i64,
    pub answers: Vec<String>,
}

/// Wire shape of a stored question, returned from creation
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuestion {
    pub id: i64,
    pub text: String,
    pub correct_answer: String,
    pub points: i64,
    pub answers: Vec<String>,
    pub set_number: u32,
    pub question_number: u32,
}

async fn max_set_number(State(repo): State<QuestionRepo>) -> Result<Json<i64>, ApiError> {
    Ok(Json(repo.max_set_number()?))
}

async fn set_size(
    State(repo): State<QuestionRepo>,
    Path(set_number): Path<u32>,
) -> Result<Json<u32>, ApiError> {
    Ok(Json(repo.set_size(set_number)?))
}

async fn get_question(
    State(repo): State<QuestionRepo>,
    Path((set_number, question_number)): Path<(u32, u32)>,
) -> Result<Json<QuestionOut>, ApiError> {
    let question = repo.get(set_number, question_number)?;
    Ok(Json(QuestionOut {
        text: question.text,
        correct_answer: question.correct_answer,
        points: question.points,
        answers: question.answers,
    }))
}

async fn create_question(
    State(repo): State<QuestionRepo>,
    Json(question): Json<QuestionIn>,
) -> Result<Json<StoredQuestion>, ApiError> {
    let stored = repo.create(&NewQuestion {
        text: question.text,
        correct_answer: question.correct_answer,
        points: question.points,
        answers: question.answers,
        set_number: question.set_number,
        question_number: question.question_number,
    })?;

    Ok(Json(StoredQuestion {
        id: stored.id,
        text: stored.text,
        correct_answer: stored.correct_answer,
        points: stored.points,
        answers: stored.answers,
        set_number: stored.set_number,
        question_number: stored.question_number,
    }))
}

async fn delete_question(
    State(repo): State<QuestionRepo>,
    Path((set_number, question_number)): Path<(u32, u32)>,
) -> Result<StatusCode, ApiError> {
    if repo.delete(set_number, question_number)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(StoreError::NotFound(format!(
            "question {question_number} in set {set_number}"
        ))))
    }
}

async fn set_numbers(State(repo): State<QuestionRepo>) -> Result<Json<Vec<u32>>, ApiError> {
    Ok(Json(repo.set_numbers()?))
}

/// Store failures mapped onto HTTP statuses with a JSON `detail` body
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Question not found".to_string())
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
