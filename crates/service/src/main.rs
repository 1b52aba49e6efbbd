use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sheetgrade_core::{
    decode_data_uri, inspect_payload, GradeLookup, PayloadKind, SearchError, SheetConfig,
    StudentRecord,
};

struct AppState {
    lookup: GradeLookup,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();
    let config = SheetConfig::load(None)?;
    let lookup = GradeLookup::from_config(config)?;
    if !lookup.validate_config() {
        anyhow::bail!("sheet configuration is invalid, see warnings above");
    }
    let state = Arc::new(AppState { lookup });
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr, mode = state.lookup.mode().as_str());
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", post(handle_search))
        .route("/api/answer-sheet", get(handle_answer_sheet))
        .route("/api/cache/clear", post(handle_clear_cache))
        .with_state(state)
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    student_id: String,
    birth_date: String,
}

impl SearchParams {
    fn validated(&self) -> Result<(&str, &str), AppError> {
        let id = self.student_id.trim();
        let date = self.birth_date.trim();
        if id.is_empty() || date.is_empty() {
            return Err(AppError::bad_request(
                "student id and birth date are both required",
            ));
        }
        Ok((id, date))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    student_id: String,
    birth_date: String,
    student_name: String,
    subject: String,
    grade: f64,
    display_grade: String,
    grade_percent: f64,
    has_image: bool,
    image_url: String,
    download_name: String,
}

impl SearchResponse {
    fn new(lookup: &GradeLookup, record: StudentRecord) -> Self {
        let image_url = lookup.convert_drive_url(&record.image_url);
        Self {
            display_grade: record.formatted_grade(),
            grade_percent: record.grade_percent(),
            has_image: record.has_image(),
            download_name: record.download_file_name(),
            image_url,
            grade: record.grade,
            student_id: record.student_id,
            birth_date: record.birth_date,
            student_name: record.student_name,
            subject: record.subject,
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "mode": state.lookup.mode().as_str(),
    }))
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let record = find_record(&state, &params).await?;
    Ok(Json(SearchResponse::new(&state.lookup, record)))
}

async fn handle_answer_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let record = find_record(&state, &params).await?;
    let image_url = state.lookup.convert_drive_url(&record.image_url);
    match inspect_payload(&image_url) {
        PayloadKind::Url => Ok(Redirect::temporary(&image_url).into_response()),
        PayloadKind::DataUri => {
            let image = decode_data_uri(&image_url).map_err(|err| {
                warn!(error = %err, "answer sheet payload could not be decoded");
                AppError::not_found("answer sheet unavailable")
            })?;
            let content_type =
                HeaderValue::from_str(&image.mime).map_err(AppError::internal)?;
            let disposition =
                HeaderValue::from_str(&content_disposition(&record.download_file_name()))
                    .map_err(AppError::internal)?;
            Ok((
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                image.bytes,
            )
                .into_response())
        }
        PayloadKind::Empty | PayloadKind::Malformed => {
            Err(AppError::not_found("answer sheet unavailable"))
        }
    }
}

async fn handle_clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.lookup.clear_cache();
    StatusCode::NO_CONTENT
}

async fn find_record(state: &AppState, params: &SearchParams) -> Result<StudentRecord, AppError> {
    let (id, date) = params.validated()?;
    state
        .lookup
        .search_student(id, date)
        .await?
        .ok_or_else(|| {
            AppError::not_found("no result matches this student id and birth date")
        })
}

/// ASCII fallback plus an RFC 5987 `filename*` so non-Latin names survive.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn not_found<E: ToString>(msg: E) -> Self {
        Self::NotFound(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Search(err) => {
                let cause = std::error::Error::source(&err)
                    .map(|source| source.to_string())
                    .unwrap_or_default();
                error!("search_error" = %err, cause = %cause);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "search failed, please try again" })),
                )
                    .into_response()
            }
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
