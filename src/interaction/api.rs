//! JSON API: multipart uploads in, analysis envelopes out.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{instrument, warn};

use crate::{
    base::types::{AnalysisResponse, SummaryResponse},
    service::inference::InferenceError,
};

use super::analysis::Analyzer;

/// Name of the multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Errors surfaced by the upload endpoints.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Uploaded file is not valid UTF-8 text.")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("Missing `file` field in multipart upload.")]
    MissingFile,

    #[error("Invalid multipart upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Expected a multipart upload: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::Decode(_) | AnalyzeError::MissingFile => StatusCode::BAD_REQUEST,
            AnalyzeError::Multipart(err) => err.status(),
            AnalyzeError::NotMultipart(err) => err.status(),
            AnalyzeError::Inference(InferenceError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AnalyzeError::Inference(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed with {status}: {self}");

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the JSON API router.
pub fn router(analyzer: Analyzer, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze_log))
        .route("/analyze/", post(analyze_log))
        .route("/summarize", post(summarize_log))
        .route("/summarize/", post(summarize_log))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(analyzer)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "AI Log Analyzer is running 🚀" }))
}

#[instrument(skip_all)]
async fn analyze_log(State(analyzer): State<Analyzer>, multipart: Result<Multipart, MultipartRejection>) -> Result<Json<AnalysisResponse>, AnalyzeError> {
    let text = read_upload(multipart?).await?;

    Ok(Json(analyzer.analyze(&text).await?))
}

#[instrument(skip_all)]
async fn summarize_log(State(analyzer): State<Analyzer>, multipart: Result<Multipart, MultipartRejection>) -> Result<Json<SummaryResponse>, AnalyzeError> {
    let text = read_upload(multipart?).await?;

    Ok(Json(analyzer.summarize(&text).await?))
}

/// Pull the `file` field out of a multipart body and decode it as UTF-8.
async fn read_upload(mut multipart: Multipart) -> Result<String, AnalyzeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field.bytes().await?;
            return Ok(String::from_utf8(bytes.to_vec())?);
        }
    }

    Err(AnalyzeError::MissingFile)
}
