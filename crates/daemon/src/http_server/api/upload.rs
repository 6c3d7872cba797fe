use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Json, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::content::{ContentError, Uid};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::auth::AuthContext;
use crate::ServiceState;

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "fileupload";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file: UploadedFile,
    /// The token the upload was recorded under
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub uid: Uid,
    pub file_name: String,
    pub file_size: u64,
}

pub async fn handler(
    State(state): State<ServiceState>,
    ctx: AuthContext,
    headers: HeaderMap,
    request: Request,
) -> Result<impl IntoResponse, UploadError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !is_form_data(content_type) {
        return Err(UploadError::UnsupportedMediaType(content_type.to_string()));
    }

    let (Some(identity), Some(token)) = (ctx.identity(), ctx.raw_token()) else {
        return Err(UploadError::Unauthenticated);
    };

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| UploadError::InvalidRequest(e.body_text()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            tracing::debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            return Err(UploadError::MissingFile);
        };

        let record = state.content().write(&file_name, field).await?;
        state
            .database()
            .record_ownership(identity, record.uid)
            .await?;
        tracing::info!(
            %identity,
            uid = %record.uid,
            file_name = %record.original_name,
            size = record.size_bytes,
            "stored upload"
        );

        return Ok(Json(UploadResponse {
            file: UploadedFile {
                uid: record.uid,
                file_name: record.original_name,
                file_size: record.size_bytes,
            },
            token: token.to_string(),
        }));
    }

    Err(UploadError::MissingFile)
}

fn is_form_data(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|mime| mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA)
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported content type {0:?}, expected multipart/form-data")]
    UnsupportedMediaType(String),
    #[error("no {UPLOAD_FIELD} file in request")]
    MissingFile,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("request is not authenticated")]
    Unauthenticated,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("failed to record ownership: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, self.to_string()).into_response()
            }
            UploadError::MissingFile | UploadError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, format!("Bad request: {}", self)).into_response()
            }
            UploadError::Multipart(e) => (e.status(), e.body_text()).into_response(),
            UploadError::Content(ContentError::Stream(e)) => {
                match e.downcast_ref::<MultipartError>() {
                    Some(multipart) => (multipart.status(), multipart.body_text()).into_response(),
                    None => (StatusCode::BAD_REQUEST, format!("Bad request: {}", e)).into_response(),
                }
            }
            UploadError::Content(e) if e.is_client_error() => {
                tracing::warn!("rejected upload: {}", e);
                (StatusCode::BAD_REQUEST, format!("Bad request: {}", e)).into_response()
            }
            UploadError::Unauthenticated | UploadError::Content(_) | UploadError::Database(_) => {
                tracing::error!("upload failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

/// Client side upload of a single file, streamed from `body`.
pub struct UploadRequest {
    pub file_name: String,
    pub length: u64,
    pub body: reqwest::Body,
}

impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let part = Part::stream_with_length(self.body, self.length).file_name(self.file_name);
        let form = Form::new().part(UPLOAD_FIELD, part);
        client.post(endpoint(base_url, "/upload")).multipart(form)
    }
}
