use std::path::Path;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use tokio_util::io::ReaderStream;

use common::content::{ContentError, Uid};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::auth::AuthContext;
use crate::ServiceState;

/// Stream an upload back to an identity that owns it.
pub async fn handler(
    State(state): State<ServiceState>,
    ctx: AuthContext,
    UrlPath(fileid): UrlPath<String>,
) -> Result<Response, FileError> {
    if !ctx.is_authenticated() {
        return Err(FileError::Unauthenticated);
    }
    if !ctx.is_authorized() {
        return Err(FileError::Unauthorized(fileid));
    }

    let uid: Uid = fileid.parse()?;
    let path = state.content().resolve(uid).await?;
    send_file(&path).await
}

async fn send_file(path: &Path) -> Result<Response, FileError> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let file_name = path
        .file_name()
        .map(|name| disposition_name(&name.to_string_lossy()))
        .unwrap_or_default();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
        .header(CONTENT_LENGTH, length)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| FileError::Response(e.to_string()))?;
    Ok(response)
}

/// Quote-safe, header-safe rendering of a stored file name.
fn disposition_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("unauthorized")]
    Unauthenticated,
    #[error("unauthorized for file {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build response: {0}")]
    Response(String),
}

impl IntoResponse for FileError {
    fn into_response(self) -> Response {
        match self {
            FileError::Unauthenticated | FileError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            FileError::Content(ContentError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not found".to_string()).into_response()
            }
            FileError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, "not found".to_string()).into_response()
            }
            FileError::Content(ref e) if e.is_client_error() => {
                tracing::warn!("rejected download: {}", e);
                (StatusCode::BAD_REQUEST, format!("Bad request: {}", e)).into_response()
            }
            FileError::Content(_) | FileError::Io(_) | FileError::Response(_) => {
                tracing::error!("download failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub uid: Uid,
}

impl ApiRequest for DownloadRequest {
    type Response = bytes::Bytes;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, &format!("/file/{}", self.uid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_name() {
        assert_eq!(disposition_name("a.txt"), "a.txt");
        assert_eq!(disposition_name("say \"hi\".txt"), "say _hi_.txt");
        assert_eq!(disposition_name("tab\there"), "tab_here");
        assert_eq!(disposition_name("café.txt"), "caf_.txt");
    }

    #[test]
    fn test_error_statuses() {
        let uid = Uid::from(1);
        let cases = [
            (FileError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (FileError::Unauthorized(uid.to_string()), StatusCode::UNAUTHORIZED),
            (FileError::Content(ContentError::NotFound(uid)), StatusCode::NOT_FOUND),
            (
                FileError::Content(ContentError::PathEscape("../etc".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                FileError::Content(ContentError::InvalidUid("xyz".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                FileError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)),
                StatusCode::NOT_FOUND,
            ),
            (
                FileError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
