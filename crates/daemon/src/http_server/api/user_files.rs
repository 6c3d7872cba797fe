use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::content::Uid;

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::auth::Identity;
use crate::ServiceState;

pub type UserFilesResponse = Vec<Uid>;

/// Every uid the caller owns, oldest first.
pub async fn handler(
    State(state): State<ServiceState>,
    Identity(identity): Identity,
) -> Result<impl IntoResponse, UserFilesError> {
    let uids = state.database().list_by_identity(&identity).await?;
    tracing::debug!(%identity, count = uids.len(), "listed owned files");
    Ok(Json(uids))
}

#[derive(Debug, thiserror::Error)]
pub enum UserFilesError {
    #[error("ownership lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for UserFilesError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected error".to_string(),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilesRequest;

impl ApiRequest for UserFilesRequest {
    type Response = UserFilesResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, "/user-files"))
    }
}
