use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::auth::AuthContext;

/// Returns the request's authoritative token as plain text.
pub async fn handler(ctx: AuthContext) -> Result<impl IntoResponse, TokenError> {
    ctx.raw_token()
        .map(str::to_owned)
        .ok_or(TokenError::Unavailable)
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token not available")]
    Unavailable,
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenRequest;

impl ApiRequest for TokenRequest {
    type Response = String;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, "/token"))
    }
}
