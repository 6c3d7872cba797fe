use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use common::session::Session;
use common::token::Claims;

/// What the auth stages established about a request.
///
/// Handlers never see a partially trusted identity: the identity is only
/// present once the token was verified, and `is_authorized` implies it.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    identity: Option<String>,
    authorized: bool,
    raw_token: Option<String>,
    session: Option<Session>,
}

impl AuthContext {
    /// Context after token resolution, before authentication.
    pub fn resolved(raw_token: String, session: Session) -> Self {
        Self {
            identity: None,
            authorized: false,
            raw_token: Some(raw_token),
            session: Some(session),
        }
    }

    pub fn authenticate(&mut self, claims: &Claims) {
        self.identity = Some(claims.subject().to_string());
    }

    pub fn set_authorized(&mut self, authorized: bool) {
        self.authorized = authorized;
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// The verified identity
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized && self.is_authenticated()
    }

    /// The authoritative token for this request
    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extracts the verified identity, rejecting unauthenticated requests.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(AuthContext::identity)
            .map(|identity| Identity(identity.to_string()))
            .ok_or(Unauthorized)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
    }
}
