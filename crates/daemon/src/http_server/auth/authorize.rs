use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use common::content::Uid;

use super::context::AuthContext;
use crate::ServiceState;

/// Mark the request authorized when its identity owns the addressed upload.
///
/// Unauthenticated requests and ids that do not parse stay unauthorized.
pub async fn authorize_ownership(
    State(state): State<ServiceState>,
    Path(fileid): Path<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthorizeError> {
    let mut ctx = req
        .extensions_mut()
        .remove::<AuthContext>()
        .unwrap_or_default();

    let identity = ctx.identity().map(str::to_owned);
    if let (Some(identity), Ok(uid)) = (identity, fileid.parse::<Uid>()) {
        let owned = state.database().is_owned_by(&identity, uid).await?;
        if !owned {
            tracing::debug!(%identity, %uid, "identity does not own file");
        }
        ctx.set_authorized(owned);
    }

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error("ownership lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AuthorizeError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected error".to_string(),
        )
            .into_response()
    }
}
