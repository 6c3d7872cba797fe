use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::context::AuthContext;
use super::source::TokenSource;
use crate::ServiceState;

/// Verify the request's `jwt` cookie and record the identity it carries.
///
/// Runs after token resolution, which has already rewritten the cookie to
/// the authoritative token. A missing or invalid token leaves the request
/// unauthenticated; rejecting it is up to the handler.
pub async fn authenticate(
    State(state): State<ServiceState>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut ctx = req
        .extensions_mut()
        .remove::<AuthContext>()
        .unwrap_or_default();

    match TokenSource::Cookie.extract(req.uri(), req.headers()) {
        Some(token) => match state.tokens().verify(&token) {
            Ok(claims) => ctx.authenticate(&claims),
            Err(e) => tracing::debug!("request token rejected: {}", e),
        },
        None => tracing::debug!("no token cookie on request"),
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}
