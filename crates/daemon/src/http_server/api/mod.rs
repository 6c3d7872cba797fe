use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

pub mod client;
pub mod file;
pub mod token;
pub mod upload;
pub mod user_files;

use crate::http_server::auth::{authenticate, authorize_ownership, resolve_token};
use crate::ServiceState;

/// Application routes, all behind token resolution and authentication.
pub fn router(state: ServiceState) -> Router<ServiceState> {
    let file_route = get(file::handler).route_layer(middleware::from_fn_with_state(
        state.clone(),
        authorize_ownership,
    ));

    Router::new()
        .route("/token", get(token::handler))
        .route("/upload", post(upload::handler))
        .route("/file/:fileid", file_route)
        .route("/user-files", get(user_files::handler))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_token))
        .with_state(state)
}
