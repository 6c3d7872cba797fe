//! Request authentication.
//!
//! Every application route runs behind two stages, outermost first:
//!
//! 1. [`resolve_token`] settles the single authoritative token for the
//!    request (request supplied, cached in the session, or freshly minted),
//!    persists the session and rewrites the request's `jwt` cookie to it.
//!    Only the session cookie is sent back to the client.
//! 2. [`authenticate`] verifies that cookie and records the identity.
//!
//! Routes addressing a single upload add [`authorize_ownership`]. Handlers
//! only ever read the resulting [`AuthContext`].

mod authenticate;
mod authorize;
mod context;
mod cookies;
mod resolve;
mod source;

pub use authenticate::authenticate;
pub use authorize::{authorize_ownership, AuthorizeError};
pub use context::{AuthContext, Identity, Unauthorized};
pub use cookies::CookiePolicy;
pub use resolve::{resolve_token, ResolveError, ResolvedToken, TokenOrigin, TokenResolver};
pub use source::{set_request_cookie, TokenSource, REQUEST_TOKEN_SOURCES};

/// Cookie referencing the server-side session
pub const SESSION_COOKIE_NAME: &str = "webfilesJWTSession";
/// Transport cookie carrying the authoritative token
pub const TOKEN_COOKIE_NAME: &str = "jwt";
/// Query parameter a token may be supplied in
pub const TOKEN_QUERY_PARAM: &str = "jwt";
/// Session value caching the session's token
pub const SESSION_TOKEN_KEY: &str = "JWTToken";
