use std::fmt;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use common::session::{Session, SessionError};
use common::token::{Claims, TokenCodec, TokenError};

use super::context::AuthContext;
use super::source::{set_request_cookie, TokenSource, REQUEST_TOKEN_SOURCES};
use super::{SESSION_COOKIE_NAME, SESSION_TOKEN_KEY, TOKEN_COOKIE_NAME};
use crate::ServiceState;

/// How the authoritative token of a request was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// Supplied with the request itself
    Request(TokenSource),
    /// Cached in the client's session
    Session,
    /// Nothing valid was offered, a new identity was issued
    Minted,
}

impl fmt::Display for TokenOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenOrigin::Request(source) => write!(f, "request {}", source),
            TokenOrigin::Session => f.write_str("session"),
            TokenOrigin::Minted => f.write_str("minted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: String,
    pub claims: Claims,
    pub origin: TokenOrigin,
}

/// Settles the one token a request runs under.
///
/// A valid request token wins over the session's cached token, which wins
/// over minting. Candidates are verified in order and the first valid one
/// is taken; invalid ones are skipped, never fatal.
pub struct TokenResolver<'a> {
    codec: &'a TokenCodec,
}

impl<'a> TokenResolver<'a> {
    pub fn new(codec: &'a TokenCodec) -> Self {
        Self { codec }
    }

    /// Resolve against `candidates` (source, raw token) and the session.
    ///
    /// The session ends up caching a valid token: a request token is cached
    /// only if the session had none, a minted token always is.
    pub fn resolve<I>(&self, candidates: I, session: &mut Session) -> Result<ResolvedToken, TokenError>
    where
        I: IntoIterator<Item = (TokenSource, String)>,
    {
        let cached = session.get(SESSION_TOKEN_KEY).and_then(|token| {
            self.codec
                .verify(token)
                .ok()
                .map(|claims| (token.to_string(), claims))
        });

        let offered = candidates.into_iter().find_map(|(source, token)| {
            match self.codec.verify(&token) {
                Ok(claims) => Some((source, token, claims)),
                Err(e) => {
                    tracing::debug!(%source, "ignoring request token: {}", e);
                    None
                }
            }
        });

        if let Some((source, token, claims)) = offered {
            if cached.is_none() {
                session.insert(SESSION_TOKEN_KEY, token.clone());
            }
            return Ok(ResolvedToken {
                token,
                claims,
                origin: TokenOrigin::Request(source),
            });
        }

        if let Some((token, claims)) = cached {
            return Ok(ResolvedToken {
                token,
                claims,
                origin: TokenOrigin::Session,
            });
        }

        // the session id doubles as the new anonymous identity
        let (token, claims) = self.codec.issue(session.id())?;
        session.insert(SESSION_TOKEN_KEY, token.clone());
        Ok(ResolvedToken {
            token,
            claims,
            origin: TokenOrigin::Minted,
        })
    }
}

/// Outermost auth stage.
///
/// Loads the session, resolves the authoritative token, saves the session
/// and rewrites the request's `jwt` cookie so later stages read only that
/// token. The rewrite never leaves the server: the response only refreshes
/// the session cookie, so a one-off query or header token cannot displace
/// the identity cached in the browser's session.
pub async fn resolve_token(
    State(state): State<ServiceState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ResolveError> {
    let session_cookie = jar.get(SESSION_COOKIE_NAME).map(|cookie| cookie.value());
    let mut session = state.sessions().get(SESSION_COOKIE_NAME, session_cookie).await?;

    let candidates = REQUEST_TOKEN_SOURCES.iter().filter_map(|source| {
        source
            .extract(req.uri(), req.headers())
            .map(|token| (*source, token))
    });
    let resolved = TokenResolver::new(state.tokens()).resolve(candidates, &mut session)?;

    let session_value = state.sessions().save(&mut session).await?;
    tracing::debug!(
        origin = %resolved.origin,
        session = session.id(),
        identity = resolved.claims.subject(),
        "resolved request token"
    );

    set_request_cookie(req.headers_mut(), TOKEN_COOKIE_NAME, &resolved.token);
    let response_jar = CookieJar::new().add(state.cookies().session_cookie(session_value));

    req.extensions_mut()
        .insert(AuthContext::resolved(resolved.token, session));

    let response = next.run(req).await;
    Ok((response_jar, response).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("session store error: {0}")]
    Session(#[from] SessionError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        tracing::error!("token resolution failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "session unavailable".to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const SECRET: &[u8] = b"resolver-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    fn session() -> Session {
        Session::new(SESSION_COOKIE_NAME, "session-id")
    }

    fn expired_token(codec: &TokenCodec) -> String {
        codec
            .sign(&Claims {
                sub: "old".into(),
                iat: 0,
                exp: 1,
            })
            .unwrap()
    }

    #[test]
    fn test_mints_session_identity_when_nothing_offered() {
        let codec = codec();
        let mut session = session();

        let resolved = TokenResolver::new(&codec)
            .resolve(std::iter::empty(), &mut session)
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Minted);
        assert_eq!(resolved.claims.subject(), "session-id");
        assert_eq!(session.get(SESSION_TOKEN_KEY), Some(resolved.token.as_str()));
    }

    #[test]
    fn test_cached_session_token_is_reused() {
        let codec = codec();
        let (token, _) = codec.issue("alice").unwrap();
        let mut session = session();
        session.insert(SESSION_TOKEN_KEY, token.clone());

        let resolved = TokenResolver::new(&codec)
            .resolve(std::iter::empty(), &mut session)
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Session);
        assert_eq!(resolved.token, token);
        assert_eq!(resolved.claims.subject(), "alice");
    }

    #[test]
    fn test_request_token_wins_without_replacing_cache() {
        let codec = codec();
        let (cached, _) = codec.issue("alice").unwrap();
        let (offered, _) = codec.issue("bob").unwrap();
        let mut session = session();
        session.insert(SESSION_TOKEN_KEY, cached.clone());

        let resolved = TokenResolver::new(&codec)
            .resolve([(TokenSource::Header, offered.clone())], &mut session)
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Request(TokenSource::Header));
        assert_eq!(resolved.claims.subject(), "bob");
        assert_eq!(session.get(SESSION_TOKEN_KEY), Some(cached.as_str()));
    }

    #[test]
    fn test_request_token_cached_into_empty_session() {
        let codec = codec();
        let (offered, _) = codec.issue("bob").unwrap();
        let mut session = session();

        let resolved = TokenResolver::new(&codec)
            .resolve([(TokenSource::Query, offered.clone())], &mut session)
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Request(TokenSource::Query));
        assert_eq!(session.get(SESSION_TOKEN_KEY), Some(offered.as_str()));
    }

    #[test]
    fn test_first_valid_candidate_in_order() {
        let codec = codec();
        let forged = TokenCodec::new(b"other").issue("mallory").unwrap().0;
        let (header, _) = codec.issue("from-header").unwrap();
        let (cookie, _) = codec.issue("from-cookie").unwrap();
        let mut session = session();

        let resolved = TokenResolver::new(&codec)
            .resolve(
                [
                    (TokenSource::Query, forged),
                    (TokenSource::Header, header),
                    (TokenSource::Cookie, cookie),
                ],
                &mut session,
            )
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Request(TokenSource::Header));
        assert_eq!(resolved.claims.subject(), "from-header");
    }

    #[test]
    fn test_invalid_tokens_fall_through_to_mint() {
        let codec = codec();
        let mut session = session();
        session.insert(SESSION_TOKEN_KEY, expired_token(&codec));

        let resolved = TokenResolver::new(&codec)
            .resolve(
                [
                    (TokenSource::Query, "garbage".to_string()),
                    (TokenSource::Cookie, expired_token(&codec)),
                ],
                &mut session,
            )
            .unwrap();

        assert_eq!(resolved.origin, TokenOrigin::Minted);
        assert_eq!(resolved.claims.subject(), "session-id");
        assert_eq!(session.get(SESSION_TOKEN_KEY), Some(resolved.token.as_str()));
    }

    #[test]
    fn test_minted_token_uses_codec_lifetime() {
        let codec = TokenCodec::with_lifetime(SECRET, Duration::from_secs(60));
        let mut session = session();

        let resolved = TokenResolver::new(&codec)
            .resolve(std::iter::empty(), &mut session)
            .unwrap();

        assert_eq!(resolved.claims.exp - resolved.claims.iat, 60);
    }
}
