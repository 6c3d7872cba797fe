use std::fmt;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use super::{TOKEN_COOKIE_NAME, TOKEN_QUERY_PARAM};

/// Where in a request a token can be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `?jwt=<token>`
    Query,
    /// `Authorization: Bearer <token>`
    Header,
    /// `Cookie: jwt=<token>`
    Cookie,
}

/// Request sources in precedence order.
pub const REQUEST_TOKEN_SOURCES: [TokenSource; 3] =
    [TokenSource::Query, TokenSource::Header, TokenSource::Cookie];

impl TokenSource {
    /// The raw token this source carries, if any. Empty values count as absent.
    pub fn extract(self, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let token = match self {
            TokenSource::Query => uri.query().and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == TOKEN_QUERY_PARAM)
                    .map(|(_, value)| value.into_owned())
            }),
            TokenSource::Header => headers
                .typed_get::<Authorization<Bearer>>()
                .map(|auth| auth.token().to_string()),
            TokenSource::Cookie => CookieJar::from_headers(headers)
                .get(TOKEN_COOKIE_NAME)
                .map(|cookie| cookie.value().to_string()),
        };
        token.filter(|token| !token.is_empty())
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenSource::Query => "query",
            TokenSource::Header => "header",
            TokenSource::Cookie => "cookie",
        };
        f.write_str(name)
    }
}

/// Replace the request cookie `name` with `value`, keeping every other cookie.
///
/// All `Cookie` headers are folded into one. Pairs that do not parse are
/// dropped.
pub fn set_request_cookie(headers: &mut HeaderMap, name: &str, value: &str) {
    let mut cookies: Vec<Cookie<'static>> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .filter(|cookie| cookie.name() != name)
        .map(Cookie::into_owned)
        .collect();
    cookies.push(Cookie::new(name.to_owned(), value.to_owned()));

    let header = cookies
        .iter()
        .map(|cookie| cookie.stripped().to_string())
        .collect::<Vec<_>>()
        .join("; ");
    match HeaderValue::from_str(&header) {
        Ok(header) => {
            headers.insert(COOKIE, header);
        }
        Err(e) => tracing::warn!(cookie = name, "could not rewrite request cookie: {}", e),
    }
}
