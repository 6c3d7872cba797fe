use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};

use super::SESSION_COOKIE_NAME;

const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Attributes of the session cookie the server sets.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Only send cookies over HTTPS
    pub secure: bool,
    pub session_max_age: Duration,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            session_max_age: DEFAULT_SESSION_MAX_AGE,
        }
    }
}

impl CookiePolicy {
    pub fn session_cookie(&self, value: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.session_max_age.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let policy = CookiePolicy::default();
        let cookie = policy.session_cookie("id.tag".to_string());

        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "id.tag");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(DEFAULT_SESSION_MAX_AGE.as_secs() as i64))
        );
    }

    #[test]
    fn test_secure_policy_marks_cookie() {
        let policy = CookiePolicy {
            secure: true,
            session_max_age: Duration::from_secs(600),
        };
        let cookie = policy.session_cookie("id.tag".to_string());

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));
    }
}
