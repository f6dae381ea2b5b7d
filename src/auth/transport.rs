//! Moving tokens between the service and its clients.
//!
//! A refreshed token is sent back both as a `New-Token` header and as the
//! `auth_token` cookie. The cookie lives for 7 days regardless of the token
//! TTL: the token decides validity, the cookie only carries it.

use std::time::Duration;

use super::IssuedToken;

pub const NEW_TOKEN_HEADER: &str = "New-Token";
pub const SET_COOKIE_HEADER: &str = "Set-Cookie";
pub const AUTH_COOKIE: &str = "auth_token";
pub const COOKIE_PATH: &str = "/";
pub const COOKIE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Secure; SameSite=Lax";

/// `Set-Cookie` value carrying `token`.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{AUTH_COOKIE}={token}; Path={COOKIE_PATH}; Max-Age={}; {COOKIE_ATTRIBUTES}",
        COOKIE_MAX_AGE.as_secs()
    )
}

/// `Set-Cookie` value that makes the client drop the session cookie.
pub fn logout_cookie() -> String {
    format!(
        "{AUTH_COOKIE}=; Path={COOKIE_PATH}; Max-Age=0; \
         Expires=Thu, 01 Jan 1970 00:00:00 GMT; {COOKIE_ATTRIBUTES}"
    )
}

/// Response headers delivering a freshly issued token.
pub fn delivery_headers(issued: &IssuedToken) -> [(&'static str, String); 2] {
    [
        (NEW_TOKEN_HEADER, issued.token.clone()),
        (SET_COOKIE_HEADER, session_cookie(&issued.token)),
    ]
}

/// Token from an `Authorization` header value: `Bearer <token>` or the bare
/// token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if header.eq_ignore_ascii_case("bearer") => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Token from a `Cookie` header value.
pub fn cookie_token(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
