//! Input checks applied before anything touches the store.

use shorty_error::ValidationError;
use url::Url;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;
pub const URL_MAX: usize = 2048;

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    check_length("username", username, USERNAME_MIN, USERNAME_MAX)?;
    if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ValidationError::InvalidCharacters { field: "username" });
    }
    Ok(())
}

/// Length plus one lowercase letter, one uppercase letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_length("password", password, PASSWORD_MIN, PASSWORD_MAX)?;
    let required: [(&'static str, fn(&char) -> bool); 3] = [
        ("lowercase letter", char::is_ascii_lowercase),
        ("uppercase letter", char::is_ascii_uppercase),
        ("digit", char::is_ascii_digit),
    ];
    for (missing, class) in required {
        if !password.chars().any(|c| class(&c)) {
            return Err(ValidationError::WeakPassword { missing });
        }
    }
    Ok(())
}

pub fn ensure_password_changed(
    current: &str,
    new: &str,
) -> Result<(), ValidationError> {
    if current == new {
        return Err(ValidationError::PasswordUnchanged);
    }
    Ok(())
}

/// Accepts absolute `http`/`https` URLs with a host.
///
/// Whitespace is rejected up front: the parser would silently drop tabs and
/// newlines instead.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl { reason };

    if url.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    if url.len() > URL_MAX {
        return Err(invalid("too long".to_string()));
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("contains whitespace".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "scheme must be http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::InvalidLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}
