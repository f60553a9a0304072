//! Account credential validation.
//!
//! Pure checks only; no network calls happen here. The token engine calls
//! [`validate_credentials`] before every authentication attempt so that bad
//! configuration fails fast instead of burning retry budget against the
//! login endpoint.

use serde::Deserialize;

/// Username/password pair for one Easee cloud account.
///
/// Immutable once constructed; the configuration layer builds exactly one of
/// these per configured account.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
    /// The offending field, when a single one can be named.
    pub field: Option<&'static str>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: "credentials valid".to_string(),
            field: None,
        }
    }

    fn fail(message: &str, field: Option<&'static str>) -> Self {
        Self {
            valid: false,
            message: message.to_string(),
            field,
        }
    }
}

const MIN_PASSWORD_LENGTH: usize = 6;

/// Shape check only: exactly the level of strictness the cloud login form
/// applies. One `@` with something before it, and a dot somewhere in the
/// domain part.
fn looks_like_email(username: &str) -> bool {
    let mut parts = username.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    match parts.next() {
        Some(domain) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Full validation of stored credentials, checked in order with the first
/// failure winning: presence, username non-empty, email shape, password
/// non-empty, password length.
pub fn validate_credentials(credentials: Option<&Credentials>) -> Validation {
    let Some(credentials) = credentials else {
        return Validation::fail("no credentials configured", None);
    };

    let username = credentials.username.trim();
    if username.is_empty() {
        return Validation::fail("username is empty", Some("username"));
    }
    if !looks_like_email(username) {
        return Validation::fail("username is not an e-mail address", Some("username"));
    }

    let password = credentials.password.trim();
    if password.is_empty() {
        return Validation::fail("password is empty", Some("password"));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Validation::fail(
            "password is shorter than 6 characters",
            Some("password"),
        );
    }

    Validation::ok()
}

/// Looser variant for direct login calls that bypass the stored-credential
/// path: presence only, no shape or length checks.
pub fn validate_login_credentials(credentials: Option<&Credentials>) -> Validation {
    let Some(credentials) = credentials else {
        return Validation::fail("no credentials supplied", None);
    };
    if credentials.username.trim().is_empty() {
        return Validation::fail("username is empty", Some("username"));
    }
    if credentials.password.trim().is_empty() {
        return Validation::fail("password is empty", Some("password"));
    }
    Validation::ok()
}
