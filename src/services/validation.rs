//! Shape checks for owner emails and organization names.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").expect("email pattern compiles")
});

static ORG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("org name pattern compiles"));

/// Lowercase `local@domain.tld` with a 2–4 letter top-level domain.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Non-empty, ASCII letters, digits and underscores only.
pub fn is_valid_org_name(name: &str) -> bool {
    ORG_NAME_RE.is_match(name)
}
