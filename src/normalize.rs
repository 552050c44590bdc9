/// URL normalization for user-entered bookmark addresses
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationError;

static HTTP_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://").expect("scheme pattern is valid")
});

/// Turn free-form input into a canonical absolute URL
///
/// Algorithm:
/// 1. Trim surrounding whitespace; reject if nothing is left
/// 2. If the input does not start with http:// or https:// (any case),
///    prepend https://
/// 3. Parse as an absolute URL and return its serialized form
///
/// Examples:
/// - example.com → https://example.com/
/// - HTTP://Example.com/a → http://example.com/a
/// - "   " → Err(Empty)
/// - http:// → Err(InvalidUrl)
pub fn normalize_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let candidate = if HTTP_SCHEME.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&candidate)
        .map(|url| url.to_string())
        .map_err(|_| ValidationError::InvalidUrl)
}
