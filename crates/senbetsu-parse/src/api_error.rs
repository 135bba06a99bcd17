use regex::Regex;
use std::sync::LazyLock;

/// Matches `<error code="100" description="Incorrect user credentials"/>`.
static RE_API_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*(?:<\?xml[^>]*\?>\s*)?<error\s+code="(?P<code>\d+)"\s+description="(?P<description>[^"]*)""#)
        .unwrap()
});

/// An error document returned by a Newznab-style API in place of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: u32,
    pub description: String,
}

impl ApiError {
    /// Rate limiting, which means "nothing this time" rather than a fault.
    pub fn is_request_limit(&self) -> bool {
        self.description
            .to_ascii_lowercase()
            .contains("request limit reached")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}: {}", self.code, self.description)
    }
}

/// Detect an API error document. Returns `None` for anything else,
/// including a well-formed feed.
pub fn parse_api_error(body: &str) -> Option<ApiError> {
    let caps = RE_API_ERROR.captures(body)?;
    Some(ApiError {
        code: caps["code"].parse().ok()?,
        description: caps["description"].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_document() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<error code="100" description="Incorrect user credentials"/>"#;
        let err = parse_api_error(body).unwrap();
        assert_eq!(err.code, 100);
        assert_eq!(err.description, "Incorrect user credentials");
        assert!(!err.is_request_limit());
        assert_eq!(err.to_string(), "error 100: Incorrect user credentials");
    }

    #[test]
    fn test_request_limit() {
        let err = parse_api_error(r#"<error code="500" description="Request limit reached"/>"#).unwrap();
        assert!(err.is_request_limit());
    }

    #[test]
    fn test_feed_is_not_error() {
        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_api_error(body).is_none());
    }
}
