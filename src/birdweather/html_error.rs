//! HTML gateway-error detection.
//!
//! Proxies and gateways fronting the `BirdWeather` API sometimes return an
//! HTML error page instead of JSON. When that happens we extract a short,
//! human-readable message instead of surfacing raw markup.

use crate::constants::birdweather::{HTML_ERROR_KEYWORDS, HTML_SNIPPET_WINDOW};
use scraper::{Html, Selector};

/// Category an HTTP status is classified as for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 408 / 504 / 524.
    Timeout,
    /// Everything else.
    Network,
}

/// Classify an HTTP status code per the spec: 408/504/524 are `timeout`,
/// everything else `network`.
#[must_use]
pub fn classify_status(status: u16) -> StatusCategory {
    match status {
        408 | 504 | 524 => StatusCategory::Timeout,
        _ => StatusCategory::Network,
    }
}

/// `true` if the response's `Content-Type` header indicates HTML.
#[must_use]
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
}

/// Extracts a short error message from an HTML body: the `<title>` if
/// present, otherwise a fixed-width snippet around the first matched
/// error keyword, otherwise a generic fallback.
#[must_use]
pub fn extract_html_error_message(body: &str) -> String {
    let document = Html::parse_document(body);
    #[allow(clippy::expect_used)]
    let title_selector = Selector::parse("title").expect("static selector is valid");
    if let Some(title) = document.select(&title_selector).next() {
        let text: String = title.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return text;
        }
    }

    let lower = body.to_lowercase();
    for keyword in HTML_ERROR_KEYWORDS {
        if let Some(pos) = lower.find(keyword) {
            let start = pos.saturating_sub(HTML_SNIPPET_WINDOW / 2);
            let end = (pos + keyword.len() + HTML_SNIPPET_WINDOW / 2).min(body.len());
            let snippet = &body[start..end];
            return snippet.trim().to_string();
        }
    }

    "unrecognised HTML error response".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_from_gateway_error_page() {
        let body = "<html><head><title>502 Bad Gateway</title></head></html>";
        let message = extract_html_error_message(body);
        assert_eq!(message, "502 Bad Gateway");
    }

    #[test]
    fn falls_back_to_keyword_snippet_without_title() {
        let body = "<html><body><p>an unauthorized request was made</p></body></html>";
        let message = extract_html_error_message(body);
        assert!(message.to_lowercase().contains("unauthorized"));
    }

    #[test]
    fn classifies_timeout_statuses() {
        assert_eq!(classify_status(408), StatusCategory::Timeout);
        assert_eq!(classify_status(504), StatusCategory::Timeout);
        assert_eq!(classify_status(524), StatusCategory::Timeout);
        assert_eq!(classify_status(502), StatusCategory::Network);
        assert_eq!(classify_status(500), StatusCategory::Network);
    }

    #[test]
    fn detects_html_content_type_with_charset_suffix() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(!is_html_content_type("application/json"));
    }
}
