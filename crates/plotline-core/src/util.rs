//! Small text and HTTP helpers shared by the client and configuration code.

use reqwest::StatusCode;
use serde::Deserialize;

const MAX_ERROR_BODY_CHARS: usize = 180;

/// Trimmed text, or `None` when nothing but whitespace remains.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// One-line description of a failed API response.
///
/// Prefers the `{"error": ...}` body the Plotline API sends; anything else is
/// truncated so HTML error pages stay readable in a terminal.
pub fn parse_api_error(status: StatusCode, body: &str) -> String {
    let code = status.as_u16();
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|payload| payload.error.or(payload.message))
        .map(|message| message.trim().to_string())
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

    if message.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("{message} ({code})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_trims_or_drops() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \n ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" Saga ".to_string())),
            Some("Saga".to_string())
        );
    }

    #[test]
    fn only_http_schemes_count_as_urls() {
        assert!(is_http_url("http://127.0.0.1:8080"));
        assert!(!is_http_url("ftp://plotline.example.com"));
    }

    #[test]
    fn long_plain_bodies_are_truncated() {
        let message = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, &"x".repeat(500));
        assert_eq!(message.len(), MAX_ERROR_BODY_CHARS + " (500)".len());
    }

    #[test]
    fn parse_api_error_prefers_json_error_field() {
        let message = parse_api_error(StatusCode::CONFLICT, r#"{"error":"Email already taken"}"#);
        assert_eq!(message, "Email already taken (409)");
    }

    #[test]
    fn parse_api_error_falls_back_to_status() {
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502)"
        );
    }
}
