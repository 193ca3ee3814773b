//! Error mapping for the remote APIs
//!
//! Converts the error bodies returned by Cachet and PagerDuty into the
//! normalized `ServiceError` type.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map a Cachet API error to a ServiceError
///
/// Cachet reports failures as `{"errors": [{"title": .., "detail": ..}]}`.
pub fn map_cachet_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "cachet".to_string();

    let first = json
        .get("errors")
        .and_then(|errors| errors.as_array())
        .and_then(|errors| errors.first());

    if let Some(code) = first.and_then(|e| e.get("id")).and_then(|id| id.as_str()) {
        context.error_code = Some(code.to_string());
    }

    let message = first
        .and_then(|e| e.get("detail").or_else(|| e.get("title")))
        .and_then(|m| m.as_str())
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .unwrap_or("Unknown Cachet error");

    by_status(status, message)
}

/// Map a PagerDuty API error to a ServiceError
///
/// PagerDuty reports failures as `{"error": {"message": .., "code": .., "errors": [..]}}`.
pub fn map_pagerduty_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "pagerduty".to_string();

    let Some(error) = json.get("error") else {
        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown PagerDuty error");
        return by_status(status, message);
    };

    if let Some(code) = error.get("code").and_then(|c| c.as_i64()) {
        context.error_code = Some(code.to_string());
    }

    if let Some(details) = error.get("errors").and_then(|e| e.as_array()) {
        let details: Vec<&str> = details.iter().filter_map(|d| d.as_str()).collect();
        if !details.is_empty() {
            context.add("details", details.join("; "));
        }
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown PagerDuty error");

    by_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match context.service.as_str() {
            "cachet" => return map_cachet_error(status, &json, context),
            "pagerduty" => return map_pagerduty_error(status, &json, context),
            _ => {
                let message = json
                    .get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|m| m.as_str())
                    .unwrap_or(body);
                return by_status(status, message);
            }
        }
    }

    // Fallback to status-based mapping
    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 100 {
        format!("{}: {:.100}...", status, body)
    } else {
        format!("{}: {}", status, body)
    };

    by_status(status, &message)
}

fn by_status(status: StatusCode, message: &str) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::validation(message)
        }
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}
