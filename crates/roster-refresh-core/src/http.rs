// Shared HTTP plumbing for the rating API clients.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

impl LookupError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout {
                url: url.to_string(),
            }
        } else {
            LookupError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Outcome of a GET whose status was not necessarily a success.
pub(crate) enum JsonResponse<T> {
    Ok(T),
    NotOk(reqwest::StatusCode),
}

/// GET `url` and decode the body as JSON, returning non-success statuses to
/// the caller instead of treating them as errors.
pub(crate) async fn get_json_lenient<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
) -> Result<JsonResponse<T>, LookupError> {
    debug!(url, "GET");
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| LookupError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Ok(JsonResponse::NotOk(status));
    }

    let body = response
        .text()
        .await
        .map_err(|e| LookupError::from_reqwest(url, e))?;
    serde_json::from_str(&body)
        .map(JsonResponse::Ok)
        .map_err(|e| LookupError::Decode {
            url: url.to_string(),
            source: e,
        })
}

/// GET `url` and decode the body as JSON. Any non-success status is an error.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
) -> Result<T, LookupError> {
    match get_json_lenient(http, url).await? {
        JsonResponse::Ok(value) => Ok(value),
        JsonResponse::NotOk(status) => Err(LookupError::Status {
            url: url.to_string(),
            status,
        }),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Deserialize a field the upstream APIs send as a string, a number, or null
/// into optional text. Null and empty strings both become `None`.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Lenient {
        #[serde(default, deserialize_with = "lenient_text")]
        field: Option<String>,
    }

    fn lenient_field(json: &str) -> Option<String> {
        serde_json::from_str::<Lenient>(json).unwrap().field
    }

    #[test]
    fn lenient_text_accepts_strings() {
        assert_eq!(lenient_field(r#"{"field": "Smith, John"}"#).as_deref(), Some("Smith, John"));
    }

    #[test]
    fn lenient_text_stringifies_numbers() {
        assert_eq!(lenient_field(r#"{"field": 1850}"#).as_deref(), Some("1850"));
    }

    #[test]
    fn lenient_text_null_and_missing_are_none() {
        assert_eq!(lenient_field(r#"{"field": null}"#), None);
        assert_eq!(lenient_field(r#"{}"#), None);
        assert_eq!(lenient_field(r#"{"field": ""}"#), None);
    }

    #[test]
    fn status_error_message_names_url() {
        let err = LookupError::Status {
            url: "http://example.test/x".into(),
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert_eq!(
            err.to_string(),
            "http://example.test/x returned status 404 Not Found"
        );
    }
}
