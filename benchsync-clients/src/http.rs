//! Blocking HTTP plumbing shared by both clients.

use std::time::Duration;

use serde_json::Value;

use benchsync_core::error::{RemoteError, Service};

/// Agent with a whole-request timeout.
pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Send `request` (with an optional JSON body) and decode the response.
///
/// Empty bodies (`204 No Content`) decode to [`Value::Null`].
pub(crate) fn send(
    service: Service,
    request: ureq::Request,
    body: Option<&Value>,
) -> Result<Value, RemoteError> {
    let method = request.method().to_string();
    let url = request.url().to_string();
    tracing::debug!("{service} {method} {url}");

    let result = match body {
        Some(json) => request.send_json(json),
        None => request.call(),
    };
    let response = result.map_err(|e| map_error(service, e))?;
    decode(service, response)
}

/// Send a raw string body and return the raw response text.
pub(crate) fn send_text(
    service: Service,
    request: ureq::Request,
    body: &str,
) -> Result<String, RemoteError> {
    let response = request
        .send_string(body)
        .map_err(|e| map_error(service, e))?;
    response.into_string().map_err(|e| RemoteError::Decode {
        service,
        message: e.to_string(),
    })
}

fn decode(service: Service, response: ureq::Response) -> Result<Value, RemoteError> {
    let text = response.into_string().map_err(|e| RemoteError::Decode {
        service,
        message: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode {
        service,
        message: e.to_string(),
    })
}

fn map_error(service: Service, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            RemoteError::Status {
                service,
                status,
                message: server_message(&body),
            }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport {
            service,
            message: transport.to_string(),
        },
    }
}

/// Pull the human-readable part out of an error body.
///
/// Salesforce answers `[{"message": "...", "errorCode": "..."}]`; SEED answers
/// `{"status": "error", "message": "..."}`. Anything else is returned as is.
pub(crate) fn server_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let entries: Vec<&Value> = match &json {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let messages: Vec<String> = entries
        .iter()
        .filter_map(|entry| {
            let message = entry.get("message").and_then(Value::as_str)?;
            Some(match entry.get("errorCode").and_then(Value::as_str) {
                Some(code) => format!("{code}: {message}"),
                None => message.to_string(),
            })
        })
        .collect();
    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}

/// `value[key]` as a string, or a decode error naming the key.
pub(crate) fn str_field<'a>(
    service: Service,
    value: &'a Value,
    key: &str,
) -> Result<&'a str, RemoteError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Decode {
            service,
            message: format!("missing string field `{key}`"),
        })
}

/// `value[key]` as an unsigned integer, or a decode error naming the key.
pub(crate) fn u64_field(service: Service, value: &Value, key: &str) -> Result<u64, RemoteError> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| RemoteError::Decode {
            service,
            message: format!("missing integer field `{key}`"),
        })
}
