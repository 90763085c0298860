//! Response body decoding shared by every transport.

use contracts::{ContractError, ResultModel};
use serde::Deserialize;
use serde_json::Value;

/// Longest upstream message carried into an error
const MAX_ERROR_LEN: usize = 512;

#[derive(Deserialize)]
struct ReportBody {
    report: String,
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// Decode an analyze response into a validated `ResultModel`
///
/// # Errors
/// - `Upstream` when the body carries an `error` field
/// - `ResultDecode` when the body is not a result
/// - `EmptySeries` / `NonMonotonicSeries` when the result is unusable
pub fn decode_result(body: &[u8]) -> Result<ResultModel, ContractError> {
    let value = parse_body("analyze", body)?;
    let result: ResultModel = serde_json::from_value(value).map_err(|e| ContractError::ResultDecode {
        message: format!("analysis result does not match the expected shape: {e}"),
        source: Some(Box::new(e)),
    })?;
    result.validate()?;
    Ok(result)
}

/// Decode a `{"report": text}` response
pub fn decode_report(body: &[u8]) -> Result<String, ContractError> {
    let value = parse_body("report", body)?;
    let report: ReportBody = serde_json::from_value(value).map_err(|e| ContractError::ResultDecode {
        message: format!("report response missing 'report' text: {e}"),
        source: Some(Box::new(e)),
    })?;
    Ok(report.report)
}

/// Decode a `{"status": "healthy"}` response
pub fn decode_health(body: &[u8]) -> Result<(), ContractError> {
    let value = parse_body("health", body)?;
    let health: HealthBody = serde_json::from_value(value)
        .map_err(|e| ContractError::upstream("health", format!("unexpected health body: {e}")))?;
    if health.status == "healthy" {
        Ok(())
    } else {
        Err(ContractError::upstream(
            "health",
            format!("service reports status '{}'", health.status),
        ))
    }
}

/// Parse JSON and surface an in-band `{"error": ...}` as an upstream failure
fn parse_body(operation: &str, body: &[u8]) -> Result<Value, ContractError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| ContractError::ResultDecode {
        message: format!("{operation} response is not valid JSON: {e}"),
        source: Some(Box::new(e)),
    })?;

    if let Some(error) = value.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ContractError::upstream(operation, truncate(&message)));
    }

    Ok(value)
}

/// Clip long upstream messages on a char boundary
pub(crate) fn truncate(message: &str) -> String {
    if message.len() <= MAX_ERROR_LEN {
        return message.to_string();
    }
    let mut end = MAX_ERROR_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}
