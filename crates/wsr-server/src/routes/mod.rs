//! REST routes. Every handler performs exactly one ledger operation.

pub mod bank;
pub mod contracts;
pub mod identities;
pub mod loans;
pub mod pokemon;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use wsr_contract::Committed;

use crate::error::ApiError;

/// Header carrying the id of the transaction a mutating request committed.
pub const TX_ID_HEADER: HeaderName = HeaderName::from_static("x-transaction-id");

/// Unwrap a JSON body, turning extractor rejections into `InvalidArgument`.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::invalid_argument(format!("missing required field: {field}")))
}

pub(crate) fn required_str(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(ApiError::invalid_argument(format!(
            "required field must not be empty: {field}"
        ))),
        None => Err(ApiError::invalid_argument(format!(
            "missing required field: {field}"
        ))),
    }
}

/// Response for a committed submission, tagged with its transaction id.
pub(crate) fn committed<T: Serialize>(status: StatusCode, committed: Committed<T>) -> Response {
    let tx_id = committed.receipt.tx_id.to_string();
    let mut response = if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else {
        (status, Json(committed.value)).into_response()
    };
    if let Ok(value) = HeaderValue::from_str(&tx_id) {
        response.headers_mut().insert(TX_ID_HEADER, value);
    }
    response
}
