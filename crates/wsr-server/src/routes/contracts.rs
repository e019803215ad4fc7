//! Generic function dispatch, mirroring a gateway's submit/evaluate calls.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{body, committed, required_str};
use crate::error::ApiError;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InvokeRequest {
    pub function: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

pub async fn invoke(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let function = required_str(req.function, "function")?;
    let result = state
        .run(move |ledger| ledger.invoke(&name, &function, &req.args))
        .await?;
    Ok(committed(StatusCode::OK, result))
}

pub async fn query(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = body(payload)?;
    let function = required_str(req.function, "function")?;
    let value = state
        .run(move |ledger| ledger.query(&name, &function, &req.args))
        .await?;
    Ok(Json(value))
}
