use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::router::AppState;

pub async fn ping(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pong = state.run(|ledger| ledger.query("bank", "Ping", &[])).await?;
    Ok(Json(pong))
}
