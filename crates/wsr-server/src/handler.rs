use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::router::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let contracts: Vec<Value> = state
        .ledger
        .contracts()
        .map(|c| json!({ "name": c.name(), "functions": c.functions() }))
        .collect();
    Ok(Json(json!({
        "name": "wsr-server",
        "version": env!("CARGO_PKG_VERSION"),
        "height": state.ledger.height()?,
        "contracts": contracts,
    })))
}

/// Run `InitLedger` on every contract.
pub async fn init_ledger_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (receipts, height) = state
        .run(|ledger| Ok((ledger.init_ledger()?, ledger.height()?)))
        .await?;
    let receipts: Vec<Value> = receipts
        .into_iter()
        .map(|(contract, receipt)| {
            json!({
                "contract": contract,
                "txId": receipt.tx_id.to_string(),
                "block": receipt.block_number(),
            })
        })
        .collect();
    Ok(Json(json!({
        "height": height,
        "receipts": receipts,
    })))
}
