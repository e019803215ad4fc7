use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use wsr_contract::{HistoryEntry, Identity, IdentityContract, NewIdentity};

use super::{body, committed, required_str};
use crate::error::ApiError;
use crate::router::AppState;

/// `id`, `firstName`, `lastName` and `cnic` are required; the rest default
/// to empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentityRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub cnic: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub mobile_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdentityRequest {
    pub mobile_number: Option<String>,
    pub address: Option<String>,
}

pub async fn list_identities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Identity>>, ApiError> {
    let all = state
        .run(|ledger| {
            ledger.evaluate(IdentityContract::NAME, |ctx| IdentityContract.get_all_identities(ctx))
        })
        .await?;
    Ok(Json(all))
}

pub async fn create_identity(
    State(state): State<AppState>,
    payload: Result<Json<CreateIdentityRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let new = NewIdentity {
        id: required_str(req.id, "id")?,
        first_name: required_str(req.first_name, "firstName")?,
        last_name: required_str(req.last_name, "lastName")?,
        cnic: required_str(req.cnic, "cnic")?,
        title: req.title.unwrap_or_default(),
        date_of_birth: req.date_of_birth.unwrap_or_default(),
        gender: req.gender.unwrap_or_default(),
        mobile_number: req.mobile_number.unwrap_or_default(),
    };

    let result = state
        .run(move |ledger| {
            ledger.submit(IdentityContract::NAME, |ctx| IdentityContract.create_identity(ctx, new))
        })
        .await?;
    Ok(committed(StatusCode::CREATED, result))
}

pub async fn read_identity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    let identity = state
        .run(move |ledger| {
            ledger.evaluate(IdentityContract::NAME, |ctx| IdentityContract.read_identity(ctx, &id))
        })
        .await?;
    Ok(Json(identity))
}

pub async fn update_identity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateIdentityRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let mobile = required_str(req.mobile_number, "mobileNumber")?;
    let address = required_str(req.address, "address")?;
    let result = state
        .run(move |ledger| {
            ledger.submit(IdentityContract::NAME, |ctx| {
                IdentityContract.update_identity(ctx, &id, &mobile, &address)
            })
        })
        .await?;
    Ok(committed(StatusCode::OK, result))
}

pub async fn delete_identity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let result = state
        .run(move |ledger| {
            ledger.submit(IdentityContract::NAME, |ctx| IdentityContract.delete_identity(ctx, &id))
        })
        .await?;
    Ok(committed(StatusCode::NO_CONTENT, result))
}

pub async fn identity_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry<Identity>>>, ApiError> {
    let history = state
        .run(move |ledger| {
            ledger.evaluate(IdentityContract::NAME, |ctx| {
                IdentityContract.get_identity_history(ctx, &id)
            })
        })
        .await?;
    Ok(Json(history))
}
