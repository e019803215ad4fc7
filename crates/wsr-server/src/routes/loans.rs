use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use wsr_contract::{HistoryEntry, LoanApplication, LoanContract};

use super::{body, committed, required, required_str};
use crate::error::ApiError;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    pub id: Option<String>,
    pub applicant: Option<String>,
    pub amount: Option<i64>,
    pub term: Option<i64>,
    pub interest_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn list_loans(
    State(state): State<AppState>,
) -> Result<Json<Vec<LoanApplication>>, ApiError> {
    let loans = state
        .run(|ledger| {
            ledger.evaluate(LoanContract::NAME, |ctx| LoanContract.get_all_loan_applications(ctx))
        })
        .await?;
    Ok(Json(loans))
}

pub async fn create_loan(
    State(state): State<AppState>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let id = required_str(req.id, "id")?;
    let applicant = required_str(req.applicant, "applicant")?;
    let amount = required(req.amount, "amount")?;
    let term = required(req.term, "term")?;
    let interest_rate = required(req.interest_rate, "interestRate")?;

    let result = state
        .run(move |ledger| {
            ledger.submit(LoanContract::NAME, |ctx| {
                LoanContract.create_loan_application(
                    ctx,
                    &id,
                    &applicant,
                    amount,
                    term,
                    interest_rate,
                )
            })
        })
        .await?;
    Ok(committed(StatusCode::CREATED, result))
}

pub async fn read_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LoanApplication>, ApiError> {
    let loan = state
        .run(move |ledger| {
            ledger.evaluate(LoanContract::NAME, |ctx| LoanContract.read_loan_application(ctx, &id))
        })
        .await?;
    Ok(Json(loan))
}

pub async fn update_loan_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let status = required_str(body(payload)?.status, "status")?;
    let result = state
        .run(move |ledger| {
            ledger.submit(LoanContract::NAME, |ctx| {
                LoanContract.update_loan_status(ctx, &id, &status)
            })
        })
        .await?;
    Ok(committed(StatusCode::OK, result))
}

pub async fn delete_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let result = state
        .run(move |ledger| {
            ledger.submit(LoanContract::NAME, |ctx| LoanContract.delete_loan_application(ctx, &id))
        })
        .await?;
    Ok(committed(StatusCode::NO_CONTENT, result))
}

pub async fn loan_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry<LoanApplication>>>, ApiError> {
    let history = state
        .run(move |ledger| {
            ledger.evaluate(LoanContract::NAME, |ctx| LoanContract.get_loan_history(ctx, &id))
        })
        .await?;
    Ok(Json(history))
}
