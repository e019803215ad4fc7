use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use wsr_contract::{HistoryEntry, Pokemon, PokemonContract};

use super::{body, committed, required, required_str};
use crate::error::ApiError;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePokemonRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub trainer: Option<String>,
    pub location: Option<String>,
    pub power: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePokemonRequest {
    pub trainer: Option<String>,
    pub power: Option<i64>,
}

pub async fn list_pokemon(State(state): State<AppState>) -> Result<Json<Vec<Pokemon>>, ApiError> {
    let all = state
        .run(|ledger| {
            ledger.evaluate(PokemonContract::NAME, |ctx| PokemonContract.get_all_pokemon(ctx))
        })
        .await?;
    Ok(Json(all))
}

pub async fn create_pokemon(
    State(state): State<AppState>,
    payload: Result<Json<CreatePokemonRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let id = required_str(req.id, "id")?;
    let name = required_str(req.name, "name")?;
    let kind = required_str(req.kind, "type")?;
    let trainer = required_str(req.trainer, "trainer")?;
    let location = required_str(req.location, "location")?;
    let power = required(req.power, "power")?;

    let result = state
        .run(move |ledger| {
            ledger.submit(PokemonContract::NAME, |ctx| {
                PokemonContract.create_pokemon(ctx, &id, &name, &kind, &trainer, &location, power)
            })
        })
        .await?;
    Ok(committed(StatusCode::CREATED, result))
}

pub async fn read_pokemon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Pokemon>, ApiError> {
    let pokemon = state
        .run(move |ledger| {
            ledger.evaluate(PokemonContract::NAME, |ctx| PokemonContract.read_pokemon(ctx, &id))
        })
        .await?;
    Ok(Json(pokemon))
}

pub async fn update_pokemon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePokemonRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    let trainer = required_str(req.trainer, "trainer")?;
    let power = required(req.power, "power")?;
    let result = state
        .run(move |ledger| {
            ledger.submit(PokemonContract::NAME, |ctx| {
                PokemonContract.update_pokemon(ctx, &id, &trainer, power)
            })
        })
        .await?;
    Ok(committed(StatusCode::OK, result))
}

pub async fn evolve_pokemon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let result = state
        .run(move |ledger| {
            ledger.submit(PokemonContract::NAME, |ctx| PokemonContract.evolve_pokemon(ctx, &id))
        })
        .await?;
    Ok(committed(StatusCode::OK, result))
}

pub async fn delete_pokemon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let result = state
        .run(move |ledger| {
            ledger.submit(PokemonContract::NAME, |ctx| PokemonContract.delete_pokemon(ctx, &id))
        })
        .await?;
    Ok(committed(StatusCode::NO_CONTENT, result))
}

pub async fn pokemon_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry<Pokemon>>>, ApiError> {
    let history = state
        .run(move |ledger| {
            ledger.evaluate(PokemonContract::NAME, |ctx| PokemonContract.get_history(ctx, &id))
        })
        .await?;
    Ok(Json(history))
}
