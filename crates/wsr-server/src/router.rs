use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use wsr_contract::{ContractResult, Ledger};

use crate::error::ApiError;
use crate::handler;
use crate::routes::{bank, contracts, identities, loans, pokemon};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Run one ledger operation on the blocking pool.
    ///
    /// Commits hold the world-state write lock across the journal write (and
    /// its `fsync` with `sync_every_write`), so they stay off the async
    /// worker threads.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Ledger) -> ContractResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || op(&ledger))
            .await
            .map_err(|e| ApiError::internal(format!("ledger task failed: {e}")))?
            .map_err(ApiError::from)
    }
}

/// Build the axum router with all WSR endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/ledger/init", post(handler::init_ledger_handler))
        .route("/v1/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/v1/loans/:id", get(loans::read_loan).delete(loans::delete_loan))
        .route("/v1/loans/:id/status", put(loans::update_loan_status))
        .route("/v1/loans/:id/history", get(loans::loan_history))
        .route(
            "/v1/pokemon",
            get(pokemon::list_pokemon).post(pokemon::create_pokemon),
        )
        .route(
            "/v1/pokemon/:id",
            get(pokemon::read_pokemon)
                .put(pokemon::update_pokemon)
                .delete(pokemon::delete_pokemon),
        )
        .route("/v1/pokemon/:id/evolve", post(pokemon::evolve_pokemon))
        .route("/v1/pokemon/:id/history", get(pokemon::pokemon_history))
        .route(
            "/v1/identities",
            get(identities::list_identities).post(identities::create_identity),
        )
        .route(
            "/v1/identities/:id",
            get(identities::read_identity)
                .put(identities::update_identity)
                .delete(identities::delete_identity),
        )
        .route("/v1/identities/:id/history", get(identities::identity_history))
        .route("/v1/bank/ping", get(bank::ping))
        .route("/v1/contracts/:name/invoke", post(contracts::invoke))
        .route("/v1/contracts/:name/query", post(contracts::query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
