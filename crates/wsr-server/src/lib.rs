//! HTTP gateway for World State Records.
//!
//! Maps REST calls onto ledger submissions and evaluations, one ledger
//! operation per request.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use routes::TX_ID_HEADER;
pub use server::WsrServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;
    use wsr_contract::Ledger;

    fn app() -> Router {
        let ledger = Ledger::in_memory();
        ledger.init_ledger().unwrap();
        build_router(AppState::new(Arc::new(ledger)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = send(&app(), Method::GET, "/v1/health", None).await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn info_endpoint() {
        let response = send(&app(), Method::GET, "/v1/info", None).await;
        assert_eq!(response.status(), 200);
        let info = json_body(response).await;
        assert_eq!(info["name"], "wsr-server");
        assert_eq!(info["height"], 3);
        assert_eq!(info["contracts"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn loan_lifecycle() {
        let app = app();
        let response = send(
            &app,
            Method::POST,
            "/v1/loans",
            Some(json!({
                "id": "loan3",
                "applicant": "Sara",
                "amount": 2500,
                "term": 24,
                "interestRate": 3.75
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(TX_ID_HEADER));
        let created = json_body(response).await;
        assert_eq!(created["status"], "Pending");

        let response = send(
            &app,
            Method::PUT,
            "/v1/loans/loan3/status",
            Some(json!({ "status": "Approved" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let read = json_body(send(&app, Method::GET, "/v1/loans/loan3", None).await).await;
        assert_eq!(read["status"], "Approved");
        assert_eq!(read["amount"], 2500);

        let response = send(&app, Method::DELETE, "/v1/loans/loan3", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let history =
            json_body(send(&app, Method::GET, "/v1/loans/loan3/history", None).await).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2]["isDelete"], true);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let response = send(
            &app(),
            Method::POST,
            "/v1/loans",
            Some(json!({ "id": "loan9", "applicant": "Sara" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "InvalidArgument");
        assert!(body["message"].as_str().unwrap().contains("amount"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/pokemon")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn not_found_and_conflict() {
        let app = app();
        let response = send(&app, Method::GET, "/v1/pokemon/missingno", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "NotFound");

        let response = send(
            &app,
            Method::POST,
            "/v1/pokemon",
            Some(json!({
                "id": "poke1",
                "name": "Mew",
                "type": "Psychic",
                "trainer": "Ash",
                "location": "Faraway Island",
                "power": 100
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"], "AlreadyExists");
    }

    #[tokio::test]
    async fn evolve_twice_conflicts() {
        let app = app();
        let response = send(&app, Method::POST, "/v1/pokemon/poke2/evolve", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["power"], 82);

        let response = send(&app, Method::POST, "/v1/pokemon/poke2/evolve", None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"], "AlreadyInTargetState");
    }

    #[tokio::test]
    async fn identity_update() {
        let app = app();
        let response = send(
            &app,
            Method::PUT,
            "/v1/identities/identity1",
            Some(json!({ "mobileNumber": "03111111111", "address": "Karachi" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert_eq!(updated["address"], "Karachi");
        assert_eq!(updated["oldNIC"], "");
    }

    #[tokio::test]
    async fn bank_ping() {
        let response = send(&app(), Method::GET, "/v1/bank/ping", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!("Pong"));
    }

    #[tokio::test]
    async fn generic_invoke_and_query() {
        let app = app();
        let response = send(
            &app,
            Method::POST,
            "/v1/contracts/pokemon/invoke",
            Some(json!({ "function": "UpdatePokemon", "args": ["poke3", "Brock", "60"] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TX_ID_HEADER));

        let response = send(
            &app,
            Method::POST,
            "/v1/contracts/pokemon/query",
            Some(json!({ "function": "ReadPokemon", "args": ["poke3"] })),
        )
        .await;
        let squirtle = json_body(response).await;
        assert_eq!(squirtle["trainer"], "Brock");
        assert_eq!(squirtle["power"], 60);

        let response = send(
            &app,
            Method::POST,
            "/v1/contracts/casino/query",
            Some(json!({ "function": "Spin" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "UnknownContract");
    }

    #[tokio::test]
    async fn ledger_init_endpoint_reseeds() {
        let app = app();
        send(&app, Method::DELETE, "/v1/loans/loan1", None).await;
        let response = send(&app, Method::POST, "/v1/ledger/init", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(&app, Method::GET, "/v1/loans/loan1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn file_backed_commits_run_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            sync_every_write: true,
            ..ServerConfig::default()
        };
        let app = WsrServer::new(config).router().unwrap();

        let (evolved, health) = tokio::join!(
            send(&app, Method::POST, "/v1/pokemon/poke3/evolve", None),
            send(&app, Method::GET, "/v1/health", None),
        );
        assert_eq!(evolved.status(), StatusCode::OK);
        assert_eq!(health.status(), StatusCode::OK);

        let info = json_body(send(&app, Method::GET, "/v1/info", None).await).await;
        assert_eq!(info["height"], 4);
    }

    #[tokio::test]
    async fn panicking_ledger_task_is_internal_error() {
        let state = AppState::new(Arc::new(Ledger::in_memory()));
        let err = state
            .run(|_| -> wsr_contract::ContractResult<()> { panic!("ledger task blew up") })
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, "Infrastructure");
    }
}
