use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;
use wsr_contract::ContractError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("world state error: {0}")]
    State(#[from] wsr_state::StateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by route handlers, rendered as
/// `{"error": <kind>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "InvalidArgument",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "Infrastructure",
            message: message.into(),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        let status = match &err {
            ContractError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ContractError::NotFound { .. }
            | ContractError::UnknownContract(_)
            | ContractError::UnknownFunction { .. } => StatusCode::NOT_FOUND,
            ContractError::AlreadyExists { .. } | ContractError::AlreadyInTargetState { .. } => {
                StatusCode::CONFLICT
            }
            e if e.is_conflict() => StatusCode::CONFLICT,
            ContractError::Deserialization { .. } | ContractError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_argument(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.kind, error = %self.message, "request failed");
        }
        let body = serde_json::json!({ "error": self.kind, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsr_state::StateError;

    fn status_of(err: ContractError) -> StatusCode {
        ApiError::from(err).status
    }

    #[test]
    fn contract_errors_map_to_statuses() {
        assert_eq!(
            status_of(ContractError::invalid_argument("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ContractError::NotFound { kind: "loan application", key: "k".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ContractError::UnknownContract("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ContractError::AlreadyExists { kind: "Pokemon", key: "k".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ContractError::AlreadyInTargetState {
                kind: "Pokemon",
                key: "k".into(),
                state: "evolved".into(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StateError::MvccConflict { key: "k".into() }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ContractError::Deserialization {
                kind: "identity",
                key: "k".into(),
                reason: "eof".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(StateError::Poisoned("world state").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kind_is_carried() {
        let err = ApiError::from(ContractError::UnknownFunction {
            contract: "bank".into(),
            function: "Rob".into(),
        });
        assert_eq!(err.kind, "UnknownFunction");
        assert!(err.message.contains("Rob"));
    }
}
