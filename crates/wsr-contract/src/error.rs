use thiserror::Error;
use wsr_state::StateError;

/// Errors surfaced by record stores, contracts, and the ledger.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("the {kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("the {kind} {key} does not exist")]
    NotFound { kind: &'static str, key: String },

    /// Stored bytes do not decode into the expected record shape.
    #[error("cannot decode {kind} {key}: {reason}")]
    Deserialization {
        kind: &'static str,
        key: String,
        reason: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("the {kind} {key} is already {state}")]
    AlreadyInTargetState {
        kind: &'static str,
        key: String,
        state: String,
    },

    #[error("unknown contract: {0}")]
    UnknownContract(String),

    #[error("contract {contract} has no function {function}")]
    UnknownFunction { contract: String, function: String },

    #[error("world state error: {0}")]
    Infrastructure(StateError),
}

impl ContractError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable name of the error kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::NotFound { .. } => "NotFound",
            Self::Deserialization { .. } => "Deserialization",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::AlreadyInTargetState { .. } => "AlreadyInTargetState",
            Self::UnknownContract(_) => "UnknownContract",
            Self::UnknownFunction { .. } => "UnknownFunction",
            Self::Infrastructure(StateError::MvccConflict { .. }) => "Conflict",
            Self::Infrastructure(_) => "Infrastructure",
        }
    }

    /// Whether the transaction lost a race with a concurrent commit.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Infrastructure(StateError::MvccConflict { .. }))
    }
}

impl From<StateError> for ContractError {
    fn from(err: StateError) -> Self {
        match err {
            // Key and namespace rule violations are caller mistakes.
            StateError::InvalidInput(e) => Self::InvalidArgument(e.to_string()),
            other => Self::Infrastructure(other),
        }
    }
}

pub type ContractResult<T> = Result<T, ContractError>;
