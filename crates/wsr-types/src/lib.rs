//! Foundation types for World State Records (WSR).
//!
//! Every other WSR crate depends on `wsr-types`.
//!
//! # Key Types
//!
//! - [`TxId`] -- UUID v7 transaction identifier, time-ordered
//! - [`TemporalAnchor`] -- Hybrid Logical Clock timestamp stamped on each commit
//! - [`validate_key`] -- rules every world-state key must satisfy

pub mod error;
pub mod key;
pub mod temporal;
pub mod txid;

pub use error::TypeError;
pub use key::{validate_key, validate_namespace, MAX_KEY_BYTES};
pub use temporal::TemporalAnchor;
pub use txid::TxId;
