use serde::de::DeserializeOwned;
use serde::Serialize;

/// A JSON document stored under its own key.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable record name used in error messages.
    const KIND: &'static str;

    /// World-state key of this record.
    fn key(&self) -> &str;
}
