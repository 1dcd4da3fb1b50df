//! Plugin catalog.
//!
//! The actions and polling triggers the workflow-automation plugin exposes,
//! and the manifest document that describes them. The manifest server
//! serves the same catalog over HTTP.

mod actions;
mod manifest;
mod props;
mod triggers;

pub use actions::Action;
pub use manifest::{ActionSpec, AuthSpec, Manifest, TriggerSpec};
pub use props::{PropKind, PropSpec};
pub use triggers::{PollResult, Trigger};

use crate::huly::HulyError;

/// Failure of a catalog operation.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown trigger: {0}")]
    UnknownTrigger(String),

    /// The supplied props did not validate.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Huly(#[from] HulyError),

    /// A backend result could not be turned back into JSON.
    #[error("could not encode backend result: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Decode JSON props into a typed input, mapping failures to `InvalidInput`.
pub(crate) fn decode_props<T>(props: serde_json::Value) -> CatalogResult<T>
where
    T: serde::de::DeserializeOwned,
{
    // ---
    let props = match props {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(props).map_err(|err| CatalogError::InvalidInput(err.to_string()))
}

/// Serialize a backend result for the caller.
pub(crate) fn encode_result<T: serde::Serialize>(value: T) -> CatalogResult<serde_json::Value> {
    serde_json::to_value(value).map_err(CatalogError::Encode)
}

/// Reject blank required text.
pub(crate) fn require_text(field: &str, value: &str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
