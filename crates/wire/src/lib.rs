//! Wire models for the clinic's remote patient API.
//!
//! The remote API speaks a legacy, flat, Spanish-keyed JSON shape
//! (`nombre`, `documento`, `nacimiento`, ...). This crate is the only place
//! that shape exists: it parses API envelopes, renders request bodies, and
//! translates rows into the canonical [`hcdu_types::Patient`].
//!
//! This crate focuses on:
//! - strict envelope deserialisation with field paths in error messages
//! - per-row translation, where one malformed row never sinks the roster
//! - request rendering for patient creation

pub mod affiliation;
pub mod roster;

pub use affiliation::{Affiliation, AffiliationOutcome, ADD_PATIENT_ACTION};
pub use roster::{Roster, RosterData, GET_PATIENTS_ACTION};

/// Errors returned by the `hcdu-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;

/// Deserialise `text` as `T`, reporting the path of the first mismatching field.
pub(crate) fn parse_with_path<T>(text: &str, what: &str) -> WireResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(text);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => {
            deserializer.end()?;
            Ok(parsed)
        }
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            Err(WireError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Text fields the PHP backend may emit as either JSON strings or numbers.
#[derive(Clone, Debug, serde::Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    pub(crate) fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}
