//! Patient identifiers.
//!
//! [`PatientId`] is the record key assigned at creation, either by the remote
//! API or sequentially (`p1`, `p2`, ...). [`NationalId`] is the document number
//! (DNI) used for duplicate detection; it is stored in digit-only form so that
//! `23.456.789` and `23456789` collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of digits a national id must contain once separators are stripped.
pub const NATIONAL_ID_MIN_DIGITS: usize = 6;

/// Errors raised when constructing identifiers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("patient id cannot be empty")]
    EmptyPatientId,
    #[error("national id cannot be empty")]
    EmptyNationalId,
    #[error("national id must contain at least {min} digits, got {found}")]
    TooFewDigits { min: usize, found: usize },
}

/// Immutable key of a patient and its clinical record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentityError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityError::EmptyPatientId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Builds the sequential id used when no id was issued by the remote API.
    pub fn sequential(n: u64) -> Self {
        Self(format!("p{n}"))
    }

    /// Returns the sequence number of ids shaped like `p<n>`.
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.strip_prefix('p')?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PatientId> for String {
    fn from(value: PatientId) -> Self {
        value.0
    }
}

/// Digit-only national identity number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    /// Normalises `input` by dropping every non-digit character.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyNationalId`] for blank input and
    /// [`IdentityError::TooFewDigits`] when fewer than [`NATIONAL_ID_MIN_DIGITS`] remain.
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        if input.trim().is_empty() {
            return Err(IdentityError::EmptyNationalId);
        }
        let digits = Self::strip_non_digits(input);
        if digits.len() < NATIONAL_ID_MIN_DIGITS {
            return Err(IdentityError::TooFewDigits {
                min: NATIONAL_ID_MIN_DIGITS,
                found: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// Digit-only projection of arbitrary input, without length checks.
    pub fn strip_non_digits(input: &str) -> String {
        input.chars().filter(char::is_ascii_digit).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NationalId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NationalId> for String {
    fn from(value: NationalId) -> Self {
        value.0
    }
}
