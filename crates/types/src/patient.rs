//! Canonical patient demographics.

use crate::{NationalId, NonEmptyText, PatientId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative sex as captured on the intake form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "other")]
    Other,
}

impl Sex {
    /// Wire/form code: `M`, `F` or `other`.
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Other => "other",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" => Ok(Sex::Male),
            "f" => Ok(Sex::Female),
            "other" | "x" | "otro" => Ok(Sex::Other),
            other => Err(format!("unknown sex code '{other}'")),
        }
    }
}

/// Contact and insurance metadata owned by a single patient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiliatoryInfo {
    pub address: String,
    pub phone: String,
    pub insurance_number: String,
}

/// Demographics of a patient that does not have an id yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub full_name: NonEmptyText,
    pub national_id: NationalId,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub filiatory: FiliatoryInfo,
}

impl NewPatient {
    /// Attaches the assigned id, producing the stored patient.
    pub fn with_id(self, id: PatientId) -> Patient {
        Patient {
            id,
            full_name: self.full_name,
            national_id: self.national_id,
            birth_date: self.birth_date,
            sex: self.sex,
            filiatory: self.filiatory,
        }
    }
}

/// A person enrolled in the clinic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: NonEmptyText,
    pub national_id: NationalId,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub filiatory: FiliatoryInfo,
}

impl Patient {
    /// Case-insensitive substring match over name and national id.
    ///
    /// The national id is compared on the digits of the query, so `23.456.789`
    /// finds `23456789`.
    ///
    /// An empty (or whitespace) query matches every patient.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        if self.full_name.as_str().to_lowercase().contains(&q) {
            return true;
        }
        let digits = NationalId::strip_non_digits(&q);
        !digits.is_empty() && self.national_id.as_str().contains(&digits)
    }
}
