//! Patient intake ("afiliación") validation.
//!
//! [`IntakeValidator`] turns a raw [`IntakeDraft`] (form values as typed)
//! into a [`ValidatedIntake`] that the store can apply, or a
//! [`ValidationReport`] listing every violated field. Rules are evaluated
//! independently so the form can highlight all problems at once.

use crate::snomed::Diagnosis;
use chrono::{Datelike, Local, NaiveDate};
use hcdu_types::{FiliatoryInfo, IdentityError, NationalId, NewPatient, NonEmptyText, Sex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Intake form fields that can carry a validation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    NationalId,
    BirthDate,
    Sex,
}

impl Field {
    /// Identifier the form uses for the field.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::NationalId => "nationalId",
            Field::BirthDate => "birthDate",
            Field::Sex => "sex",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single field-level violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldError {
    RequiredField(Field),
    InvalidFormat(Field),
    FutureDate(Field),
}

impl FieldError {
    pub fn field(self) -> Field {
        match self {
            FieldError::RequiredField(f)
            | FieldError::InvalidFormat(f)
            | FieldError::FutureDate(f) => f,
        }
    }

    /// Human-readable message for the form.
    pub fn message(self) -> String {
        match self {
            FieldError::RequiredField(Field::Name) => "Full name is required".into(),
            FieldError::RequiredField(Field::NationalId) => "National id is required".into(),
            FieldError::InvalidFormat(Field::NationalId) => format!(
                "National id must contain at least {} digits",
                hcdu_types::NATIONAL_ID_MIN_DIGITS
            ),
            FieldError::InvalidFormat(Field::BirthDate) => {
                "Birth date must be a valid YYYY-MM-DD date".into()
            }
            FieldError::FutureDate(Field::BirthDate) => "Birth date cannot be in the future".into(),
            FieldError::InvalidFormat(Field::Sex) => "Sex must be M, F or other".into(),
            FieldError::RequiredField(f) => format!("{f} is required"),
            FieldError::InvalidFormat(f) => format!("{f} has an invalid format"),
            FieldError::FutureDate(f) => format!("{f} cannot be in the future"),
        }
    }
}

/// Every violation found in one draft.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn contains(&self, error: FieldError) -> bool {
        self.errors.contains(&error)
    }

    /// Keys of the violated fields.
    pub fn fields(&self) -> BTreeSet<&'static str> {
        self.errors.iter().map(|e| e.field().key()).collect()
    }

    /// One message per violated field, keyed by field identifier.
    pub fn messages(&self) -> BTreeMap<&'static str, String> {
        self.errors
            .iter()
            .map(|e| (e.field().key(), e.message()))
            .collect()
    }

    fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.message()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Encounter type selected on the intake form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncounterKind {
    Ambulatory,
    Admission,
    Lab,
    Imaging,
    Kinesiology,
    Other,
}

impl EncounterKind {
    /// Parses the form value; anything unrecognised is [`EncounterKind::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ambulatory" | "ambulatorio" => EncounterKind::Ambulatory,
            "admission" | "internacion" | "internación" => EncounterKind::Admission,
            "lab" | "laboratorio" => EncounterKind::Lab,
            "imaging" | "imagenes" | "imágenes" => EncounterKind::Imaging,
            "kinesiology" | "kinesiologia" | "kinesiología" => EncounterKind::Kinesiology,
            _ => EncounterKind::Other,
        }
    }
}

/// Detail payload of the encounter that seeds a new record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitialEncounter {
    Ambulatory {
        reason: String,
        professional: String,
        diagnosis: Option<Diagnosis>,
    },
    Admission {
        admission_type: String,
        service: String,
        bed: String,
        diagnosis: Option<Diagnosis>,
    },
    Lab {
        study: String,
        result: String,
    },
    Imaging {
        study: String,
        report: String,
    },
    Kinesiology {
        technique: String,
        notes: String,
    },
    /// `other` or unrecognised kinds: nothing is appended.
    None,
}

impl InitialEncounter {
    /// Reads the detail subset that belongs to `kind`.
    pub fn from_details(kind: EncounterKind, details: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| {
            details
                .get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let diagnosis = || details.get("diagnosis").and_then(|l| Diagnosis::parse_label(l));

        match kind {
            EncounterKind::Ambulatory => InitialEncounter::Ambulatory {
                reason: text("reason"),
                professional: text("professional"),
                diagnosis: diagnosis(),
            },
            EncounterKind::Admission => InitialEncounter::Admission {
                admission_type: text("admission_type"),
                service: text("service"),
                bed: text("bed"),
                diagnosis: diagnosis(),
            },
            EncounterKind::Lab => InitialEncounter::Lab {
                study: text("study"),
                result: text("result"),
            },
            EncounterKind::Imaging => InitialEncounter::Imaging {
                study: text("study"),
                report: text("report"),
            },
            EncounterKind::Kinesiology => InitialEncounter::Kinesiology {
                technique: text("technique"),
                notes: text("notes"),
            },
            EncounterKind::Other => InitialEncounter::None,
        }
    }
}

/// Raw intake form values.
#[derive(Clone, Debug, Default)]
pub struct IntakeDraft {
    pub full_name: String,
    pub national_id: String,
    /// `YYYY-MM-DD`, empty when not provided.
    pub birth_date: String,
    /// `M`, `F`, `other`, or empty.
    pub sex: String,
    pub address: String,
    pub phone: String,
    pub insurance_number: String,
    pub encounter_kind: String,
    /// Encounter detail fields keyed by form name, plus the optional `encounter_date`.
    pub details: BTreeMap<String, String>,
}

impl IntakeDraft {
    pub fn new(full_name: impl Into<String>, national_id: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            national_id: national_id.into(),
            ..Default::default()
        }
    }

    pub fn with_encounter(mut self, kind: impl Into<String>) -> Self {
        self.encounter_kind = kind.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// An intake that passed validation, ready for [`crate::store::ClinicalRecordStore::add_patient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedIntake {
    patient: NewPatient,
    encounter_date: NaiveDate,
    encounter: InitialEncounter,
}

impl ValidatedIntake {
    pub fn patient(&self) -> &NewPatient {
        &self.patient
    }

    pub fn encounter_date(&self) -> NaiveDate {
        self.encounter_date
    }

    pub fn encounter(&self) -> &InitialEncounter {
        &self.encounter
    }

    pub(crate) fn into_parts(self) -> (NewPatient, NaiveDate, InitialEncounter) {
        (self.patient, self.encounter_date, self.encounter)
    }
}

/// Validates intake drafts against a reference date.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntakeValidator;

impl IntakeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates `draft` as of the local calendar date.
    pub fn validate_now(&self, draft: &IntakeDraft) -> Result<ValidatedIntake, ValidationReport> {
        self.validate(draft, Local::now().date_naive())
    }

    /// Validates `draft` as of `today`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationReport`] containing every violated rule.
    pub fn validate(
        &self,
        draft: &IntakeDraft,
        today: NaiveDate,
    ) -> Result<ValidatedIntake, ValidationReport> {
        let mut report = ValidationReport::default();

        let full_name = NonEmptyText::new(&draft.full_name)
            .map_err(|_| report.push(FieldError::RequiredField(Field::Name)))
            .ok();

        let national_id = match NationalId::parse(&draft.national_id) {
            Ok(id) => Some(id),
            Err(IdentityError::EmptyNationalId) => {
                report.push(FieldError::RequiredField(Field::NationalId));
                None
            }
            Err(_) => {
                report.push(FieldError::InvalidFormat(Field::NationalId));
                None
            }
        };

        let birth_date = match parse_optional_date(&draft.birth_date) {
            Ok(Some(date)) if date > today => {
                report.push(FieldError::FutureDate(Field::BirthDate));
                None
            }
            Ok(date) => date,
            Err(_) => {
                report.push(FieldError::InvalidFormat(Field::BirthDate));
                None
            }
        };

        let sex = match draft.sex.trim() {
            "" => None,
            code => code
                .parse::<Sex>()
                .map_err(|_| report.push(FieldError::InvalidFormat(Field::Sex)))
                .ok(),
        };

        let (Some(full_name), Some(national_id)) = (full_name, national_id) else {
            return Err(report);
        };
        if !report.is_valid() {
            return Err(report);
        }

        let encounter_date = draft
            .details
            .get("encounter_date")
            .and_then(|d| parse_optional_date(d).ok().flatten())
            .unwrap_or(today);
        let kind = EncounterKind::parse(&draft.encounter_kind);

        Ok(ValidatedIntake {
            patient: NewPatient {
                full_name,
                national_id,
                birth_date,
                sex,
                filiatory: FiliatoryInfo {
                    address: draft.address.trim().to_string(),
                    phone: draft.phone.trim().to_string(),
                    insurance_number: draft.insurance_number.trim().to_string(),
                },
            },
            encounter_date,
            encounter: InitialEncounter::from_details(kind, &draft.details),
        })
    }
}

fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match value.trim() {
        "" => Ok(None),
        text => NaiveDate::parse_from_str(text, DATE_FORMAT).map(Some),
    }
}

/// Calendar age in whole years on `today`.
///
/// Returns `None` when `birth_date` is after `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth_date > today {
        return None;
    }
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
