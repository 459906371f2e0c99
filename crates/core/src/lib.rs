//! # HCDU Core
//!
//! Core business logic of the unified clinical history (HCDU):
//! - [`store::ClinicalRecordStore`]: the roster and every patient's clinical record
//! - [`intake::IntakeValidator`]: field-level validation of patient intake
//! - [`session::SessionContext`]: login, active patient, write permission
//! - [`users::UserDirectory`]: the administered credential list
//! - [`roster`]: roster loading with the explicit degraded-mode fallback
//! - [`snomed::SnomedCatalog`]: the diagnosis picker catalogue
//!
//! **No transport concerns**: HTTP lives in `hcdu-api-client`, the legacy JSON
//! shape in `hcdu-wire`. Rendering is left to the caller, which reads
//! snapshots from the store.

pub mod config;
pub mod constants;
pub mod error;
pub mod intake;
pub mod patient;
pub mod records;
pub mod remote;
pub mod roster;
pub mod session;
pub mod snomed;
pub mod store;
pub mod users;

pub use config::CoreConfig;
pub use error::{HcduError, HcduResult};
pub use intake::{age_on, IntakeDraft, IntakeValidator, ValidatedIntake, ValidationReport};
pub use patient::PatientService;
pub use remote::PatientApi;
pub use roster::{load_roster, mock_roster, RosterLoad};
pub use session::{ActiveUser, Role, SessionContext};
pub use snomed::{Diagnosis, SnomedCatalog};
pub use store::{ClinicalRecordStore, DataMode, PatientSnapshot};
pub use users::{User, UserDirectory};

pub use hcdu_types::{
    FiliatoryInfo, NationalId, NewPatient, NonEmptyText, Patient, PatientId, Sex,
};
