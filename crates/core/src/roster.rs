//! Roster loading with the mandatory mock fallback.
//!
//! Any failure of the remote roster load switches the store to the fixed
//! two-patient mock roster. The switch is an explicit
//! `DataMode::Live -> DataMode::Degraded` transition: it is logged and a
//! warning is handed back exactly once, on the transition itself.

use crate::constants::DEGRADED_ROSTER_WARNING;
use crate::remote::PatientApi;
use crate::store::{ClinicalRecordStore, DataMode};
use chrono::NaiveDate;
use hcdu_types::{FiliatoryInfo, NationalId, NonEmptyText, Patient, PatientId, Sex};

/// Outcome of a roster load, for the view layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterLoad {
    pub mode: DataMode,
    pub patients: usize,
    /// Set only on the load that entered degraded mode.
    pub warning: Option<&'static str>,
}

/// The fixed roster used when the remote API is unavailable.
pub fn mock_roster() -> Vec<Patient> {
    vec![
        mock_patient(
            "p1",
            "María González",
            "23456789",
            (1976, 4, 12),
            Sex::Female,
            FiliatoryInfo {
                address: "San Nicolás de Bari 699".into(),
                phone: "3804-123456".into(),
                insurance_number: "12345678900".into(),
            },
        ),
        mock_patient(
            "p2",
            "Juan Pérez",
            "30987654",
            (1988, 11, 2),
            Sex::Male,
            FiliatoryInfo {
                address: "25 de Mayo 442".into(),
                phone: "3804-369874".into(),
                insurance_number: "130987654".into(),
            },
        ),
    ]
}

fn mock_patient(
    id: &str,
    name: &str,
    national_id: &str,
    (y, m, d): (i32, u32, u32),
    sex: Sex,
    filiatory: FiliatoryInfo,
) -> Patient {
    // The mock literals are fixed and valid, so these conversions cannot fail.
    Patient {
        id: PatientId::new(id).expect("mock id is non-empty"),
        full_name: NonEmptyText::new(name).expect("mock name is non-empty"),
        national_id: NationalId::parse(national_id).expect("mock national id is valid"),
        birth_date: NaiveDate::from_ymd_opt(y, m, d),
        sex: Some(sex),
        filiatory,
    }
}

/// Loads the roster from `api` into `store`, falling back to [`mock_roster`].
///
/// A failure while the store is already degraded keeps the current degraded
/// roster (including patients registered since) and issues no new warning.
pub async fn load_roster<A>(store: &mut ClinicalRecordStore, api: &A) -> RosterLoad
where
    A: PatientApi + ?Sized,
{
    tracing::info!("loading roster from the remote API");

    match api.fetch_roster().await {
        Ok(patients) => {
            if store.data_mode() == DataMode::Degraded {
                tracing::info!("remote API reachable again, leaving degraded mode");
            }
            store.replace_roster(patients, DataMode::Live);
            tracing::info!("roster loaded: {} patients", store.len());
            RosterLoad {
                mode: DataMode::Live,
                patients: store.len(),
                warning: None,
            }
        }
        Err(e) if store.data_mode() == DataMode::Degraded => {
            tracing::debug!("roster load failed again while degraded: {}", e);
            RosterLoad {
                mode: DataMode::Degraded,
                patients: store.len(),
                warning: None,
            }
        }
        Err(e) => {
            tracing::warn!("roster load failed ({}); switching to mock roster", e);
            store.replace_roster(mock_roster(), DataMode::Degraded);
            RosterLoad {
                mode: DataMode::Degraded,
                patients: store.len(),
                warning: Some(DEGRADED_ROSTER_WARNING),
            }
        }
    }
}
