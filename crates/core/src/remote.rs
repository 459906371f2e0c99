//! Seam to the remote patient API.
//!
//! The core never talks HTTP itself; `hcdu-api-client` implements this trait
//! and tests substitute in-memory fakes.

use crate::HcduResult;
use async_trait::async_trait;
use hcdu_types::{NewPatient, Patient, PatientId};

#[async_trait]
pub trait PatientApi: Send + Sync {
    /// Fetches the full roster.
    ///
    /// Transport failures, `success: false` answers and malformed bodies are
    /// all reported as errors; the caller decides on the fallback.
    async fn fetch_roster(&self) -> HcduResult<Vec<Patient>>;

    /// Submits a new patient and returns the id the backend issued, if any.
    async fn add_patient(&self, patient: &NewPatient) -> HcduResult<Option<PatientId>>;
}

/// In-memory [`PatientApi`] for tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::HcduError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub(crate) roster: Mutex<Option<Vec<Patient>>>,
        pub(crate) issued_id: Option<PatientId>,
        pub(crate) reject_creation: bool,
        pub(crate) created: Mutex<Vec<NewPatient>>,
        pub(crate) fetches: AtomicUsize,
    }

    impl FakeApi {
        /// An API whose every call fails with a transport error.
        pub(crate) fn unreachable() -> Self {
            Self::default()
        }

        pub(crate) fn serving(patients: Vec<Patient>) -> Self {
            Self {
                roster: Mutex::new(Some(patients)),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PatientApi for FakeApi {
        async fn fetch_roster(&self) -> HcduResult<Vec<Patient>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.roster
                .lock()
                .map_err(|e| HcduError::Transport(e.to_string()))?
                .clone()
                .ok_or_else(|| HcduError::Transport("connection refused".into()))
        }

        async fn add_patient(&self, patient: &NewPatient) -> HcduResult<Option<PatientId>> {
            if self.reject_creation {
                return Err(HcduError::Rejected("documento duplicado".into()));
            }
            if self.roster.lock().map(|r| r.is_none()).unwrap_or(true) {
                return Err(HcduError::Transport("connection refused".into()));
            }
            self.created
                .lock()
                .map_err(|e| HcduError::Transport(e.to_string()))?
                .push(patient.clone());
            Ok(self.issued_id.clone())
        }
    }
}
