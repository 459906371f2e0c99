//! Patient service: roster loading and patient registration against the remote API.
//!
//! This ties the pieces of an intake together: permission check, validation,
//! the client-side duplicate check, the remote creation call and finally the
//! local [`ClinicalRecordStore::add_patient`].

use crate::intake::{IntakeDraft, IntakeValidator};
use crate::remote::PatientApi;
use crate::roster::{load_roster, RosterLoad};
use crate::session::SessionContext;
use crate::store::ClinicalRecordStore;
use crate::{HcduError, HcduResult};
use chrono::NaiveDate;
use hcdu_types::Patient;

/// Patient operations that involve the remote API.
#[derive(Clone, Debug)]
pub struct PatientService<A> {
    api: A,
    validator: IntakeValidator,
}

impl<A: PatientApi> PatientService<A> {
    /// Creates a new `PatientService` talking to `api`.
    pub fn new(api: A) -> Self {
        Self {
            api,
            validator: IntakeValidator::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Loads the roster into `store`, falling back to the mock roster on failure.
    pub async fn load_roster(&self, store: &mut ClinicalRecordStore) -> RosterLoad {
        load_roster(store, &self.api).await
    }

    /// Registers a new patient from an intake form.
    ///
    /// The remote call happens only after the draft validated and its national
    /// id was checked against the loaded roster. The store is changed only
    /// after the backend accepted the patient; a failed call is not retried.
    ///
    /// # Errors
    ///
    /// - [`HcduError::PermissionDenied`] / [`HcduError::NotAuthenticated`]
    /// - [`HcduError::Validation`] with every violated field
    /// - [`HcduError::DuplicateIdentity`] for a national id already on the roster
    /// - [`HcduError::Transport`] / [`HcduError::Rejected`] from the backend
    pub async fn register(
        &self,
        store: &mut ClinicalRecordStore,
        session: &SessionContext,
        draft: &IntakeDraft,
        today: NaiveDate,
    ) -> HcduResult<Patient> {
        session.require_writer("register patients")?;

        let intake = self
            .validator
            .validate(draft, today)
            .map_err(HcduError::Validation)?;

        if store.contains_national_id(&intake.patient().national_id) {
            tracing::warn!(
                "intake rejected: national id {} already registered",
                intake.patient().national_id
            );
            return Err(HcduError::DuplicateIdentity(
                intake.patient().national_id.clone(),
            ));
        }

        let issued_id = self.api.add_patient(intake.patient()).await.map_err(|e| {
            tracing::error!("remote patient creation failed: {}", e);
            e
        })?;

        store.add_patient(session, intake, issued_id)
    }
}
