//! Login session: active user, selected patient and permission predicates.
//!
//! The session only computes permissions. Enforcement happens in the store
//! and the user directory, which consult the session before every mutation.

use crate::snomed::Diagnosis;
use crate::users::UserDirectory;
use crate::{HcduError, HcduResult};
use hcdu_types::PatientId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a system user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Read-only access to every record.
    Auditor,
    /// Health-care provider ("prestador").
    #[serde(alias = "prestador")]
    Provider,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Auditor => "auditor",
            Role::Provider => "provider",
        }
    }

    pub fn can_write(self) -> bool {
        matches!(self, Role::Admin | Role::Provider)
    }

    pub fn can_administer(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HcduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "auditor" => Ok(Role::Auditor),
            "provider" | "prestador" => Ok(Role::Provider),
            other => Err(HcduError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated user as seen by the rest of the system (no password).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveUser {
    pub username: String,
    pub role: Role,
}

/// Per-browser session state.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    user: Option<ActiveUser>,
    selected_patient: Option<PatientId>,
    secondary_diagnoses: Vec<Diagnosis>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticates against `directory` with an exact, case-sensitive match.
    ///
    /// A successful login starts a fresh session: any previously selected
    /// patient and pending secondary diagnoses are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HcduError::AuthenticationFailure`] and leaves the session
    /// untouched when no credential matches.
    pub fn login(
        &mut self,
        directory: &UserDirectory,
        username: &str,
        password: &str,
    ) -> HcduResult<&ActiveUser> {
        let user = directory
            .authenticate(username, password)
            .ok_or(HcduError::AuthenticationFailure)?;

        tracing::info!("user {} logged in as {}", user.username, user.role);

        self.selected_patient = None;
        self.secondary_diagnoses.clear();
        Ok(&*self.user.insert(ActiveUser {
            username: user.username.clone(),
            role: user.role,
        }))
    }

    /// Clears the active user, the selected patient and pending diagnoses.
    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!("user {} logged out", user.username);
        }
        self.selected_patient = None;
        self.secondary_diagnoses.clear();
    }

    pub fn current_user(&self) -> Option<&ActiveUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True for admins and providers; auditors are read-only.
    pub fn can_write(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.can_write())
    }

    /// True when the admin panel should be shown.
    pub fn can_administer(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.can_administer())
    }

    pub fn selected_patient(&self) -> Option<&PatientId> {
        self.selected_patient.as_ref()
    }

    /// Marks `id` as the active patient. Existence is checked by
    /// [`crate::store::ClinicalRecordStore::select_patient`].
    pub(crate) fn set_selected_patient(&mut self, id: PatientId) -> HcduResult<()> {
        if self.user.is_none() {
            return Err(HcduError::NotAuthenticated);
        }
        if self.selected_patient.as_ref() != Some(&id) {
            self.secondary_diagnoses.clear();
        }
        self.selected_patient = Some(id);
        Ok(())
    }

    /// Adds a secondary diagnosis to the pending list of the next outpatient visit.
    ///
    /// A diagnosis whose code is already pending is ignored.
    pub fn add_secondary_diagnosis(&mut self, diagnosis: Diagnosis) {
        if !self
            .secondary_diagnoses
            .iter()
            .any(|d| d.code == diagnosis.code)
        {
            self.secondary_diagnoses.push(diagnosis);
        }
    }

    pub fn secondary_diagnoses(&self) -> &[Diagnosis] {
        &self.secondary_diagnoses
    }

    pub(crate) fn take_secondary_diagnoses(&mut self) -> Vec<Diagnosis> {
        std::mem::take(&mut self.secondary_diagnoses)
    }

    /// Returns the active user when they may mutate clinical records.
    pub(crate) fn require_writer(&self, action: &'static str) -> HcduResult<&ActiveUser> {
        let user = self.user.as_ref().ok_or(HcduError::NotAuthenticated)?;
        if !user.role.can_write() {
            tracing::warn!("denied {} to read-only user {}", action, user.username);
            return Err(HcduError::PermissionDenied {
                username: user.username.clone(),
                role: user.role,
                action,
            });
        }
        Ok(user)
    }

    /// Returns the active user when they may administer users.
    pub(crate) fn require_admin(&self, action: &'static str) -> HcduResult<&ActiveUser> {
        let user = self.user.as_ref().ok_or(HcduError::NotAuthenticated)?;
        if !user.role.can_administer() {
            tracing::warn!("denied {} to non-admin user {}", action, user.username);
            return Err(HcduError::PermissionDenied {
                username: user.username.clone(),
                role: user.role,
                action,
            });
        }
        Ok(user)
    }
}
