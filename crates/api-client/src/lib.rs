//! # HCDU API client
//!
//! HTTP implementation of [`PatientApi`] for the legacy `api.php` backend.
//!
//! - `GET {endpoint}?action=get_patients` loads the roster
//! - `POST {endpoint}` with a JSON body creates a patient
//!
//! Bodies are translated by `hcdu-wire`; every failure is mapped onto
//! [`HcduError::Transport`] or [`HcduError::Rejected`] so the core can decide
//! on fallbacks without knowing about HTTP.

use async_trait::async_trait;
use hcdu_core::{CoreConfig, HcduError, HcduResult, PatientApi};
use hcdu_types::{NewPatient, Patient, PatientId};
use hcdu_wire::affiliation::Affiliation;
use hcdu_wire::roster::{Roster, GET_PATIENTS_ACTION};
use reqwest::Client;

/// [`PatientApi`] backed by the remote PHP endpoint.
#[derive(Clone, Debug)]
pub struct HttpPatientApi {
    client: Client,
    endpoint: String,
}

impl HttpPatientApi {
    /// Builds a client for the endpoint and timeout in `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`HcduError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: &CoreConfig) -> HcduResult<Self> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| HcduError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: cfg.api_endpoint().to_string(),
        })
    }
}

#[async_trait]
impl PatientApi for HttpPatientApi {
    async fn fetch_roster(&self) -> HcduResult<Vec<Patient>> {
        tracing::debug!("GET {}?action={}", self.endpoint, GET_PATIENTS_ACTION);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", GET_PATIENTS_ACTION)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;
        let body = response.text().await.map_err(transport)?;

        let roster = Roster::parse(&body)
            .map_err(|e| HcduError::Transport(format!("malformed roster response: {e}")))?;
        if !roster.success {
            return Err(HcduError::Rejected(
                roster
                    .message
                    .unwrap_or_else(|| "roster request failed".to_string()),
            ));
        }
        if roster.skipped > 0 {
            tracing::warn!("{} roster rows could not be read", roster.skipped);
        }

        Ok(roster.patients)
    }

    async fn add_patient(&self, patient: &NewPatient) -> HcduResult<Option<PatientId>> {
        let request = Affiliation::render_request(patient)
            .map_err(|e| HcduError::InvalidInput(e.to_string()))?;
        tracing::debug!("POST {} (add patient {})", self.endpoint, patient.national_id);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        // The backend reports business failures in the body, sometimes with an error status.
        let outcome = match Affiliation::parse_response(&body) {
            Ok(outcome) => outcome,
            Err(_) if !status.is_success() => {
                return Err(HcduError::Transport(format!("HTTP {status}")));
            }
            Err(e) => {
                return Err(HcduError::Transport(format!(
                    "malformed creation response: {e}"
                )));
            }
        };

        if !outcome.success {
            return Err(HcduError::Rejected(
                outcome
                    .message
                    .unwrap_or_else(|| "patient creation failed".to_string()),
            ));
        }
        Ok(outcome.id)
    }
}

fn transport(e: reqwest::Error) -> HcduError {
    HcduError::Transport(e.to_string())
}
