//! Patient creation ("afiliación") request and response.

use crate::roster::render_wire_date;
use crate::{parse_with_path, TextOrNumber, WireError, WireResult};
use hcdu_types::{NewPatient, PatientId, Sex};
use serde::{Deserialize, Serialize};

/// `action` discriminator expected by the backend for patient creation.
pub const ADD_PATIENT_ACTION: &str = "add_patient";

/// Domain-level result of a patient creation response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffiliationOutcome {
    pub success: bool,
    /// Id issued by the backend, when it returned one.
    pub id: Option<PatientId>,
    pub message: Option<String>,
}

/// Patient creation operations.
pub struct Affiliation;

impl Affiliation {
    /// Render the JSON request body for creating `patient`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if serialisation fails.
    pub fn render_request(patient: &NewPatient) -> WireResult<String> {
        let wire = AddPatientReqWire {
            action: ADD_PATIENT_ACTION,
            nombre: patient.full_name.as_str(),
            documento: patient.national_id.as_str(),
            nacimiento: render_wire_date(patient.birth_date),
            sexo: patient.sex.map(Sex::code).unwrap_or_default(),
            domicilio: &patient.filiatory.address,
            telefono: &patient.filiatory.phone,
            os_nro: &patient.filiatory.insurance_number,
        };
        serde_json::to_string(&wire)
            .map_err(|e| WireError::Translation(format!("Failed to serialise request: {e}")))
    }

    /// Parse the backend's answer to a creation request.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the body is not a well-formed response envelope,
    /// or if a successful response carries a blank id.
    pub fn parse_response(json_text: &str) -> WireResult<AffiliationOutcome> {
        let wire: AddPatientResWire = parse_with_path(json_text, "Affiliation response")?;

        let id = match wire.data.and_then(|d| d.id) {
            Some(raw) => Some(
                PatientId::new(raw.into_string())
                    .map_err(|e| WireError::InvalidInput(format!("Invalid issued id: {e}")))?,
            ),
            None => None,
        };

        Ok(AffiliationOutcome {
            success: wire.success,
            id,
            message: wire.message,
        })
    }
}

#[derive(Debug, Serialize)]
struct AddPatientReqWire<'a> {
    action: &'static str,
    nombre: &'a str,
    documento: &'a str,
    nacimiento: String,
    sexo: &'static str,
    domicilio: &'a str,
    telefono: &'a str,
    os_nro: &'a str,
}

#[derive(Debug, Deserialize)]
struct AddPatientResWire {
    success: bool,
    #[serde(default)]
    data: Option<AddPatientDataWire>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddPatientDataWire {
    #[serde(default)]
    id: Option<TextOrNumber>,
}
