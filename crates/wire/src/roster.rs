//! Roster envelope returned by `?action=get_patients`.
//!
//! ```json
//! { "success": true,
//!   "data": [ { "id": 1, "nombre": "...", "documento": "...", "nacimiento": "1976-04-12",
//!               "sexo": "F", "domicilio": "...", "telefono": "...", "obra_social": "..." } ],
//!   "message": null }
//! ```

use crate::{parse_with_path, TextOrNumber, WireError, WireResult};
use chrono::NaiveDate;
use hcdu_types::{FiliatoryInfo, NationalId, NonEmptyText, Patient, PatientId, Sex};
use serde::Deserialize;

/// Query action used by the roster endpoint.
pub const GET_PATIENTS_ACTION: &str = "get_patients";

/// Placeholder the backend writes for unknown dates.
const ZERO_DATE: &str = "0000-00-00";

/// Domain-level result of a roster response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterData {
    /// `success` flag reported by the backend.
    pub success: bool,
    /// Backend message, usually only present on failure.
    pub message: Option<String>,
    /// Rows that translated into canonical patients, in response order.
    pub patients: Vec<Patient>,
    /// Number of rows dropped because they could not be translated.
    pub skipped: usize,
}

/// Roster envelope operations.
///
/// Zero-sized namespace; all methods are associated functions.
pub struct Roster;

impl Roster {
    /// Parse a roster response body.
    ///
    /// The envelope itself must be well-formed. Individual rows that fail to
    /// translate are logged and counted in [`RosterData::skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the body is not JSON or the envelope does not
    /// match the expected schema.
    pub fn parse(json_text: &str) -> WireResult<RosterData> {
        let wire: RosterEnvelopeWire = parse_with_path(json_text, "Roster")?;

        let mut patients = Vec::with_capacity(wire.data.len());
        let mut skipped = 0;
        for (index, raw) in wire.data.into_iter().enumerate() {
            match row_from_value(raw).and_then(row_to_domain) {
                Ok(patient) => patients.push(patient),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("skipping roster row {}: {}", index, e);
                }
            }
        }

        Ok(RosterData {
            success: wire.success,
            message: wire.message,
            patients,
            skipped,
        })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RosterEnvelopeWire {
    success: bool,
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AfiliadoRowWire {
    id: TextOrNumber,
    nombre: String,
    documento: TextOrNumber,
    #[serde(default)]
    nacimiento: Option<String>,
    #[serde(default)]
    sexo: Option<String>,
    #[serde(default)]
    domicilio: Option<String>,
    #[serde(default)]
    telefono: Option<TextOrNumber>,
    #[serde(default)]
    obra_social: Option<TextOrNumber>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn row_from_value(raw: serde_json::Value) -> WireResult<AfiliadoRowWire> {
    serde_path_to_error::deserialize(raw).map_err(|err| {
        WireError::Translation(format!(
            "Afiliado schema mismatch at {}: {}",
            err.path(),
            err.inner()
        ))
    })
}

fn row_to_domain(row: AfiliadoRowWire) -> WireResult<Patient> {
    let id = PatientId::new(row.id.into_string())
        .map_err(|e| WireError::Translation(format!("Invalid patient id: {e}")))?;
    let full_name = NonEmptyText::new(&row.nombre)
        .map_err(|e| WireError::Translation(format!("Invalid nombre for {id}: {e}")))?;
    let national_id = NationalId::parse(&row.documento.into_string())
        .map_err(|e| WireError::Translation(format!("Invalid documento for {id}: {e}")))?;
    let birth_date = parse_wire_date(row.nacimiento.as_deref())
        .map_err(|e| WireError::Translation(format!("Invalid nacimiento for {id}: {e}")))?;
    let sex = row
        .sexo
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.parse::<Sex>().ok());

    Ok(Patient {
        id,
        full_name,
        national_id,
        birth_date,
        sex,
        filiatory: FiliatoryInfo {
            address: row.domicilio.unwrap_or_default(),
            phone: row.telefono.map(TextOrNumber::into_string).unwrap_or_default(),
            insurance_number: row
                .obra_social
                .map(TextOrNumber::into_string)
                .unwrap_or_default(),
        },
    })
}

/// Parse an optional `YYYY-MM-DD` date; blank and zero dates mean "unknown".
pub(crate) fn parse_wire_date(
    value: Option<&str>,
) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match value.map(str::trim) {
        None | Some("") | Some(ZERO_DATE) => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d").map(Some),
    }
}

/// Render an optional date the way the backend expects it (empty when unknown).
pub(crate) fn render_wire_date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
