//! Canonical in-memory state of the roster and every clinical record.
//!
//! [`ClinicalRecordStore`] is the only owner of patient state. All mutation
//! goes through its operations, each of which:
//! - consults the caller's [`SessionContext`] for write permission first,
//! - checks its domain precondition before touching anything, so a rejected
//!   command leaves no partial change,
//! - only ever changes the targeted patient's record.

use crate::intake::{InitialEncounter, ValidatedIntake};
use crate::records::{
    Admission, AdmissionEpisode, ClinicalRecord, DentalProcedure, Dispense, EvolutionNote,
    ImagingStudy, KineSession, LabResult, OutpatientVisit, Stamped,
};
use crate::session::SessionContext;
use crate::{HcduError, HcduResult};
use chrono::NaiveDate;
use hcdu_types::{NationalId, Patient, PatientId};
use serde::Serialize;
use std::collections::HashMap;

/// Where the current roster came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DataMode {
    /// Loaded from the remote API.
    Live,
    /// The remote API failed and the built-in mock roster is in use.
    Degraded,
}

/// Immutable copy of one patient and their record, handed to the view layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientSnapshot {
    pub patient: Patient,
    pub record: ClinicalRecord,
}

#[derive(Clone, Debug)]
pub struct ClinicalRecordStore {
    patients: Vec<Patient>,
    records: HashMap<PatientId, ClinicalRecord>,
    mode: DataMode,
}

impl Default for ClinicalRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicalRecordStore {
    /// An empty, live store.
    pub fn new() -> Self {
        Self {
            patients: Vec::new(),
            records: HashMap::new(),
            mode: DataMode::Live,
        }
    }

    /// A store holding `patients`, each with an empty record.
    pub fn with_roster(patients: Vec<Patient>, mode: DataMode) -> Self {
        let mut store = Self::new();
        store.replace_roster(patients, mode);
        store
    }

    pub fn data_mode(&self) -> DataMode {
        self.mode
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Installs a freshly loaded roster.
    ///
    /// A record is kept only when the data mode is unchanged and the patient
    /// with that id still has the same national id. Every other patient gets
    /// an empty record, so mock data never leaks into live patients and vice
    /// versa. Rows repeating an id or national id already seen are ignored.
    pub fn replace_roster(&mut self, patients: Vec<Patient>, mode: DataMode) {
        let mut records = std::mem::take(&mut self.records);
        let previous = std::mem::take(&mut self.patients);
        if mode != self.mode {
            tracing::info!(
                "data mode {:?} -> {:?}, starting {} records fresh",
                self.mode,
                mode,
                records.len()
            );
            records.clear();
        }
        let mut roster: Vec<Patient> = Vec::with_capacity(patients.len());
        let mut fresh = HashMap::with_capacity(patients.len());

        for patient in patients {
            if fresh.contains_key(&patient.id)
                || roster.iter().any(|p| p.national_id == patient.national_id)
            {
                tracing::warn!(
                    "ignoring duplicate roster entry {} (national id {})",
                    patient.id,
                    patient.national_id
                );
                continue;
            }
            let same_person = previous
                .iter()
                .any(|p| p.id == patient.id && p.national_id == patient.national_id);
            let record = if same_person {
                records.remove(&patient.id).unwrap_or_default()
            } else {
                ClinicalRecord::default()
            };
            fresh.insert(patient.id.clone(), record);
            roster.push(patient);
        }

        if !records.is_empty() {
            tracing::debug!("dropped {} records not carried over", records.len());
        }

        self.patients = roster;
        self.records = fresh;
        self.mode = mode;
    }

    pub fn contains_national_id(&self, national_id: &NationalId) -> bool {
        self.patients.iter().any(|p| &p.national_id == national_id)
    }

    pub fn find_by_id(&self, id: &PatientId) -> Option<&Patient> {
        self.patients.iter().find(|p| &p.id == id)
    }

    /// Case-insensitive substring search over names and national ids, in roster order.
    pub fn search(&self, query: &str) -> Vec<&Patient> {
        self.patients.iter().filter(|p| p.matches(query)).collect()
    }

    pub fn record(&self, id: &PatientId) -> Option<&ClinicalRecord> {
        self.records.get(id)
    }

    pub fn snapshot(&self, id: &PatientId) -> Option<PatientSnapshot> {
        let patient = self.find_by_id(id)?.clone();
        let record = self.records.get(id)?.clone();
        Some(PatientSnapshot { patient, record })
    }

    /// Makes `id` the session's active patient.
    ///
    /// # Errors
    ///
    /// Fails with [`HcduError::NotAuthenticated`] without a logged-in user and
    /// [`HcduError::PatientNotFound`] for unknown ids.
    pub fn select_patient(
        &self,
        session: &mut SessionContext,
        id: &PatientId,
    ) -> HcduResult<&Patient> {
        if !session.is_authenticated() {
            return Err(HcduError::NotAuthenticated);
        }
        let patient = self
            .find_by_id(id)
            .ok_or_else(|| HcduError::PatientNotFound(id.clone()))?;
        session.set_selected_patient(id.clone())?;
        Ok(patient)
    }

    /// Admits a validated intake as a new patient with a fresh record.
    ///
    /// The patient gets `issued_id` when the remote API assigned one, otherwise
    /// the next sequential `p<n>` id. An issued id that collides with a local
    /// one also falls back to the sequential id, since the backend has already
    /// committed the patient by then. The intake's initial encounter is
    /// appended to the matching module, stamped with the acting user.
    ///
    /// # Errors
    ///
    /// - [`HcduError::PermissionDenied`] / [`HcduError::NotAuthenticated`] without write access
    /// - [`HcduError::DuplicateIdentity`] when the national id is already on the roster
    pub fn add_patient(
        &mut self,
        session: &SessionContext,
        intake: ValidatedIntake,
        issued_id: Option<PatientId>,
    ) -> HcduResult<Patient> {
        let actor = session.require_writer("register patients")?;

        if self.contains_national_id(&intake.patient().national_id) {
            return Err(HcduError::DuplicateIdentity(
                intake.patient().national_id.clone(),
            ));
        }

        let id = match issued_id {
            Some(id) if self.records.contains_key(&id) => {
                let fallback = self.next_sequential_id();
                tracing::warn!(
                    "issued patient id {} is already in use locally, storing as {}",
                    id,
                    fallback
                );
                fallback
            }
            Some(id) => id,
            None => self.next_sequential_id(),
        };

        let (new_patient, encounter_date, encounter) = intake.into_parts();
        let mut record = ClinicalRecord::default();
        seed_initial_encounter(&mut record, encounter, encounter_date, &actor.username);

        let patient = new_patient.with_id(id);
        tracing::info!(
            "{} registered patient {} (national id {})",
            actor.username,
            patient.id,
            patient.national_id
        );

        self.records.insert(patient.id.clone(), record);
        self.patients.push(patient.clone());
        Ok(patient)
    }

    /// Appends an outpatient visit carrying the session's pending secondary diagnoses.
    ///
    /// The session's accumulator is cleared only when the visit is recorded.
    ///
    /// # Errors
    ///
    /// Fails with [`HcduError::MissingDiagnosis`] when the visit has no primary
    /// diagnosis, besides the permission and lookup errors of every mutation.
    pub fn record_outpatient_visit(
        &mut self,
        session: &mut SessionContext,
        id: &PatientId,
        mut visit: OutpatientVisit,
    ) -> HcduResult<()> {
        let (record, _) = self.writable_record(session, id, "record outpatient visits")?;
        if visit.diagnosis.is_none() {
            return Err(HcduError::MissingDiagnosis);
        }

        visit
            .secondary_diagnoses
            .extend(session.take_secondary_diagnoses());
        tracing::debug!("outpatient visit recorded for {}", id);
        record.push_outpatient_visit(visit);
        Ok(())
    }

    /// Opens an admission.
    ///
    /// # Errors
    ///
    /// Fails with [`HcduError::MissingDiagnosis`] without an admission diagnosis
    /// and [`HcduError::AdmissionAlreadyOpen`] while another admission is open.
    pub fn open_admission(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        admission: Admission,
    ) -> HcduResult<()> {
        let (record, _) = self.writable_record(session, id, "open admissions")?;
        if admission.diagnosis.is_none() {
            return Err(HcduError::MissingDiagnosis);
        }
        if record.admission().is_some() {
            return Err(HcduError::AdmissionAlreadyOpen(id.clone()));
        }

        tracing::debug!("admission opened for {} on {}", id, admission.admitted_on);
        record.set_admission(admission);
        Ok(())
    }

    /// Discharges the open admission, archiving it with its evolutions.
    ///
    /// # Errors
    ///
    /// Fails with [`HcduError::NoActiveAdmission`] when nothing is open and
    /// [`HcduError::InvalidInput`] when `discharged_on` precedes the admission date.
    pub fn discharge_admission(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        discharged_on: NaiveDate,
    ) -> HcduResult<AdmissionEpisode> {
        let (record, username) = self.writable_record(session, id, "discharge admissions")?;
        let admitted_on = record
            .admission()
            .map(|a| a.admitted_on)
            .ok_or_else(|| HcduError::NoActiveAdmission(id.clone()))?;
        if discharged_on < admitted_on {
            return Err(HcduError::InvalidInput(format!(
                "discharge date {discharged_on} is before admission date {admitted_on}"
            )));
        }

        let episode = record
            .close_admission(discharged_on, username)
            .ok_or_else(|| HcduError::NoActiveAdmission(id.clone()))?
            .clone();

        tracing::debug!("admission of {} discharged on {}", id, discharged_on);
        Ok(episode)
    }

    /// Appends a progress note to the open admission.
    ///
    /// # Errors
    ///
    /// Fails with [`HcduError::NoActiveAdmission`] when no admission is open.
    pub fn record_evolution(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        note: EvolutionNote,
    ) -> HcduResult<()> {
        let (record, recorded_by) = self.writable_record(session, id, "record evolutions")?;
        if record.admission().is_none() {
            return Err(HcduError::NoActiveAdmission(id.clone()));
        }

        record.push_evolution(Stamped {
            recorded_by,
            entry: note,
        });
        tracing::debug!("evolution recorded for {}", id);
        Ok(())
    }

    pub fn record_pharmacy(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        dispense: Dispense,
    ) -> HcduResult<()> {
        let (record, recorded_by) = self.writable_record(session, id, "record dispenses")?;
        record.push_dispense(Stamped {
            recorded_by,
            entry: dispense,
        });
        tracing::debug!("dispense recorded for {}", id);
        Ok(())
    }

    pub fn record_lab(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        result: LabResult,
    ) -> HcduResult<()> {
        let (record, recorded_by) = self.writable_record(session, id, "record lab results")?;
        record.push_lab_result(Stamped {
            recorded_by,
            entry: result,
        });
        tracing::debug!("lab result recorded for {}", id);
        Ok(())
    }

    pub fn record_imaging(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        study: ImagingStudy,
    ) -> HcduResult<()> {
        let (record, recorded_by) = self.writable_record(session, id, "record imaging studies")?;
        record.push_imaging_study(Stamped {
            recorded_by,
            entry: study,
        });
        tracing::debug!("imaging study recorded for {}", id);
        Ok(())
    }

    pub fn record_kinesiology(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        kine: KineSession,
    ) -> HcduResult<()> {
        let (record, recorded_by) =
            self.writable_record(session, id, "record kinesiology sessions")?;
        record.push_kine_session(Stamped {
            recorded_by,
            entry: kine,
        });
        tracing::debug!("kinesiology session recorded for {}", id);
        Ok(())
    }

    pub fn record_dental(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        procedure: DentalProcedure,
    ) -> HcduResult<()> {
        let (record, recorded_by) =
            self.writable_record(session, id, "record dental procedures")?;
        record.push_dental_procedure(Stamped {
            recorded_by,
            entry: procedure,
        });
        tracing::debug!("dental procedure recorded for {}", id);
        Ok(())
    }

    /// Permission check plus lookup shared by every record mutation.
    fn writable_record(
        &mut self,
        session: &SessionContext,
        id: &PatientId,
        action: &'static str,
    ) -> HcduResult<(&mut ClinicalRecord, String)> {
        let username = session.require_writer(action)?.username.clone();
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| HcduError::PatientNotFound(id.clone()))?;
        Ok((record, username))
    }

    fn next_sequential_id(&self) -> PatientId {
        let highest = self
            .patients
            .iter()
            .filter_map(|p| p.id.sequence_number())
            .max()
            .unwrap_or(0);
        PatientId::sequential(highest + 1)
    }
}

fn seed_initial_encounter(
    record: &mut ClinicalRecord,
    encounter: InitialEncounter,
    date: NaiveDate,
    actor: &str,
) {
    let recorded_by = actor.to_string();
    match encounter {
        InitialEncounter::Ambulatory {
            reason,
            professional,
            diagnosis,
        } => record.push_outpatient_visit(OutpatientVisit {
            date,
            professional,
            reason,
            diagnosis,
            ..Default::default()
        }),
        InitialEncounter::Admission {
            admission_type,
            service,
            bed,
            diagnosis,
        } => record.set_admission(Admission {
            kind: admission_type,
            admitted_on: date,
            service,
            bed,
            diagnosis,
        }),
        InitialEncounter::Lab { study, result } => record.push_lab_result(Stamped {
            recorded_by,
            entry: LabResult {
                date,
                study,
                result,
            },
        }),
        InitialEncounter::Imaging { study, report } => record.push_imaging_study(Stamped {
            recorded_by,
            entry: ImagingStudy {
                date,
                study,
                report,
            },
        }),
        InitialEncounter::Kinesiology { technique, notes } => {
            record.push_kine_session(Stamped {
                recorded_by,
                entry: KineSession {
                    date,
                    technique,
                    notes,
                },
            })
        }
        InitialEncounter::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{IntakeDraft, IntakeValidator};
    use crate::records::EvolutionTimeline;
    use crate::roster::mock_roster;
    use crate::snomed::Diagnosis;
    use crate::users::UserDirectory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn pid(id: &str) -> PatientId {
        PatientId::new(id).expect("valid patient id")
    }

    fn session_as(username: &str, password: &str) -> SessionContext {
        let directory = UserDirectory::bootstrap();
        let mut session = SessionContext::new();
        session
            .login(&directory, username, password)
            .expect("bootstrap credentials should log in");
        session
    }

    fn store_with_mock() -> ClinicalRecordStore {
        ClinicalRecordStore::with_roster(mock_roster(), DataMode::Degraded)
    }

    fn validated(draft: &IntakeDraft) -> ValidatedIntake {
        IntakeValidator::new()
            .validate(draft, date(2025, 3, 1))
            .expect("draft should validate")
    }

    fn hypertension() -> Diagnosis {
        Diagnosis::new("Hipertensión esencial", "59621000")
    }

    fn admission_with_diagnosis() -> Admission {
        Admission {
            kind: "programada".into(),
            admitted_on: date(2025, 3, 2),
            service: "Clínica Médica".into(),
            bed: "12".into(),
            diagnosis: Some(hypertension()),
        }
    }

    #[test]
    fn duplicate_national_id_is_rejected_without_change() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let intake = validated(&IntakeDraft::new("Otra Persona", "23456789"));

        let err = store
            .add_patient(&session, intake, None)
            .expect_err("duplicate national id should be rejected");

        assert!(matches!(err, HcduError::DuplicateIdentity(ref id) if id.as_str() == "23456789"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ambulatory_intake_seeds_one_outpatient_visit() {
        let mut store = store_with_mock();
        let session = session_as("prestador", "prestador123");
        let draft = IntakeDraft::new("Ana Ruiz", "99112233")
            .with_encounter("ambulatory")
            .with_detail("reason", "Control")
            .with_detail("professional", "Dra. Díaz");

        let patient = store
            .add_patient(&session, validated(&draft), None)
            .expect("intake should be admitted");

        assert_eq!(store.len(), 3);
        assert_eq!(patient.id.as_str(), "p3");
        let record = store.record(&patient.id).expect("record should exist");
        assert_eq!(record.outpatient_visits().len(), 1);
        assert_eq!(record.outpatient_visits()[0].reason, "Control");
        assert_eq!(record.outpatient_visits()[0].date, date(2025, 3, 1));
        assert!(record.admission().is_none());
    }

    #[test]
    fn issued_id_is_used_and_other_kind_seeds_nothing() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let draft = IntakeDraft::new("Ana Ruiz", "99112233").with_encounter("other");

        let patient = store
            .add_patient(&session, validated(&draft), Some(pid("417")))
            .expect("intake should be admitted");

        assert_eq!(patient.id.as_str(), "417");
        let record = store.record(&patient.id).expect("record should exist");
        assert_eq!(record, &ClinicalRecord::default());
    }

    #[test]
    fn admission_intake_opens_admission_and_imaging_lands_in_imaging() {
        let mut store = ClinicalRecordStore::new();
        let session = session_as("admin", "admin123");
        let admitted = IntakeDraft::new("Ana Ruiz", "99112233")
            .with_encounter("internacion")
            .with_detail("service", "Cirugía")
            .with_detail("diagnosis", "Apendicitis aguda (85189001)");
        let imaged = IntakeDraft::new("Luis Sosa", "20111222")
            .with_encounter("imaging")
            .with_detail("study", "Rx tórax");

        let a = store
            .add_patient(&session, validated(&admitted), None)
            .expect("admission intake should be admitted");
        let b = store
            .add_patient(&session, validated(&imaged), None)
            .expect("imaging intake should be admitted");

        let admission = store
            .record(&a.id)
            .and_then(|r| r.admission())
            .expect("admission should be open");
        assert_eq!(admission.service, "Cirugía");
        assert_eq!(
            admission.diagnosis.as_ref().map(|d| d.code.as_str()),
            Some("85189001")
        );

        let record = store.record(&b.id).expect("record should exist");
        assert_eq!(record.imaging_studies().len(), 1);
        assert!(record.lab_results().is_empty());
        assert_eq!(record.imaging_studies()[0].recorded_by, "admin");
        assert_eq!(b.id.as_str(), "p2");
    }

    #[test]
    fn outpatient_visit_requires_primary_diagnosis() {
        let mut store = store_with_mock();
        let mut session = session_as("admin", "admin123");
        session.add_secondary_diagnosis(hypertension());

        let err = store
            .record_outpatient_visit(&mut session, &pid("p1"), OutpatientVisit::default())
            .expect_err("visit without diagnosis should be rejected");

        assert!(matches!(err, HcduError::MissingDiagnosis));
        let record = store.record(&pid("p1")).expect("record should exist");
        assert!(record.outpatient_visits().is_empty());
        assert_eq!(session.secondary_diagnoses().len(), 1);
    }

    #[test]
    fn outpatient_visit_takes_pending_secondary_diagnoses() {
        let mut store = store_with_mock();
        let mut session = session_as("admin", "admin123");
        let diabetes = Diagnosis::new("Diabetes mellitus tipo 2", "44054006");
        session.add_secondary_diagnosis(diabetes.clone());
        session.add_secondary_diagnosis(diabetes.clone());

        let visit = OutpatientVisit {
            date: date(2025, 3, 1),
            reason: "Cefalea".into(),
            diagnosis: Some(hypertension()),
            ..Default::default()
        };
        store
            .record_outpatient_visit(&mut session, &pid("p1"), visit)
            .expect("visit should be recorded");

        let record = store.record(&pid("p1")).expect("record should exist");
        assert_eq!(record.outpatient_visits()[0].secondary_diagnoses, vec![diabetes]);
        assert!(session.secondary_diagnoses().is_empty());
    }

    #[test]
    fn evolution_without_admission_is_rejected() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let note = EvolutionNote {
            date: date(2025, 3, 3),
            note: "Estable".into(),
        };

        let err = store
            .record_evolution(&session, &pid("p2"), note)
            .expect_err("evolution without admission should be rejected");

        assert!(matches!(err, HcduError::NoActiveAdmission(_)));
        let record = store.record(&pid("p2")).expect("record should exist");
        assert!(record.evolutions().is_empty());
        assert_eq!(record.evolution_timeline(), EvolutionTimeline::NoAdmission);
    }

    #[test]
    fn admission_lifecycle_archives_evolutions_on_discharge() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let id = pid("p2");

        store
            .open_admission(&session, &id, admission_with_diagnosis())
            .expect("admission should open");
        let err = store
            .open_admission(&session, &id, admission_with_diagnosis())
            .expect_err("second admission should be rejected");
        assert!(matches!(err, HcduError::AdmissionAlreadyOpen(_)));

        store
            .record_evolution(
                &session,
                &id,
                EvolutionNote {
                    date: date(2025, 3, 3),
                    note: "Afebril".into(),
                },
            )
            .expect("evolution should be recorded");

        let episode = store
            .discharge_admission(&session, &id, date(2025, 3, 5))
            .expect("discharge should succeed");
        assert_eq!(episode.evolutions.len(), 1);
        assert_eq!(episode.discharged_by, "admin");

        let record = store.record(&id).expect("record should exist");
        assert!(record.admission().is_none());
        assert!(record.evolutions().is_empty());
        assert_eq!(record.past_admissions().len(), 1);

        let err = store
            .discharge_admission(&session, &id, date(2025, 3, 6))
            .expect_err("nothing left to discharge");
        assert!(matches!(err, HcduError::NoActiveAdmission(_)));
    }

    #[test]
    fn admission_requires_diagnosis() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let admission = Admission {
            diagnosis: None,
            ..admission_with_diagnosis()
        };

        let err = store
            .open_admission(&session, &pid("p1"), admission)
            .expect_err("admission without diagnosis should be rejected");
        assert!(matches!(err, HcduError::MissingDiagnosis));
        assert!(store.record(&pid("p1")).and_then(|r| r.admission()).is_none());
    }

    #[test]
    fn auditor_cannot_mutate_records() {
        let mut store = store_with_mock();
        let session = session_as("auditor", "auditor123");
        let before = store.snapshot(&pid("p1")).expect("snapshot should exist");

        let err = store
            .record_lab(
                &session,
                &pid("p1"),
                LabResult {
                    date: date(2025, 3, 1),
                    study: "Hemograma".into(),
                    result: "Normal".into(),
                },
            )
            .expect_err("auditor should be denied");
        assert!(matches!(err, HcduError::PermissionDenied { .. }));

        let intake = validated(&IntakeDraft::new("Ana Ruiz", "99112233"));
        let err = store
            .add_patient(&session, intake, None)
            .expect_err("auditor should be denied");
        assert!(matches!(err, HcduError::PermissionDenied { .. }));

        assert_eq!(store.snapshot(&pid("p1")), Some(before));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn logged_out_session_cannot_mutate() {
        let mut store = store_with_mock();
        let session = SessionContext::new();
        let err = store
            .record_dental(
                &session,
                &pid("p1"),
                DentalProcedure {
                    date: date(2025, 3, 1),
                    tooth: "36".into(),
                    procedure: "Obturación".into(),
                    notes: String::new(),
                },
            )
            .expect_err("anonymous session should be denied");
        assert!(matches!(err, HcduError::NotAuthenticated));
    }

    #[test]
    fn entries_are_stamped_with_the_acting_user() {
        let mut store = store_with_mock();
        let session = session_as("operador", "operator123");
        let id = pid("p1");

        store
            .record_pharmacy(
                &session,
                &id,
                Dispense {
                    date: date(2025, 3, 1),
                    medication: "Enalapril 10 mg".into(),
                    quantity: 30,
                    notes: String::new(),
                },
            )
            .expect("dispense should be recorded");
        store
            .record_kinesiology(
                &session,
                &id,
                KineSession {
                    date: date(2025, 3, 1),
                    technique: "Electroterapia".into(),
                    notes: String::new(),
                },
            )
            .expect("kinesiology session should be recorded");

        let record = store.record(&id).expect("record should exist");
        assert_eq!(record.pharmacy_dispenses()[0].recorded_by, "operador");
        assert_eq!(record.pharmacy_dispenses()[0].quantity, 30);
        assert_eq!(record.kinesiology_sessions()[0].recorded_by, "operador");
        assert!(store.record(&pid("p2")).is_some_and(|r| r.pharmacy_dispenses().is_empty()));
    }

    #[test]
    fn unknown_patient_is_reported() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let err = store
            .record_imaging(
                &session,
                &pid("p99"),
                ImagingStudy {
                    date: date(2025, 3, 1),
                    study: "Ecografía".into(),
                    report: String::new(),
                },
            )
            .expect_err("unknown patient should be reported");
        assert!(matches!(err, HcduError::PatientNotFound(_)));
    }

    #[test]
    fn select_patient_resets_pending_diagnoses_on_change() {
        let store = store_with_mock();
        let mut session = session_as("admin", "admin123");

        store
            .select_patient(&mut session, &pid("p1"))
            .expect("p1 should be selectable");
        session.add_secondary_diagnosis(hypertension());
        store
            .select_patient(&mut session, &pid("p1"))
            .expect("p1 should be selectable");
        assert_eq!(session.secondary_diagnoses().len(), 1);

        let patient = store
            .select_patient(&mut session, &pid("p2"))
            .expect("p2 should be selectable");
        assert_eq!(patient.full_name.as_str(), "Juan Pérez");
        assert!(session.secondary_diagnoses().is_empty());

        let err = store
            .select_patient(&mut session, &pid("p9"))
            .expect_err("unknown patient should be reported");
        assert!(matches!(err, HcduError::PatientNotFound(_)));
        assert_eq!(session.selected_patient(), Some(&pid("p2")));
    }

    #[test]
    fn search_matches_names_and_national_ids() {
        let store = store_with_mock();

        assert_eq!(store.search("").len(), 2);
        let by_name: Vec<_> = store.search("gonz").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(by_name, vec!["p1"]);
        let by_id: Vec<_> = store.search("3098").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(by_id, vec!["p2"]);
        let dotted: Vec<_> = store.search("23.456.789").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(dotted, vec!["p1"]);
        assert!(store.search("zzz").is_empty());
    }

    #[test]
    fn replace_roster_keeps_records_of_remaining_patients() {
        let mut store = ClinicalRecordStore::with_roster(mock_roster(), DataMode::Live);
        let session = session_as("admin", "admin123");
        store
            .open_admission(&session, &pid("p1"), admission_with_diagnosis())
            .expect("admission should open");

        let mut reloaded = mock_roster();
        reloaded.truncate(1);
        let duplicate = reloaded[0].clone();
        reloaded.push(duplicate);
        store.replace_roster(reloaded, DataMode::Live);

        assert_eq!(store.len(), 1);
        assert_eq!(store.data_mode(), DataMode::Live);
        assert!(store.record(&pid("p1")).and_then(|r| r.admission()).is_some());
        assert!(store.record(&pid("p2")).is_none());
    }

    fn carlos_diaz_as_p1() -> Patient {
        let mut patient = mock_roster().remove(0);
        patient.full_name = hcdu_types::NonEmptyText::new("Carlos Díaz").expect("valid name");
        patient.national_id = NationalId::parse("40111222").expect("valid national id");
        patient
    }

    fn hemograma() -> LabResult {
        LabResult {
            date: date(2025, 3, 1),
            study: "Hemograma".into(),
            result: "Normal".into(),
        }
    }

    #[test]
    fn live_patient_never_inherits_mock_record() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        store
            .record_lab(&session, &pid("p1"), hemograma())
            .expect("lab result should be recorded");

        store.replace_roster(vec![carlos_diaz_as_p1()], DataMode::Live);

        let record = store.record(&pid("p1")).expect("record should exist");
        assert!(record.lab_results().is_empty());
        assert_eq!(store.data_mode(), DataMode::Live);
    }

    #[test]
    fn mode_switch_starts_records_fresh_even_for_same_person() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        store
            .record_lab(&session, &pid("p2"), hemograma())
            .expect("lab result should be recorded");

        store.replace_roster(mock_roster(), DataMode::Live);

        let record = store.record(&pid("p2")).expect("record should exist");
        assert_eq!(record, &ClinicalRecord::default());
    }

    #[test]
    fn reused_id_with_other_national_id_gets_empty_record() {
        let mut store = ClinicalRecordStore::with_roster(mock_roster(), DataMode::Live);
        let session = session_as("admin", "admin123");
        store
            .record_lab(&session, &pid("p1"), hemograma())
            .expect("lab result should be recorded");
        store
            .record_lab(&session, &pid("p2"), hemograma())
            .expect("lab result should be recorded");

        let mut reloaded = mock_roster();
        reloaded[0] = carlos_diaz_as_p1();
        store.replace_roster(reloaded, DataMode::Live);

        assert!(store.record(&pid("p1")).is_some_and(|r| r.lab_results().is_empty()));
        assert_eq!(
            store.record(&pid("p2")).map(|r| r.lab_results().len()),
            Some(1)
        );
    }

    #[test]
    fn colliding_issued_id_falls_back_to_sequential_id() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let intake = validated(&IntakeDraft::new("Ana Ruiz", "99112233"));

        let patient = store
            .add_patient(&session, intake, Some(pid("p1")))
            .expect("colliding issued id should not fail the intake");

        assert_eq!(patient.id.as_str(), "p3");
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.find_by_id(&pid("p1")).map(|p| p.full_name.as_str()),
            Some("María González")
        );
    }

    #[test]
    fn evolution_is_stamped_with_the_acting_user() {
        let mut store = store_with_mock();
        let admin = session_as("admin", "admin123");
        let provider = session_as("prestador", "prestador123");
        let id = pid("p2");
        store
            .open_admission(&admin, &id, admission_with_diagnosis())
            .expect("admission should open");

        for (session, note) in [(&admin, "Ingreso"), (&provider, "Afebril")] {
            store
                .record_evolution(
                    session,
                    &id,
                    EvolutionNote {
                        date: date(2025, 3, 3),
                        note: note.into(),
                    },
                )
                .expect("evolution should be recorded");
        }

        let evolutions = store.record(&id).expect("record should exist").evolutions();
        assert_eq!(evolutions.len(), 2);
        assert_eq!(evolutions[0].recorded_by, "admin");
        assert_eq!(evolutions[1].recorded_by, "prestador");
        assert_eq!(evolutions[1].note, "Afebril");
    }

    #[test]
    fn lab_and_dental_entries_are_appended_and_stamped() {
        let mut store = store_with_mock();
        let session = session_as("prestador", "prestador123");
        let id = pid("p1");

        store
            .record_lab(&session, &id, hemograma())
            .expect("lab result should be recorded");
        store
            .record_lab(
                &session,
                &id,
                LabResult {
                    study: "Glucemia".into(),
                    ..hemograma()
                },
            )
            .expect("lab result should be recorded");
        store
            .record_dental(
                &session,
                &id,
                DentalProcedure {
                    date: date(2025, 3, 2),
                    tooth: "36".into(),
                    procedure: "Obturación".into(),
                    notes: String::new(),
                },
            )
            .expect("dental procedure should be recorded");

        let record = store.record(&id).expect("record should exist");
        assert_eq!(record.lab_results().len(), 2);
        assert_eq!(record.lab_results()[1].study, "Glucemia");
        assert!(record.lab_results().iter().all(|e| e.recorded_by == "prestador"));
        assert_eq!(record.dental_procedures().len(), 1);
        assert_eq!(record.dental_procedures()[0].recorded_by, "prestador");
        assert_eq!(record.dental_procedures()[0].tooth, "36");
    }

    #[test]
    fn discharge_before_admission_date_is_rejected() {
        let mut store = store_with_mock();
        let session = session_as("admin", "admin123");
        let id = pid("p1");
        store
            .open_admission(&session, &id, admission_with_diagnosis())
            .expect("admission should open");

        let err = store
            .discharge_admission(&session, &id, date(2025, 3, 1))
            .expect_err("discharge before admission should be rejected");

        assert!(matches!(err, HcduError::InvalidInput(_)));
        let record = store.record(&id).expect("record should exist");
        assert!(record.admission().is_some());
        assert!(record.past_admissions().is_empty());

        store
            .discharge_admission(&session, &id, date(2025, 3, 2))
            .expect("same-day discharge is allowed");
    }
}
