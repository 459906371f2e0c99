//! Clinical record model.
//!
//! A [`ClinicalRecord`] aggregates every encounter module of one patient.
//! Each sequence is stored in insertion order, which is chronological order.
//! Sequences are only ever appended to by [`crate::store::ClinicalRecordStore`];
//! most-recent-first presentation is done by the read helpers here and never
//! reorders storage.

use crate::constants::SUMMARY_RECENT_VISITS;
use crate::snomed::Diagnosis;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// An entry stamped with the username of the user who recorded it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub recorded_by: String,
    #[serde(flatten)]
    pub entry: T,
}

impl<T> Deref for Stamped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry
    }
}

/// Ambulatory consultation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpatientVisit {
    pub date: NaiveDate,
    pub professional: String,
    /// Professional licence number ("matrícula").
    pub license: String,
    pub reason: String,
    pub examination: String,
    pub plan: String,
    pub notes: String,
    /// Primary diagnosis. Always present for visits recorded through the
    /// outpatient form; visits seeded at intake may still be pending one.
    pub diagnosis: Option<Diagnosis>,
    pub secondary_diagnoses: Vec<Diagnosis>,
}

/// Inpatient admission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    /// Admission type, e.g. scheduled or emergency.
    pub kind: String,
    pub admitted_on: NaiveDate,
    pub service: String,
    pub bed: String,
    pub diagnosis: Option<Diagnosis>,
}

/// Progress note written during an admission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionNote {
    pub date: NaiveDate,
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispense {
    pub date: NaiveDate,
    pub medication: String,
    pub quantity: u32,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResult {
    pub date: NaiveDate,
    pub study: String,
    pub result: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingStudy {
    pub date: NaiveDate,
    pub study: String,
    pub report: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KineSession {
    pub date: NaiveDate,
    pub technique: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentalProcedure {
    pub date: NaiveDate,
    /// Tooth number ("pieza").
    pub tooth: String,
    pub procedure: String,
    pub notes: String,
}

pub type Evolution = Stamped<EvolutionNote>;
pub type PharmacyEntry = Stamped<Dispense>;
pub type LabEntry = Stamped<LabResult>;
pub type ImagingEntry = Stamped<ImagingStudy>;
pub type KineEntry = Stamped<KineSession>;
pub type DentalEntry = Stamped<DentalProcedure>;

/// A discharged admission together with the evolutions written during it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionEpisode {
    pub admission: Admission,
    pub evolutions: Vec<Evolution>,
    pub discharged_on: NaiveDate,
    pub discharged_by: String,
}

/// State of the evolution timeline as the view layer should present it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvolutionTimeline<'a> {
    NoAdmission,
    Empty,
    /// Most recent first.
    Entries(Vec<&'a Evolution>),
}

/// Short overview shown when a patient is selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSummary<'a> {
    /// Up to [`SUMMARY_RECENT_VISITS`] visits, most recent first.
    pub recent_visits: Vec<&'a OutpatientVisit>,
    pub admission: Option<&'a Admission>,
}

/// Unified clinical history of one patient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    outpatient_visits: Vec<OutpatientVisit>,
    admission: Option<Admission>,
    evolutions: Vec<Evolution>,
    pharmacy_dispenses: Vec<PharmacyEntry>,
    lab_results: Vec<LabEntry>,
    imaging_studies: Vec<ImagingEntry>,
    kinesiology_sessions: Vec<KineEntry>,
    dental_procedures: Vec<DentalEntry>,
    past_admissions: Vec<AdmissionEpisode>,
}

impl ClinicalRecord {
    pub fn outpatient_visits(&self) -> &[OutpatientVisit] {
        &self.outpatient_visits
    }

    pub fn admission(&self) -> Option<&Admission> {
        self.admission.as_ref()
    }

    pub fn evolutions(&self) -> &[Evolution] {
        &self.evolutions
    }

    pub fn pharmacy_dispenses(&self) -> &[PharmacyEntry] {
        &self.pharmacy_dispenses
    }

    pub fn lab_results(&self) -> &[LabEntry] {
        &self.lab_results
    }

    pub fn imaging_studies(&self) -> &[ImagingEntry] {
        &self.imaging_studies
    }

    pub fn kinesiology_sessions(&self) -> &[KineEntry] {
        &self.kinesiology_sessions
    }

    pub fn dental_procedures(&self) -> &[DentalEntry] {
        &self.dental_procedures
    }

    pub fn past_admissions(&self) -> &[AdmissionEpisode] {
        &self.past_admissions
    }

    pub fn summary(&self) -> RecordSummary<'_> {
        RecordSummary {
            recent_visits: recent_first(&self.outpatient_visits)
                .take(SUMMARY_RECENT_VISITS)
                .collect(),
            admission: self.admission.as_ref(),
        }
    }

    pub fn evolution_timeline(&self) -> EvolutionTimeline<'_> {
        if self.admission.is_none() {
            return EvolutionTimeline::NoAdmission;
        }
        if self.evolutions.is_empty() {
            return EvolutionTimeline::Empty;
        }
        EvolutionTimeline::Entries(recent_first(&self.evolutions).collect())
    }

    pub(crate) fn push_outpatient_visit(&mut self, visit: OutpatientVisit) {
        self.outpatient_visits.push(visit);
    }

    pub(crate) fn set_admission(&mut self, admission: Admission) {
        self.admission = Some(admission);
    }

    /// Closes the open admission, moving it and its evolutions into history.
    pub(crate) fn close_admission(
        &mut self,
        discharged_on: NaiveDate,
        discharged_by: String,
    ) -> Option<&AdmissionEpisode> {
        let admission = self.admission.take()?;
        self.past_admissions.push(AdmissionEpisode {
            admission,
            evolutions: std::mem::take(&mut self.evolutions),
            discharged_on,
            discharged_by,
        });
        self.past_admissions.last()
    }

    pub(crate) fn push_evolution(&mut self, entry: Evolution) {
        self.evolutions.push(entry);
    }

    pub(crate) fn push_dispense(&mut self, entry: PharmacyEntry) {
        self.pharmacy_dispenses.push(entry);
    }

    pub(crate) fn push_lab_result(&mut self, entry: LabEntry) {
        self.lab_results.push(entry);
    }

    pub(crate) fn push_imaging_study(&mut self, entry: ImagingEntry) {
        self.imaging_studies.push(entry);
    }

    pub(crate) fn push_kine_session(&mut self, entry: KineEntry) {
        self.kinesiology_sessions.push(entry);
    }

    pub(crate) fn push_dental_procedure(&mut self, entry: DentalEntry) {
        self.dental_procedures.push(entry);
    }
}

/// Most-recent-first view over a chronological sequence.
pub fn recent_first<T>(items: &[T]) -> impl Iterator<Item = &T> {
    items.iter().rev()
}
