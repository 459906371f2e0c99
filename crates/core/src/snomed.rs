//! SNOMED CT mini catalogue backing the diagnosis pickers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SNOMED concept used as a diagnosis.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnosis {
    pub term: String,
    pub code: String,
}

impl Diagnosis {
    pub fn new(term: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            code: code.into(),
        }
    }

    /// Label shown in the picker: `Term (code)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.term, self.code)
    }

    /// Resolve a `Term (code)` label back into a diagnosis.
    ///
    /// The term is everything before the last `(`, the code everything between
    /// it and the last `)`. Returns `None` when the label has no parenthesised
    /// code or either part is empty.
    pub fn parse_label(label: &str) -> Option<Self> {
        let open = label.rfind('(')?;
        let close = label.rfind(')')?;
        if close <= open {
            return None;
        }
        let term = label[..open].trim();
        let code = label[open + 1..close].trim();
        if term.is_empty() || code.is_empty() {
            return None;
        }
        Some(Self::new(term, code))
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.term, self.code)
    }
}

const CONCEPTS: &[(&str, &str)] = &[
    ("44054006", "Diabetes Mellitus tipo 2"),
    ("195967001", "Hipertensión arterial"),
    ("38341003", "Neumonía"),
    ("422034002", "Cefalea"),
    ("36971009", "Lumbalgia"),
    ("387713003", "Otitis media aguda"),
    ("86049000", "Asma bronquial"),
];

/// Fixed lookup table of the concepts offered by the diagnosis pickers.
#[derive(Clone, Debug)]
pub struct SnomedCatalog {
    concepts: Vec<Diagnosis>,
}

impl Default for SnomedCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SnomedCatalog {
    pub fn builtin() -> Self {
        Self {
            concepts: CONCEPTS
                .iter()
                .map(|(code, term)| Diagnosis::new(*term, *code))
                .collect(),
        }
    }

    pub fn concepts(&self) -> &[Diagnosis] {
        &self.concepts
    }

    /// Case-insensitive substring search over terms, in catalogue order.
    pub fn search(&self, query: &str) -> Vec<&Diagnosis> {
        let q = query.trim().to_lowercase();
        self.concepts
            .iter()
            .filter(|d| d.term.to_lowercase().contains(&q))
            .collect()
    }

    pub fn find(&self, code: &str) -> Option<&Diagnosis> {
        self.concepts.iter().find(|d| d.code == code.trim())
    }
}
