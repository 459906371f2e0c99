use crate::intake::ValidationReport;
use crate::session::Role;
use hcdu_types::{NationalId, PatientId};

#[derive(Debug, thiserror::Error)]
pub enum HcduError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("intake rejected: {0}")]
    Validation(ValidationReport),
    #[error("a patient with national id {0} already exists")]
    DuplicateIdentity(NationalId),
    #[error("a primary SNOMED diagnosis is required")]
    MissingDiagnosis,
    #[error("patient {0} has no active admission")]
    NoActiveAdmission(PatientId),
    #[error("patient {0} already has an open admission")]
    AdmissionAlreadyOpen(PatientId),
    #[error("patient {0} not found")]
    PatientNotFound(PatientId),

    #[error("invalid username or password")]
    AuthenticationFailure,
    #[error("no user is logged in")]
    NotAuthenticated,
    #[error("user '{username}' ({role}) is not allowed to {action}")]
    PermissionDenied {
        username: String,
        role: Role,
        action: &'static str,
    },
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
    #[error("no user at position {0}")]
    UserNotFound(usize),

    #[error("transport failure: {0}")]
    Transport(String),
    #[error("remote API rejected the request: {0}")]
    Rejected(String),
}

pub type HcduResult<T> = std::result::Result<T, HcduError>;
