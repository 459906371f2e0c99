//! Constants used throughout the HCDU core crate.

/// Remote API endpoint used when no explicit endpoint is configured.
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost/apos/api.php";

/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming the remote API endpoint.
pub const API_ENDPOINT_ENV: &str = "HCDU_API_ENDPOINT";

/// Environment variable holding the request timeout in whole seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "HCDU_REQUEST_TIMEOUT_SECS";

/// Number of outpatient visits shown in a patient summary.
pub const SUMMARY_RECENT_VISITS: usize = 3;

/// Warning surfaced once when the roster falls back to mock data.
pub const DEGRADED_ROSTER_WARNING: &str =
    "Remote patient API unavailable; showing the built-in mock roster";
