//! Constants for the download module (timeouts, redirects).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default total request timeout (5 minutes for large PDFs).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Maximum redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Suffix appended to a destination while its body is still streaming.
pub const PARTIAL_SUFFIX: &str = ".part";
