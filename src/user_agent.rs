//! Shared User-Agent string for download and GitHub API traffic.

/// Default User-Agent for every request (identifies the tool; GitHub rejects
/// API requests without one).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("specfetch/{version} (abi-spec-archive)")
}
