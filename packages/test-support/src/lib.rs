//! Shared test utilities: logging setup, event capture and unique names for
//! test data.

pub mod logging;

use ulid::Ulid;

/// `{prefix}-{ulid}`, unique per call.
///
/// ```
/// use test_support::unique_str;
///
/// let a = unique_str("team");
/// assert_ne!(a, unique_str("team"));
/// assert!(a.starts_with("team-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}
