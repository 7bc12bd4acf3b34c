//! Log hygiene helpers shared by the client and its extensions.

pub mod pii;

pub use pii::{redact, sanitize_db_url, Redacted};
