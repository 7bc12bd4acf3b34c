//! Database infrastructure - pool construction and SQL execution.

pub mod core;
pub mod engine;

pub use self::core::{build_connect_options, connect};
pub use self::engine::execute;
