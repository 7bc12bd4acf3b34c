//! Infrastructure layer - connections and operation execution.

pub mod db;
