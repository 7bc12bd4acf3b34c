pub mod base;
pub mod data;
pub mod factory;
pub mod readonly;
