pub mod db;
pub mod log_level;
