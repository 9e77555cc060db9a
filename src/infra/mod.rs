//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod images;
pub mod telemetry;
pub mod uploads;
