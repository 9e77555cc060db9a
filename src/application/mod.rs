//! Application services layer.

pub mod error;
pub mod posts;
pub mod repos;
pub mod uploads;
