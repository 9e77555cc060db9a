//! HTML rendering: askama templates and the view models fed into them.

pub mod sanitize;
pub mod views;
