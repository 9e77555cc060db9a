//! Quillpost: a small blog server with an image-aware post editor.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
