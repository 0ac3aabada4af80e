//! Blogging API: signup/login with bearer tokens, and blog posts with
//! draft/published visibility, search, sorting and pagination.

pub mod app;
pub mod auth;
pub mod blogs;
pub mod config;
pub mod error;
pub mod json;
pub mod memory;
pub mod state;
