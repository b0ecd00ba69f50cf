//! Request handling for log-triage.
//!
//! This module provides the analysis pipeline and the two thin adapters over it:
//! - The triage-then-classify pipeline itself
//! - A JSON API taking multipart uploads
//! - An interactive HTML form

pub mod analysis;
pub mod api;
pub mod form;
