//! Core components, types, and utilities for log-triage.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The built-in label set and regex rule table.
//! - Common types and result handling.

pub mod config;
pub mod rules;
pub mod types;
