//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators used by log-triage:
//! - Inference services (e.g., Hugging Face, OpenAI)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod inference;
