//! Library root for `log-triage`.
//!
//! Log-triage classifies uploaded log files:
//! - A fast path scans the text against an ordered table of regular expressions
//! - When nothing matches, a zero-shot classifier picks the most likely issue category
//! - A separate endpoint summarizes log text
//!
//! The service is exposed as a JSON API and as an interactive form, both thin adapters
//! over one analysis pipeline. The inference collaborator sits behind a trait so that
//! different providers (or a mock) can be plugged in.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;
pub mod triage;

use base::{config::Config, types::Void};
use runtime::RunMode;
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the log-triage runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the rule table and inference client
/// - Serves the requested adapter until Ctrl-C
pub async fn start(config: Config, mode: RunMode) -> Void {
    info!("Starting log-triage ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("A crypto provider is already installed."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start(mode).await?;

    Ok(())
}
