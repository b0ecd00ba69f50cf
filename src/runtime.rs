//! Runtime services and shared state for log-triage.

use axum::Router;
use clap::ValueEnum;
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::{Config, InferenceBackend},
        types::{Res, Void},
    },
    interaction::{
        analysis::{AnalysisLimits, Analyzer},
        api, form,
    },
    service::inference::InferenceClient,
    triage::PatternTriage,
};

/// Which adapter to serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// JSON API with multipart uploads.
    Api,
    /// Interactive HTML form.
    #[default]
    Ui,
}

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration and the analysis pipeline (rule table and
/// inference client). It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The analysis pipeline.
    pub analyzer: Analyzer,
}

impl Runtime {
    /// Create a new runtime instance, connecting to the configured inference backend.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        // Initialize the inference client.
        let inference = match config.inference_backend {
            InferenceBackend::Huggingface => InferenceClient::huggingface(&config)?,
            InferenceBackend::Openai => InferenceClient::openai(&config),
        };

        Self::with_inference(config, inference)
    }

    /// Create a new runtime instance around an existing inference client.
    pub fn with_inference(config: Config, inference: InferenceClient) -> Res<Self> {
        // Compile the rule table.
        let triage = PatternTriage::new(&config.patterns)?;
        info!("Compiled {} regex rules.", triage.rules().len());

        for label in triage.unlisted_labels(&config.candidate_labels) {
            warn!("Pattern label `{label}` is not a classifier candidate label; only the regex path can report it.");
        }

        let analyzer = Analyzer::new(triage, inference, config.candidate_labels.clone(), AnalysisLimits::from_config(&config));

        Ok(Self { config, analyzer })
    }

    /// Build the router for `mode`.
    pub fn router(&self, mode: RunMode) -> Res<Router> {
        match mode {
            RunMode::Api => Ok(api::router(self.analyzer.clone(), self.config.max_upload_bytes)),
            RunMode::Ui => form::router(self.analyzer.clone()),
        }
    }

    /// Serve `mode` until Ctrl-C.
    pub async fn start(&self, mode: RunMode) -> Void {
        let port = match mode {
            RunMode::Api => self.config.api_port,
            RunMode::Ui => self.config.ui_port,
        };

        let router = self.router(mode)?;
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), port)).await?;

        info!("Serving {mode:?} on http://{}", listener.local_addr()?);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        info!("Shut down cleanly.");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
