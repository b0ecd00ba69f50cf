//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::rules;

use super::types::{PatternSpec, Res};

/// Default bind host.
fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default port for the JSON API.
fn default_api_port() -> u16 {
    8000
}

/// Default port for the interactive form.
fn default_ui_port() -> u16 {
    7860
}

/// Default Hugging Face inference endpoint.
fn default_huggingface_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

/// Default zero-shot classification model.
fn default_classifier_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

/// Default summarization model.
fn default_summarizer_model() -> String {
    "t5-small".to_string()
}

/// Default OpenAI model for the `openai` backend.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_analyze_prefix_chars() -> usize {
    1500
}

fn default_summarize_prefix_chars() -> usize {
    2000
}

fn default_summary_max_length() -> u32 {
    80
}

fn default_summary_min_length() -> u32 {
    25
}

/// Default cap on multipart upload size.
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Default timeout for a single inference call, in seconds.
fn default_inference_timeout_secs() -> u64 {
    60
}

/// Default number of retries after the first failed inference call.
fn default_inference_max_retries() -> u32 {
    3
}

/// Which collaborator serves zero-shot classification and summarization.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// Hugging Face Inference API.
    #[default]
    Huggingface,
    /// OpenAI responses API.
    Openai,
}

/// Configuration for the log-triage application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inner: Arc::new(ConfigInner::default()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Bind host (`HOST`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port for the JSON API mode (`API_PORT`).
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Port for the interactive form mode (`UI_PORT`).
    #[serde(default = "default_ui_port")]
    pub ui_port: u16,
    /// Inference collaborator to use (`INFERENCE_BACKEND`): `huggingface` or `openai`.
    #[serde(default)]
    pub inference_backend: InferenceBackend,
    /// Base URL of the Hugging Face inference API (`HUGGINGFACE_ENDPOINT`).
    #[serde(default = "default_huggingface_endpoint")]
    pub huggingface_endpoint: String,
    /// Optional Hugging Face API token (`HUGGINGFACE_API_TOKEN`).
    #[serde(default)]
    pub huggingface_api_token: String,
    /// Zero-shot classification model (`CLASSIFIER_MODEL`).
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    /// Summarization model (`SUMMARIZER_MODEL`).
    #[serde(default = "default_summarizer_model")]
    pub summarizer_model: String,
    /// OpenAI API key (`OPENAI_API_KEY`), required for the `openai` backend.
    #[serde(default)]
    pub openai_api_key: String,
    /// OpenAI model (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Characters of an upload inspected by `/analyze` (`ANALYZE_PREFIX_CHARS`).
    #[serde(default = "default_analyze_prefix_chars")]
    pub analyze_prefix_chars: usize,
    /// Characters of an upload sent to the summarizer (`SUMMARIZE_PREFIX_CHARS`).
    #[serde(default = "default_summarize_prefix_chars")]
    pub summarize_prefix_chars: usize,
    /// Upper bound on summary length (`SUMMARY_MAX_LENGTH`).
    #[serde(default = "default_summary_max_length")]
    pub summary_max_length: u32,
    /// Lower bound on summary length (`SUMMARY_MIN_LENGTH`).
    #[serde(default = "default_summary_min_length")]
    pub summary_min_length: u32,
    /// Largest accepted upload body, in bytes (`MAX_UPLOAD_BYTES`).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Timeout for one inference call, in seconds (`INFERENCE_TIMEOUT_SECS`).
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,
    /// Retries after a failed or timed out inference call (`INFERENCE_MAX_RETRIES`).
    #[serde(default = "default_inference_max_retries")]
    pub inference_max_retries: u32,
    /// Candidate labels for zero-shot classification.
    #[serde(default = "rules::default_candidate_labels")]
    pub candidate_labels: Vec<String>,
    /// Ordered regex rules; earlier entries take precedence.
    #[serde(default = "rules::default_patterns")]
    pub patterns: Vec<PatternSpec>,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            ui_port: default_ui_port(),
            inference_backend: InferenceBackend::default(),
            huggingface_endpoint: default_huggingface_endpoint(),
            huggingface_api_token: String::new(),
            classifier_model: default_classifier_model(),
            summarizer_model: default_summarizer_model(),
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            analyze_prefix_chars: default_analyze_prefix_chars(),
            summarize_prefix_chars: default_summarize_prefix_chars(),
            summary_max_length: default_summary_max_length(),
            summary_min_length: default_summary_min_length(),
            max_upload_bytes: default_max_upload_bytes(),
            inference_timeout_secs: default_inference_timeout_secs(),
            inference_max_retries: default_inference_max_retries(),
            candidate_labels: rules::default_candidate_labels(),
            patterns: rules::default_patterns(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("LOG_TRIAGE").try_parsing(true));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check the cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.analyze_prefix_chars == 0 || self.summarize_prefix_chars == 0 || self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Prefix lengths and upload limit must be greater than 0."));
        }

        if self.summary_min_length > self.summary_max_length {
            return Err(anyhow::anyhow!("Summary min length must not exceed summary max length."));
        }

        if self.inference_timeout_secs < 1 {
            return Err(anyhow::anyhow!("Inference timeout must be at least 1 second."));
        }

        if self.candidate_labels.is_empty() {
            return Err(anyhow::anyhow!("At least one candidate label is required."));
        }

        if self.inference_backend == InferenceBackend::Openai && self.openai_api_key.is_empty() {
            return Err(anyhow::anyhow!("The openai backend requires an OpenAI API key."));
        }

        Ok(())
    }
}
