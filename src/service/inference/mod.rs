//! Integration with external inference services.
//!
//! This module provides a thin wrapper around model-serving collaborators for
//! zero-shot classification and summarization. The module defines the
//! `GenericInferenceClient` trait that can be implemented for different providers,
//! with implementations for the Hugging Face Inference API and OpenAI.

pub mod huggingface;
pub mod openai;

use std::{future::Future, ops::Deref, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::base::{config::Config, types::Classification};

// Types.

pub type InferenceResult<T> = Result<T, InferenceError>;

/// Failures of an inference collaborator.
///
/// Each variant maps to a distinct HTTP status at the edge, so callers can tell a slow
/// collaborator from a broken one.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference call timed out after {attempts} attempts.")]
    Timeout { attempts: u32 },

    #[error("Inference service unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("Inference service returned malformed output: {0}")]
    Malformed(String),
}

impl InferenceError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// A single failed attempt, before retries are accounted for.
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable { attempts: 1, message: message.to_string() }
    }
}

// Traits.

/// Generic inference client trait that clients must implement.
///
/// Implementing this trait allows different model-serving providers to be used
/// by the analysis pipeline, and lets tests substitute a mock.
#[async_trait]
pub trait GenericInferenceClient: Send + Sync + 'static {
    /// Zero-shot classify `text` against `labels`.
    ///
    /// The result carries labels ordered by descending score, with scores in `[0, 1]`.
    async fn classify(&self, text: &str, labels: &[String]) -> InferenceResult<Classification>;

    /// Summarize `text` into a summary whose length lies within the given bounds.
    async fn summarize(&self, text: &str, max_length: u32, min_length: u32) -> InferenceResult<String>;
}

// Structs.

/// Inference client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct InferenceClient {
    inner: Arc<dyn GenericInferenceClient>,
}

impl Deref for InferenceClient {
    type Target = dyn GenericInferenceClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl InferenceClient {
    pub fn new(inner: Arc<dyn GenericInferenceClient>) -> Self {
        Self { inner }
    }
}

/// Timeout and backoff settings for collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.inference_timeout_secs),
            max_retries: config.inference_max_retries,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `call` under the policy's timeout, retrying timeouts and unavailability with
/// exponential backoff. Malformed output is returned immediately.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut call: F) -> InferenceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = InferenceResult<T>>,
{
    let mut retries = 0;

    loop {
        let result = timeout(policy.timeout, call()).await;

        match result {
            Ok(Ok(value)) => {
                info!("{what} call succeeded after {} attempts", retries + 1);
                return Ok(value);
            }
            Ok(Err(InferenceError::Malformed(message))) => {
                return Err(InferenceError::Malformed(message));
            }
            Ok(Err(err)) => {
                if retries >= policy.max_retries {
                    let message = match err {
                        InferenceError::Unavailable { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(InferenceError::Unavailable { attempts: retries + 1, message });
                }
                retries += 1;
                warn!("{what} call failed, retrying {retries}/{}: {err}", policy.max_retries);
            }
            Err(_) => {
                if retries >= policy.max_retries {
                    return Err(InferenceError::Timeout { attempts: retries + 1 });
                }
                retries += 1;
                warn!("{what} call timed out, retrying {retries}/{}", policy.max_retries);
            }
        }

        let delay = policy.base_delay * 2_u32.pow(retries - 1);
        tokio::time::sleep(delay).await;
    }
}

/// Check a raw classifier result and order it by descending score.
pub fn validate_classification(raw: Classification) -> InferenceResult<Classification> {
    if raw.labels.is_empty() {
        return Err(InferenceError::malformed("classifier returned no labels"));
    }

    if raw.labels.len() != raw.scores.len() {
        return Err(InferenceError::malformed(format!(
            "classifier returned {} labels but {} scores",
            raw.labels.len(),
            raw.scores.len()
        )));
    }

    if let Some(score) = raw.scores.iter().find(|s| !s.is_finite() || **s < 0.0 || **s > 1.0) {
        return Err(InferenceError::malformed(format!("classifier score {score} is outside [0, 1]")));
    }

    let mut pairs = raw.labels.into_iter().zip(raw.scores).collect::<Vec<_>>();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (labels, scores) = pairs.into_iter().unzip();

    Ok(Classification { labels, scores })
}
