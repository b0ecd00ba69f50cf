//! Hugging Face Inference API backend.
//!
//! Zero-shot classification and summarization are served by hosted pipelines:
//! `POST {endpoint}/{model}` with a JSON body of `inputs` and `parameters`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::base::{
    config::Config,
    types::{Classification, Res},
};

use super::{GenericInferenceClient, InferenceClient, InferenceError, InferenceResult, RetryPolicy, call_with_retry, validate_classification};

// Extra methods on `InferenceClient` applied by the Hugging Face implementation.

impl InferenceClient {
    pub fn huggingface(config: &Config) -> Res<Self> {
        let client = HuggingFaceInferenceClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

/// Hosted pipelines answer zero-shot requests in one of two shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    /// `{"sequence": ..., "labels": [...], "scores": [...]}`
    Columns { labels: Vec<String>, scores: Vec<f64> },
    /// `[{"label": ..., "score": ...}, ...]`
    Rows(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

impl From<ZeroShotResponse> for Classification {
    fn from(value: ZeroShotResponse) -> Self {
        match value {
            ZeroShotResponse::Columns { labels, scores } => Classification { labels, scores },
            ZeroShotResponse::Rows(rows) => {
                let (labels, scores) = rows.into_iter().map(|r| (r.label, r.score)).unzip();
                Classification { labels, scores }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: SummarizationParameters,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct SummarizationParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummarizationOutput {
    summary_text: String,
}

// Specific implementations.

/// Hugging Face Inference API client implementation.
#[derive(Clone)]
pub struct HuggingFaceInferenceClient {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    classifier_model: String,
    summarizer_model: String,
    policy: RetryPolicy,
}

impl HuggingFaceInferenceClient {
    /// Create a new Hugging Face inference client.
    #[instrument(name = "HuggingFaceInferenceClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            endpoint: config.huggingface_endpoint.trim_end_matches('/').to_string(),
            api_token: Some(config.huggingface_api_token.clone()).filter(|t| !t.is_empty()),
            classifier_model: config.classifier_model.clone(),
            summarizer_model: config.summarizer_model.clone(),
            policy: RetryPolicy::from_config(config),
        })
    }

    /// Override the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// POST `body` to the pipeline for `model` and decode the JSON answer.
    async fn post<B, T>(&self, model: &str, body: &B) -> InferenceResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, model);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(InferenceError::unavailable)?;
        let status = response.status();
        let text = response.text().await.map_err(InferenceError::unavailable)?;

        if !status.is_success() {
            return Err(InferenceError::unavailable(format!("{model} returned {status}: {text}")));
        }

        debug!("{model} returned {} bytes", text.len());

        serde_json::from_str(&text).map_err(|e| InferenceError::malformed(format!("{model}: {e}")))
    }
}

#[async_trait]
impl GenericInferenceClient for HuggingFaceInferenceClient {
    #[instrument(name = "HuggingFaceInferenceClient::classify", skip_all)]
    async fn classify(&self, text: &str, labels: &[String]) -> InferenceResult<Classification> {
        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters { candidate_labels: labels },
            options: RequestOptions { wait_for_model: true },
        };

        let response: ZeroShotResponse = call_with_retry(&self.policy, "Zero-shot classification", || self.post(&self.classifier_model, &body)).await?;

        validate_classification(response.into())
    }

    #[instrument(name = "HuggingFaceInferenceClient::summarize", skip_all)]
    async fn summarize(&self, text: &str, max_length: u32, min_length: u32) -> InferenceResult<String> {
        let body = SummarizationRequest {
            inputs: text,
            parameters: SummarizationParameters {
                max_length,
                min_length,
                do_sample: false,
            },
            options: RequestOptions { wait_for_model: true },
        };

        let outputs: Vec<SummarizationOutput> = call_with_retry(&self.policy, "Summarization", || self.post(&self.summarizer_model, &body)).await?;

        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or_else(|| InferenceError::malformed("summarizer returned no outputs"))
    }
}

// Tests.
