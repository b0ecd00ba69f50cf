//! OpenAI backend.
//!
//! Uses a general-purpose chat model as a zero-shot classifier and summarizer. The
//! classifier answers in a strict JSON schema so its output can be validated the same way
//! as a dedicated classification pipeline.

use std::sync::Arc;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        Content, CreateResponseArgs, Input, InputItem, InputMessageArgs, OutputContent, Response, ResponseFormatJsonSchema, Role, TextConfig, TextResponseFormat,
    },
};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::base::{config::Config, types::Classification};

use super::{GenericInferenceClient, InferenceClient, InferenceError, InferenceResult, RetryPolicy, call_with_retry, validate_classification};

/// Classifier instructions.
const CLASSIFIER_DIRECTIVE: &str = "You are a zero-shot text classifier for application logs. \
Score how likely the log text belongs to each candidate label. Use every candidate label exactly once, \
give each a score between 0 and 1 so that the scores sum to 1, and order the labels by descending score.";

/// Summarizer instructions; `{min}` and `{max}` are replaced with word bounds.
const SUMMARIZER_DIRECTIVE: &str = "Summarize the following application log text in plain prose. \
Use between {min} and {max} words. Return only the summary.";

// Extra methods on `InferenceClient` applied by the openai implementation.

impl InferenceClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiInferenceClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI inference client implementation.
#[derive(Clone)]
pub struct OpenAiInferenceClient {
    client: Client<OpenAIConfig>,
    model: String,
    policy: RetryPolicy,
}

impl OpenAiInferenceClient {
    /// Create a new OpenAI inference client.
    #[instrument(name = "OpenAiInferenceClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            model: config.openai_model.clone(),
            policy: RetryPolicy::from_config(config),
        }
    }

    /// Build a single user message input.
    fn build_input(text: &str) -> InferenceResult<Input> {
        Ok(Input::Items(vec![InputItem::Message(
            InputMessageArgs::default()
                .role(Role::User)
                .content(format!("# Log Text\n\n{text}\n\n"))
                .build()
                .map_err(|e| InferenceError::malformed(format!("invalid request: {e}")))?,
        )]))
    }

    /// Start a request with the shared settings.
    fn base_request(&self, instructions: String, input: Input) -> CreateResponseArgs {
        let mut request = CreateResponseArgs::default();
        request.model(&self.model).instructions(instructions).input(input);

        // Add the temperature for the non-reasoning models.
        if self.model.starts_with("gpt") {
            request.temperature(0.0);
        }

        request
    }

    /// Send `request` under the retry policy.
    async fn call_openai_api(&self, what: &str, request: &CreateResponseArgs) -> InferenceResult<Response> {
        call_with_retry(&self.policy, what, || async move {
            let request = request.build().map_err(|e| InferenceError::malformed(format!("invalid request: {e}")))?;
            self.client.responses().create(request).await.map_err(InferenceError::unavailable)
        })
        .await
    }
}

#[async_trait]
impl GenericInferenceClient for OpenAiInferenceClient {
    #[instrument(name = "OpenAiInferenceClient::classify", skip_all)]
    async fn classify(&self, text: &str, labels: &[String]) -> InferenceResult<Classification> {
        let input = Self::build_input(text)?;

        let mut request = self.base_request(CLASSIFIER_DIRECTIVE.to_string(), input);
        request.text(classification_text_config(labels));

        let response = self.call_openai_api("OpenAI classification", &request).await?;
        let text = collect_output_text(&response)?;

        let raw: Classification = serde_json::from_str(&text).map_err(|e| InferenceError::malformed(format!("classifier output is not valid JSON: {e}")))?;

        validate_classification(raw)
    }

    #[instrument(name = "OpenAiInferenceClient::summarize", skip_all)]
    async fn summarize(&self, text: &str, max_length: u32, min_length: u32) -> InferenceResult<String> {
        let input = Self::build_input(text)?;
        let instructions = SUMMARIZER_DIRECTIVE.replace("{min}", &min_length.to_string()).replace("{max}", &max_length.to_string());

        let mut request = self.base_request(instructions, input);
        request.text(TextConfig { format: TextResponseFormat::Text });

        let response = self.call_openai_api("OpenAI summarization", &request).await?;
        let summary = collect_output_text(&response)?;

        if summary.trim().is_empty() {
            return Err(InferenceError::malformed("summarizer returned an empty summary"));
        }

        Ok(summary.trim().to_string())
    }
}

/// Concatenate the text parts of an OpenAI response.
#[instrument(skip_all)]
pub fn collect_output_text(response: &Response) -> InferenceResult<String> {
    let mut result = Vec::new();

    info!("LLM response has {} outputs.", response.output.len());
    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => result.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(InferenceError::malformed(format!("request refused: {reason:?}")));
                        }
                    }
                }
            }
            _ => {
                warn!("Unknown output: {output:#?}");
            }
        }
    }

    if result.is_empty() {
        return Err(InferenceError::malformed("response contained no text"));
    }

    Ok(result.join(""))
}

/// Strict JSON schema restricting the classifier to the candidate labels.
fn classification_text_config(labels: &[String]) -> TextConfig {
    TextConfig {
        format: TextResponseFormat::JsonSchema(ResponseFormatJsonSchema {
            name: "ZeroShotClassification".to_string(),
            description: Some("Candidate labels ordered by descending score.".to_string()),
            schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "labels": {
                        "type": "array",
                        "items": { "type": "string", "enum": labels }
                    },
                    "scores": {
                        "type": "array",
                        "items": { "type": "number" }
                    }
                },
                "required": ["labels", "scores"],
                "additionalProperties": false
            })),
            strict: Some(true),
        }),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;

    fn create_test_config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "test_key".to_string()),
                inference_max_retries: 0,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_classification_schema_lists_labels() {
        let labels = vec!["timeout".to_string(), "other".to_string()];

        let TextResponseFormat::JsonSchema(format) = classification_text_config(&labels).format else {
            panic!("expected a JSON schema format");
        };
        let schema = format.schema.unwrap();

        assert_eq!(schema["properties"]["labels"]["items"]["enum"], serde_json::json!(["timeout", "other"]));
        assert_eq!(format.strict, Some(true));
    }

    #[test]
    fn test_build_input() {
        assert!(OpenAiInferenceClient::build_input("connection reset").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_api_key_is_unavailable() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: "sk-invalid-key-for-testing".to_string(),
                inference_max_retries: 0,
                ..Default::default()
            }),
        };

        let client = InferenceClient::openai(&config);

        let result = client.classify("Connection refused", &["network issue".to_string()]).await;

        assert!(matches!(result, Err(InferenceError::Unavailable { .. }) | Err(InferenceError::Timeout { .. })));
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY"]
    async fn test_classify_live() {
        let client = InferenceClient::openai(&create_test_config());
        let labels = crate::base::rules::default_candidate_labels();

        let result = client.classify("The weather is nice today", &labels).await.unwrap();

        assert_eq!(result.labels.len(), result.scores.len());
        assert!(labels.contains(&result.labels[0]));
    }
}
