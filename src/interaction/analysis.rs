//! The triage-then-classify pipeline shared by the JSON API and the interactive form.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{AnalysisResponse, Classification, SummaryResponse, TriageMethod, TriageResult},
    },
    service::inference::{InferenceClient, InferenceError, InferenceResult},
    triage::{PatternTriage, truncate_chars},
};

/// Input bounds applied before triage and inference.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisLimits {
    pub analyze_prefix_chars: usize,
    pub summarize_prefix_chars: usize,
    pub summary_max_length: u32,
    pub summary_min_length: u32,
}

impl AnalysisLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            analyze_prefix_chars: config.analyze_prefix_chars,
            summarize_prefix_chars: config.summarize_prefix_chars,
            summary_max_length: config.summary_max_length,
            summary_min_length: config.summary_min_length,
        }
    }
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What the pipeline concluded about a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// A regex rule matched.
    Pattern { label: String },
    /// The zero-shot classifier picked `label`; `confidence` is a percentage rounded to two decimals.
    Model { label: String, confidence: f64, details: Classification },
}

impl Verdict {
    pub fn triage_result(&self) -> TriageResult {
        match self {
            Verdict::Pattern { label } => TriageResult {
                matched_label: Some(label.clone()),
                method: TriageMethod::Regex,
            },
            Verdict::Model { .. } => TriageResult {
                matched_label: None,
                method: TriageMethod::AiClassification,
            },
        }
    }
}

/// Regex triage with zero-shot fallback.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Analyzer {
    triage: Arc<PatternTriage>,
    inference: InferenceClient,
    labels: Arc<[String]>,
    limits: AnalysisLimits,
}

impl Analyzer {
    pub fn new(triage: PatternTriage, inference: InferenceClient, labels: Vec<String>, limits: AnalysisLimits) -> Self {
        Self {
            triage: Arc::new(triage),
            inference,
            labels: labels.into(),
            limits,
        }
    }

    /// Triage `text` as given, falling back to the classifier when no rule matches.
    #[instrument(skip_all)]
    pub async fn classify_text(&self, text: &str) -> InferenceResult<Verdict> {
        if let Some(label) = self.triage.scan(text) {
            info!("Regex rule matched: {label}");
            return Ok(Verdict::Pattern { label: label.to_string() });
        }

        info!("No regex rule matched, falling back to zero-shot classification ...");

        let details = self.inference.classify(text, &self.labels).await?;
        let (label, score) = details.top().ok_or_else(|| InferenceError::malformed("classifier returned no labels"))?;

        Ok(Verdict::Model {
            label: label.to_string(),
            confidence: round_percent(score),
            details,
        })
    }

    /// Analyze an uploaded document, inspecting only its bounded prefix.
    #[instrument(skip_all)]
    pub async fn analyze(&self, text: &str) -> InferenceResult<AnalysisResponse> {
        let text = truncate_chars(text, self.limits.analyze_prefix_chars);

        let verdict = self.classify_text(text).await?;
        let TriageResult { matched_label, method } = verdict.triage_result();

        info!("Triaged via {method:?} (rule: {matched_label:?})");

        let response = match verdict {
            Verdict::Pattern { label } => AnalysisResponse {
                summary: format!("Detected pattern: {label} (via regex)"),
                method,
                details: None,
            },
            Verdict::Model { label, confidence, details } => AnalysisResponse {
                summary: format!("Likely issue: {label} ({}% confidence)", format_percent(confidence)),
                method,
                details: Some(details),
            },
        };

        Ok(response)
    }

    /// Summarize an uploaded document's bounded prefix.
    #[instrument(skip_all)]
    pub async fn summarize(&self, text: &str) -> InferenceResult<SummaryResponse> {
        let text = truncate_chars(text, self.limits.summarize_prefix_chars);

        let summary = self.inference.summarize(text, self.limits.summary_max_length, self.limits.summary_min_length).await?;

        Ok(SummaryResponse { summary })
    }

    /// One-line answer for the interactive form, inspecting the same bounded prefix as `analyze`.
    #[instrument(skip_all)]
    pub async fn describe(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return "Please enter log text.".to_string();
        }

        let text = truncate_chars(text, self.limits.analyze_prefix_chars);

        match self.classify_text(text).await {
            Ok(Verdict::Pattern { label }) => format!("Pattern matched: {label}"),
            Ok(Verdict::Model { label, confidence, .. }) => format!("AI detected: {label} ({}%)", format_percent(confidence)),
            Err(err) => format!("Analysis failed: {err}"),
        }
    }
}

/// Express a `[0, 1]` score as a percentage rounded to two decimals.
pub fn round_percent(score: f64) -> f64 {
    (score * 100.0 * 100.0).round() / 100.0
}

/// Render a percentage the way it reads in responses: whole numbers keep one decimal (`92.0`).
pub fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 { format!("{percent:.1}") } else { format!("{percent}") }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::{
        base::{rules, types::PatternSpec},
        service::inference::GenericInferenceClient,
    };

    mock! {
        pub Inference {}

        #[async_trait]
        impl GenericInferenceClient for Inference {
            async fn classify(&self, text: &str, labels: &[String]) -> InferenceResult<Classification>;
            async fn summarize(&self, text: &str, max_length: u32, min_length: u32) -> InferenceResult<String>;
        }
    }

    fn weather_classification() -> Classification {
        Classification {
            labels: vec!["system healthy".to_string(), "other".to_string(), "timeout".to_string()],
            scores: vec![0.87654, 0.1, 0.02346],
        }
    }

    fn analyzer(mock: MockInference) -> Analyzer {
        Analyzer::new(
            PatternTriage::default_rules().unwrap(),
            InferenceClient::new(Arc::new(mock)),
            rules::default_candidate_labels(),
            AnalysisLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_regex_path_skips_inference() {
        let mut mock = MockInference::new();
        mock.expect_classify().never();

        let analyzer = analyzer(mock);

        let response = analyzer.analyze("Connection refused by host").await.unwrap();
        assert_eq!(response.summary, "Detected pattern: network issue (via regex)");
        assert_eq!(response.method, TriageMethod::Regex);
        assert_eq!(response.details, None);

        let response = analyzer.analyze("HTTP 500 Internal Server Error occurred").await.unwrap();
        assert_eq!(response.summary, "Detected pattern: server error (via regex)");
    }

    #[tokio::test]
    async fn test_fallback_invoked_once() {
        let mut mock = MockInference::new();
        mock.expect_classify()
            .withf(|text, labels| text == "The weather is nice today" && labels.len() == 9)
            .times(1)
            .returning(|_, _| Ok(weather_classification()));

        let analyzer = analyzer(mock);

        let response = analyzer.analyze("The weather is nice today").await.unwrap();
        let details = response.details.unwrap();

        assert_eq!(response.method, TriageMethod::AiClassification);
        assert_eq!(response.summary, "Likely issue: system healthy (87.65% confidence)");
        assert_eq!(details.labels[0], "system healthy");
        assert_eq!(round_percent(details.scores[0]), 87.65);
    }

    #[tokio::test]
    async fn test_empty_input_falls_back() {
        let mut mock = MockInference::new();
        mock.expect_classify()
            .withf(|text, _| text.is_empty())
            .times(1)
            .returning(|_, _| Err(InferenceError::unavailable("empty input rejected")));

        let analyzer = analyzer(mock);

        let result = analyzer.analyze("").await;

        assert!(matches!(result, Err(InferenceError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_match_past_prefix_is_ignored() {
        let text = format!("{}connection refused", "a".repeat(1500));

        let mut mock = MockInference::new();
        mock.expect_classify()
            .withf(|text, _| text.chars().count() == 1500)
            .times(1)
            .returning(|_, _| Ok(weather_classification()));

        let analyzer = analyzer(mock);

        let response = analyzer.analyze(&text).await.unwrap();

        assert_eq!(response.method, TriageMethod::AiClassification);
    }

    #[tokio::test]
    async fn test_custom_rules_take_precedence_in_order() {
        let mut mock = MockInference::new();
        mock.expect_classify().never();

        let triage = PatternTriage::new(&[PatternSpec::new("first", "alpha"), PatternSpec::new("second", "beta")]).unwrap();
        let analyzer = Analyzer::new(triage, InferenceClient::new(Arc::new(mock)), vec!["other".to_string()], AnalysisLimits::default());

        let verdict = analyzer.classify_text("beta then alpha").await.unwrap();

        assert_eq!(verdict, Verdict::Pattern { label: "first".to_string() });
        assert_eq!(verdict.triage_result().method, TriageMethod::Regex);
    }

    #[tokio::test]
    async fn test_summarize_truncates_and_passes_bounds() {
        let text = "x".repeat(5000);

        let mut mock = MockInference::new();
        mock.expect_summarize()
            .withf(|text, max_length, min_length| text.len() == 2000 && *max_length == 80 && *min_length == 25)
            .times(1)
            .returning(|_, _, _| Ok("A very repetitive log.".to_string()));

        let analyzer = analyzer(mock);

        let response = analyzer.summarize(&text).await.unwrap();

        assert_eq!(response.summary, "A very repetitive log.");
    }

    #[tokio::test]
    async fn test_describe_for_form() {
        let mut mock = MockInference::new();
        mock.expect_classify().times(1).returning(|_, _| Ok(weather_classification()));

        let analyzer = analyzer(mock);

        assert_eq!(analyzer.describe("   ").await, "Please enter log text.");
        assert_eq!(analyzer.describe("auth failed for user bob").await, "Pattern matched: authentication failure");
        assert_eq!(analyzer.describe("The weather is nice today").await, "AI detected: system healthy (87.65%)");
    }

    #[tokio::test]
    async fn test_describe_reports_failure() {
        let mut mock = MockInference::new();
        mock.expect_classify().returning(|_, _| Err(InferenceError::Timeout { attempts: 4 }));

        let analyzer = analyzer(mock);

        assert_eq!(analyzer.describe("all quiet").await, "Analysis failed: Inference call timed out after 4 attempts.");
    }

    #[tokio::test]
    async fn test_describe_bounds_classifier_input() {
        let mut mock = MockInference::new();
        mock.expect_classify()
            .withf(|text, _| text.chars().count() == 1500)
            .times(1)
            .returning(|_, _| Ok(weather_classification()));

        let analyzer = analyzer(mock);

        assert_eq!(analyzer.describe(&"q".repeat(1_000_000)).await, "AI detected: system healthy (87.65%)");
    }

    #[tokio::test]
    async fn test_describe_ignores_match_past_prefix() {
        let text = format!("{}connection refused", "q".repeat(1500));

        let mut mock = MockInference::new();
        mock.expect_classify().times(1).returning(|_, _| Ok(weather_classification()));

        let analyzer = analyzer(mock);

        assert!(analyzer.describe(&text).await.starts_with("AI detected:"));
    }

    #[tokio::test]
    async fn test_whole_percent_keeps_one_decimal() {
        let mut mock = MockInference::new();
        mock.expect_classify().times(2).returning(|_, _| {
            Ok(Classification {
                labels: vec!["other".to_string()],
                scores: vec![0.92],
            })
        });

        let analyzer = analyzer(mock);

        let response = analyzer.analyze("all quiet").await.unwrap();
        assert_eq!(response.summary, "Likely issue: other (92.0% confidence)");
        assert_eq!(analyzer.describe("all quiet").await, "AI detected: other (92.0%)");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(round_percent(0.92)), "92.0");
        assert_eq!(format_percent(round_percent(0.5)), "50.0");
        assert_eq!(format_percent(round_percent(0.87654)), "87.65");
        assert_eq!(format_percent(round_percent(0.123)), "12.3");
        assert_eq!(format_percent(round_percent(1.0)), "100.0");
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(0.87654), 87.65);
        assert_eq!(round_percent(0.5), 50.0);
        assert_eq!(round_percent(0.0), 0.0);
        assert_eq!(round_percent(1.0), 100.0);
    }
}
