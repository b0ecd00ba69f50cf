use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// How a piece of log text was triaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriageMethod {
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "AI classification")]
    AiClassification,
}

/// The outcome of triaging a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageResult {
    pub matched_label: Option<String>,
    pub method: TriageMethod,
}

/// Zero-shot classifier output: labels ordered by descending score, with matching scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl Classification {
    /// The top label and its score, if any.
    pub fn top(&self) -> Option<(&str, f64)> {
        self.labels.first().zip(self.scores.first()).map(|(label, score)| (label.as_str(), *score))
    }
}

/// Response envelope for `/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub summary: String,
    pub method: TriageMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Classification>,
}

/// Response envelope for `/summarize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// A single `(label, pattern)` pair as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub label: String,
    pub pattern: String,
}

impl PatternSpec {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
        }
    }
}
