//! Regex fast-path triage.
//!
//! A [`PatternTriage`] holds an ordered list of [`PatternRule`]s. Scanning walks the rules in
//! registration order and reports the label of the first rule that matches anywhere in the
//! text. When several rules match, the earliest-registered one wins, regardless of where in
//! the text each match occurs.

use anyhow::Context;
use regex::{Regex, RegexBuilder};

use crate::base::{
    rules,
    types::{PatternSpec, Res},
};

/// A labelled, compiled, case-insensitive pattern.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: String,
    pub pattern: Regex,
}

impl PatternRule {
    /// Compile a rule, failing if the pattern is not a valid regular expression.
    pub fn new(label: impl Into<String>, pattern: &str) -> Res<Self> {
        let label = label.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid pattern for label `{label}`."))?;

        Ok(Self { label, pattern })
    }
}

/// Immutable, ordered rule table.
#[derive(Debug, Clone)]
pub struct PatternTriage {
    rules: Vec<PatternRule>,
}

impl PatternTriage {
    /// Compile an ordered list of pattern specs.
    pub fn new(specs: &[PatternSpec]) -> Res<Self> {
        let rules = specs.iter().map(|s| PatternRule::new(s.label.clone(), &s.pattern)).collect::<Res<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// The built-in rule table.
    pub fn default_rules() -> Res<Self> {
        Self::new(&rules::default_patterns())
    }

    /// Return the label of the first rule that matches `text`, if any.
    pub fn scan(&self, text: &str) -> Option<&str> {
        self.rules.iter().find(|r| r.pattern.is_match(text)).map(|r| r.label.as_str())
    }

    /// Rule labels that do not appear in `candidates`.
    pub fn unlisted_labels<'a>(&'a self, candidates: &[String]) -> Vec<&'a str> {
        self.rules
            .iter()
            .map(|r| r.label.as_str())
            .filter(|label| !candidates.iter().any(|c| c == label))
            .collect()
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

/// The prefix of `text` made of its first `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triage() -> PatternTriage {
        PatternTriage::default_rules().unwrap()
    }

    #[test]
    fn test_default_rules_compile_in_order() {
        let triage = triage();
        let labels = triage.rules().iter().map(|r| r.label.as_str()).collect::<Vec<_>>();

        assert_eq!(
            labels,
            vec![
                "network issue",
                "server error",
                "authentication failure",
                "configuration error",
                "timeout",
                "database error",
                "permission denied",
            ]
        );
    }

    #[test]
    fn test_scan_single_matches() {
        let triage = triage();

        assert_eq!(triage.scan("Connection refused by host"), Some("network issue"));
        assert_eq!(triage.scan("HTTP 500 Internal Server Error occurred"), Some("server error"));
        assert_eq!(triage.scan("401 Unauthorized"), Some("authentication failure"));
        assert_eq!(triage.scan("fatal: missing env DATABASE_URL"), Some("configuration error"));
        assert_eq!(triage.scan("request timed out after 30s"), Some("timeout"));
        assert_eq!(triage.scan("SQL error near SELECT"), Some("database error"));
        assert_eq!(triage.scan("open /etc/shadow: permission denied"), Some("permission denied"));
    }

    #[test]
    fn test_scan_is_case_insensitive() {
        let triage = triage();

        assert_eq!(triage.scan("DNS ERROR while resolving"), Some("network issue"));
        assert_eq!(triage.scan("dns error while resolving"), Some("network issue"));
    }

    #[test]
    fn test_scan_earliest_registered_wins() {
        let triage = triage();

        // The timeout appears first in the text, but the network rule is registered first.
        assert_eq!(triage.scan("timeout waiting for peer; connection refused"), Some("network issue"));
        // Authentication outranks timeout.
        assert_eq!(triage.scan("took too long, then returned forbidden"), Some("authentication failure"));
    }

    #[test]
    fn test_scan_no_match() {
        let triage = triage();

        assert_eq!(triage.scan("The weather is nice today"), None);
        assert_eq!(triage.scan(""), None);
    }

    #[test]
    fn test_custom_rules() {
        let triage = PatternTriage::new(&[PatternSpec::new("disk full", r"no\s*space\s*left"), PatternSpec::new("oom", r"out\s*of\s*memory")]).unwrap();

        assert_eq!(triage.scan("write failed: No space left on device"), Some("disk full"));
        assert_eq!(triage.scan("Out Of Memory: killed process"), Some("oom"));
        assert_eq!(triage.scan("Connection refused"), None);
    }

    #[test]
    fn test_invalid_pattern_names_label() {
        let err = PatternTriage::new(&[PatternSpec::new("broken", r"(unclosed")]).unwrap_err();

        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn test_unlisted_labels() {
        let triage = triage();
        let candidates = rules::default_candidate_labels();

        assert_eq!(triage.unlisted_labels(&candidates), vec!["permission denied"]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("🚀🚀🚀", 1), "🚀");
    }

    #[test]
    fn test_match_past_bound_is_not_detected() {
        let triage = triage();
        let text = format!("{}connection refused", "x".repeat(1500));

        assert_eq!(triage.scan(&text), Some("network issue"));
        assert_eq!(triage.scan(truncate_chars(&text, 1500)), None);
    }
}
