//! Built-in label set and regex rule table.

use super::types::PatternSpec;

/// Candidate labels handed to the zero-shot classifier.
pub const CANDIDATE_LABELS: &[&str] = &[
    "network issue",
    "server error",
    "authentication failure",
    "performance issue",
    "configuration error",
    "timeout",
    "database error",
    "system healthy",
    "other",
];

/// Known issue patterns, in match priority order.
///
/// Order matters: the first pattern that matches wins, so a log line that mentions both a
/// refused connection and a timeout is reported as a network issue.
pub const PATTERNS: &[(&str, &str)] = &[
    ("network issue", r"(connection\s*refused|host\s*unreachable|dns\s*error|network\s*down)"),
    ("server error", r"(internal\s*server\s*error|http\s*500|service\s*unavailable)"),
    ("authentication failure", r"(unauthorized|forbidden|invalid\s*credentials|auth\s*failed)"),
    ("configuration error", r"(missing\s*(config|env|key)|invalid\s*(path|argument))"),
    ("timeout", r"(timeout|timed\s*out|took\s*too\s*long)"),
    ("database error", r"(sql\s*error|database\s*connection\s*failed|query\s*failed)"),
    ("permission denied", r"(permission\s*denied|access\s*refused)"),
];

/// The candidate labels as owned strings.
pub fn default_candidate_labels() -> Vec<String> {
    CANDIDATE_LABELS.iter().map(|l| l.to_string()).collect()
}

/// The pattern table as owned specs.
pub fn default_patterns() -> Vec<PatternSpec> {
    PATTERNS.iter().map(|(label, pattern)| PatternSpec::new(*label, *pattern)).collect()
}
