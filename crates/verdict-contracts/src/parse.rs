//! Parse rule definitions and extraction result types.
//!
//! A parse run applies an ordered list of `ParseRule`s to a text and
//! produces a `ParseResult`: the surviving matches in rule declaration
//! order plus run metrics.

use serde::{Deserialize, Serialize};

use crate::error::{VerdictError, VerdictResult};

/// How a rule's `pattern` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// `pattern` is a regular expression; every non-overlapping match is
    /// extracted verbatim.
    Regex,
    /// `pattern` is a literal marker; the extracted value is the text
    /// between the marker and the next `secondary_pattern` occurrence (or
    /// the end of the segment).
    Keyword,
}

/// The slice of input a rule is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseScope {
    /// Apply the rule to each 1-indexed line in order.
    LineByLine,
    /// Apply the rule once to the whole text.
    AllText,
}

/// Which of a rule's collected matches survive into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// Keep only the first match in scan order.
    FirstMatch,
    /// Keep every match.
    AllMatches,
    /// Keep the single match with the longest extracted value; ties keep
    /// the first-encountered.
    LongestMatch,
}

fn default_scope() -> ParseScope {
    ParseScope::AllText
}

fn default_strategy() -> ParseStrategy {
    ParseStrategy::FirstMatch
}

/// A single extraction rule. Immutable; declaration order is load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRule {
    /// Referenced in matches and `rules_matched`; should be unique.
    pub name: String,
    /// Regex or literal marker, depending on `mode`.
    pub pattern: String,
    pub mode: ParseMode,
    #[serde(default = "default_scope")]
    pub scope: ParseScope,
    #[serde(default = "default_strategy")]
    pub strategy: ParseStrategy,
    /// Value a consumer may substitute when the rule extracts nothing.
    /// The engine itself emits no synthetic matches for it.
    #[serde(default)]
    pub fallback_value: Option<String>,
    /// Keyword-mode end marker delimiting the extracted value.
    #[serde(default)]
    pub secondary_pattern: Option<String>,
}

/// Byte span of a match within the scanned segment.
///
/// Offsets are relative to the line when the rule's scope is line-by-line
/// (in which case `line_number` is set), otherwise relative to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLocation {
    pub start: usize,
    pub end: usize,
    pub line_number: Option<usize>,
}

impl ParseLocation {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One extracted value together with where and how it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMatch {
    pub value: String,
    pub location: ParseLocation,
    pub rule_name: String,
    /// 1.0 for regex extraction, 0.9 for keyword extraction.
    pub confidence: f64,
}

/// Aggregate statistics for one parse run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetrics {
    /// Surviving matches across all rules.
    pub total_matches: usize,
    /// End-to-end duration of the run, in seconds.
    pub execution_time: f64,
    /// Length of the input text in bytes.
    pub chars_processed: usize,
    /// Names of rules with at least one surviving match, in declaration
    /// order, no duplicates.
    pub rules_matched: Vec<String>,
}

/// The full outcome of one parse run.
///
/// Matches are ordered by rule declaration order, then by scan order
/// within each rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub matches: Vec<ParseMatch>,
    pub metrics: ParseMetrics,
}

impl ParseResult {
    /// The highest-confidence match produced by `rule_name`, first on ties.
    pub fn best_match(&self, rule_name: &str) -> Option<&ParseMatch> {
        let mut best: Option<&ParseMatch> = None;
        for m in self.matches.iter().filter(|m| m.rule_name == rule_name) {
            if best.map_or(true, |b| m.confidence > b.confidence) {
                best = Some(m);
            }
        }
        best
    }

    /// All matches produced by `rule_name`, in scan order.
    pub fn matches_for(&self, rule_name: &str) -> Vec<&ParseMatch> {
        self.matches
            .iter()
            .filter(|m| m.rule_name == rule_name)
            .collect()
    }

    /// Extracted values grouped by rule name, preserving match order.
    pub fn values_by_rule(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        let mut grouped: std::collections::BTreeMap<String, Vec<String>> = Default::default();
        for m in &self.matches {
            grouped
                .entry(m.rule_name.clone())
                .or_default()
                .push(m.value.clone());
        }
        grouped
    }
}

/// Check a parse request's shape before the engine runs.
///
/// The engine itself is total and never rejects a rule; shape problems are
/// caught here instead. Regex compilability is checked by the parser's
/// `validate` seam, which owns the regex dependency.
pub fn validate_parse_request(text: &str, rules: &[ParseRule]) -> VerdictResult<()> {
    if text.is_empty() {
        return Err(VerdictError::validation("input text cannot be empty"));
    }
    if rules.is_empty() {
        return Err(VerdictError::validation(
            "at least one parse rule must be provided",
        ));
    }
    for rule in rules {
        if rule.name.trim().is_empty() {
            return Err(VerdictError::validation("parse rule name cannot be empty"));
        }
        if rule.pattern.is_empty() {
            return Err(VerdictError::validation(format!(
                "parse rule '{}' has an empty pattern",
                rule.name
            )));
        }
    }
    Ok(())
}
