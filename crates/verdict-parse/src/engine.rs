//! Rule-based extraction engine.
//!
//! `RuleParser` implements the `Parser` trait from `verdict-core`. Rules
//! are applied in declaration order; per rule the engine dispatches on
//! scope (whole text vs. 1-indexed lines), then on mode (regex vs. literal
//! keyword scan), and finally reduces the collected matches with the
//! rule's strategy. Ordering is load-bearing throughout — first-match
//! semantics depend on it.
//!
//! The engine is total: a rule that cannot match (including an
//! uncompilable regex pattern) contributes nothing and is logged, never
//! raised. Shape problems are the caller's concern, surfaced through
//! `validate` before parsing.

use std::time::Instant;

use regex::Regex;
use tracing::{debug, warn};

use verdict_contracts::{
    error::{VerdictError, VerdictResult},
    parse::{
        validate_parse_request, ParseLocation, ParseMatch, ParseMetrics, ParseMode, ParseResult,
        ParseRule, ParseScope, ParseStrategy,
    },
};
use verdict_core::traits::Parser;

/// Check rule well-formedness without touching any input text.
///
/// Shape problems (empty list, empty names or patterns) are `Validation`
/// errors; a regex-mode pattern that does not compile is a `Configuration`
/// error because the rule definition itself is broken, not the request.
pub fn validate_rules(rules: &[ParseRule]) -> VerdictResult<()> {
    // Reuse the shape checks; the placeholder text only has to be non-empty.
    validate_parse_request(" ", rules)?;
    for rule in rules {
        if rule.mode == ParseMode::Regex {
            Regex::new(&rule.pattern).map_err(|e| {
                VerdictError::config(format!(
                    "parse rule '{}' has an invalid pattern: {e}",
                    rule.name
                ))
            })?;
        }
    }
    Ok(())
}

/// The verdict extraction engine. Stateless; construct once and share.
#[derive(Debug, Default)]
pub struct RuleParser;

impl RuleParser {
    pub fn new() -> Self {
        Self
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Collect a rule's raw matches across its scope, before strategy
    /// post-processing.
    fn collect_matches(rule: &ParseRule, text: &str) -> Vec<ParseMatch> {
        // Compile once per rule, not per line. An invalid pattern makes
        // the rule inert rather than failing the run.
        let compiled = match rule.mode {
            ParseMode::Regex => match Regex::new(&rule.pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(rule = %rule.name, error = %e, "invalid regex pattern, rule skipped");
                    return Vec::new();
                }
            },
            ParseMode::Keyword => None,
        };

        match rule.scope {
            ParseScope::AllText => Self::segment_matches(rule, compiled.as_ref(), text, None),
            ParseScope::LineByLine => {
                let mut collected = Vec::new();
                for (index, line) in text.lines().enumerate() {
                    let found =
                        Self::segment_matches(rule, compiled.as_ref(), line, Some(index + 1));
                    if !found.is_empty() {
                        collected.extend(found);
                        // First-match rules stop scanning at the first
                        // line that yields anything.
                        if rule.strategy == ParseStrategy::FirstMatch {
                            break;
                        }
                    }
                }
                collected
            }
        }
    }

    /// Apply a rule's mode to one text segment (the whole text or a line).
    fn segment_matches(
        rule: &ParseRule,
        compiled: Option<&Regex>,
        segment: &str,
        line_number: Option<usize>,
    ) -> Vec<ParseMatch> {
        match (rule.mode, compiled) {
            (ParseMode::Regex, Some(re)) => Self::regex_matches(rule, re, segment, line_number),
            (ParseMode::Keyword, _) => Self::keyword_matches(rule, segment, line_number),
            // Unreachable in practice: regex mode without a compiled
            // pattern was already filtered out by collect_matches.
            (ParseMode::Regex, None) => Vec::new(),
        }
    }

    /// Every non-overlapping regex match in the segment, confidence 1.0.
    fn regex_matches(
        rule: &ParseRule,
        re: &Regex,
        segment: &str,
        line_number: Option<usize>,
    ) -> Vec<ParseMatch> {
        re.find_iter(segment)
            .map(|m| ParseMatch {
                value: m.as_str().to_string(),
                location: ParseLocation {
                    start: m.start(),
                    end: m.end(),
                    line_number,
                },
                rule_name: rule.name.clone(),
                confidence: 1.0,
            })
            .collect()
    }

    /// Literal keyword scan: the extracted value is the text between the
    /// end of a `pattern` occurrence and the next `secondary_pattern`
    /// occurrence (or the end of the segment), trimmed. Empty trimmed
    /// values are discarded. Confidence 0.9.
    fn keyword_matches(
        rule: &ParseRule,
        segment: &str,
        line_number: Option<usize>,
    ) -> Vec<ParseMatch> {
        let pattern = rule.pattern.as_str();
        if pattern.is_empty() {
            // Malformed rule; validate() rejects this shape up front.
            return Vec::new();
        }

        let mut found = Vec::new();
        let mut cursor = 0usize;

        while let Some(relative) = segment[cursor..].find(pattern) {
            let start = cursor + relative;
            let value_start = start + pattern.len();

            let end = rule
                .secondary_pattern
                .as_deref()
                .filter(|sec| !sec.is_empty())
                .and_then(|sec| segment[value_start..].find(sec).map(|p| value_start + p))
                .unwrap_or(segment.len());

            let value = segment[value_start..end].trim();
            if !value.is_empty() {
                found.push(ParseMatch {
                    value: value.to_string(),
                    location: ParseLocation {
                        start,
                        end,
                        line_number,
                    },
                    rule_name: rule.name.clone(),
                    confidence: 0.9,
                });
            }

            if end >= segment.len() {
                break;
            }
            // Advance past the consumed span by at least one character so
            // an empty span cannot stall the scan.
            let step = segment[end..].chars().next().map_or(1, |c| c.len_utf8());
            cursor = end + step;
        }

        found
    }

    /// Reduce a rule's collected matches according to its strategy.
    fn apply_strategy(strategy: ParseStrategy, found: Vec<ParseMatch>) -> Vec<ParseMatch> {
        match strategy {
            ParseStrategy::AllMatches => found,
            ParseStrategy::FirstMatch => found.into_iter().take(1).collect(),
            ParseStrategy::LongestMatch => {
                let mut best: Option<ParseMatch> = None;
                for m in found {
                    // Strictly greater keeps the first-encountered on ties.
                    let replace = best
                        .as_ref()
                        .map_or(true, |b| m.value.len() > b.value.len());
                    if replace {
                        best = Some(m);
                    }
                }
                best.into_iter().collect()
            }
        }
    }
}

impl Parser for RuleParser {
    fn validate(&self, rules: &[ParseRule]) -> VerdictResult<()> {
        validate_rules(rules)
    }

    /// Apply `rules` in declaration order and collect surviving matches.
    fn parse(&self, text: &str, rules: &[ParseRule]) -> ParseResult {
        let started = Instant::now();
        let mut matches: Vec<ParseMatch> = Vec::new();
        let mut rules_matched: Vec<String> = Vec::new();

        for rule in rules {
            let collected = Self::collect_matches(rule, text);
            let surviving = Self::apply_strategy(rule.strategy, collected);

            debug!(
                rule = %rule.name,
                surviving = surviving.len(),
                "rule evaluated"
            );

            if !surviving.is_empty() {
                rules_matched.push(rule.name.clone());
                matches.extend(surviving);
            }
        }

        let metrics = ParseMetrics {
            total_matches: matches.len(),
            execution_time: started.elapsed().as_secs_f64(),
            chars_processed: text.len(),
            rules_matched,
        };

        ParseResult { matches, metrics }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
