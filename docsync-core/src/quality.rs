//! Minimum-quality gate for generated documentation pages.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::QualityRules;
use crate::contract::DocKind;
use crate::error::PipelineError;

fn fenced_code_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[^\n]*\n.*?```").expect("fenced code block pattern is valid")
    })
}

/// Reason a page fails the gate, or `None` when it passes.
pub fn rejection_reason(content: &str, rules: &QualityRules) -> Option<String> {
    let length = content.trim().chars().count();
    if length < rules.min_length {
        return Some(format!(
            "content is {length} characters, minimum is {}",
            rules.min_length
        ));
    }
    if let Some(marker) = rules
        .placeholder_markers
        .iter()
        .find(|m| !m.is_empty() && content.contains(m.as_str()))
    {
        return Some(format!("content contains placeholder marker '{marker}'"));
    }
    if rules.require_code_example && !fenced_code_block().is_match(content) {
        return Some("content has no fenced code example".to_string());
    }
    None
}

/// Reject low-quality documentation pages. Navigation content is not gated.
pub fn check(path: &str, kind: DocKind, content: &str, rules: &QualityRules) -> Result<(), PipelineError> {
    if kind != DocKind::Doc {
        return Ok(());
    }
    match rejection_reason(content, rules) {
        Some(reason) => Err(PipelineError::ContentQualityRejected {
            path: path.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
