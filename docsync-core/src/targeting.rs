//! Picks prior documents that steer the style of a generated page.

use crate::contract::DocKind;
use crate::state::{DocFile, DocInfo};

/// Second-to-last path segment: `docs/llm/openai.mdx` is in category `llm`.
pub fn category(path: &str) -> Option<&str> {
    let mut segments = path.rsplit('/');
    segments.next()?;
    segments.next().filter(|s| !s.is_empty())
}

/// Select template documents for `target_path`.
///
/// Explicit `template_paths` win whenever at least one of them is a known document
/// with content. Otherwise every known documentation page in the same category as
/// the target (excluding the target itself) is used. Output follows `doc_info` order.
pub fn select_templates<'a>(
    target_path: &str,
    doc_info: &'a DocInfo,
    template_paths: &[String],
) -> Vec<&'a DocFile> {
    if !template_paths.is_empty() {
        let explicit: Vec<&DocFile> = doc_info
            .files
            .iter()
            .filter(|f| f.content.is_some() && template_paths.iter().any(|p| *p == f.path))
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
    }

    let Some(target_category) = category(target_path) else {
        return Vec::new();
    };
    doc_info
        .files
        .iter()
        .filter(|f| {
            f.kind == DocKind::Doc
                && f.path != target_path
                && f.content.is_some()
                && category(&f.path) == Some(target_category)
        })
        .collect()
}
