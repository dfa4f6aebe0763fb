//! Markdown link grammar and outbound edge extraction.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::paths::NoteId;
use crate::link_graph::models::Edge;

/// Target prefixes treated as external URLs.
const EXTERNAL_TARGET_PREFIXES: &[&str] = &["http:", "https:", "www."];

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

// [label](target): label allows word chars, `-/.#^` and whitespace;
// target allows word chars, `-/.#^` and `%` (encoded spaces).
static NOTE_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[([\w\-/\s.#^]+)\]\(([\w\-/.#^%]+)\)"));

/// One link occurrence as written in the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink<'a> {
    /// Text between the brackets.
    pub label: &'a str,
    /// Target before the first `#`.
    pub path: &'a str,
    /// Block reference after the first `#`, if any.
    pub fragment: Option<&'a str>,
    /// Byte range of the whole `[label](target)` occurrence.
    pub span: Range<usize>,
}

fn is_external_target(target: &str) -> bool {
    EXTERNAL_TARGET_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Lazily iterate the internal link occurrences of a note.
///
/// External URLs are skipped; unrecognized syntax is simply not matched.
pub fn scan_links(content: &str) -> impl Iterator<Item = RawLink<'_>> {
    NOTE_LINK_REGEX.captures_iter(content).filter_map(|caps| {
        let whole = caps.get(0)?;
        let label = caps.get(1)?.as_str();
        let target = caps.get(2)?.as_str();
        if is_external_target(target) {
            return None;
        }
        let (path, fragment) = match target.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (target, None),
        };
        Some(RawLink {
            label,
            path,
            fragment,
            span: whole.range(),
        })
    })
}

/// Lazily resolve the outbound edges of `source` from its content.
///
/// One edge per occurrence; fragments are discarded and pure in-note
/// references (`[x](#block)`) produce nothing.
pub fn extract_edges<'a>(
    source: &'a NoteId,
    content: &'a str,
    root: &'a Path,
) -> impl Iterator<Item = Edge> + 'a {
    scan_links(content)
        .filter(|link| !link.path.is_empty())
        .map(move |link| Edge::new(source.clone(), NoteId::from_link_target(link.path, root)))
}
