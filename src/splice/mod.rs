//! Marker-based splicing of rewritten code
//!
//! Flagged blocks are wrapped in sentinel comment lines before the file goes
//! out; when rewrites come back, each marked region is swapped for the
//! rewrite with the same entity name.

pub mod markers;
pub mod response;

pub use markers::{insert_markers, process_marked_file};
pub use response::{parse_replacement_list, parse_replacements, Replacement, ReplacementMap};

use crate::index::{BlockKind, CodeBlock};
use regex::Regex;
use std::sync::LazyLock;

static METHOD_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\w+)\s*\(").expect("METHOD_NAME_RE regex should compile")
});

static TYPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|enum|record)\s+(\w+)")
        .expect("TYPE_NAME_RE regex should compile")
});

pub(crate) fn start_tag(id: &str) -> String {
    format!("// <start-flagged:{}>", id)
}

pub(crate) fn end_tag(id: &str) -> String {
    format!("// <end-flagged:{}>", id)
}

/// Best-effort name of the entity a block declares.
///
/// Methods: identifier before the first `(`. Types: identifier after the
/// declaration keyword. Everything else, or no match: the kind string.
pub fn entity_name(block: &CodeBlock) -> String {
    let pattern = match block.kind {
        BlockKind::Method => &*METHOD_NAME_RE,
        BlockKind::Type => &*TYPE_NAME_RE,
        _ => return block.kind.as_str().to_string(),
    };

    pattern
        .captures(&block.text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| block.kind.as_str().to_string())
}

/// True if `text` opens with a class, interface, enum or record declaration
/// named `name` (annotations and modifiers allowed before it).
pub(crate) fn declares_type(text: &str, name: &str) -> bool {
    let header = text.split('{').next().unwrap_or_default();
    TYPE_NAME_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .is_some_and(|m| m.as_str() == name)
}

/// Entity name carried by a marker id (`{name}-{sequence}`)
pub(crate) fn name_from_marker_id(id: &str) -> &str {
    match id.rsplit_once('-') {
        Some((name, seq)) if !name.is_empty() && seq.chars().all(|c| c.is_ascii_digit()) => name,
        _ => id,
    }
}
