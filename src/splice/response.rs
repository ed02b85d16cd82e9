//! Method extraction from free-form LLM responses
//!
//! Purely textual: a signature line starts a method and brace depth counting
//! from its first `{` finds the end. No syntax tree is involved, so braces
//! inside string literals or comments can confuse it.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Method name -> implementation text, in response order
pub type ReplacementMap = IndexMap<String, String>;

/// A rewritten method recovered from a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub name: String,
    pub text: String,
}

// Either one or more modifiers (return type optional, so constructors match)
// or no modifiers and a mandatory return type.
static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:(?:public|private|protected|static|final|abstract|synchronized|native|strictfp|default)\s+)+(?:<[^>{;]*>\s+)?(?:(?P<ret>[\w.<>\[\]?,]+(?:\s*,\s*[\w.<>\[\]?]+)*)\s+)?|(?:<[^>{;]*>\s+)?(?P<bare_ret>[\w.<>\[\]?,]+(?:\s*,\s*[\w.<>\[\]?]+)*)[ \t]+)(?P<name>\w+)\s*\([^)]*\)\s*(?:throws\s+[\w.]+(?:\s*,\s*[\w.]+)*\s*)?\{",
    )
    .expect("SIGNATURE_RE regex should compile")
});

/// Words that can open a `word (...) {` line without being a method
const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "catch", "try", "synchronized", "return",
    "new", "throw", "case", "yield", "assert",
];

fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS.contains(&word)
}

/// Extract methods from a response, keeping the first definition of a name.
pub fn parse_replacements(response: &str) -> ReplacementMap {
    let mut map = ReplacementMap::new();
    for replacement in parse_replacement_list(response) {
        if map.contains_key(&replacement.name) {
            warn!(name = %replacement.name, "duplicate method in response, keeping the first");
            continue;
        }
        map.insert(replacement.name, replacement.text);
    }
    info!("parsed {} method(s) from LLM response", map.len());
    map
}

/// Every top-level method in a response, in order, duplicates included.
///
/// Signatures inside an already-extracted method (local or anonymous class
/// members) belong to that method and are not reported separately.
pub fn parse_replacement_list(response: &str) -> Vec<Replacement> {
    let mut replacements = Vec::new();
    let mut consumed_until = 0usize;

    for captures in SIGNATURE_RE.captures_iter(response) {
        let Some(signature) = captures.get(0) else {
            continue;
        };
        let name = captures["name"].to_string();
        let return_type = captures.name("ret").or_else(|| captures.name("bare_ret"));

        if signature.start() < consumed_until {
            debug!(%name, "signature nested in a previous method, skipping");
            continue;
        }

        if is_statement_keyword(&name)
            || return_type.is_some_and(|t| is_statement_keyword(t.as_str()))
        {
            debug!(%name, "statement header, not a method");
            continue;
        }

        let start = annotated_start(response, signature.start());
        let end = match find_block_end(response, signature.start()) {
            Some(end) => end,
            None => {
                warn!(%name, "unterminated method body in response, taking the rest");
                response.len()
            }
        };
        consumed_until = end;

        let text = response[start..end].trim().to_string();
        if !text.is_empty() {
            replacements.push(Replacement { name, text });
        }
    }

    replacements
}

/// Byte offset just past the brace that closes the first `{` at or after
/// `from`.
fn find_block_end(text: &str, from: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut opened = false;

    for (i, c) in text[from..].char_indices() {
        match c {
            '{' => {
                depth += 1;
                opened = true;
            }
            '}' => {
                if !opened {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    return Some(from + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Widen a signature start upwards over directly preceding annotation lines.
/// `line_start` must be the start of a line.
fn annotated_start(text: &str, line_start: usize) -> usize {
    let mut start = line_start;
    while start > 0 {
        let prev_end = start - 1; // the '\n' ending the previous line
        let prev_start = text[..prev_end].rfind('\n').map(|i| i + 1).unwrap_or(0);
        if text[prev_start..prev_end].trim_start().starts_with('@') {
            start = prev_start;
        } else {
            break;
        }
    }
    start
}
