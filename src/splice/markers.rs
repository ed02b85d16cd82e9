//! Sentinel insertion and marked-region replacement

use super::response::ReplacementMap;
use super::{declares_type, end_tag, entity_name, name_from_marker_id, start_tag};
use crate::index::CodeBlock;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static START_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"// <start-flagged:([^>\s]+)>").expect("START_MARKER_RE regex should compile")
});

/// Wrap every finding-bearing block in start/end sentinel lines.
///
/// Blocks are processed by start line, last first, so inserting lines never
/// shifts a block that is still waiting. Marked regions never nest (see
/// [`disjoint_regions`]).
pub fn insert_markers(original: &str, blocks: &[CodeBlock]) -> String {
    let mut flagged: Vec<&CodeBlock> = blocks.iter().filter(|b| b.has_findings()).collect();
    if flagged.is_empty() {
        return original.to_string();
    }

    flagged.sort_by(|a, b| {
        b.start_line()
            .cmp(&a.start_line())
            .then(a.end_line().cmp(&b.end_line()))
    });
    let flagged = disjoint_regions(flagged);

    let mut lines: Vec<String> = original.split('\n').map(str::to_string).collect();
    let mut sequence = 0usize;

    for block in flagged {
        let start = block.start_line() - 1;
        let end = block.end_line();
        if end > lines.len() {
            warn!(
                start_line = block.start_line(),
                end_line = block.end_line(),
                "block extends past end of file, not marking"
            );
            continue;
        }

        sequence += 1;
        let id = format!("{}-{}", entity_name(block), sequence);
        lines.insert(end, end_tag(&id));
        lines.insert(start, start_tag(&id));
        debug!(%id, span = %block.span, "inserted markers");
    }

    lines.join("\n")
}

/// Drop blocks whose markers would nest inside another marked region.
///
/// A flagged type that encloses other flagged blocks is left to its members;
/// any remaining block enclosed by another is carried inside the outer one.
fn disjoint_regions(blocks: Vec<&CodeBlock>) -> Vec<&CodeBlock> {
    let encloses_other = |outer: &CodeBlock, pool: &[&CodeBlock]| {
        pool.iter()
            .any(|inner| inner.span != outer.span && outer.span.encloses(&inner.span))
    };

    let without_wrapping_types: Vec<&CodeBlock> = blocks
        .iter()
        .copied()
        .filter(|b| {
            let wraps = b.is_container() && encloses_other(*b, &blocks);
            if wraps {
                debug!(span = %b.span, "type encloses flagged members, not marking it");
            }
            !wraps
        })
        .collect();

    without_wrapping_types
        .iter()
        .copied()
        .filter(|b| {
            let nested = without_wrapping_types
                .iter()
                .any(|outer| outer.span != b.span && outer.span.encloses(&b.span));
            if nested {
                debug!(span = %b.span, "block nested in a marked region, not marking it");
            }
            !nested
        })
        .collect()
}

/// Replace marked regions with rewrites and append unused rewrites.
pub fn process_marked_file(marked: &str, replacements: &ReplacementMap) -> String {
    if marked.is_empty() {
        warn!("attempted to process empty file content");
        return String::new();
    }

    let (content, used) = replace_marked_blocks(marked, replacements);
    append_unused_replacements(content, replacements, &used)
}

/// Single forward pass over the marked text. Positions come from the
/// original text and are shifted by the running length delta of the
/// replacements made so far.
///
/// A marked type is only ever replaced by a type declaration of the same
/// name; otherwise its original text is restored without sentinels.
fn replace_marked_blocks(marked: &str, replacements: &ReplacementMap) -> (String, HashSet<String>) {
    let mut output = marked.to_string();
    let mut used = HashSet::new();
    let mut delta: isize = 0;
    let mut search_from = 0;

    while let Some(captures) = START_MARKER_RE.captures_at(marked, search_from) {
        let Some(start_match) = captures.get(0) else {
            break;
        };
        let id = &captures[1];
        let closing = end_tag(id);

        let Some(relative_end) = marked[start_match.end()..].find(&closing) else {
            warn!(%id, "start marker has no matching end marker, leaving it in place");
            search_from = start_match.end();
            continue;
        };
        let region_start = start_match.start();
        let region_end = start_match.end() + relative_end + closing.len();

        let name = name_from_marker_id(id);
        let inner = &marked[start_match.end()..start_match.end() + relative_end];
        let inner = inner.strip_prefix('\n').unwrap_or(inner);
        let body = inner.strip_suffix('\n').unwrap_or(inner);
        let region_is_type = declares_type(body, name);

        let replacement = match replacements.get(name) {
            Some(code) if !region_is_type || declares_type(code, name) => {
                used.insert(name.to_string());
                debug!(%id, entity = name, "replaced marked block");
                format!(
                    "// <start-replaced:{id}>\n{code}\n// <end-replaced:{id}>"
                )
            }
            Some(_) => {
                // Same-named constructor: keep the type and don't append it
                used.insert(name.to_string());
                warn!(%id, entity = name, "replacement for a marked type is not a type declaration, keeping the type");
                body.to_string()
            }
            None if region_is_type => {
                warn!(%id, entity = name, "no replacement found for marked type, keeping it");
                body.to_string()
            }
            None => {
                warn!(%id, entity = name, "no replacement found for marked block, removing it");
                format!(
                    "// <removed-method: {name} from marker {id}>\n\
                     // Original method was removed as no matching refactored implementation was found"
                )
            }
        };

        let shifted_start = shift(region_start, delta);
        let shifted_end = shift(region_end, delta);
        output.replace_range(shifted_start..shifted_end, &replacement);

        delta += replacement.len() as isize - (region_end - region_start) as isize;
        search_from = region_end;
    }

    (output, used)
}

fn shift(position: usize, delta: isize) -> usize {
    position.saturating_add_signed(delta)
}

/// Insert rewrites that matched no marker before the file's last `}`.
fn append_unused_replacements(
    mut content: String,
    replacements: &ReplacementMap,
    used: &HashSet<String>,
) -> String {
    let extras: Vec<(&String, &String)> = replacements
        .iter()
        .filter(|(name, _)| !used.contains(name.as_str()))
        .collect();
    if extras.is_empty() {
        return content;
    }

    let Some(last_brace) = content.rfind('}') else {
        warn!(
            "no closing brace to append {} extra method(s) before, dropping them",
            extras.len()
        );
        return content;
    };

    let block: String = extras
        .iter()
        .map(|(name, code)| {
            format!(
                "\n\n    // Additional helper method generated by LLM: {}\n    {}\n",
                name, code
            )
        })
        .collect();
    content.insert_str(last_brace, &block);

    info!("added {} extra helper method(s) from LLM response", extras.len());
    content
}
