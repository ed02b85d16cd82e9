//! Request payloads and summaries for planned batches
//!
//! A batch goes out as JSON: the rewrite instruction, the file name, and the
//! flagged members grouped under the signature of the type that holds them.
//! The same blocks also render as a plain-text summary for the terminal.

use crate::index::{innermost_container, BlockKind, CodeBlock};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use tracing::debug;

/// Default instruction sent with every batch
pub const REFACTOR_INSTRUCTION: &str = r#"You are refactoring Java code flagged by a static analyzer.
For each violation, rewrite the extracted code so the listed issues go away while behavior stays exactly the same.
Return only complete Java method or constructor definitions, one after another, each with its full signature and body.
Keep every method name unchanged. You may add new private helper methods; give them new, unique names.
Do not return whole classes, field declarations, or explanations."#;

const UNKNOWN_TYPE: &str = "Unknown";

// ═══════════════════════════════════════════════════════════════════════════
//  Refactoring objectives
// ═══════════════════════════════════════════════════════════════════════════

/// Goal text for a single analyzer rule
pub fn objective_for_rule(rule: &str) -> &'static str {
    match rule {
        "CyclomaticComplexity" => {
            "Reduce branching and split complex logic into smaller, reusable methods while preserving functionality."
        }
        "CognitiveComplexity" => {
            "Refactor deeply nested structures, simplify conditions, and improve readability while maintaining correctness."
        }
        "NPathComplexity" => {
            "Reduce execution paths by simplifying conditionals and avoiding redundant logic without altering behavior."
        }
        "ExcessivePublicCount" => {
            "Consider reducing the number of public methods by encapsulating logic within private methods where possible."
        }
        _ => {
            "Refactor this code to improve maintainability and reduce complexity while ensuring correctness."
        }
    }
}

/// Distinct objectives for a set of rules, one per line, in rule order.
/// Unknown rules share the default objective, which appears at most once.
pub fn objective_for_rules<'a>(rules: impl IntoIterator<Item = &'a str>) -> String {
    let rules: BTreeSet<&str> = rules.into_iter().collect();
    if rules.is_empty() {
        return objective_for_rule("").to_string();
    }

    let mut objectives: Vec<&'static str> = Vec::new();
    for rule in rules {
        let objective = objective_for_rule(rule);
        if !objectives.contains(&objective) {
            objectives.push(objective);
        }
    }
    objectives.join("\n")
}

// ═══════════════════════════════════════════════════════════════════════════
//  Request payload
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct RequestPayload<'a> {
    instruction: &'a str,
    file: String,
    classes: Vec<ClassEntry>,
}

#[derive(Debug, Serialize)]
struct ClassEntry {
    type_signature: String,
    violations: Vec<ViolationEntry>,
}

#[derive(Debug, Serialize)]
struct ViolationEntry {
    block_type: &'static str,
    extracted_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<IssueEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refactoring_objective: Option<String>,
}

#[derive(Debug, Serialize)]
struct IssueEntry {
    rule: String,
    message: String,
}

/// Build the JSON request for one batch.
///
/// Type blocks in the batch provide the grouping; each member goes under the
/// innermost type that encloses it, or under `"Unknown"`. A type that carries
/// findings of its own also appears as a violation of itself. An empty batch yields `[]`.
pub fn build_request_payload(
    batch: &[CodeBlock],
    include_issues: bool,
    instruction: Option<&str>,
) -> serde_json::Result<serde_json::Value> {
    let Some(first) = batch.first() else {
        return Ok(serde_json::Value::Array(Vec::new()));
    };

    let types: Vec<&CodeBlock> = batch.iter().filter(|b| b.kind == BlockKind::Type).collect();

    let mut classes: Vec<ClassEntry> = types
        .iter()
        .map(|t| ClassEntry {
            type_signature: type_signature_line(&t.text),
            violations: if t.has_findings() {
                vec![violation_entry(t, include_issues)]
            } else {
                Vec::new()
            },
        })
        .collect();
    let mut unknown: Vec<ViolationEntry> = Vec::new();

    for member in batch.iter().filter(|b| b.kind != BlockKind::Type) {
        let owner = innermost_container(&types, member);
        let entry = violation_entry(member, include_issues);
        match owner {
            Some(index) => classes[index].violations.push(entry),
            None => unknown.push(entry),
        }
    }

    if !unknown.is_empty() {
        classes.push(ClassEntry {
            type_signature: UNKNOWN_TYPE.to_string(),
            violations: unknown,
        });
    }

    let payload = RequestPayload {
        instruction: instruction.unwrap_or(REFACTOR_INSTRUCTION),
        file: file_name(first),
        classes,
    };
    debug!(file = %payload.file, classes = payload.classes.len(), "built request payload");
    serde_json::to_value(&payload)
}

fn violation_entry(block: &CodeBlock, include_issues: bool) -> ViolationEntry {
    let (issues, refactoring_objective) = if include_issues {
        let issues = block
            .findings
            .iter()
            .map(|f| IssueEntry {
                rule: f.rule_id.clone(),
                message: f.message.clone(),
            })
            .collect();
        let objective = objective_for_rules(block.findings.iter().map(|f| f.rule_id.as_str()));
        (Some(issues), Some(objective))
    } else {
        (None, None)
    };

    ViolationEntry {
        block_type: block.kind.as_str(),
        extracted_code: block.text.clone(),
        issues,
        refactoring_objective,
    }
}

/// Signature part of a type summary: its first line without the brace
fn type_signature_line(summary: &str) -> String {
    let first = summary.lines().next().unwrap_or_default();
    first.trim_end().trim_end_matches('{').trim_end().to_string()
}

fn file_name(block: &CodeBlock) -> String {
    block
        .file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| block.file_path.display().to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
//  Terminal summary
// ═══════════════════════════════════════════════════════════════════════════

/// Render blocks as a per-type report of flagged members
pub fn format_summary(blocks: &[CodeBlock]) -> String {
    let Some(first) = blocks.first() else {
        return "No violations detected in the analyzed file.".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "Analysis summary for file: {}", file_name(first));

    let mut types: Vec<&CodeBlock> = blocks.iter().filter(|b| b.kind == BlockKind::Type).collect();
    types.sort_by_key(|t| t.span);

    for (index, ty) in types.iter().enumerate() {
        let _ = writeln!(
            out,
            "\nType Signature: {} (Lines {})",
            type_signature_line(&ty.text),
            ty.span
        );

        let mut flagged: Vec<&CodeBlock> = Vec::new();
        if ty.has_findings() {
            flagged.push(*ty);
        }
        flagged.extend(blocks.iter().filter(|b| {
            b.kind != BlockKind::Type && innermost_container(&types, b) == Some(index)
        }));

        if flagged.is_empty() {
            out.push_str("  No violations detected in this type.\n");
            continue;
        }

        for block in flagged {
            let _ = writeln!(out, "\n  {} (Lines {})", block.kind, block.span);
            for finding in &block.findings {
                let _ = writeln!(out, "    - {}: {}", finding.rule_id, finding.message);
            }
        }
    }

    out
}
