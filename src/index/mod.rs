//! Block indexing for flagged Java sources
//!
//! Uses tree-sitter to map line-based analyzer findings onto the smallest
//! enclosing method, type, lambda or initializer, and to synthesize
//! class-level context blocks for types whose members are flagged.

pub mod parser;
pub mod summary;

use crate::error::BlockSpanError;
use crate::findings::Finding;
use parser::{block_kind, locate, node_span, parse_java, type_declarations};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use summary::{block_text, SummaryLevel};
use tracing::{debug, info, warn};

/// Syntax node kinds a finding can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Method,
    Type,
    Lambda,
    StaticInitializer,
    Unknown,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Method => "Method",
            BlockKind::Type => "Type",
            BlockKind::Lambda => "Lambda",
            BlockKind::StaticInitializer => "StaticInitializer",
            BlockKind::Unknown => "Unknown",
        }
    }

    /// Type blocks carry class-level context for their members
    pub fn is_container(&self) -> bool {
        matches!(self, BlockKind::Type)
    }

    /// Preference between candidates covering the same line span.
    /// Higher wins: Method > Lambda > StaticInitializer > Type.
    pub(crate) fn tie_rank(&self) -> u8 {
        match self {
            BlockKind::Method => 4,
            BlockKind::Lambda => 3,
            BlockKind::StaticInitializer => 2,
            BlockKind::Type => 1,
            BlockKind::Unknown => 0,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive 1-based line range of a block. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSpan")]
pub struct BlockSpan {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
}

impl TryFrom<RawSpan> for BlockSpan {
    type Error = BlockSpanError;

    fn try_from(raw: RawSpan) -> Result<Self, Self::Error> {
        BlockSpan::new(raw.start, raw.end)
    }
}

impl BlockSpan {
    pub fn new(start: usize, end: usize) -> Result<Self, BlockSpanError> {
        if start == 0 {
            return Err(BlockSpanError::ZeroLine);
        }
        if start > end {
            return Err(BlockSpanError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    /// True if `other` lies entirely inside this span (equal spans included)
    pub fn encloses(&self, other: &BlockSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for BlockSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A located block of source with the findings it encloses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub file_path: PathBuf,
    pub kind: BlockKind,
    pub span: BlockSpan,
    /// Verbatim source for members, a signature summary for types
    pub text: String,
    /// Findings in first-seen order; empty for synthesized context blocks
    pub findings: Vec<Finding>,
}

impl CodeBlock {
    pub fn start_line(&self) -> usize {
        self.span.start()
    }

    pub fn end_line(&self) -> usize {
        self.span.end()
    }

    /// Size in characters, the unit batch budgets are measured in
    pub fn size(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

/// Index of the innermost container (smallest span) that encloses
/// `member`, ignoring `member` itself.
pub fn innermost_container(containers: &[&CodeBlock], member: &CodeBlock) -> Option<usize> {
    containers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.span != member.span && c.span.encloses(&member.span))
        .min_by_key(|(_, c)| c.span.line_count())
        .map(|(idx, _)| idx)
}

/// Read `file_path` and extract its flagged blocks.
///
/// An unreadable file degrades to an empty list, like a parse failure.
pub fn extract_blocks(file_path: &Path, findings: &[Finding]) -> Vec<CodeBlock> {
    if findings.is_empty() {
        return Vec::new();
    }

    match fs::read_to_string(file_path) {
        Ok(content) => extract_blocks_from_source(file_path, &content, findings),
        Err(err) => {
            warn!(path = %file_path.display(), error = %err, "failed to read source file");
            Vec::new()
        }
    }
}

/// Extract flagged blocks from already-loaded source.
///
/// Synthesized type context blocks (no findings, minimal summary) come first
/// in source order, followed by finding-bearing blocks ordered by span.
pub fn extract_blocks_from_source(
    file_path: &Path,
    content: &str,
    findings: &[Finding],
) -> Vec<CodeBlock> {
    if findings.is_empty() {
        return Vec::new();
    }

    let tree = match parse_java(content) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(path = %file_path.display(), error = %err, "could not parse source file");
            return Vec::new();
        }
    };
    let root = tree.root_node();

    let grouped = group(root, content, file_path, findings);

    let mut blocks = Vec::with_capacity(grouped.len() + 1);
    for node in type_declarations(root) {
        let Some(span) = node_span(&node) else {
            continue;
        };
        if grouped.contains_key(&span) {
            continue;
        }
        blocks.push(CodeBlock {
            file_path: file_path.to_path_buf(),
            kind: BlockKind::Type,
            span,
            text: block_text(&node, BlockKind::Type, content, SummaryLevel::Minimal),
            findings: Vec::new(),
        });
    }
    blocks.extend(grouped.into_values());

    info!(
        path = %file_path.display(),
        "extracted {} code blocks",
        blocks.len()
    );
    blocks
}

/// Merge findings into one block per minimal enclosing node.
///
/// Findings with no enclosing candidate are skipped with a warning.
pub fn group(
    root: tree_sitter::Node,
    content: &str,
    file_path: &Path,
    findings: &[Finding],
) -> BTreeMap<BlockSpan, CodeBlock> {
    let mut blocks: BTreeMap<BlockSpan, CodeBlock> = BTreeMap::new();

    for finding in findings {
        let Some(node) = locate(root, finding.line) else {
            warn!(line = finding.line, rule = %finding.rule_id, "no enclosing block found for finding");
            continue;
        };
        let Some(span) = node_span(&node) else {
            continue;
        };

        if let Some(block) = blocks.get_mut(&span) {
            block.findings.push(finding.clone());
            continue;
        }

        let kind = block_kind(&node).unwrap_or(BlockKind::Unknown);
        debug!(%span, %kind, "new block for finding at line {}", finding.line);
        blocks.insert(
            span,
            CodeBlock {
                file_path: file_path.to_path_buf(),
                kind,
                span,
                text: block_text(&node, kind, content, SummaryLevel::Full),
                findings: vec![finding.clone()],
            },
        );
    }

    blocks
}
