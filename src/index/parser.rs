//! Tree-sitter Java parsing and block location

use super::{BlockKind, BlockSpan};
use crate::error::ParseError;
use std::cell::RefCell;
use tree_sitter::{Node, Parser, Tree};

// ═══════════════════════════════════════════════════════════════════════════
//  THREAD-LOCAL PARSER
// ═══════════════════════════════════════════════════════════════════════════
//
// Tree-sitter parsers are expensive to create but reusable, so each thread
// keeps one pre-configured Java parser.

thread_local! {
    static JAVA_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignore error here - surfaces as ParseError::NoTree at parse time
        let _ = p.set_language(&tree_sitter_java::LANGUAGE.into());
        p
    });
}

/// Parse Java source into a syntax tree.
///
/// A tree that contains error nodes is rejected: block boundaries inside a
/// broken file can't be trusted for splicing.
pub fn parse_java(content: &str) -> Result<Tree, ParseError> {
    let tree = JAVA_PARSER
        .with(|p| p.borrow_mut().parse(content, None))
        .ok_or(ParseError::NoTree)?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ParseError::Syntax { line });
    }
    Ok(tree)
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error_line)
}

/// Map a node to the block kind it represents, if it is a candidate at all
pub(crate) fn block_kind(node: &Node) -> Option<BlockKind> {
    match node.kind() {
        "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
            Some(BlockKind::Method)
        }
        "class_declaration" | "interface_declaration" | "enum_declaration"
        | "record_declaration" => Some(BlockKind::Type),
        "lambda_expression" => Some(BlockKind::Lambda),
        "static_initializer" => Some(BlockKind::StaticInitializer),
        // Instance initializer: a bare block directly in a type body
        "block" => node
            .parent()
            .filter(|p| matches!(p.kind(), "class_body" | "enum_body_declarations"))
            .map(|_| BlockKind::StaticInitializer),
        _ => None,
    }
}

/// 1-based inclusive line span of a node
pub(crate) fn node_span(node: &Node) -> Option<BlockSpan> {
    BlockSpan::new(node.start_position().row + 1, node.end_position().row + 1).ok()
}

struct Candidate<'t> {
    node: Node<'t>,
    kind: BlockKind,
    width: usize,
}

impl Candidate<'_> {
    /// Smaller span wins; on equal span the higher-ranked kind wins, and on a
    /// full tie the later (deeper) node in pre-order wins.
    fn yields_to(&self, other: &Candidate) -> bool {
        other.width < self.width
            || (other.width == self.width && other.kind.tie_rank() >= self.kind.tie_rank())
    }
}

/// Find the smallest candidate node whose line span contains `line`.
///
/// Returns `None` when no method, type, lambda or initializer encloses the
/// line (imports, package declaration, blank trailing lines).
pub fn locate(root: Node, line: usize) -> Option<Node> {
    let mut best: Option<Candidate> = None;
    visit(root, line, &mut best);
    best.map(|c| c.node)
}

fn visit<'t>(node: Node<'t>, line: usize, best: &mut Option<Candidate<'t>>) {
    let start = node.start_position().row + 1;
    let end = node.end_position().row + 1;
    // Children never extend past their parent, so prune here
    if line < start || line > end {
        return;
    }

    if let Some(kind) = block_kind(&node) {
        let candidate = Candidate {
            node,
            kind,
            width: end - start,
        };
        let replace = match best.as_ref() {
            Some(current) => current.yields_to(&candidate),
            None => true,
        };
        if replace {
            *best = Some(candidate);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, line, best);
    }
}

/// All type declarations in pre-order (outer types before nested ones)
pub(crate) fn type_declarations(root: Node) -> Vec<Node> {
    let mut types = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if block_kind(&node) == Some(BlockKind::Type) {
            types.push(node);
        }

        if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return types;
            }
        }
    }
}

// Helper functions

pub(crate) fn get_node_text(node: &Node, content: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    content[start..end].to_string()
}
