//! Block text rendering
//!
//! Members are sent verbatim because the exact text is what gets rewritten
//! and spliced back. Types are reduced to a signature summary: fields always,
//! method signatures only when the type itself is flagged.

use super::parser::get_node_text;
use super::BlockKind;
use tree_sitter::Node;

/// How much of a type declaration to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLevel {
    /// Signature, fields and method signatures
    Full,
    /// Signature and fields only
    Minimal,
}

/// Render the text for a located node
pub fn block_text(node: &Node, kind: BlockKind, content: &str, level: SummaryLevel) -> String {
    match kind {
        BlockKind::Type => summarize_type(node, content, level),
        BlockKind::Method
        | BlockKind::Lambda
        | BlockKind::StaticInitializer
        | BlockKind::Unknown => get_node_text(node, content),
    }
}

/// Summarize a class, interface, enum or record declaration
pub fn summarize_type(node: &Node, content: &str, level: SummaryLevel) -> String {
    let mut summary = type_signature(node, content);
    summary.push_str(" {");

    let members = body_members(node);

    let fields: Vec<String> = members
        .iter()
        .filter(|m| matches!(m.kind(), "field_declaration" | "constant_declaration"))
        .map(|m| summarize_field(m, content))
        .collect();
    if !fields.is_empty() {
        summary.push_str("\n  Fields:");
        for field in &fields {
            summary.push_str("\n    ");
            summary.push_str(field);
        }
    }

    if level == SummaryLevel::Full {
        let methods: Vec<String> = members
            .iter()
            .filter(|m| m.kind() == "method_declaration")
            .map(|m| summarize_method(m, content))
            .collect();
        if !methods.is_empty() {
            summary.push_str("\n  Methods:");
            for method in &methods {
                summary.push_str("\n    ");
                summary.push_str(method);
            }
        }
    }

    summary.push_str("\n}");
    summary
}

/// `public class Name extends Base implements A, B`
fn type_signature(node: &Node, content: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(access) = access_modifier(node, content) {
        parts.push(access);
    }

    let keyword = match node.kind() {
        "interface_declaration" => "interface",
        "enum_declaration" => "enum",
        "record_declaration" => "record",
        _ => "class",
    };
    parts.push(keyword.to_string());

    let name = node
        .child_by_field_name("name")
        .map(|n| get_node_text(&n, content))
        .unwrap_or_else(|| "Anonymous".to_string());
    parts.push(name);

    let mut signature = parts.join(" ");

    if let Some(superclass) = node.child_by_field_name("superclass") {
        if let Some(base) = superclass.named_child(0) {
            signature.push_str(" extends ");
            signature.push_str(&get_node_text(&base, content));
        }
    }

    // Interfaces extend other interfaces through an unnamed child
    let mut cursor = node.walk();
    let extends_interfaces = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "extends_interfaces");
    if let Some(extends) = extends_interfaces {
        let names = type_list_names(&extends, content);
        if !names.is_empty() {
            signature.push_str(" extends ");
            signature.push_str(&names.join(", "));
        }
    }

    if let Some(interfaces) = node.child_by_field_name("interfaces") {
        let names = type_list_names(&interfaces, content);
        if !names.is_empty() {
            signature.push_str(" implements ");
            signature.push_str(&names.join(", "));
        }
    }

    signature
}

/// Simple names from a `super_interfaces`/`extends_interfaces` node, type
/// arguments stripped
fn type_list_names(node: &Node, content: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(list) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "type_list")
    else {
        return Vec::new();
    };

    let mut list_cursor = list.walk();
    list.named_children(&mut list_cursor)
        .map(|t| {
            let text = get_node_text(&t, content);
            match text.find('<') {
                Some(pos) => text[..pos].trim().to_string(),
                None => text,
            }
        })
        .collect()
}

fn access_modifier(node: &Node, content: &str) -> Option<String> {
    modifier_keywords(node, content)
        .into_iter()
        .find(|m| matches!(m.as_str(), "public" | "protected" | "private"))
}

/// Keyword modifiers of a declaration, annotations excluded
fn modifier_keywords(node: &Node, content: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(modifiers) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return Vec::new();
    };

    let mut mod_cursor = modifiers.walk();
    modifiers
        .children(&mut mod_cursor)
        .filter(|c| !matches!(c.kind(), "marker_annotation" | "annotation"))
        .map(|c| get_node_text(&c, content))
        .collect()
}

/// Declarations inside the type body, looking through enum body wrappers
fn body_members<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.named_children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

/// `int count` or `String first, last`
fn summarize_field(node: &Node, content: &str) -> String {
    let field_type = node
        .child_by_field_name("type")
        .map(|t| get_node_text(&t, content))
        .unwrap_or_default();

    let mut cursor = node.walk();
    let names: Vec<String> = node
        .children_by_field_name("declarator", &mut cursor)
        .filter_map(|d| d.child_by_field_name("name"))
        .map(|n| get_node_text(&n, content))
        .collect();

    format!("{} {}", field_type, names.join(", ")).trim().to_string()
}

/// `public static int sum(List<Integer> xs, int start)`
pub fn summarize_method(node: &Node, content: &str) -> String {
    let mut parts = modifier_keywords(node, content);

    if let Some(return_type) = node.child_by_field_name("type") {
        parts.push(get_node_text(&return_type, content));
    }

    let name = node
        .child_by_field_name("name")
        .map(|n| get_node_text(&n, content))
        .unwrap_or_default();

    let params = node
        .child_by_field_name("parameters")
        .map(|p| summarize_parameters(&p, content))
        .unwrap_or_default();

    parts.push(format!("{}({})", name, params));
    parts.join(" ")
}

fn summarize_parameters(node: &Node, content: &str) -> String {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter_map(|param| match param.kind() {
            "formal_parameter" => {
                let ty = param.child_by_field_name("type")?;
                let name = param.child_by_field_name("name")?;
                Some(format!(
                    "{} {}",
                    get_node_text(&ty, content),
                    get_node_text(&name, content)
                ))
            }
            "spread_parameter" => Some(
                get_node_text(&param, content)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}
