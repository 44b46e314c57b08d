//! Syntactic name usage: what a block defines, what it reads, and what it
//! leaves free. Pure name matching; no scope resolution.

use indexmap::IndexSet;
use smallvec::SmallVec;
use tree_sitter::Node;

use crate::core::nodes::{NodeClass, unwrap_export};
use crate::core::span::Span;

/// Names a block introduces at its own level.
pub type DefinedNames = SmallVec<[String; 4]>;

/// Pre-order walk; `visit` returns whether to descend into the node.
pub fn walk<'t>(
    root: Node<'t>,
    mut visit: impl FnMut(Node<'t>) -> bool,
)
{
    let mut cursor = root.walk();
    let mut descend = visit(root);

    loop
    {
        if descend && cursor.goto_first_child()
        {
            descend = visit(cursor.node());
            continue;
        }

        // Climb until a sibling is available or the root is reached
        loop
        {
            if cursor
                .node()
                .id()
                == root.id()
            {
                return;
            }
            if cursor.goto_next_sibling()
            {
                descend = visit(cursor.node());
                break;
            }
            if !cursor.goto_parent()
            {
                return;
            }
        }
    }
}

fn text_of<'a>(
    node: Node,
    src: &'a str,
) -> &'a str
{
    node.utf8_text(src.as_bytes())
        .unwrap_or("")
}

fn is_field(
    parent: Node,
    field: &str,
    node: Node,
) -> bool
{
    parent
        .child_by_field_name(field)
        .is_some_and(|c| c.id() == node.id())
}

/// True when an identifier sits at a binding position.
pub fn is_definition_site(node: Node) -> bool
{
    let Some(parent) = node.parent()
    else
    {
        return false;
    };

    match parent.kind()
    {
        "variable_declarator" => is_field(parent, "name", node),
        "function_declaration"
        | "generator_function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "class_declaration"
        | "class" => is_field(parent, "name", node),
        "formal_parameters" | "array_pattern" | "object_pattern" | "rest_pattern" => true,
        "assignment_pattern" => is_field(parent, "left", node),
        "pair_pattern" => is_field(parent, "value", node),
        "arrow_function" => is_field(parent, "parameter", node),
        "catch_clause" => is_field(parent, "parameter", node),
        "for_in_statement" =>
        {
            is_field(parent, "left", node)
                && parent
                    .child_by_field_name("kind")
                    .is_some()
        }
        "import_specifier" | "import_clause" | "namespace_import" | "labeled_statement" => true,
        _ => false,
    }
}

/// Identifier kinds that can refer to a binding.
fn is_reference_kind(node: Node) -> bool
{
    matches!(node.kind(), "identifier" | "shorthand_property_identifier")
}

/// Names defined by a candidate: the function or class name, or every
/// simple declarator name. Calls and statements define nothing.
pub fn defined_names(
    node: Node,
    src: &str,
) -> DefinedNames
{
    let node = unwrap_export(node);
    let mut out = DefinedNames::new();

    match NodeClass::of(node)
    {
        NodeClass::FunctionDeclaration | NodeClass::Class =>
        {
            if let Some(name) = node.child_by_field_name("name")
            {
                out.push(
                    text_of(name, src).to_string(),
                );
            }
        }
        NodeClass::LexicalDeclaration | NodeClass::VariableDeclaration =>
        {
            let mut cursor = node.walk();
            for decl in node.named_children(&mut cursor)
            {
                if let Some(name) = decl.child_by_field_name("name")
                    && name.kind() == "identifier"
                {
                    out.push(
                        text_of(name, src).to_string(),
                    );
                }
            }
        }
        _ =>
        {}
    }

    out
}

/// Names read or called by identifiers lying inside `span`, found by an
/// overlap-pruned walk over the whole tree. Definition sites are skipped.
pub fn referenced_names_in_span(
    root: Node,
    span: Span,
    src: &str,
) -> IndexSet<String>
{
    let mut out = IndexSet::new();

    walk(root, |n| {
        let node_span = Span::new(n.start_byte(), n.end_byte());
        if !node_span.overlaps(&span)
        {
            return false;
        }

        if is_reference_kind(n)
            && n.start_byte() >= span.start
            && n.end_byte() <= span.end
            && !is_definition_site(n)
        {
            out.insert(
                text_of(n, src).to_string(),
            );
        }

        true
    });

    out
}

/// Names read or called within `node` that `node` does not itself bind.
pub fn free_identifiers(
    node: Node,
    src: &str,
) -> IndexSet<String>
{
    let mut reads = IndexSet::new();
    let mut bound: IndexSet<String> = defined_names(node, src)
        .into_iter()
        .collect();

    walk(node, |n| {
        if is_reference_kind(n)
        {
            let name = text_of(n, src).to_string();
            if is_definition_site(n)
            {
                bound.insert(name);
            }
            else
            {
                reads.insert(name);
            }
        }
        true
    });

    reads.retain(|name| !bound.contains(name));
    reads
}
