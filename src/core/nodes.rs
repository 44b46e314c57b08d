//! Node classification and navigation over the JavaScript syntax tree.
//!
//! Raw tree-sitter kind strings are mapped to [`NodeClass`] once, here.
//! Everything downstream matches on the enum.

use tree_sitter::Node;

use crate::core::span::{Span, full_lines, node_lines};
use crate::infra::buffer::TextBuffer;

/// Upper bound for function elevation.
pub const MAX_NESTING_LEVEL: usize = 50;

/// Closed set of node kinds the extractor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass
{
    Program,
    FunctionDeclaration,
    FunctionExpression,
    ArrowFunction,
    Method,
    Class,
    LexicalDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    ExpressionStatement,
    Export,
    ControlFlow,
    StatementBlock,
    Call,
    Arguments,
    Member,
    Identifier,
    StringLiteral,
    Comment,
    Error,
    Other,
}

impl NodeClass
{
    /// Map a grammar kind string.
    pub fn from_kind(kind: &str) -> Self
    {
        match kind
        {
            "program" => Self::Program,
            "function_declaration" | "generator_function_declaration" => Self::FunctionDeclaration,
            "function_expression" | "function" | "generator_function" => Self::FunctionExpression,
            "arrow_function" => Self::ArrowFunction,
            "method_definition" => Self::Method,
            "class_declaration" | "class" => Self::Class,
            "lexical_declaration" => Self::LexicalDeclaration,
            "variable_declaration" => Self::VariableDeclaration,
            "variable_declarator" => Self::VariableDeclarator,
            "expression_statement" => Self::ExpressionStatement,
            "export_statement" => Self::Export,
            "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
            | "do_statement" | "try_statement" | "switch_statement" => Self::ControlFlow,
            "statement_block" => Self::StatementBlock,
            "call_expression" | "new_expression" => Self::Call,
            "arguments" => Self::Arguments,
            "member_expression" => Self::Member,
            "identifier" => Self::Identifier,
            "string" | "template_string" => Self::StringLiteral,
            "comment" => Self::Comment,
            "ERROR" => Self::Error,
            _ => Self::Other,
        }
    }

    /// Classify a node.
    pub fn of(node: Node) -> Self
    {
        if node.is_error()
        {
            return Self::Error;
        }
        Self::from_kind(node.kind())
    }

    pub fn is_function_like(self) -> bool
    {
        matches!(
            self,
            Self::FunctionDeclaration | Self::FunctionExpression | Self::ArrowFunction | Self::Method
        )
    }

    pub fn is_declaration(self) -> bool
    {
        matches!(
            self,
            Self::FunctionDeclaration | Self::LexicalDeclaration | Self::VariableDeclaration
        )
    }

    /// Units that are never partially included.
    pub fn is_whole_block_candidate(self) -> bool
    {
        self.is_function_like()
            || matches!(
                self,
                Self::Class
                    | Self::LexicalDeclaration
                    | Self::VariableDeclaration
                    | Self::ExpressionStatement
                    | Self::Export
                    | Self::ControlFlow
            )
    }

    /// Constructs that open a scope (used for the top-level test).
    pub fn opens_scope(self) -> bool
    {
        self.is_function_like()
            || matches!(self, Self::Class | Self::StatementBlock | Self::ControlFlow)
    }
}

/// True for a statement block that is the `body` of a function.
pub fn is_function_body(node: Node) -> bool
{
    if NodeClass::of(node) != NodeClass::StatementBlock
    {
        return false;
    }

    node.parent()
        .filter(|p| NodeClass::of(*p).is_function_like())
        .and_then(|p| p.child_by_field_name("body"))
        .is_some_and(|body| body.id() == node.id())
}

/// Declaration wrapped by an `export` statement, or the node itself.
pub fn unwrap_export(node: Node) -> Node
{
    if NodeClass::of(node) == NodeClass::Export
        && let Some(decl) = node.child_by_field_name("declaration")
    {
        return decl;
    }
    node
}

/// Resolve the unit that must be kept whole around `node`.
///
/// A function passed as a call argument resolves to the call (so the
/// closing parenthesis survives); an expression statement holding a single
/// call resolves to that call.
pub fn container_for(node: Node) -> Node
{
    let class = NodeClass::of(node);

    if class.is_function_like()
    {
        let mut current = node;

        loop
        {
            let Some(parent) = current.parent()
            else
            {
                break;
            };

            match NodeClass::of(parent)
            {
                // f(function () {}) → the call
                NodeClass::Arguments => match parent
                    .parent()
                    .filter(|g| NodeClass::of(*g) == NodeClass::Call)
                {
                    Some(call) => current = call,
                    None => break,
                },
                // a(...).then(...) → the outer call
                NodeClass::Member => match parent
                    .parent()
                    .filter(|g| NodeClass::of(*g) == NodeClass::Call)
                {
                    Some(call) if NodeClass::of(current) == NodeClass::Call => current = call,
                    _ => break,
                },
                // (function () {})() → the call
                NodeClass::Call if NodeClass::of(current) != NodeClass::Call => current = parent,
                NodeClass::Other if parent.kind() == "parenthesized_expression" =>
                {
                    current = parent
                }
                _ => break,
            }
        }

        return current;
    }

    if class == NodeClass::ExpressionStatement
        && node.named_child_count() == 1
        && let Some(inner) = node.named_child(0)
        && NodeClass::of(inner) == NodeClass::Call
    {
        return inner;
    }

    node
}

/// Nearest function-like ancestor (inclusive), hopping from a function
/// body to its owner and looking inside `arguments` for a callback.
pub fn nearest_enclosing_function(node: Node) -> Option<Node>
{
    let mut current = Some(node);

    while let Some(n) = current
    {
        let class = NodeClass::of(n);

        if class.is_function_like()
        {
            return Some(n);
        }
        if is_function_body(n)
        {
            return n.parent();
        }
        if class == NodeClass::Arguments
        {
            let mut cursor = n.walk();
            let callback = n
                .named_children(&mut cursor)
                .find(|c| NodeClass::of(*c).is_function_like());
            if callback.is_some()
            {
                return callback;
            }
        }

        current = n.parent();
    }

    None
}

/// Strictly-outer function-like ancestor.
fn outer_function(node: Node) -> Option<Node>
{
    let mut current = node.parent();

    while let Some(n) = current
    {
        if NodeClass::of(n).is_function_like()
        {
            return Some(n);
        }
        current = n.parent();
    }

    None
}

/// Promote `func` to its enclosing function up to `levels` times.
pub fn elevate_by_levels(
    func: Node,
    levels: usize,
) -> Node
{
    let mut current = func;

    for _ in 0..levels.min(MAX_NESTING_LEVEL)
    {
        match outer_function(current)
        {
            Some(outer) => current = outer,
            None => break,
        }
    }

    current
}

/// Highest ancestor whose parent is the root (the node itself at top level).
pub fn topmost_ancestor(node: Node) -> Node
{
    let mut current = node;

    while let Some(parent) = current.parent()
    {
        if parent
            .parent()
            .is_none()
        {
            break;
        }
        current = parent;
    }

    current
}

/// Previous named sibling, skipping parser-inserted placeholders.
pub fn prev_named_sibling(node: Node) -> Option<Node>
{
    let mut sib = node.prev_named_sibling();

    while let Some(s) = sib
    {
        if !s.is_missing()
        {
            return Some(s);
        }
        sib = s.prev_named_sibling();
    }

    None
}

/// Next named sibling, skipping parser-inserted placeholders.
pub fn next_named_sibling(node: Node) -> Option<Node>
{
    let mut sib = node.next_named_sibling();

    while let Some(s) = sib
    {
        if !s.is_missing()
        {
            return Some(s);
        }
        sib = s.next_named_sibling();
    }

    None
}

/// True when `node` or any ancestor is an error or a missing placeholder.
pub fn in_error_region(node: Node) -> bool
{
    let mut current = Some(node);

    while let Some(n) = current
    {
        if n.is_error() || n.is_missing()
        {
            return true;
        }
        current = n.parent();
    }

    false
}

/// Span of `node`'s lines in full.
pub fn expand_to_full_lines<B: TextBuffer + ?Sized>(
    buf: &B,
    node: Node,
) -> Span
{
    let (start, end) = node_lines(node);
    full_lines(buf, start, end)
}

/// Full-line span of `node` plus directly preceding comment lines.
///
/// Comments are absorbed while no blank line separates them and each sits
/// on its own line (a trailing comment belongs to the statement before it).
pub fn expand_with_leading_comments<B: TextBuffer + ?Sized>(
    buf: &B,
    node: Node,
) -> Span
{
    // Sibling lookups happen at statement level
    let anchor = match node
        .parent()
        .map(NodeClass::of)
    {
        Some(NodeClass::ExpressionStatement | NodeClass::Export) => node
            .parent()
            .unwrap_or(node),
        _ => node,
    };

    let mut first = anchor;
    let mut prev = anchor.prev_sibling();

    while let Some(p) = prev
    {
        if NodeClass::of(p) != NodeClass::Comment
        {
            break;
        }

        let gap = first
            .start_position()
            .row
            .saturating_sub(
                p.end_position()
                    .row,
            );
        let own_line = p
            .prev_sibling()
            .is_none_or(|pp| pp.end_position().row < p.start_position().row);

        if gap > 1 || !own_line
        {
            break;
        }

        first = p;
        prev = p.prev_sibling();
    }

    let (start_line, _) = node_lines(first);
    let (_, end_line) = node_lines(node);

    full_lines(buf, start_line, end_line)
}

/// Full-line span with optional leading comments.
pub fn block_span<B: TextBuffer + ?Sized>(
    buf: &B,
    node: Node,
    with_comments: bool,
) -> Span
{
    if with_comments
    {
        expand_with_leading_comments(buf, node)
    }
    else
    {
        expand_to_full_lines(buf, node)
    }
}
