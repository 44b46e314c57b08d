//! Candidate collectors over the root's direct children.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::core::nodes::{NodeClass, block_span, container_for, unwrap_export};
use crate::core::refs::walk;
use crate::core::span::{Span, line_of};
use crate::infra::buffer::TextBuffer;

/// Recognizer for "test" calls: `<object>.<method>("title", ...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPattern
{
    pub object: String,
    pub method: String,
}

impl Default for TestPattern
{
    fn default() -> Self
    {
        Self { object: "pm".to_string(), method: "test".to_string() }
    }
}

impl TestPattern
{
    /// The call node if `node` is (or wraps) a matching test call.
    pub fn match_call<'t>(
        &self,
        node: Node<'t>,
        src: &str,
    ) -> Option<Node<'t>>
    {
        let call = container_for(unwrap_export(node));
        if call.kind() != "call_expression"
        {
            return None;
        }

        let callee = call.child_by_field_name("function")?;
        if callee.kind() != "member_expression"
        {
            return None;
        }

        let object = callee.child_by_field_name("object")?;
        let property = callee.child_by_field_name("property")?;
        let bytes = src.as_bytes();

        if object.kind() != "identifier"
            || object
                .utf8_text(bytes)
                .ok()?
                != self.object
            || property
                .utf8_text(bytes)
                .ok()?
                != self.method
        {
            return None;
        }

        // First argument must be a string or template title
        let args = call.child_by_field_name("arguments")?;
        let first = args.named_child(0)?;
        matches!(NodeClass::of(first), NodeClass::StringLiteral).then_some(call)
    }

    /// Title string of a matching test call, quotes stripped.
    pub fn title(
        &self,
        call: Node,
        src: &str,
    ) -> Option<String>
    {
        let first = call
            .child_by_field_name("arguments")?
            .named_child(0)?;
        if NodeClass::of(first) != NodeClass::StringLiteral
        {
            return None;
        }

        let raw = first
            .utf8_text(src.as_bytes())
            .ok()?;
        let inner = raw
            .get(1..raw.len().saturating_sub(1))
            .unwrap_or("");
        Some(inner.to_string())
    }
}

/// Classification of a candidate block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind
{
    FunctionDeclaration,
    LexicalDeclaration,
    VariableDeclaration,
    ArrowFunctionDeclaration,
    FunctionExpressionDeclaration,
    #[serde(rename = "pm_test")]
    TestCall,
    ClassDeclaration,
    Generic,
}

impl BlockKind
{
    /// Fixed prior used by the kind signal.
    pub fn prior(self) -> f64
    {
        match self
        {
            Self::FunctionDeclaration => 1.0,
            Self::LexicalDeclaration => 0.9,
            Self::VariableDeclaration => 0.8,
            Self::TestCall => 0.7,
            _ => 0.6,
        }
    }

    /// Label reported for global declaration results.
    pub fn declaration_label(self) -> &'static str
    {
        match self
        {
            Self::LexicalDeclaration | Self::VariableDeclaration => "declaration",
            _ => "function_declaration",
        }
    }
}

/// One candidate unit: full-line span, its syntax node and kind.
#[derive(Debug, Clone, Copy)]
pub struct BlockRange<'t>
{
    pub span: Span,
    pub node: Node<'t>,
    pub kind: Option<BlockKind>,
    pub start_line: usize,
    pub end_line: usize,
}

impl<'t> BlockRange<'t>
{
    fn new<B: TextBuffer + ?Sized>(
        buf: &B,
        span: Span,
        node: Node<'t>,
        kind: Option<BlockKind>,
    ) -> Self
    {
        Self {
            span,
            node,
            kind,
            start_line: line_of(buf, span.start),
            end_line: line_of(buf, span.end),
        }
    }

    pub fn text<'a>(
        &self,
        src: &'a str,
    ) -> &'a str
    {
        self.span
            .slice(src)
    }
}

fn root_children<'t>(root: Node<'t>) -> Vec<Node<'t>>
{
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|n| NodeClass::of(*n) != NodeClass::Comment)
        .collect()
}

/// Top-level function, `const`/`let` and `var` declarations.
pub fn global_declarations<'t, B: TextBuffer + ?Sized>(
    root: Node<'t>,
    buf: &B,
    with_comments: bool,
) -> Vec<BlockRange<'t>>
{
    root_children(root)
        .into_iter()
        .filter_map(|child| {
            let decl = unwrap_export(child);
            let kind = match NodeClass::of(decl)
            {
                NodeClass::FunctionDeclaration => BlockKind::FunctionDeclaration,
                NodeClass::LexicalDeclaration => BlockKind::LexicalDeclaration,
                NodeClass::VariableDeclaration => BlockKind::VariableDeclaration,
                _ => return None,
            };
            let span = block_span(buf, container_for(child), with_comments);

            Some(BlockRange::new(buf, span, decl, Some(kind)))
        })
        .collect()
}

/// Top-level test calls, minus any overlapping `exclude`.
pub fn other_test_blocks<'t, B: TextBuffer + ?Sized>(
    root: Node<'t>,
    buf: &B,
    pattern: &TestPattern,
    exclude: Option<Span>,
    with_comments: bool,
) -> Vec<BlockRange<'t>>
{
    let src = buf.value();

    root_children(root)
        .into_iter()
        .filter_map(|child| {
            let call = pattern.match_call(child, src)?;
            let span = block_span(buf, call, with_comments);
            if exclude.is_some_and(|ex| ex.overlaps(&span))
            {
                return None;
            }

            Some(BlockRange::new(buf, span, call, Some(BlockKind::TestCall)))
        })
        .collect()
}

/// Does the subtree under `node` contain a node of one of `kinds`?
fn contains_kind(
    node: Node,
    kinds: &[&str],
) -> bool
{
    let mut found = false;
    walk(node, |n| {
        if found
        {
            return false;
        }
        if kinds.contains(&n.kind())
        {
            found = true;
            return false;
        }
        true
    });
    found
}

/// Classify a declaration by what its initializers hold.
fn declaration_kind(decl: Node) -> BlockKind
{
    let mut cursor = decl.walk();
    let values: Vec<Node> = decl
        .named_children(&mut cursor)
        .filter_map(|d| d.child_by_field_name("value"))
        .collect();

    if values
        .iter()
        .any(|v| contains_kind(*v, &["arrow_function"]))
    {
        return BlockKind::ArrowFunctionDeclaration;
    }
    if values
        .iter()
        .any(|v| contains_kind(*v, &["function_expression", "function", "generator_function"]))
    {
        return BlockKind::FunctionExpressionDeclaration;
    }

    match NodeClass::of(decl)
    {
        NodeClass::VariableDeclaration => BlockKind::VariableDeclaration,
        _ => BlockKind::LexicalDeclaration,
    }
}

/// Every top-level block, classified, in file order.
pub fn top_level_blocks<'t, B: TextBuffer + ?Sized>(
    root: Node<'t>,
    buf: &B,
    pattern: &TestPattern,
    with_comments: bool,
) -> Vec<BlockRange<'t>>
{
    let src = buf.value();

    let mut out: Vec<BlockRange<'t>> = root_children(root)
        .into_iter()
        .map(|child| {
            if let Some(call) = pattern.match_call(child, src)
            {
                let span = block_span(buf, call, with_comments);
                return BlockRange::new(buf, span, call, Some(BlockKind::TestCall));
            }

            let inner = unwrap_export(child);
            let kind = match NodeClass::of(inner)
            {
                NodeClass::FunctionDeclaration => BlockKind::FunctionDeclaration,
                NodeClass::LexicalDeclaration | NodeClass::VariableDeclaration =>
                {
                    declaration_kind(inner)
                }
                NodeClass::Class => BlockKind::ClassDeclaration,
                _ => BlockKind::Generic,
            };
            let span = block_span(buf, container_for(child), with_comments);

            BlockRange::new(buf, span, inner, Some(kind))
        })
        .collect();

    out.sort_by_key(|b| b.span.start);
    out
}

/// Whole top-level blocks whose lines intersect `[start_line, end_line]`.
///
/// Only complete containers are returned, never a slice of one.
pub fn window_blocks<'t, B: TextBuffer + ?Sized>(
    root: Node<'t>,
    buf: &B,
    start_line: usize,
    end_line: usize,
    with_comments: bool,
) -> Vec<BlockRange<'t>>
{
    let mut out: Vec<BlockRange<'t>> = root_children(root)
        .into_iter()
        .filter(|child| NodeClass::of(*child).is_whole_block_candidate())
        .map(|child| {
            let container = container_for(child);
            let span = block_span(buf, container, with_comments);
            BlockRange::new(buf, span, container, None)
        })
        .filter(|b| b.start_line <= end_line && b.end_line >= start_line)
        .collect();

    out.sort_by_key(|b| b.span.start);
    out
}

/// Top-level block whose lines contain `line`.
pub fn block_at_line<'t, B: TextBuffer + ?Sized>(
    root: Node<'t>,
    buf: &B,
    pattern: &TestPattern,
    line: usize,
    with_comments: bool,
) -> Option<BlockRange<'t>>
{
    top_level_blocks(root, buf, pattern, with_comments)
        .into_iter()
        .find(|b| b.start_line <= line && line <= b.end_line)
}

/// Compact rendering of a test block: header through the opening brace,
/// one elision marker, and the closing line.
pub fn render_skeleton(text: &str) -> String
{
    let lines: Vec<&str> = text
        .lines()
        .collect();
    if lines.len() <= 3
    {
        return text.to_string();
    }

    let Some(header_end) = lines
        .iter()
        .position(|l| l.contains('{'))
    else
    {
        return text.to_string();
    };
    let last = lines.len() - 1;
    if header_end + 1 >= last
    {
        return text.to_string();
    }

    let body_indent: String = lines[header_end + 1]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect();

    let mut out = lines[..=header_end].join("\n");
    out.push('\n');
    out.push_str(&body_indent);
    out.push_str("// …\n");
    out.push_str(lines[last]);
    out
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::parse::Grammar;
    use crate::infra::buffer::SourceBuffer;
    use tree_sitter::Tree;

    const SRC: &str = "\
const RATE = 2;
var legacy = 1;
// doubles things
const double = (x) => x * RATE;
const fmt = function (v) { return String(v); };
function helper() {}
export function shared() {}
class Box {}
pm.test(\"first case\", function () {
  pm.expect(double(2)).to.eql(4);
});
pm.test(`second`, () => {});
other.test(\"not a test\", () => {});
if (RATE) { helper(); }
";

    fn parse(src: &str) -> Tree
    {
        Grammar::javascript()
            .and_then(|g| g.parser())
            .expect("parser")
            .parse(src, None)
            .expect("tree")
    }

    #[test]
    fn collects_global_declarations()
    {
        let tree = parse(SRC);
        let buf = SourceBuffer::new(SRC);
        let decls = global_declarations(tree.root_node(), &buf, true);

        let kinds: Vec<BlockKind> = decls
            .iter()
            .filter_map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::LexicalDeclaration,
                BlockKind::VariableDeclaration,
                BlockKind::LexicalDeclaration,
                BlockKind::LexicalDeclaration,
                BlockKind::FunctionDeclaration,
                BlockKind::FunctionDeclaration,
            ]
        );
        // Leading comment belongs to `double`
        assert!(decls[2].text(SRC).starts_with("// doubles things"));
        // The export keyword stays inside the span
        assert!(decls[5].text(SRC).starts_with("export function shared"));
    }

    #[test]
    fn recognizes_test_calls_and_titles()
    {
        let tree = parse(SRC);
        let buf = SourceBuffer::new(SRC);
        let pattern = TestPattern::default();
        let tests = other_test_blocks(tree.root_node(), &buf, &pattern, None, true);

        assert_eq!(tests.len(), 2);
        assert_eq!(pattern.title(tests[0].node, SRC).as_deref(), Some("first case"));
        assert_eq!(pattern.title(tests[1].node, SRC).as_deref(), Some("second"));
        assert_eq!(tests[0].start_line, 9);
        assert_eq!(tests[0].end_line, 11);

        let excluded =
            other_test_blocks(tree.root_node(), &buf, &pattern, Some(tests[0].span), true);
        assert_eq!(excluded.len(), 1);
    }

    #[test]
    fn classifies_top_level_blocks()
    {
        let tree = parse(SRC);
        let buf = SourceBuffer::new(SRC);
        let blocks = top_level_blocks(tree.root_node(), &buf, &TestPattern::default(), true);
        let kinds: Vec<BlockKind> = blocks
            .iter()
            .filter_map(|b| b.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                BlockKind::LexicalDeclaration,
                BlockKind::VariableDeclaration,
                BlockKind::ArrowFunctionDeclaration,
                BlockKind::FunctionExpressionDeclaration,
                BlockKind::FunctionDeclaration,
                BlockKind::FunctionDeclaration,
                BlockKind::ClassDeclaration,
                BlockKind::TestCall,
                BlockKind::TestCall,
                BlockKind::Generic,
                BlockKind::Generic,
            ]
        );
    }

    #[test]
    fn window_blocks_are_whole()
    {
        let tree = parse(SRC);
        let buf = SourceBuffer::new(SRC);
        let blocks = window_blocks(tree.root_node(), &buf, 10, 10, true);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 9);
        assert_eq!(blocks[0].end_line, 11);
        assert!(blocks[0].kind.is_none());
    }

    #[test]
    fn skeleton_keeps_header_and_closer()
    {
        let text = "pm.test(\"t\", function () {\n  a();\n  b();\n  c();\n});";
        assert_eq!(
            render_skeleton(text),
            "pm.test(\"t\", function () {\n  // …\n});"
        );
        assert_eq!(render_skeleton("pm.test(\"t\", () => {\n  a();\n});"), "pm.test(\"t\", () => {\n  a();\n});");
    }
}
