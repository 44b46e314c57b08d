//! Cursor strategy selection: which lines form the cursor-local context.
//!
//! Every span produced here is full-line aligned. Decision order:
//!
//! 1. no tree, empty buffer or no node at the cursor: raw line window
//! 2. unfinished code at the cursor: hybrid raw-plus-whole-blocks union
//! 3. cursor at top level: line window with syntax-sanity expansion
//! 4. cursor inside a block: the block plus a window around its top-level
//!    ancestor

use serde::{Deserialize, Serialize};
use tracing::debug;
use tree_sitter::{Node, Point, Tree};

use crate::core::budgeter::char_len;
use crate::core::collect::window_blocks;
use crate::core::heuristics::{LOOKAHEAD_LINES, looks_unfinished};
use crate::core::nodes::{
    NodeClass, block_span, container_for, elevate_by_levels, in_error_region, is_function_body,
    nearest_enclosing_function, next_named_sibling, prev_named_sibling, topmost_ancestor,
};
use crate::core::options::ExtractOptions;
use crate::core::span::{Span, full_lines, line_of, line_start, node_lines};
use crate::infra::buffer::{Position, TextBuffer};

/// How the cursor-local range was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy
{
    EnclosingFunction,
    TopLevelWithSyntaxSanity,
    EnclosingBlockWithContext,
    FallbackLines,
}

impl Strategy
{
    pub fn as_str(self) -> &'static str
    {
        match self
        {
            Self::EnclosingFunction => "enclosing-function",
            Self::TopLevelWithSyntaxSanity => "top-level-with-syntax-sanity",
            Self::EnclosingBlockWithContext => "enclosing-block-with-context",
            Self::FallbackLines => "fallback-lines",
        }
    }
}

impl std::fmt::Display for Strategy
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// Tier A range and the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection
{
    pub span: Span,
    pub strategy: Strategy,
    /// The enclosing block alone, when one was used
    pub block: Option<Span>,
}

impl Selection
{
    fn fallback(span: Span) -> Self
    {
        Self { span, strategy: Strategy::FallbackLines, block: None }
    }
}

/// Position clamped into the buffer, as a 1-based line and a tree point.
fn cursor_point<B: TextBuffer + ?Sized>(
    buf: &B,
    pos: Position,
) -> (usize, Point)
{
    let clamped = buf.position_at(buf.offset_at(pos));
    (
        clamped.line,
        Point::new(
            clamped
                .line
                .saturating_sub(1),
            clamped
                .column
                .saturating_sub(1),
        ),
    )
}

/// Smallest node spanning the cursor, if the tree has one there.
pub fn node_at<'t, B: TextBuffer + ?Sized>(
    tree: &'t Tree,
    buf: &B,
    pos: Position,
) -> Option<Node<'t>>
{
    let (_, point) = cursor_point(buf, pos);
    tree.root_node()
        .descendant_for_point_range(point, point)
}

/// Raw symmetric window of whole lines around `line`.
pub fn raw_window<B: TextBuffer + ?Sized>(
    buf: &B,
    line: usize,
    radius: usize,
) -> Span
{
    full_lines(buf, line.saturating_sub(radius), line.saturating_add(radius))
}

/// Line span of a root child, comments included when requested.
fn child_lines<B: TextBuffer + ?Sized>(
    buf: &B,
    child: Node,
    with_comments: bool,
) -> (usize, usize)
{
    let span = block_span(buf, container_for(child), with_comments);
    (line_of(buf, span.start), line_of(buf, span.end))
}

/// Push window boundaries out of any whole-block candidate they fall
/// strictly inside.
pub fn sanity_expand<B: TextBuffer + ?Sized>(
    root: Node,
    buf: &B,
    mut start_line: usize,
    mut end_line: usize,
    with_comments: bool,
) -> (usize, usize)
{
    let mut cursor = root.walk();
    let blocks: Vec<(usize, usize)> = root
        .named_children(&mut cursor)
        .filter(|c| NodeClass::of(*c).is_whole_block_candidate())
        .map(|c| child_lines(buf, c, with_comments))
        .collect();

    // Repeat until stable; one block's extent can land inside another's
    loop
    {
        let before = (start_line, end_line);

        for &(bs, be) in &blocks
        {
            if bs < start_line && start_line <= be
            {
                start_line = bs;
            }
            if bs <= end_line && end_line < be
            {
                end_line = be;
            }
        }

        if (start_line, end_line) == before
        {
            return (start_line, end_line);
        }
    }
}

/// Window of `prefix`/`suffix` lines around `[from, to]`, sanity-expanded.
fn context_window<B: TextBuffer + ?Sized>(
    root: Node,
    buf: &B,
    from: usize,
    to: usize,
    opts: &ExtractOptions,
) -> Span
{
    let start = from
        .saturating_sub(opts.prefix_lines)
        .max(1);
    let end = to
        .saturating_add(opts.suffix_lines)
        .min(buf.line_count());
    let (start, end) = sanity_expand(root, buf, start, end, opts.include_leading_comments);

    full_lines(buf, start, end)
}

/// Whether any ancestor (inclusive) opens a scope.
fn inside_block(node: Node) -> bool
{
    let mut current = Some(node);

    while let Some(n) = current
    {
        if NodeClass::of(n).opens_scope() || is_function_body(n)
        {
            return true;
        }
        current = n.parent();
    }

    false
}

/// Nearest scope-opening ancestor (inclusive); a function body yields its function.
fn nearest_block(node: Node) -> Option<Node>
{
    let mut current = Some(node);

    while let Some(n) = current
    {
        if is_function_body(n)
        {
            return n.parent();
        }
        if NodeClass::of(n).opens_scope()
        {
            return Some(n);
        }
        current = n.parent();
    }

    None
}

/// Cursor line plus the lookahead lines, for the unfinished-code check.
fn lookahead<B: TextBuffer + ?Sized>(
    buf: &B,
    line: usize,
) -> Vec<&str>
{
    let last = buf.line_count();
    (line..=line.saturating_add(LOOKAHEAD_LINES).min(last))
        .map(|l| buf.line_content(l))
        .collect()
}

/// Choose tier A for `pos`.
pub fn select<B: TextBuffer + ?Sized>(
    buf: &B,
    tree: Option<&Tree>,
    pos: Position,
    opts: &ExtractOptions,
) -> Selection
{
    let (line, _) = cursor_point(buf, pos);
    let raw = || raw_window(buf, line, opts.fallback_line_window);

    let Some(tree) = tree
    else
    {
        debug!("no tree; raw window");
        return Selection::fallback(raw());
    };
    if buf
        .value()
        .is_empty()
    {
        return Selection::fallback(raw());
    }

    let root = tree.root_node();
    let Some(node) = node_at(tree, buf, pos)
    else
    {
        debug!("no node at cursor; raw window");
        return Selection::fallback(raw());
    };

    if in_error_region(node) || looks_unfinished(&lookahead(buf, line), root.has_error())
    {
        debug!(line, "unfinished code at cursor; hybrid");
        return hybrid(root, node, buf, line, opts);
    }

    if !inside_block(node)
    {
        let span = context_window(root, buf, line, line, opts);
        return Selection {
            span,
            strategy: Strategy::TopLevelWithSyntaxSanity,
            block: None,
        };
    }

    let Some(block) = nearest_block(node)
    else
    {
        let span = context_window(root, buf, line, line, opts);
        return Selection::fallback(span);
    };

    let mut strategy = Strategy::EnclosingBlockWithContext;
    let block = if NodeClass::of(block).is_function_like()
    {
        let levels = opts.nesting();
        if levels > 0
        {
            strategy = Strategy::EnclosingFunction;
        }
        container_for(elevate_by_levels(block, levels))
    }
    else
    {
        block
    };

    let block_range = block_span(buf, block, opts.include_leading_comments);
    let (top_start, top_end) = node_lines(topmost_ancestor(block));
    let window = context_window(root, buf, top_start, top_end, opts);

    debug!(%strategy, kind = block.kind(), "enclosing block");
    Selection {
        span: block_range.union(&window),
        strategy,
        block: Some(block_range),
    }
}

/// Unfinished container taken raw through the cursor line, unioned with
/// whole neighbouring blocks.
fn hybrid<B: TextBuffer + ?Sized>(
    root: Node,
    node: Node,
    buf: &B,
    line: usize,
    opts: &ExtractOptions,
) -> Selection
{
    let with_comments = opts.include_leading_comments;

    let container = nearest_enclosing_function(node)
        .map(container_for)
        .or_else(|| {
            let mut current = Some(node);
            while let Some(n) = current
            {
                if n.id() != root.id() && NodeClass::of(n).is_whole_block_candidate()
                {
                    return Some(container_for(n));
                }
                current = n.parent();
            }
            None
        })
        .unwrap_or_else(|| topmost_ancestor(node));

    let mut span = if container.id() == root.id()
    {
        raw_window(buf, line, opts.fallback_line_window)
    }
    else
    {
        let (start, _) = node_lines(container);
        full_lines(buf, start.min(line), line)
    };

    let top = topmost_ancestor(container);
    if top.id() != root.id()
    {
        for sib in [prev_named_sibling(top), next_named_sibling(top)]
            .into_iter()
            .flatten()
        {
            span = span.union(&block_span(buf, container_for(sib), with_comments));
        }
    }

    let radius = opts.fallback_line_window;
    let (from, to) = (line.saturating_sub(radius), line.saturating_add(radius));
    for b in window_blocks(root, buf, from, to, with_comments)
    {
        span = span.union(&b.span);
    }

    Selection::fallback(span)
}

/// Shrink an over-budget selection: the enclosing block alone, then a raw
/// window narrowed until it fits (empty when not even the cursor line fits).
pub fn shrink_to_budget<B: TextBuffer + ?Sized>(
    buf: &B,
    selection: Selection,
    pos: Position,
    radius: usize,
    budget: usize,
) -> Selection
{
    let fits = |s: &Span| char_len(s.slice(buf.value())) <= budget;

    if fits(&selection.span)
    {
        return selection;
    }
    if let Some(block) = selection.block
        && fits(&block)
    {
        debug!(budget, "tier A shrunk to enclosing block");
        return Selection::fallback(block);
    }

    let (line, _) = cursor_point(buf, pos);
    for r in (0..=radius.min(buf.line_count())).rev()
    {
        let window = raw_window(buf, line, r);
        if fits(&window)
        {
            debug!(budget, radius = r, "tier A shrunk to raw window");
            return Selection::fallback(window);
        }
    }

    let at = line_start(buf, line);
    Selection::fallback(Span::new(at, at))
}
