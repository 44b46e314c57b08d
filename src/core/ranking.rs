//! Multi-signal scoring of candidate blocks.
//!
//! Every signal lies in `[0, 1]`; the score is a fixed linear mix:
//! `0.30·lexical + 0.35·reference + 0.20·kind − 0.05·complexity + 0.20·title`.

use std::cmp::Ordering;

use indexmap::IndexSet;
use serde::Serialize;
use tree_sitter::Node;

use crate::core::budgeter::char_len;
use crate::core::collect::{BlockKind, BlockRange, TestPattern};
use crate::core::refs::{defined_names, free_identifiers};
use crate::core::tokens::{clamp01, tokenize};

/// Distance in lines at which the lexical signal reaches zero.
pub const LEXICAL_HORIZON: f64 = 200.0;

const W_LEXICAL: f64 = 0.30;
const W_REFERENCE: f64 = 0.35;
const W_KIND: f64 = 0.20;
const W_COMPLEXITY: f64 = 0.05;
const W_TITLE: f64 = 0.20;

/// Prior for a candidate with no kind.
const UNSET_KIND_PRIOR: f64 = 0.5;

/// Free identifiers considered for title overlap.
const TITLE_FREE_NAMES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Signals
{
    pub lexical: f64,
    pub reference: f64,
    pub kind: f64,
    pub complexity: f64,
    pub title: f64,
}

impl Signals
{
    pub fn score(&self) -> f64
    {
        W_LEXICAL * self.lexical + W_REFERENCE * self.reference + W_KIND * self.kind
            - W_COMPLEXITY * self.complexity
            + W_TITLE * self.title
    }
}

/// A candidate with its rendered text and score.
#[derive(Debug, Clone)]
pub struct RankedBlock<'t>
{
    pub block: BlockRange<'t>,
    /// Text emitted for the block (a skeleton for test blocks in tier D)
    pub text: String,
    pub size_chars: usize,
    pub signals: Signals,
    pub score: f64,
    /// Defined names that the cursor context reads
    pub reference_matches: usize,
    /// Jaccard against the current block, when computed
    pub similarity: f64,
}

/// Cursor-side inputs shared by every candidate of one ranking pass.
#[derive(Debug, Clone, Copy)]
pub struct RankInput<'a>
{
    pub src: &'a str,
    pub cursor_line: usize,
    pub tier_budget: usize,
    /// Names read or called inside tier A
    pub anchor_refs: &'a IndexSet<String>,
    /// Tokens of the enclosing test's title
    pub title_tokens: &'a [String],
    pub pattern: &'a TestPattern,
}

fn lexical_signal(
    start_line: usize,
    cursor_line: usize,
) -> f64
{
    clamp01(1.0 - start_line.abs_diff(cursor_line) as f64 / LEXICAL_HORIZON)
}

fn reference_signal(matches: usize) -> f64
{
    clamp01(1.0 - (-(matches as f64)).exp())
}

fn kind_signal(kind: Option<BlockKind>) -> f64
{
    kind.map_or(UNSET_KIND_PRIOR, BlockKind::prior)
}

fn complexity_signal(
    size: usize,
    budget: usize,
) -> f64
{
    clamp01(size as f64 / budget.max(1) as f64)
}

/// Fraction of title tokens found inside any of the candidate's names.
fn title_signal(
    block: &BlockRange,
    input: &RankInput,
) -> f64
{
    if input
        .title_tokens
        .is_empty()
    {
        return 0.0;
    }

    let mut names: Vec<String> = free_identifiers(block.node, input.src)
        .into_iter()
        .take(TITLE_FREE_NAMES)
        .chain(defined_names(block.node, input.src))
        .map(|n| n.to_lowercase())
        .collect();

    if block.kind == Some(BlockKind::TestCall)
        && let Some(title) = input
            .pattern
            .title(block.node, input.src)
    {
        names.extend(tokenize(&title));
    }

    let matched = input
        .title_tokens
        .iter()
        .filter(|t| {
            names
                .iter()
                .any(|n| n.contains(t.as_str()))
        })
        .count();

    clamp01(matched as f64 / input.title_tokens.len().max(1) as f64)
}

/// Score one candidate whose emitted text is `text`.
pub fn score_block<'t>(
    block: BlockRange<'t>,
    text: String,
    input: &RankInput,
) -> RankedBlock<'t>
{
    let size_chars = char_len(&text);
    let reference_matches = defined_names(block.node, input.src)
        .iter()
        .filter(|n| {
            input
                .anchor_refs
                .contains(n.as_str())
        })
        .count();

    let signals = Signals {
        lexical: lexical_signal(block.start_line, input.cursor_line),
        reference: reference_signal(reference_matches),
        kind: kind_signal(block.kind),
        complexity: complexity_signal(size_chars, input.tier_budget),
        title: title_signal(&block, input),
    };

    RankedBlock {
        block,
        text,
        size_chars,
        score: signals.score(),
        signals,
        reference_matches,
        similarity: 0.0,
    }
}

/// Score descending, then smaller first, then file position.
pub fn compare(
    a: &RankedBlock,
    b: &RankedBlock,
) -> Ordering
{
    b.score
        .total_cmp(&a.score)
        .then(
            a.size_chars
                .cmp(&b.size_chars),
        )
        .then(
            a.block
                .span
                .start
                .cmp(
                    &b.block
                        .span
                        .start,
                ),
        )
}

/// Score and sort `blocks`; `render` produces each block's emitted text.
pub fn rank<'t>(
    blocks: impl IntoIterator<Item = BlockRange<'t>>,
    input: &RankInput,
    render: impl Fn(&BlockRange<'t>) -> String,
) -> Vec<RankedBlock<'t>>
{
    let mut ranked: Vec<RankedBlock<'t>> = blocks
        .into_iter()
        .map(|b| {
            let text = render(&b);
            score_block(b, text, input)
        })
        .collect();

    ranked.sort_by(compare);
    ranked
}

/// Title tokens of the nearest test call enclosing `node`.
pub fn enclosing_test_title(
    node: Option<Node>,
    src: &str,
    pattern: &TestPattern,
) -> Vec<String>
{
    let mut current = node;

    while let Some(n) = current
    {
        if n.kind() == "call_expression"
            && let Some(call) = pattern.match_call(n, src)
        {
            return pattern
                .title(call, src)
                .map(|t| tokenize(&t))
                .unwrap_or_default();
        }
        current = n.parent();
    }

    Vec::new()
}
