//! Public extraction API.
//!
//! An [`Extractor`] owns one buffer, its parse manager and the last debug
//! payload. Every query brings the tree up to date first, then runs the
//! pure pipeline over the frozen tree; queries never fail.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, instrument};
use tree_sitter::Tree;

use crate::ExtractorError;
use crate::core::budgeter::{self, Budget, FitResult, Item, Packer, SEPARATOR, SkipReason};
use crate::core::closure::{self, DefinitionIndex};
use crate::core::collect::{
    BlockKind, BlockRange, block_at_line, global_declarations, other_test_blocks,
    render_skeleton, top_level_blocks,
};
use crate::core::dedupe::{Reservations, Tier, TierRange, assemble, dedupe};
use crate::core::options::{DEFAULT_BLOCK_BUDGET, DEFAULT_SECTIONS_BUDGET, ExtractOptions};
use crate::core::parse::{Grammar, ParseManager, TreeStatus};
use crate::core::ranking::{RankInput, RankedBlock, Signals, enclosing_test_title, rank};
use crate::core::refs::{defined_names, referenced_names_in_span};
use crate::core::span::{Span, line_of};
use crate::core::strategy::{Selection, Strategy, node_at, select, shrink_to_budget};
use crate::core::tokens::{jaccard, token_set, tokenize};
use crate::infra::buffer::{ChangeEvent, Position, Range, SourceBuffer, TextBuffer};

/// Tier A context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorContext
{
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationEntry
{
    /// `function_declaration` or `declaration`
    pub kind: &'static str,
    pub names: Vec<String>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub score: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationsMeta
{
    pub budget: usize,
    pub used_chars: usize,
    pub candidates: usize,
    pub picked: usize,
}

/// Global declarations that fit the budget, in file order.
#[derive(Debug, Clone, Serialize)]
pub struct DeclarationsResult
{
    pub text: String,
    pub declarations: Vec<DeclarationEntry>,
    pub meta: DeclarationsMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry
{
    pub kind: Option<BlockKind>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub size_chars: usize,
    pub similarity: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevantBlocksMeta
{
    pub budget: usize,
    pub threshold: f64,
    pub top_k: usize,
    pub candidates: usize,
    pub picked: usize,
}

/// Similar helper blocks: `blocks` in ranked order, `text` in file order.
#[derive(Debug, Clone, Serialize)]
pub struct RelevantBlocksResult
{
    pub text: String,
    pub blocks: Vec<BlockEntry>,
    pub current_block: Option<BlockEntry>,
    pub meta: RelevantBlocksMeta,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerTier<T>
{
    pub a: T,
    pub b: T,
    pub c: T,
    pub d: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionsMeta
{
    pub strategy: Strategy,
    pub budgets: Budget,
    /// Accepted ranges per tier, in file order
    pub offsets: PerTier<Vec<Span>>,
    pub picked: PerTier<usize>,
    pub used_chars: PerTier<usize>,
    pub dependency_additions: usize,
}

/// All four tiers of the combined query.
#[derive(Debug, Clone, Serialize)]
pub struct RankedSections
{
    pub lines_around_cursor: String,
    pub declarations: String,
    pub relevant_lines: String,
    pub existing_tests: String,
    pub meta: SectionsMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateDebug
{
    pub start_line: usize,
    pub end_line: usize,
    pub kind: Option<BlockKind>,
    pub size_chars: usize,
    pub score: f64,
    pub signals: Signals,
    pub similarity: f64,
    pub picked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierDebug
{
    pub tier: Tier,
    pub budget: usize,
    pub used: usize,
    pub candidates: Vec<CandidateDebug>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyDebug
{
    pub name: String,
    pub tier: Tier,
    pub start_line: usize,
    pub end_line: usize,
    pub size_chars: usize,
}

/// Verbose ranking trace, built only when `debug` is requested.
#[derive(Debug, Clone, Serialize)]
pub struct DebugPayload
{
    pub anchor_refs: Vec<String>,
    pub title_tokens: Vec<String>,
    pub reference_tokens: Vec<String>,
    pub tiers: Vec<TierDebug>,
    pub dependencies: Vec<DependencyDebug>,
}

/// Cursor-aware context extractor over one buffer.
pub struct Extractor<B: TextBuffer = SourceBuffer>
{
    buffer: B,
    parser: ParseManager,
    last_debug: Option<DebugPayload>,
}

impl<B: TextBuffer> Extractor<B>
{
    /// Bind `buffer` and parse it. Setup failure is the only error.
    #[instrument(level = "debug", skip_all)]
    pub fn new(
        buffer: B,
        grammar: &Grammar,
    ) -> Result<Self, ExtractorError>
    {
        let mut parser = ParseManager::new(grammar)?;
        parser.ensure_current(&buffer);

        Ok(Self { buffer, parser, last_debug: None })
    }

    pub fn buffer(&self) -> &B
    {
        &self.buffer
    }

    /// Mutable host buffer. Edits made through it must be reported with
    /// [`Extractor::on_buffer_changed`].
    pub fn buffer_mut(&mut self) -> &mut B
    {
        &mut self.buffer
    }

    pub fn tree_status(&self) -> TreeStatus
    {
        self.parser
            .status()
    }

    /// Reparse now if anything is pending.
    pub fn force_build_tree(&mut self)
    {
        self.parser
            .ensure_current(&self.buffer);
    }

    /// Queue every change of a host notification; never reparses.
    pub fn on_buffer_changed(
        &mut self,
        event: &ChangeEvent,
    )
    {
        for change in &event.changes
        {
            self.parser
                .record_edit(change);
        }
    }

    /// Debug payload of the last query that requested one.
    pub fn last_debug(&self) -> Option<&DebugPayload>
    {
        self.last_debug
            .as_ref()
    }

    /// Tier A only.
    #[instrument(level = "debug", skip(self, opts), fields(line = pos.line, column = pos.column))]
    pub fn context_around_cursor(
        &mut self,
        pos: Position,
        opts: &ExtractOptions,
    ) -> CursorContext
    {
        self.parser
            .ensure_current(&self.buffer);
        let buf = &self.buffer;

        let mut sel = select(buf, self.parser.tree(), pos, opts);
        if let Some(budget) = opts.max_chars_budget
        {
            sel = shrink_to_budget(buf, sel, pos, opts.fallback_line_window, budget);
        }

        cursor_context(buf, sel)
    }

    /// Top-level declarations ranked against the cursor context.
    #[instrument(level = "debug", skip(self, opts), fields(line = pos.line, column = pos.column))]
    pub fn global_declarations(
        &mut self,
        pos: Position,
        opts: &ExtractOptions,
    ) -> DeclarationsResult
    {
        self.parser
            .ensure_current(&self.buffer);
        let buf = &self.buffer;
        let budget = opts.budget_or(DEFAULT_BLOCK_BUDGET);

        let Some(tree) = self
            .parser
            .tree()
        else
        {
            return DeclarationsResult {
                text: String::new(),
                declarations: Vec::new(),
                meta: DeclarationsMeta { budget, used_chars: 0, candidates: 0, picked: 0 },
            };
        };

        let src = buf.value();
        let root = tree.root_node();
        let sel = select(buf, Some(tree), pos, opts);
        let anchor_refs = referenced_names_in_span(root, sel.span, src);
        let title = enclosing_test_title(node_at(tree, buf, pos), src, &opts.test_pattern);

        let input = RankInput {
            src,
            cursor_line: line_of(buf, buf.offset_at(pos)),
            tier_budget: budget,
            anchor_refs: &anchor_refs,
            title_tokens: &title,
            pattern: &opts.test_pattern,
        };
        let ranked = rank(
            global_declarations(root, buf, opts.include_leading_comments),
            &input,
            |b| b.text(src).to_string(),
        );
        let fit = budgeter::fit(items(&ranked), budget);

        let mut picked: Vec<&RankedBlock> = fit
            .picked
            .iter()
            .map(|&id| &ranked[id])
            .collect();
        picked.sort_by_key(|r| r.block.span.start);

        let declarations: Vec<DeclarationEntry> = picked
            .iter()
            .map(|r| DeclarationEntry {
                kind: r
                    .block
                    .kind
                    .map_or("declaration", BlockKind::declaration_label),
                names: defined_names(r.block.node, src).into_vec(),
                start_offset: r.block.span.start,
                end_offset: r.block.span.end,
                start_line: r.block.start_line,
                end_line: r.block.end_line,
                score: r.score,
                text: r.text.clone(),
            })
            .collect();

        debug!(candidates = ranked.len(), picked = declarations.len(), "declarations");
        DeclarationsResult {
            text: join(picked.iter().map(|r| r.text.as_str())),
            meta: DeclarationsMeta {
                budget,
                used_chars: fit.used,
                candidates: ranked.len(),
                picked: declarations.len(),
            },
            declarations,
        }
    }

    /// Top-level blocks most similar to the block under the cursor.
    #[instrument(level = "debug", skip(self, opts), fields(line = pos.line, column = pos.column))]
    pub fn relevant_blocks(
        &mut self,
        pos: Position,
        opts: &ExtractOptions,
    ) -> RelevantBlocksResult
    {
        self.parser
            .ensure_current(&self.buffer);
        let buf = &self.buffer;
        let budget = opts.budget_or(DEFAULT_BLOCK_BUDGET);
        let mut meta = RelevantBlocksMeta {
            budget,
            threshold: opts.min_similarity_threshold,
            top_k: opts.top_k,
            candidates: 0,
            picked: 0,
        };

        let Some(tree) = self
            .parser
            .tree()
        else
        {
            return RelevantBlocksResult {
                text: String::new(),
                blocks: Vec::new(),
                current_block: None,
                meta,
            };
        };

        let src = buf.value();
        let root = tree.root_node();
        let with_comments = opts.include_leading_comments;
        let line = line_of(buf, buf.offset_at(pos));

        let current = block_at_line(root, buf, &opts.test_pattern, line, with_comments);
        let reference_text = match &current
        {
            Some(block) => block
                .text(src)
                .to_string(),
            None => select(buf, Some(tree), pos, opts)
                .span
                .slice(src)
                .to_string(),
        };
        let reference = token_set(&reference_text);

        let mut scored: Vec<BlockEntry> = top_level_blocks(root, buf, &opts.test_pattern, with_comments)
            .into_iter()
            .filter(|b| b.kind != Some(BlockKind::TestCall))
            .filter(|b| current.is_none_or(|c| c.span != b.span))
            .map(|b| {
                let text = b
                    .text(src)
                    .to_string();
                let similarity = jaccard(&token_set(&text), &reference);
                entry(&b, text, similarity)
            })
            .collect();
        meta.candidates = scored.len();

        scored.retain(|e| e.similarity >= opts.min_similarity_threshold);
        scored.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(
                    a.size_chars
                        .cmp(&b.size_chars),
                )
                .then(
                    a.start_offset
                        .cmp(&b.start_offset),
                )
        });

        let packed = scored
            .iter()
            .enumerate()
            .map(|(id, e)| Item { id, size: e.size_chars });
        let mut fit = budgeter::fit(packed, budget);
        fit.cap_top_k(opts.top_k, |id| scored[id].size_chars);

        let blocks: Vec<BlockEntry> = fit
            .picked
            .iter()
            .map(|&id| scored[id].clone())
            .collect();
        let mut in_file_order: Vec<&BlockEntry> = blocks
            .iter()
            .collect();
        in_file_order.sort_by_key(|e| e.start_offset);
        meta.picked = blocks.len();

        RelevantBlocksResult {
            text: join(in_file_order.iter().map(|e| e.text.as_str())),
            current_block: current.map(|c| entry(&c, c.text(src).to_string(), 1.0)),
            blocks,
            meta,
        }
    }

    /// The full tiered pipeline.
    #[instrument(level = "debug", skip(self, opts), fields(line = pos.line, column = pos.column))]
    pub fn ranked_context_sections(
        &mut self,
        pos: Position,
        opts: &ExtractOptions,
    ) -> RankedSections
    {
        self.parser
            .ensure_current(&self.buffer);

        let sections = rank_sections(&self.buffer, self.parser.tree(), pos, opts);
        if opts.debug
        {
            self.last_debug = sections
                .debug
                .clone();
        }

        sections
    }
}

impl Extractor<SourceBuffer>
{
    /// Edit the owned buffer and queue the change.
    pub fn edit(
        &mut self,
        range: Range,
        text: &str,
    )
    {
        let change = self
            .buffer
            .replace(range, text);
        self.parser
            .record_edit(&change);
    }
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String
{
    parts
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn items(ranked: &[RankedBlock]) -> Vec<Item>
{
    ranked
        .iter()
        .enumerate()
        .map(|(id, r)| Item { id, size: r.size_chars })
        .collect()
}

fn entry(
    block: &BlockRange,
    text: String,
    similarity: f64,
) -> BlockEntry
{
    BlockEntry {
        kind: block.kind,
        start_offset: block.span.start,
        end_offset: block.span.end,
        start_line: block.start_line,
        end_line: block.end_line,
        size_chars: budgeter::char_len(&text),
        similarity,
        text,
    }
}

fn cursor_context<B: TextBuffer + ?Sized>(
    buf: &B,
    sel: Selection,
) -> CursorContext
{
    CursorContext {
        text: sel
            .span
            .slice(buf.value())
            .to_string(),
        start_offset: sel.span.start,
        end_offset: sel.span.end,
        start_line: line_of(buf, sel.span.start),
        end_line: line_of(buf, sel.span.end),
        strategy: sel.strategy,
    }
}

/// Greedy fit over the candidates that survive reservation and `keep`.
fn pack_tier(
    ranked: &[RankedBlock],
    reserved: &Reservations,
    budget: usize,
    keep: impl Fn(&RankedBlock) -> bool,
) -> FitResult
{
    let mut pre = Vec::new();
    let eligible: Vec<Item> = ranked
        .iter()
        .enumerate()
        .filter_map(|(id, r)| {
            if reserved.overlaps(&r.block.span)
            {
                pre.push((id, SkipReason::Reserved));
                return None;
            }
            if !keep(r)
            {
                pre.push((id, SkipReason::Dissimilar));
                return None;
            }
            Some(Item { id, size: r.size_chars })
        })
        .collect();

    let mut fit = budgeter::fit(eligible, budget);
    fit.skipped
        .extend(pre);
    fit
}

fn tier_debug(
    tier: Tier,
    budget: usize,
    ranked: &[RankedBlock],
    fit: &FitResult,
) -> TierDebug
{
    let candidates = ranked
        .iter()
        .enumerate()
        .map(|(id, r)| {
            let skip_reason = fit
                .skipped
                .iter()
                .find(|(s, _)| *s == id)
                .map(|(_, reason)| *reason);
            CandidateDebug {
                start_line: r.block.start_line,
                end_line: r.block.end_line,
                kind: r.block.kind,
                size_chars: r.size_chars,
                score: r.score,
                signals: r.signals,
                similarity: r.similarity,
                picked: fit
                    .picked
                    .contains(&id),
                skip_reason,
            }
        })
        .collect();

    TierDebug { tier, budget, used: fit.used, candidates }
}

/// Picks of one tier as dedupe input, reserving each.
fn accept(
    tier: Tier,
    ranked: &[RankedBlock],
    fit: &FitResult,
    reserved: &mut Reservations,
) -> Vec<TierRange>
{
    fit.picked
        .iter()
        .map(|&id| {
            let r = &ranked[id];
            reserved.reserve(r.block.span);
            TierRange { tier, span: r.block.span, text: r.text.clone() }
        })
        .collect()
}

fn rank_sections<B: TextBuffer + ?Sized>(
    buf: &B,
    tree: Option<&Tree>,
    pos: Position,
    opts: &ExtractOptions,
) -> RankedSections
{
    let src = buf.value();
    let budgets = Budget::split(opts.budget_or(DEFAULT_SECTIONS_BUDGET), opts.tier_percents);
    let with_comments = opts.include_leading_comments;
    let pattern = &opts.test_pattern;

    // Tier A
    let sel = select(buf, tree, pos, opts);
    let sel = shrink_to_budget(buf, sel, pos, opts.fallback_line_window, budgets.a);
    let mut reserved = Reservations::new();
    reserved.reserve(sel.span);

    let mut ranges = vec![TierRange {
        tier: Tier::A,
        span: sel.span,
        text: sel
            .span
            .slice(src)
            .to_string(),
    }];

    let mut tiers_debug = Vec::new();
    let mut dependencies = Vec::new();
    let mut anchor_list = Vec::new();
    let mut title_list = Vec::new();
    let mut reference_list = Vec::new();
    let mut additions = 0;

    if let Some(tree) = tree
        && !src.is_empty()
    {
        let root = tree.root_node();
        let cursor_line = line_of(buf, buf.offset_at(pos));
        let anchor_refs: IndexSet<String> = referenced_names_in_span(root, sel.span, src);
        let title = enclosing_test_title(node_at(tree, buf, pos), src, pattern);

        let input = |tier_budget| RankInput {
            src,
            cursor_line,
            tier_budget,
            anchor_refs: &anchor_refs,
            title_tokens: &title,
            pattern,
        };

        // Tier B: declarations
        let decls = global_declarations(root, buf, with_comments);
        let ranked_b = rank(decls.iter().copied(), &input(budgets.b), |b| {
            b.text(src)
                .to_string()
        });
        let fit_b = pack_tier(&ranked_b, &reserved, budgets.b, |_| true);
        ranges.extend(accept(Tier::B, &ranked_b, &fit_b, &mut reserved));

        // Tier C: similar helpers
        let current = block_at_line(root, buf, pattern, cursor_line, with_comments);
        let reference_text = current.map_or_else(
            || {
                sel.span
                    .slice(src)
                    .to_string()
            },
            |c| {
                c.text(src)
                    .to_string()
            },
        );
        let reference: HashSet<String> = token_set(&reference_text);

        let helpers = top_level_blocks(root, buf, pattern, with_comments)
            .into_iter()
            .filter(|b| b.kind != Some(BlockKind::TestCall))
            .filter(|b| current.is_none_or(|c| c.span != b.span));
        let mut ranked_c = rank(helpers, &input(budgets.c), |b| {
            b.text(src)
                .to_string()
        });
        for r in &mut ranked_c
        {
            r.similarity = jaccard(&token_set(&r.text), &reference);
        }

        let threshold = opts.min_similarity_threshold;
        let mut fit_c = pack_tier(&ranked_c, &reserved, budgets.c, |r| {
            r.similarity >= threshold || r.reference_matches > 0
        });
        fit_c.cap_top_k(opts.top_k, |id| ranked_c[id].size_chars);
        ranges.extend(accept(Tier::C, &ranked_c, &fit_c, &mut reserved));

        // One-hop closure over B and C picks; each addition fills what B left,
        // then what C left
        let index = DefinitionIndex::build(&decls, src);
        let selected: Vec<BlockRange> = fit_b
            .picked
            .iter()
            .map(|&id| ranked_b[id].block)
            .chain(
                fit_c
                    .picked
                    .iter()
                    .map(|&id| ranked_c[id].block),
            )
            .collect();
        let mut packers = [
            (Tier::B, Packer::resume(budgets.b, fit_b.used, fit_b.picked.len())),
            (Tier::C, Packer::resume(budgets.c, fit_c.used, fit_c.picked.len())),
        ];
        let added = closure::expand(&selected, &index, src, &mut reserved, &mut packers);
        additions = added.len();
        for a in &added
        {
            ranges.push(TierRange {
                tier: a.tier,
                span: a.block.span,
                text: a
                    .block
                    .text(src)
                    .to_string(),
            });
        }

        // Tier D: other tests as skeletons
        // The cursor's own test stays out even when tier A shrank away from it
        let own_test = current
            .filter(|c| c.kind == Some(BlockKind::TestCall))
            .map_or(sel.span, |c| c.span);
        let tests = other_test_blocks(root, buf, pattern, Some(own_test), with_comments);
        let ranked_d = rank(tests, &input(budgets.d), |b| render_skeleton(b.text(src)));
        let fit_d = pack_tier(&ranked_d, &reserved, budgets.d, |_| true);
        ranges.extend(accept(Tier::D, &ranked_d, &fit_d, &mut reserved));

        if opts.debug
        {
            anchor_list = anchor_refs
                .iter()
                .cloned()
                .collect();
            title_list = title.clone();
            reference_list = tokenize(&reference_text);
            tiers_debug = vec![
                tier_debug(Tier::B, budgets.b, &ranked_b, &fit_b),
                tier_debug(Tier::C, budgets.c, &ranked_c, &fit_c),
                tier_debug(Tier::D, budgets.d, &ranked_d, &fit_d),
            ];
            dependencies = added
                .iter()
                .map(|a| DependencyDebug {
                    name: a
                        .name
                        .clone(),
                    tier: a.tier,
                    start_line: a.block.start_line,
                    end_line: a.block.end_line,
                    size_chars: budgeter::char_len(a.block.text(src)),
                })
                .collect();
        }

        debug!(
            b = fit_b.picked.len(),
            c = fit_c.picked.len(),
            d = fit_d.picked.len(),
            additions,
            "tiers packed"
        );
    }

    let accepted = dedupe(ranges);
    let mut texts: PerTier<String> = PerTier::default();
    let mut offsets: PerTier<Vec<Span>> = PerTier::default();
    for tier in Tier::ALL
    {
        let (text, spans) = assemble(&accepted, tier);
        let (t, o) = match tier
        {
            Tier::A => (&mut texts.a, &mut offsets.a),
            Tier::B => (&mut texts.b, &mut offsets.b),
            Tier::C => (&mut texts.c, &mut offsets.c),
            Tier::D => (&mut texts.d, &mut offsets.d),
        };
        *t = text;
        *o = spans;
    }

    let picked = PerTier {
        a: offsets.a.len(),
        b: offsets.b.len(),
        c: offsets.c.len(),
        d: offsets.d.len(),
    };
    let used_chars = PerTier {
        a: budgeter::char_len(&texts.a),
        b: budgeter::char_len(&texts.b),
        c: budgeter::char_len(&texts.c),
        d: budgeter::char_len(&texts.d),
    };

    let debug = opts
        .debug
        .then(|| DebugPayload {
            anchor_refs: anchor_list,
            title_tokens: title_list,
            reference_tokens: reference_list,
            tiers: tiers_debug,
            dependencies,
        });

    RankedSections {
        lines_around_cursor: texts.a,
        declarations: texts.b,
        relevant_lines: texts.c,
        existing_tests: texts.d,
        meta: SectionsMeta {
            strategy: sel.strategy,
            budgets,
            offsets,
            picked,
            used_chars,
            dependency_additions: additions,
        },
        debug,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const SRC: &str = "\
const RATE = 2;
const unused = 0;
function price(x) {
  return x * RATE;
}
pm.test(\"price doubles\", function () {
  const v = price(2);
  pm.expect(v).to.eql(4);
});
pm.test(\"other\", function () {
  pm.expect(1).to.eql(1);
  pm.expect(2).to.eql(2);
});
";

    fn extractor(src: &str) -> Extractor
    {
        let grammar = Grammar::javascript().expect("grammar");
        Extractor::new(SourceBuffer::new(src), &grammar).expect("extractor")
    }

    #[test]
    fn sections_fill_every_tier_without_overlap()
    {
        let mut ex = extractor(SRC);
        let opts = ExtractOptions {
            prefix_lines: 0,
            suffix_lines: 0,
            debug: true,
            ..ExtractOptions::default()
        };
        let out = ex.ranked_context_sections(Position::new(7, 5), &opts);

        assert!(out.lines_around_cursor.starts_with("pm.test(\"price doubles\""));
        assert!(out.declarations.contains("function price"));
        assert!(out.existing_tests.contains("// …") || out.existing_tests.contains("pm.test(\"other\""));
        assert!(!out.lines_around_cursor.contains("function price"));

        let mut all: Vec<Span> = [&out.meta.offsets.a, &out.meta.offsets.b, &out.meta.offsets.c, &out.meta.offsets.d]
            .into_iter()
            .flatten()
            .copied()
            .collect();
        all.sort();
        assert!(all.windows(2).all(|w| w[0].end <= w[1].start));

        assert!(out.debug.is_some());
        assert!(ex.last_debug().is_some());
    }

    #[test]
    fn closure_pulls_definitions_of_picked_blocks()
    {
        let mut ex = extractor(SRC);
        let opts = ExtractOptions {
            prefix_lines: 0,
            suffix_lines: 0,
            debug: true,
            ..ExtractOptions::default()
        };
        let out = ex.ranked_context_sections(Position::new(7, 5), &opts);

        // RATE lands in tier B either ranked or as a dependency of price
        assert!(out.declarations.contains("const RATE = 2;"));
    }

    #[test]
    fn debug_payload_is_not_built_unless_requested()
    {
        let mut ex = extractor(SRC);
        let out = ex.ranked_context_sections(Position::new(7, 5), &ExtractOptions::default());
        assert!(out.debug.is_none());
        assert!(ex.last_debug().is_none());
    }

    #[test]
    fn edits_mark_dirty_until_next_query()
    {
        let mut ex = extractor(SRC);
        ex.edit(Range::caret(Position::new(1, 1)), "// header\n");
        assert!(ex.tree_status().is_dirty);
        assert_eq!(ex.tree_status().pending_edits_count, 1);

        let ctx = ex.context_around_cursor(Position::new(1, 1), &ExtractOptions::default());
        assert!(ctx.text.starts_with("// header"));
        assert!(!ex.tree_status().is_dirty);
    }
}
