//! End-to-end extraction scenarios over small JavaScript sources.

mod util;

use cursorctx::core::{Budget, TierPercents};
use cursorctx::{ChangeEvent, ExtractOptions, Position, Range, Strategy};
use util::{POSTMAN, extractor, is_line_aligned};

fn tight() -> ExtractOptions
{
    ExtractOptions {
        prefix_lines: 0,
        suffix_lines: 0,
        ..ExtractOptions::default()
    }
}

#[test]
fn empty_buffer_yields_empty_fallback()
{
    let mut ex = extractor("");

    let ctx = ex.context_around_cursor(Position::new(1, 1), &ExtractOptions::default());
    assert_eq!(ctx.text, "");
    assert_eq!(ctx.strategy, Strategy::FallbackLines);

    let sections = ex.ranked_context_sections(Position::new(1, 1), &ExtractOptions::default());
    assert_eq!(sections.meta.strategy, Strategy::FallbackLines);
    assert!(sections.declarations.is_empty());
    assert!(sections.relevant_lines.is_empty());
    assert!(sections.existing_tests.is_empty());
}

#[test]
fn single_declaration_is_returned_whole()
{
    let mut ex = extractor("const x = 1;");
    let ctx = ex.context_around_cursor(Position::new(1, 5), &ExtractOptions::default());

    assert!(ctx.text.contains("const x = 1;"));
    assert!(matches!(
        ctx.strategy,
        Strategy::TopLevelWithSyntaxSanity | Strategy::FallbackLines
    ));
}

#[test]
fn cursor_inside_function_covers_the_function()
{
    let src = "\
const a = 1;

function scale(x) {
  const y = x * a;
  log(y);
  return y;
}

const b = 2;
";
    let mut ex = extractor(src);
    let ctx = ex.context_around_cursor(Position::new(5, 3), &ExtractOptions::default());

    let fn_start = src
        .find("function scale")
        .expect("function start");
    let fn_end = src
        .find("}\n")
        .expect("function end")
        + 1;

    assert!(ctx.start_offset <= fn_start);
    assert!(ctx.end_offset >= fn_end);
    assert!(ctx.start_line <= 3 && ctx.end_line >= 7);
    assert!(matches!(
        ctx.strategy,
        Strategy::EnclosingBlockWithContext | Strategy::EnclosingFunction
    ));
    assert!(is_line_aligned(src, ctx.start_offset, ctx.end_offset));
}

#[test]
fn referenced_declarations_win_a_tight_budget()
{
    let src = "\
const alpha = 1;
const bravo = 2;
const charlie = 3;
const delta = 4;
const echo = 5;
const foxtrot = 6;
const golf = 7;
const hotel = 8;
const india = 9;
const juliet = 10;

pm.test(\"combines values\", function () {
  const out = charlie + foxtrot + india;
  pm.expect(out).to.eql(18);
});
";
    let mut ex = extractor(src);

    // Exactly the three referenced lines plus two separators
    let opts = ExtractOptions {
        max_chars_budget: Some(56),
        ..tight()
    };
    let out = ex.global_declarations(Position::new(13, 5), &opts);

    let names: Vec<&str> = out
        .declarations
        .iter()
        .flat_map(|d| d.names.iter().map(String::as_str))
        .collect();
    assert_eq!(names, ["charlie", "foxtrot", "india"]);
    assert_eq!(out.text, "const charlie = 3;\n\nconst foxtrot = 6;\n\nconst india = 9;");
    assert_eq!(out.meta.candidates, 10);
    assert_eq!(out.meta.picked, 3);
    assert!(out.meta.used_chars <= 56);
}

#[test]
fn similar_helpers_outrank_unrelated_ones()
{
    let src = "\
function sumPrices(items) {
  let total = 0;
  for (const item of items) {
    total += item.price;
  }
  return total;
}

function sumCosts(rows) {
  let total = 0;
  for (const row of rows) {
    total += row.price;
  }
  return total;
}

function greet(name) {
  console.log(\"hello \" + name);
}

function sumFees(entries) {
  let total = 0;
  for (const entry of entries) {
    total += entry.price;
  }
  return total;
}
";
    let mut ex = extractor(src);
    let opts = ExtractOptions {
        min_similarity_threshold: 0.0,
        ..ExtractOptions::default()
    };
    let out = ex.relevant_blocks(Position::new(4, 5), &opts);

    let current = out
        .current_block
        .as_ref()
        .expect("cursor block");
    assert_eq!((current.start_line, current.end_line), (1, 7));

    assert!(out.blocks.len() >= 2);
    let top: Vec<&str> = out.blocks[..2]
        .iter()
        .map(|b| b.text.lines().next().unwrap_or(""))
        .collect();
    assert!(top.contains(&"function sumCosts(rows) {"));
    assert!(top.contains(&"function sumFees(entries) {"));
    if let Some(third) = out.blocks.get(2)
    {
        assert!(third.text.contains("greet"));
        assert!(third.similarity < out.blocks[1].similarity);
    }

    // Emitted text follows file order
    let costs = out.text.find("sumCosts").expect("sumCosts emitted");
    let fees = out.text.find("sumFees").expect("sumFees emitted");
    assert!(costs < fees);
}

#[test]
fn default_split_of_one_thousand()
{
    let budget = Budget::split(1000, TierPercents::default());
    assert_eq!((budget.a, budget.b, budget.c, budget.d), (400, 300, 200, 100));
    assert_eq!(budget.a + budget.b + budget.c + budget.d, 1000);

    let mut ex = extractor(POSTMAN);
    let opts = ExtractOptions {
        max_chars_budget: Some(1000),
        ..ExtractOptions::default()
    };
    let out = ex.ranked_context_sections(Position::new(9, 3), &opts);
    assert_eq!(out.meta.budgets, budget);
}

#[test]
fn sections_split_a_postman_script_by_tier()
{
    let mut ex = extractor(POSTMAN);
    let out = ex.ranked_context_sections(Position::new(9, 3), &tight());

    assert!(out.lines_around_cursor.contains("status is ok"));
    assert!(!out.lines_around_cursor.contains("responds quickly"));
    assert!(out.declarations.contains("function buildUrl"));
    assert!(out.declarations.contains("const BASE_URL"));
    assert!(out.existing_tests.contains("responds quickly"));
    assert!(!out.relevant_lines.contains("buildUrl"));
}

#[test]
fn cursor_test_stays_out_of_tier_d_when_tier_a_is_empty()
{
    let mut ex = extractor(POSTMAN);
    let opts = ExtractOptions {
        max_chars_budget: Some(1000),
        tier_percents: TierPercents { a: 0.02, b: 0.3, c: 0.2, d: 0.48 },
        ..tight()
    };
    // On the test's first line, which is longer than tier A's 20 chars
    let out = ex.ranked_context_sections(Position::new(8, 5), &opts);

    assert!(out.lines_around_cursor.is_empty());
    assert!(out.existing_tests.contains("responds quickly"));
    assert!(!out.existing_tests.contains("status is ok"));
}

#[test]
fn dependency_spills_into_tier_c_when_b_is_full()
{
    // A referenced table that leaves B fewer than 24 chars
    let mut table = String::from("const bigTable = [0");
    let mut n = 1;
    while table.len() < 286
    {
        table.push_str(&format!(", {n}"));
        n += 1;
    }
    table.push_str("];");

    let src = format!(
        "{table}
const smallFactor = 2;
class PriceHelper {{
  scale(v) {{ return v * smallFactor * bigTable.length; }}
}}
pm.test(\"table lookup\", function () {{
  const hit = bigTable[0];
  pm.expect(hit).to.eql(0);
}});
"
    );
    let mut ex = extractor(&src);
    let opts = ExtractOptions {
        max_chars_budget: Some(1000),
        ..tight()
    };
    let out = ex.ranked_context_sections(Position::new(7, 5), &opts);

    let budgets = out.meta.budgets;
    assert!(out.meta.used_chars.b <= budgets.b);
    assert!(out.meta.used_chars.c <= budgets.c);

    assert!(out.declarations.contains("const bigTable"));
    assert!(out.relevant_lines.contains("class PriceHelper"));
    // smallFactor is a dependency of PriceHelper and only C has room for it
    assert_eq!(out.meta.dependency_additions, 1);
    assert!(!out.declarations.contains("smallFactor = 2"));
    assert!(out.relevant_lines.contains("const smallFactor = 2;"));
}

#[test]
fn unbounded_windows_stop_at_the_buffer_edges()
{
    let mut ex = extractor(POSTMAN);
    let opts = ExtractOptions {
        fallback_line_window: usize::MAX,
        prefix_lines: usize::MAX,
        suffix_lines: usize::MAX,
        ..ExtractOptions::default()
    };

    let ctx = ex.context_around_cursor(Position::new(9, 3), &opts);
    assert_eq!(ctx.start_offset, 0);
    assert!(ctx.text.contains("const BASE_URL"));
    assert!(ctx.text.contains("responds quickly"));
    assert!(is_line_aligned(POSTMAN, ctx.start_offset, ctx.end_offset));

    let out = ex.ranked_context_sections(Position::new(9, 3), &opts);
    assert!(out.lines_around_cursor.contains("status is ok"));
    assert!(out.meta.used_chars.a <= out.meta.budgets.a);

    // Over budget: the raw window narrows from the clamped radius
    let tight = ExtractOptions {
        max_chars_budget: Some(120),
        ..opts
    };
    let ctx = ex.context_around_cursor(Position::new(9, 3), &tight);
    assert!(ctx.text.chars().count() <= 120);
    assert!(is_line_aligned(POSTMAN, ctx.start_offset, ctx.end_offset));

    let out = ex.ranked_context_sections(Position::new(9, 3), &tight);
    assert!(out.meta.used_chars.a <= out.meta.budgets.a);
}

#[test]
fn context_is_idempotent_without_edits()
{
    let mut ex = extractor(POSTMAN);
    let opts = ExtractOptions::default();

    let first = ex.context_around_cursor(Position::new(14, 10), &opts);
    let second = ex.context_around_cursor(Position::new(14, 10), &opts);
    assert_eq!(first, second);
}

#[test]
fn out_of_range_cursor_is_clamped()
{
    let mut ex = extractor(POSTMAN);
    let ctx = ex.context_around_cursor(Position::new(999, 80), &ExtractOptions::default());

    assert!(!ctx.text.is_empty());
    assert!(is_line_aligned(POSTMAN, ctx.start_offset, ctx.end_offset));
}

#[test]
fn host_edits_follow_the_dirty_clean_cycle()
{
    let mut ex = extractor(POSTMAN);
    assert!(!ex.tree_status().is_dirty);

    let change = ex
        .buffer_mut()
        .insert(Position::new(3, 1), "const RETRIES = 3;\n");
    ex.on_buffer_changed(&ChangeEvent::from(change));

    let status = ex.tree_status();
    assert!(status.is_dirty);
    assert_eq!(status.pending_edits_count, 1);

    ex.force_build_tree();
    let status = ex.tree_status();
    assert!(!status.is_dirty);
    assert_eq!(status.pending_edits_count, 0);
    assert!(status.has_tree);

    // A second edit is picked up by the next query
    ex.edit(Range::caret(Position::new(1, 1)), "// smoke\n");
    assert!(ex.tree_status().is_dirty);
    let decls = ex.global_declarations(Position::new(1, 1), &ExtractOptions::default());
    assert!(!ex.tree_status().is_dirty);
    assert!(decls.text.contains("const RETRIES = 3;"));
}
