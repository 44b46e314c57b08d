//! CLI handlers for the extraction queries.
//!
//! Each handler loads the file into a [`SourceBuffer`], merges config
//! defaults with command-line overrides, runs one query and prints either
//! JSON or a human report.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::{AppContext, QueryArgs, SectionsArgs, StatusArgs};
use crate::core::extractor::Extractor;
use crate::core::options::ExtractOptions;
use crate::core::parse::Grammar;
use crate::infra::buffer::{Position, SourceBuffer};
use crate::infra::config::Config;

/// Command-line flags layered over the configured defaults.
pub fn merge_options(
    base: &ExtractOptions,
    args: &QueryArgs,
) -> ExtractOptions
{
    let mut opts = base.clone();

    if let Some(budget) = args.budget
    {
        opts.max_chars_budget = Some(budget);
    }
    if let Some(window) = args.window
    {
        opts.fallback_line_window = window;
        opts.prefix_lines = window;
        opts.suffix_lines = window;
    }
    if let Some(nesting) = args.nesting
    {
        opts.nesting_level = nesting;
    }
    if let Some(k) = args.top_k
    {
        opts.top_k = k;
    }
    if args.no_comments
    {
        opts.include_leading_comments = false;
    }

    opts
}

fn open(file: &Path) -> Result<Extractor>
{
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let grammar = Grammar::javascript().context("Failed to load the JavaScript grammar")?;

    Extractor::new(SourceBuffer::new(text), &grammar).context("Failed to create extractor")
}

fn header(
    label: &str,
    ctx: &AppContext,
) -> String
{
    if ctx.no_color
    {
        format!("== {label} ==")
    }
    else
    {
        format!("{} {} {}", "==".dimmed(), label.bold().cyan(), "==".dimmed())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()>
{
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize result")?);
    Ok(())
}

/// Print one titled section; empty sections are shown unless quiet.
fn print_section(
    label: &str,
    text: &str,
    ctx: &AppContext,
)
{
    if text.is_empty() && ctx.quiet
    {
        return;
    }
    if !ctx.quiet
    {
        println!("{}", header(label, ctx));
    }
    println!("{text}");
}

fn position(args: &QueryArgs) -> Position
{
    Position::new(args.line, args.column)
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn run_around(
    args: QueryArgs,
    config: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let opts = merge_options(&config.extract, &args);
    let mut ex = open(&args.file)?;
    let out = ex.context_around_cursor(position(&args), &opts);
    debug!(strategy = %out.strategy, "around");

    if args.json
    {
        return print_json(&out);
    }

    let label = format!("lines {}-{} ({})", out.start_line, out.end_line, out.strategy);
    print_section(&label, &out.text, ctx);
    Ok(())
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn run_decls(
    args: QueryArgs,
    config: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let opts = merge_options(&config.extract, &args);
    let mut ex = open(&args.file)?;
    let out = ex.global_declarations(position(&args), &opts);

    if args.json
    {
        return print_json(&out);
    }

    let label = format!(
        "declarations {}/{} ({} of {} chars)",
        out.meta.picked, out.meta.candidates, out.meta.used_chars, out.meta.budget
    );
    print_section(&label, &out.text, ctx);
    Ok(())
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn run_blocks(
    args: QueryArgs,
    config: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let opts = merge_options(&config.extract, &args);
    let mut ex = open(&args.file)?;
    let out = ex.relevant_blocks(position(&args), &opts);

    if args.json
    {
        return print_json(&out);
    }

    if !ctx.quiet
    {
        match &out.current_block
        {
            Some(cur) => println!("current block: lines {}-{}", cur.start_line, cur.end_line),
            None => println!("current block: none"),
        }
        for b in &out.blocks
        {
            println!(
                "  lines {}-{}  similarity {:.3}  {} chars",
                b.start_line, b.end_line, b.similarity, b.size_chars
            );
        }
    }
    print_section("relevant blocks", &out.text, ctx);
    Ok(())
}

#[instrument(skip_all, fields(file = %args.query.file.display()))]
pub fn run_sections(
    args: SectionsArgs,
    config: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let mut opts = merge_options(&config.extract, &args.query);
    opts.debug |= args.debug;

    let mut ex = open(&args.query.file)?;
    let out = ex.ranked_context_sections(position(&args.query), &opts);

    if args.query.json
    {
        return print_json(&out);
    }

    let b = &out.meta.budgets;
    print_section(&format!("A: cursor ({}, {} chars)", out.meta.strategy, b.a), &out.lines_around_cursor, ctx);
    print_section(&format!("B: declarations ({} chars)", b.b), &out.declarations, ctx);
    print_section(&format!("C: relevant ({} chars)", b.c), &out.relevant_lines, ctx);
    print_section(&format!("D: tests ({} chars)", b.d), &out.existing_tests, ctx);

    if let Some(trace) = &out.debug
    {
        println!("{}", header("debug", ctx));
        println!("{}", serde_json::to_string_pretty(trace).context("Failed to serialize debug payload")?);
    }
    Ok(())
}

pub fn run_status(
    args: StatusArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let ex = open(&args.file)?;
    let status = ex.tree_status();

    if args.json
    {
        return print_json(&status);
    }

    let state = if status.has_tree
    {
        if ctx.no_color { "parsed".to_string() } else { "parsed".green().to_string() }
    }
    else if ctx.no_color
    {
        "no tree".to_string()
    }
    else
    {
        "no tree".red().to_string()
    };

    println!("{}: {}", args.file.display(), state);
    if !ctx.quiet
    {
        println!("  dirty: {}", status.is_dirty);
        println!("  pending edits: {}", status.pending_edits_count);
        if let Some(at) = status.last_parse_time
        {
            println!("  last parse: {}", at.to_rfc3339());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn window_flag_sets_all_three_windows()
    {
        let args = QueryArgs {
            file: "x.js".into(),
            line: 1,
            column: 1,
            json: false,
            budget: Some(900),
            window: Some(2),
            nesting: None,
            top_k: None,
            no_comments: true,
        };
        let opts = merge_options(&ExtractOptions::default(), &args);

        assert_eq!(opts.max_chars_budget, Some(900));
        assert_eq!((opts.fallback_line_window, opts.prefix_lines, opts.suffix_lines), (2, 2, 2));
        assert!(!opts.include_leading_comments);
        assert_eq!(opts.top_k, 3);
    }
}
