use anyhow::Result;
use clap::Parser;
use cursorctx::cli::{AppContext, Cli, Commands};
use cursorctx::infra::config::{Config, load_config};
use tracing_subscriber::EnvFilter;

/// Stderr logging; `CCTX_LOG` wins over `--verbose`, which wins over config.
fn init_tracing(ctx: &AppContext, config: &Config) {
    let fallback = if ctx.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_env("CCTX_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        verbose: cli.verbose,
    };

    let config = load_config()?;
    init_tracing(&ctx, &config);

    match cli.command {
        Commands::Around(args) => cursorctx::query::run_around(args, &config, &ctx),
        Commands::Decls(args) => cursorctx::query::run_decls(args, &config, &ctx),
        Commands::Blocks(args) => cursorctx::query::run_blocks(args, &config, &ctx),
        Commands::Sections(args) => cursorctx::query::run_sections(args, &config, &ctx),
        Commands::Status(args) => cursorctx::query::run_status(args, &ctx),
        Commands::Init(args) => cursorctx::infra::config::init(args, &ctx),
        Commands::Completions(args) => cursorctx::completion::run(args, &ctx),
    }
}
