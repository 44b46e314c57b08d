use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "cctx")]
#[command(about = "Cursor-aware, budgeted, syntax-safe code context for LLM prompts")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log pipeline decisions to stderr (CCTX_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cursor-local context (tier A)
    Around(QueryArgs),

    /// Top-level declarations ranked against the cursor
    Decls(QueryArgs),

    /// Top-level blocks most similar to the one under the cursor
    Blocks(QueryArgs),

    /// All four tiers within one budget
    Sections(SectionsArgs),

    /// Parse a file and report tree status
    Status(StatusArgs),

    /// Initialize a cctx.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// File and cursor plus option overrides shared by every query
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// JavaScript source file
    pub file: PathBuf,

    /// Cursor line (1-based)
    #[arg(long, short)]
    pub line: usize,

    /// Cursor column (1-based, bytes)
    #[arg(long, short, default_value = "1")]
    pub column: usize,

    /// Emit JSON result instead of human text
    #[arg(long)]
    pub json: bool,

    /// Total character budget
    #[arg(long)]
    pub budget: Option<usize>,

    /// Raw fallback window and prefix/suffix lines
    #[arg(long)]
    pub window: Option<usize>,

    /// Enclosing functions to climb (0-50)
    #[arg(long)]
    pub nesting: Option<usize>,

    /// Cap on similar helper blocks
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Do not absorb leading comments into blocks
    #[arg(long)]
    pub no_comments: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SectionsArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Include the ranking trace
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// JavaScript source file
    pub file: PathBuf,

    /// Emit JSON result instead of human text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Shell plus exactly one destination: a directory or stdout
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true)))]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory to write the completion file into
    #[arg(long, group = "target")]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long, group = "target")]
    pub stdout: bool,
}
