//! **cursorctx** - cursor-aware, budgeted, syntax-safe code context for LLM prompts
//!
//! Keeps an incrementally parsed JavaScript tree in step with an editor
//! buffer and answers "what code around the cursor should the model see"
//! as four prioritized, non-overlapping tiers that never split a line or a
//! syntactic block.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Command handlers for the extraction queries
pub mod query;

/// Extraction pipeline - parsing, strategy selection, ranking and packing
pub mod core {
    /// Case-aware tokenization and Jaccard similarity
    pub mod tokens;

    /// Byte spans and full-line snapping
    pub mod span;

    /// Node classification and tree navigation
    pub mod nodes;

    /// Incremental parse manager and grammar handle
    pub mod parse;
    pub use parse::{Grammar, ParseManager, PendingEdit, TreeStatus};

    /// Best-effort unfinished-code detection
    pub mod heuristics;

    /// Syntactic definitions, references and free identifiers
    pub mod refs;

    /// Candidate collectors over top-level blocks
    pub mod collect;
    pub use collect::{BlockKind, BlockRange, TestPattern};

    /// Multi-signal candidate scoring
    pub mod ranking;

    /// Tier budgets and greedy packing
    pub mod budgeter;
    pub use budgeter::{Budget, TierPercents};

    /// One-hop dependency closure
    pub mod closure;

    /// Reservations and cross-tier deduplication
    pub mod dedupe;
    pub use dedupe::Tier;

    /// Tier A strategy selection
    pub mod strategy;
    pub use strategy::Strategy;

    /// Per-query options
    pub mod options;
    pub use options::ExtractOptions;

    /// Public extraction API
    pub mod extractor;
    pub use extractor::{
        CursorContext, DebugPayload, DeclarationsResult, Extractor, RankedSections,
        RelevantBlocksResult,
    };
}

/// Infrastructure - buffers, line indexing and configuration
pub mod infra {
    /// Host buffer trait and the in-memory implementation
    pub mod buffer;
    pub use buffer::{ChangeEvent, ContentChange, Position, Range, SourceBuffer, TextBuffer};

    /// CRLF/LF-robust line indexing
    pub mod line_index;
    pub use line_index::LineIndex;

    /// Layered configuration with TOML support
    pub mod config;
    pub use config::{Config, load_config};
}

/// Failures surfaced by the library. Extraction itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// The grammar could not be loaded into a parser
    #[error("parser setup failed: {0}")]
    Setup(#[from] tree_sitter::LanguageError),
}

// Re-exports for library consumers
pub use cli::{AppContext, Cli, Commands};
pub use core::{
    CursorContext, DeclarationsResult, ExtractOptions, Extractor, Grammar, RankedSections,
    RelevantBlocksResult, Strategy, Tier, TreeStatus,
};
pub use infra::{ChangeEvent, ContentChange, Position, Range, SourceBuffer, TextBuffer};
