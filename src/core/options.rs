//! Per-query extraction options.

use serde::{Deserialize, Serialize};

use crate::core::budgeter::TierPercents;
use crate::core::collect::TestPattern;
use crate::core::nodes::MAX_NESTING_LEVEL;

/// Total budget for the declaration and relevant-block queries.
pub const DEFAULT_BLOCK_BUDGET: usize = 4000;

/// Total budget for the combined ranked-sections query.
pub const DEFAULT_SECTIONS_BUDGET: usize = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions
{
    /// Symmetric raw-line window used by fallbacks
    pub fallback_line_window: usize,

    /// Lines kept above the cursor (or enclosing block) by window strategies
    pub prefix_lines: usize,

    /// Lines kept below the cursor (or enclosing block)
    pub suffix_lines: usize,

    /// How many enclosing functions to climb past the innermost one
    pub nesting_level: usize,

    /// Total character budget; `None` uses the query's default
    pub max_chars_budget: Option<usize>,

    /// Absorb comment lines directly above a block
    pub include_leading_comments: bool,

    /// Cap on similar helper blocks
    pub top_k: usize,

    pub min_similarity_threshold: f64,

    /// Record the verbose ranking payload
    pub debug: bool,

    pub tier_percents: TierPercents,

    /// Call shape recognized as a test block
    pub test_pattern: TestPattern,
}

impl Default for ExtractOptions
{
    fn default() -> Self
    {
        Self {
            fallback_line_window: 5,
            prefix_lines: 5,
            suffix_lines: 5,
            nesting_level: 0,
            max_chars_budget: None,
            include_leading_comments: true,
            top_k: 3,
            min_similarity_threshold: 0.05,
            debug: false,
            tier_percents: TierPercents::default(),
            test_pattern: TestPattern::default(),
        }
    }
}

impl ExtractOptions
{
    /// Nesting level clamped to the supported range.
    pub fn nesting(&self) -> usize
    {
        self.nesting_level
            .min(MAX_NESTING_LEVEL)
    }

    /// Configured budget, or `default` when unset.
    pub fn budget_or(
        &self,
        default: usize,
    ) -> usize
    {
        self.max_chars_budget
            .unwrap_or(default)
    }
}
