use serde::{Deserialize, Serialize};
use tracing::trace;

/// Separator placed between blocks of one tier.
pub const SEPARATOR: &str = "\n\n";

/// Character cost of [`SEPARATOR`].
pub const SEPARATOR_CHARS: usize = 2;

/// Size measure used for every budget: Unicode scalar values.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Per-tier share of the total budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPercents {
    /// Cursor-local context
    pub a: f64,
    /// Declarations and their one-hop dependencies
    pub b: f64,
    /// Similar helper blocks
    pub c: f64,
    /// Other test skeletons
    pub d: f64,
}

impl Default for TierPercents {
    fn default() -> Self {
        Self {
            a: 0.4,
            b: 0.3,
            c: 0.2,
            d: 0.1,
        }
    }
}

impl TierPercents {
    /// Negative or NaN shares become 0; shares summing past 1 are scaled down.
    pub fn sanitized(self) -> Self {
        fn sane(x: f64) -> f64 {
            if x.is_nan() || x < 0.0 { 0.0 } else { x }
        }
        let (a, b, c, d) = (sane(self.a), sane(self.b), sane(self.c), sane(self.d));
        let sum = a + b + c + d;
        if sum <= 1.0 {
            return Self { a, b, c, d };
        }
        Self {
            a: a / sum,
            b: b / sum,
            c: c / sum,
            d: d / sum,
        }
    }
}

/// Character allotment per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Budget {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
    pub total: usize,
}

impl Budget {
    /// Floor each share of `total`.
    pub fn split(total: usize, percents: TierPercents) -> Self {
        let p = percents.sanitized();
        // Epsilon keeps 1000 * 0.3 from landing on 299
        let share = |f: f64| ((total as f64) * f + 1e-9).floor() as usize;

        Self {
            a: share(p.a),
            b: share(p.b),
            c: share(p.c),
            d: share(p.d),
            total,
        }
    }
}

/// Why a candidate was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Larger than what remained of the budget
    OverBudget,
    /// Overlaps an earlier tier's pick
    Reserved,
    /// Cut by the top-k cap
    TopK,
    /// Below the similarity floor with no reference match
    Dissimilar,
    /// Zero-length range
    Empty,
}

/// A candidate to budget, in the caller's ranked order.
#[derive(Debug, Clone, Copy)]
pub struct Item {
    /// Caller-side index of the candidate
    pub id: usize,

    /// Character cost of the candidate's text
    pub size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FitResult {
    /// Ids that fit, in acceptance order
    pub picked: Vec<usize>,

    /// Ids that did not, with the reason
    pub skipped: Vec<(usize, SkipReason)>,

    /// Characters consumed, separators included
    pub used: usize,
}

/// Running greedy accumulator for one budget.
///
/// Every accepted item after the first is charged [`SEPARATOR_CHARS`] on
/// top of its size, so the joined text never exceeds the budget.
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    budget: usize,
    used: usize,
    count: usize,
}

impl Packer {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            count: 0,
        }
    }

    /// Continue charging a budget that already holds `count` items.
    pub fn resume(budget: usize, used: usize, count: usize) -> Self {
        Self {
            budget,
            used: used.min(budget),
            count,
        }
    }

    pub fn remaining(&self) -> usize {
        self.budget - self.used
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Cost of accepting an item of `size` now.
    pub fn cost_of(&self, size: usize) -> usize {
        if self.count == 0 {
            size
        } else {
            size + SEPARATOR_CHARS
        }
    }

    /// Accept the item when it fits whole; never clips.
    pub fn try_take(&mut self, size: usize) -> bool {
        let cost = self.cost_of(size);
        if cost > self.remaining() {
            return false;
        }
        self.used += cost;
        self.count += 1;
        true
    }
}

/// Greedy fit of pre-ranked items into `budget`.
///
/// Items are visited in the given order; an item that does not fit is
/// skipped and packing continues with the next one.
pub fn fit(items: impl IntoIterator<Item = Item>, budget: usize) -> FitResult {
    let mut packer = Packer::new(budget);
    let mut out = FitResult::default();

    for item in items {
        if item.size == 0 {
            out.skipped.push((item.id, SkipReason::Empty));
            continue;
        }
        if packer.try_take(item.size) {
            out.picked.push(item.id);
        } else {
            trace!(id = item.id, size = item.size, remaining = packer.remaining(), "over budget");
            out.skipped.push((item.id, SkipReason::OverBudget));
        }
    }

    out.used = packer.used();
    out
}

impl FitResult {
    /// Keep only the first `k` picks, reporting the rest as [`SkipReason::TopK`].
    ///
    /// `sizes` maps an id to its size so `used` can be recomputed.
    pub fn cap_top_k(&mut self, k: usize, sizes: impl Fn(usize) -> usize) {
        if self.picked.len() <= k {
            return;
        }
        for id in self.picked.drain(k..) {
            self.skipped.push((id, SkipReason::TopK));
        }

        let kept: usize = self.picked.iter().map(|&id| sizes(id)).sum();
        self.used = kept + SEPARATOR_CHARS * self.picked.len().saturating_sub(1);
    }
}
