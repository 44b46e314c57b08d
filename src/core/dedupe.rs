//! Reservations and cross-tier deduplication.

use serde::Serialize;

use crate::core::budgeter::SEPARATOR;
use crate::core::span::Span;

/// Priority band of extracted context. Earlier variants win conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier
{
    A,
    B,
    C,
    D,
}

impl Tier
{
    pub const ALL: [Tier; 4] = [Tier::A, Tier::B, Tier::C, Tier::D];

    /// Larger is stronger.
    pub fn priority(self) -> u8
    {
        match self
        {
            Tier::A => 4,
            Tier::B => 3,
            Tier::C => 2,
            Tier::D => 1,
        }
    }
}

/// One accepted range with the text it contributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierRange
{
    pub tier: Tier,
    pub span: Span,
    pub text: String,
}

/// Ranges already claimed by earlier pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct Reservations
{
    spans: Vec<Span>,
}

impl Reservations
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn overlaps(
        &self,
        span: &Span,
    ) -> bool
    {
        self.spans
            .iter()
            .any(|s| s.overlaps(span))
    }

    /// Exact offset pair already claimed.
    pub fn contains(
        &self,
        span: &Span,
    ) -> bool
    {
        self.spans
            .contains(span)
    }

    /// Claim `span`; empty spans claim nothing.
    pub fn reserve(
        &mut self,
        span: Span,
    )
    {
        if !span.is_empty()
        {
            self.spans
                .push(span);
        }
    }

    pub fn len(&self) -> usize
    {
        self.spans
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.spans
            .is_empty()
    }
}

/// Keep a non-overlapping subset, higher tiers first, then by position.
///
/// The result is in acceptance order.
pub fn dedupe(mut ranges: Vec<TierRange>) -> Vec<TierRange>
{
    ranges.sort_by(|a, b| {
        b.tier
            .priority()
            .cmp(
                &a.tier
                    .priority(),
            )
            .then(
                a.span
                    .start
                    .cmp(&b.span.start),
            )
            .then(
                a.span
                    .end
                    .cmp(&b.span.end),
            )
    });

    let mut accepted: Vec<TierRange> = Vec::with_capacity(ranges.len());

    for r in ranges
    {
        if r.span
            .is_empty()
        {
            continue;
        }
        if accepted
            .iter()
            .any(|a| a.span.overlaps(&r.span))
        {
            tracing::trace!(tier = ?r.tier, start = r.span.start, end = r.span.end, "dropped overlap");
            continue;
        }
        accepted.push(r);
    }

    accepted
}

/// Text and spans of one tier, in file order.
pub fn assemble(
    accepted: &[TierRange],
    tier: Tier,
) -> (String, Vec<Span>)
{
    let mut mine: Vec<&TierRange> = accepted
        .iter()
        .filter(|r| r.tier == tier)
        .collect();
    mine.sort_by_key(|r| r.span.start);

    let text = mine
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    let spans = mine
        .iter()
        .map(|r| r.span)
        .collect();

    (text, spans)
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn range(
        tier: Tier,
        start: usize,
        end: usize,
    ) -> TierRange
    {
        TierRange { tier, span: Span::new(start, end), text: format!("{start}-{end}") }
    }

    #[test]
    fn higher_tier_wins_overlap()
    {
        let accepted = dedupe(vec![
            range(Tier::C, 0, 10),
            range(Tier::A, 5, 15),
            range(Tier::D, 20, 30),
            range(Tier::B, 14, 22),
        ]);

        let kept: Vec<(Tier, usize)> = accepted
            .iter()
            .map(|r| (r.tier, r.span.start))
            .collect();
        // B loses to A; D survives once B is gone
        assert_eq!(kept, vec![(Tier::A, 5), (Tier::D, 20)]);
    }

    #[test]
    fn touching_ranges_do_not_overlap()
    {
        let accepted = dedupe(vec![range(Tier::B, 10, 20), range(Tier::B, 0, 10)]);
        assert_eq!(accepted.len(), 2);

        let (text, spans) = assemble(&accepted, Tier::B);
        assert_eq!(text, "0-10\n\n10-20");
        assert_eq!(spans, vec![Span::new(0, 10), Span::new(10, 20)]);
    }

    #[test]
    fn reservations_track_exact_and_overlapping()
    {
        let mut r = Reservations::new();
        r.reserve(Span::new(0, 5));
        r.reserve(Span::new(7, 7));
        assert_eq!(r.len(), 1);
        assert!(r.contains(&Span::new(0, 5)));
        assert!(r.overlaps(&Span::new(4, 9)));
        assert!(!r.overlaps(&Span::new(5, 9)));
    }
}
