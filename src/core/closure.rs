//! One-hop dependency closure over top-level definitions.

use indexmap::IndexMap;
use tracing::trace;

use crate::core::budgeter::{Packer, char_len};
use crate::core::collect::BlockRange;
use crate::core::dedupe::{Reservations, Tier};
use crate::core::refs::{defined_names, free_identifiers};

/// Global name → defining block; the first definition of a name wins.
#[derive(Debug, Default)]
pub struct DefinitionIndex<'t>
{
    by_name: IndexMap<String, BlockRange<'t>>,
}

impl<'t> DefinitionIndex<'t>
{
    pub fn build(
        decls: &[BlockRange<'t>],
        src: &str,
    ) -> Self
    {
        let mut by_name = IndexMap::new();

        for decl in decls
        {
            for name in defined_names(decl.node, src)
            {
                by_name
                    .entry(name)
                    .or_insert(*decl);
            }
        }

        Self { by_name }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&BlockRange<'t>>
    {
        self.by_name
            .get(name)
    }

    pub fn len(&self) -> usize
    {
        self.by_name
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.by_name
            .is_empty()
    }
}

/// A definition pulled in for a selected block.
#[derive(Debug, Clone)]
pub struct Addition<'t>
{
    /// Free name that triggered the addition
    pub name: String,
    pub block: BlockRange<'t>,
    /// Tier whose budget paid for it
    pub tier: Tier,
}

/// Add the definitions of `selected` blocks' free identifiers.
///
/// Strictly one hop: additions are not expanded further. Each addition
/// goes to the first of `packers` with room for it, avoids `reserved`, and
/// is reserved on acceptance.
pub fn expand<'t>(
    selected: &[BlockRange<'t>],
    index: &DefinitionIndex<'t>,
    src: &str,
    reserved: &mut Reservations,
    packers: &mut [(Tier, Packer)],
) -> Vec<Addition<'t>>
{
    let mut added = Vec::new();

    for block in selected
    {
        for name in free_identifiers(block.node, src)
        {
            let Some(def) = index.get(&name)
            else
            {
                continue;
            };

            if def
                .span
                .is_empty()
                || reserved.contains(&def.span)
                || reserved.overlaps(&def.span)
            {
                continue;
            }

            let size = char_len(def.text(src));
            let Some(tier) = packers
                .iter_mut()
                .find_map(|(tier, packer)| packer.try_take(size).then_some(*tier))
            else
            {
                trace!(%name, size, "dependency over budget");
                continue;
            };

            trace!(%name, ?tier, start = def.span.start, "dependency added");
            reserved.reserve(def.span);
            added.push(Addition { name, block: *def, tier });
        }
    }

    added
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::collect::global_declarations;
    use crate::core::parse::Grammar;
    use crate::infra::buffer::SourceBuffer;

    const SRC: &str = "\
const RATE = 2;
const unused = 9;
const base = RATE + 1;
function price(x) { return x * base; }
";

    #[test]
    fn pulls_direct_definitions_only()
    {
        let tree = Grammar::javascript()
            .and_then(|g| g.parser())
            .expect("parser")
            .parse(SRC, None)
            .expect("tree");
        let buf = SourceBuffer::new(SRC);
        let decls = global_declarations(tree.root_node(), &buf, true);
        let index = DefinitionIndex::build(&decls, SRC);
        assert_eq!(index.len(), 4);

        let price = decls[3];
        let mut reserved = Reservations::new();
        reserved.reserve(price.span);
        let mut packers = [(Tier::B, Packer::new(1000))];

        let added = expand(&[price], &index, SRC, &mut reserved, &mut packers);
        let names: Vec<&str> = added
            .iter()
            .map(|a| a.name.as_str())
            .collect();

        // base is one hop away; RATE is two
        assert_eq!(names, vec!["base"]);
        assert!(reserved.contains(&decls[2].span));
    }

    #[test]
    fn respects_budget_and_reservations()
    {
        let tree = Grammar::javascript()
            .and_then(|g| g.parser())
            .expect("parser")
            .parse(SRC, None)
            .expect("tree");
        let buf = SourceBuffer::new(SRC);
        let decls = global_declarations(tree.root_node(), &buf, true);
        let index = DefinitionIndex::build(&decls, SRC);

        let mut reserved = Reservations::new();
        let mut packers = [(Tier::B, Packer::new(5)), (Tier::C, Packer::new(5))];
        assert!(expand(&[decls[3]], &index, SRC, &mut reserved, &mut packers).is_empty());

        let mut reserved = Reservations::new();
        reserved.reserve(decls[2].span);
        let mut packers = [(Tier::B, Packer::new(1000))];
        assert!(expand(&[decls[3]], &index, SRC, &mut reserved, &mut packers).is_empty());
    }

    #[test]
    fn spills_into_the_next_tier_with_room()
    {
        let tree = Grammar::javascript()
            .and_then(|g| g.parser())
            .expect("parser")
            .parse(SRC, None)
            .expect("tree");
        let buf = SourceBuffer::new(SRC);
        let decls = global_declarations(tree.root_node(), &buf, true);
        let index = DefinitionIndex::build(&decls, SRC);

        // "const base = RATE + 1;" is 22 chars; B has 10 left, C has 30
        let mut reserved = Reservations::new();
        let mut packers = [(Tier::B, Packer::resume(100, 90, 1)), (Tier::C, Packer::new(30))];
        let added = expand(&[decls[3]], &index, SRC, &mut reserved, &mut packers);

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].tier, Tier::C);
        assert_eq!(packers[0].1.used(), 90);
        assert_eq!(packers[1].1.used(), 22);
    }
}
