//! Conversion of a finished distribution into deliverable bundles.

use std::sync::Arc;

use crate::content::ContentNode;
use crate::distribution::Distribution;
use crate::error::DistributeError;
use crate::item::ItemArena;

/// Why a bundle is being offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intention {
    /// Contents reinforce each other.
    Synergy,
    /// Contents are alternatives; the recipient picks a direction.
    Alternative,
    /// Low-value filler.
    Garbage,
    /// Low-value filler built around lands.
    LandGarbage,
    #[default]
    Unspecified,
}

/// One bin's worth of content, tagged with an intention.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    intention: Intention,
    nodes: Vec<Arc<ContentNode>>,
}

impl Bundle {
    pub fn intention(&self) -> Intention {
        self.intention
    }

    pub fn nodes(&self) -> &[Arc<ContentNode>] {
        &self.nodes
    }

    pub fn render_cost(&self) -> u32 {
        self.nodes.iter().map(|node| node.render_cost()).sum()
    }
}

/// Converts every bin of a distribution into a [`Bundle`].
///
/// A composite wrapping a single child is flattened to that child, so
/// a bundle never carries a pointless one-element wrapper. Fails on
/// the first empty bin; callers are expected to convert only searched
/// distributions, which the constraints steer away from empty bins.
pub fn to_bundles(
    distribution: &Distribution,
    arena: &ItemArena,
    intention: Intention,
) -> Result<Vec<Bundle>, DistributeError> {
    distribution
        .bins()
        .iter()
        .enumerate()
        .map(|(index, bin)| {
            if bin.is_empty() {
                return Err(DistributeError::EmptyBin { index });
            }
            let nodes = bin
                .iter()
                .map(|&id| flatten(arena.get(id).node_arc()))
                .collect();
            Ok(Bundle { intention, nodes })
        })
        .collect()
}

/// Unwraps single-child composites, recursively.
fn flatten(node: &Arc<ContentNode>) -> Arc<ContentNode> {
    match node.as_ref() {
        ContentNode::Composite(children) if children.len() == 1 => {
            flatten(&Arc::new(children[0].clone()))
        }
        _ => Arc::clone(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemId};

    fn arena_with(nodes: Vec<ContentNode>) -> ItemArena {
        let mut arena = ItemArena::new();
        for node in nodes {
            arena.insert(Item::new(Arc::new(node), 1.0, Vec::<String>::new()));
        }
        arena
    }

    #[test]
    fn test_bins_become_bundles() {
        let arena = arena_with(vec![
            ContentNode::leaf("a", Vec::<String>::new()),
            ContentNode::leaf("b", Vec::<String>::new()),
            ContentNode::leaf("c", Vec::<String>::new()),
        ]);
        let distribution =
            Distribution::from_bins(vec![vec![ItemId(0), ItemId(1)], vec![ItemId(2)]]);

        let bundles =
            to_bundles(&distribution, &arena, Intention::Synergy).expect("no empty bins");
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].intention(), Intention::Synergy);
        assert_eq!(bundles[0].nodes().len(), 2);
        assert_eq!(bundles[1].nodes().len(), 1);
    }

    #[test]
    fn test_single_child_composite_flattened() {
        let inner = ContentNode::leaf("only", Vec::<String>::new());
        let arena = arena_with(vec![ContentNode::composite([inner.clone()])]);
        let distribution = Distribution::from_bins(vec![vec![ItemId(0)]]);

        let bundles =
            to_bundles(&distribution, &arena, Intention::Unspecified).expect("no empty bins");
        assert_eq!(bundles[0].nodes()[0].as_ref(), &inner);
    }

    #[test]
    fn test_nested_single_child_composites_flattened() {
        let inner = ContentNode::leaf("deep", Vec::<String>::new());
        let wrapped = ContentNode::composite([ContentNode::composite([inner.clone()])]);
        let arena = arena_with(vec![wrapped]);
        let distribution = Distribution::from_bins(vec![vec![ItemId(0)]]);

        let bundles =
            to_bundles(&distribution, &arena, Intention::Alternative).expect("no empty bins");
        assert_eq!(bundles[0].nodes()[0].as_ref(), &inner);
    }

    #[test]
    fn test_empty_bin_is_an_error() {
        let arena = arena_with(vec![ContentNode::leaf("a", Vec::<String>::new())]);
        let distribution = Distribution::from_bins(vec![vec![ItemId(0)], vec![]]);

        let err = to_bundles(&distribution, &arena, Intention::Garbage);
        assert!(matches!(err, Err(DistributeError::EmptyBin { index: 1 })));
    }

    #[test]
    fn test_render_cost_sums_nodes() {
        let arena = arena_with(vec![
            ContentNode::composite([
                ContentNode::leaf("a", Vec::<String>::new()),
                ContentNode::leaf("b", Vec::<String>::new()),
            ]),
            ContentNode::leaf("c", Vec::<String>::new()),
        ]);
        let distribution = Distribution::from_bins(vec![vec![ItemId(0), ItemId(1)]]);

        let bundles =
            to_bundles(&distribution, &arena, Intention::Unspecified).expect("no empty bins");
        assert_eq!(bundles[0].render_cost(), 3);
    }
}
