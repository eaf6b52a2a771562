//! Distributable items and the arena that owns them.
//!
//! The search never moves items by value. All items live in an
//! [`ItemArena`] and the bins of a distribution hold [`ItemId`]s, so
//! cloning, comparing, and shuffling assignments stays cheap no matter
//! how heavy the wrapped content trees are.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::content::ContentNode;

/// Handle to an item in an [`ItemArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u32);

/// A weighted, labeled unit to be distributed into bins.
///
/// Immutable after construction. Equality follows the wrapped content
/// node, not the weight or groups.
#[derive(Debug, Clone)]
pub struct Item {
    weight: f64,
    groups: BTreeSet<String>,
    render_cost: u32,
    node: Arc<ContentNode>,
}

impl Item {
    /// Builds an item around a content node.
    ///
    /// When the node is a single homogeneous leaf with a small category
    /// set (at most two categories), the leaf categories are added as
    /// implied groups on top of the explicit ones. This enrichment
    /// happens exactly once, here.
    pub fn new(
        node: Arc<ContentNode>,
        weight: f64,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut groups: BTreeSet<String> = groups
            .into_iter()
            .map(Into::into)
            .filter(|g| !g.is_empty())
            .collect();

        if let Some(categories) = implied_categories(&node) {
            groups.extend(categories.iter().cloned());
        }

        let render_cost = node.render_cost();
        Self {
            weight,
            groups,
            render_cost,
            node,
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn render_cost(&self) -> u32 {
        self.render_cost
    }

    pub fn node(&self) -> &ContentNode {
        &self.node
    }

    /// The shared handle to the wrapped node.
    pub fn node_arc(&self) -> &Arc<ContentNode> {
        &self.node
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Item {}

/// Categories implied by a node that is effectively one leaf.
///
/// A bare leaf qualifies, as does a composite whose children are all
/// the same leaf. Leaves with more than two categories are considered
/// too broad to imply a grouping.
fn implied_categories(node: &ContentNode) -> Option<&Vec<String>> {
    let leaf = match node {
        ContentNode::Leaf(leaf) => leaf,
        ContentNode::Composite(children) => match children.split_first() {
            Some((ContentNode::Leaf(leaf), rest))
                if rest.iter().all(|c| matches!(c, ContentNode::Leaf(l) if l == leaf)) =>
            {
                leaf
            }
            _ => return None,
        },
    };
    if leaf.categories.is_empty() || leaf.categories.len() > 2 {
        None
    } else {
        Some(&leaf.categories)
    }
}

/// Append-only store of items. Search state references items only
/// through [`ItemId`]s into this arena.
#[derive(Debug, Default)]
pub struct ItemArena {
    items: Vec<Item>,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(item);
        id
    }

    pub fn get(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len() as u32).map(ItemId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId(i as u32), item))
    }
}
