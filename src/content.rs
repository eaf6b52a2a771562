//! Content-tree model wrapped by distributable items.
//!
//! A content node is either a single leaf or a composite over child
//! nodes. The distribution engine only needs three things from it:
//! structural equality, recursive rendering cost, and leaf iteration.

/// One leaf of a content tree: a named unit with a (small) category set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLeaf {
    pub name: String,
    pub categories: Vec<String>,
}

impl ContentLeaf {
    pub fn new(name: impl Into<String>, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

/// A content tree: leaves carry the payload, composites group children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentNode {
    Leaf(ContentLeaf),
    Composite(Vec<ContentNode>),
}

impl ContentNode {
    /// Shorthand for a leaf node.
    pub fn leaf(name: impl Into<String>, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ContentNode::Leaf(ContentLeaf::new(name, categories))
    }

    /// Shorthand for a composite node.
    pub fn composite(children: impl IntoIterator<Item = ContentNode>) -> Self {
        ContentNode::Composite(children.into_iter().collect())
    }

    /// Cost of rendering this node: one per leaf, composites sum their
    /// children recursively.
    pub fn render_cost(&self) -> u32 {
        match self {
            ContentNode::Leaf(_) => 1,
            ContentNode::Composite(children) => children.iter().map(ContentNode::render_cost).sum(),
        }
    }

    /// All leaves of the tree, depth first.
    pub fn leaves(&self) -> Vec<&ContentLeaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ContentLeaf>) {
        match self {
            ContentNode::Leaf(leaf) => out.push(leaf),
            ContentNode::Composite(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}
