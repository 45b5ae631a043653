//! Arena nodes.

use std::fmt;

/// Index of a node inside one [`AssetTree`](crate::AssetTree).
///
/// Only meaningful for the tree that produced it; a rebuild issues new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// One record placed in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode<R> {
    pub(crate) record: R,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) expanded: bool,
}

impl<R> TreeNode<R> {
    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Zero for roots.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
