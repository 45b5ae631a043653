//! Arena-backed asset tree.

use std::collections::{BTreeSet, HashMap, HashSet};

use fusion_core::{EntityId, OispAlertPriority};

use crate::node::{NodeId, TreeNode};
use crate::record::{AlertRecord, TreeRecord};

/// Parent-linked tree of records, rebuilt from scratch on every data change.
///
/// Nodes are stored in depth-first pre-order: a node is followed directly by
/// all of its descendants.
#[derive(Debug, Clone)]
pub struct AssetTree<R> {
    nodes: Vec<TreeNode<R>>,
    roots: Vec<NodeId>,
}

impl<R> Default for AssetTree<R> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<R: TreeRecord + Clone> AssetTree<R> {
    /// Build a tree where every record is both displayable and resolvable.
    pub fn build(records: &[R], previous: Option<&AssetTree<R>>) -> Self {
        Self::build_view(records, records, previous)
    }

    /// Build a tree whose roots come from `displayed` and whose children are
    /// resolved against `all`.
    ///
    /// A displayed record is a root unless another displayed record lists it
    /// as a subsystem. Subsystem ids missing from `all`, repeated within one
    /// list, or pointing back at an ancestor are skipped. Nodes whose entity
    /// id was expanded anywhere in `previous` start expanded.
    pub fn build_view(all: &[R], displayed: &[R], previous: Option<&AssetTree<R>>) -> Self {
        let by_id: HashMap<EntityId, &R> = all.iter().map(|r| (r.record_id(), r)).collect();
        let referenced: HashSet<EntityId> = displayed
            .iter()
            .flat_map(|r| r.subsystem_ids().iter().copied())
            .collect();

        let mut tree = Self {
            nodes: Vec::with_capacity(all.len()),
            roots: Vec::new(),
        };
        let mut path = Vec::new();
        for record in displayed
            .iter()
            .filter(|r| !referenced.contains(&r.record_id()))
        {
            let root = tree.add_node(None, record, &by_id, &mut path);
            tree.roots.push(root);
        }

        if let Some(previous) = previous {
            tree.apply_expanded_ids(&previous.expanded_ids());
        }

        tracing::debug!(
            records = all.len(),
            displayed = displayed.len(),
            roots = tree.roots.len(),
            nodes = tree.nodes.len(),
            "asset tree built"
        );
        tree
    }

    fn add_node(
        &mut self,
        parent: Option<NodeId>,
        record: &R,
        by_id: &HashMap<EntityId, &R>,
        path: &mut Vec<EntityId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = parent.map_or(0, |p| self.nodes[p.0].depth + 1);
        let record_id = record.record_id();
        self.nodes.push(TreeNode {
            record: record.clone(),
            parent,
            children: Vec::new(),
            depth,
            expanded: false,
        });

        path.push(record_id);
        let mut attached = HashSet::new();
        for child_id in record.subsystem_ids() {
            if path.contains(child_id) {
                tracing::trace!(parent = record_id, child = child_id, "skipping reference to ancestor");
                continue;
            }
            if !attached.insert(*child_id) {
                continue;
            }
            match by_id.get(child_id) {
                Some(child) => {
                    let child_node = self.add_node(Some(id), child, by_id, path);
                    self.nodes[id.0].children.push(child_node);
                }
                None => {
                    tracing::trace!(parent = record_id, child = child_id, "subsystem not in collection");
                }
            }
        }
        path.pop();
        id
    }

    /// Ids of every expanded node, at any depth.
    pub fn expanded_ids(&self) -> BTreeSet<EntityId> {
        self.nodes
            .iter()
            .filter(|node| node.expanded)
            .map(|node| node.record.record_id())
            .collect()
    }

    /// Expand every node whose entity id is in `ids`. Other nodes are left as
    /// they are.
    pub fn apply_expanded_ids(&mut self, ids: &BTreeSet<EntityId>) {
        for node in &mut self.nodes {
            if ids.contains(&node.record.record_id()) {
                node.expanded = true;
            }
        }
    }

    /// First node (depth-first) holding `entity_id`. A record listed under
    /// several parents occurs once per parent.
    pub fn find(&self, entity_id: EntityId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.record.record_id() == entity_id)
            .map(NodeId)
    }

    /// Whether the first occurrence of the node's id is the last entry of its
    /// parent's subsystem list. Roots are never last children, and neither is
    /// an id that the list repeats further on.
    pub fn is_last_child_element(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let Some(parent) = node.parent.and_then(|p| self.node(p)) else {
            return false;
        };
        let siblings = parent.record.subsystem_ids();
        let record_id = node.record.record_id();
        matches!(
            siblings.iter().position(|sibling| *sibling == record_id),
            Some(index) if index + 1 == siblings.len()
        )
    }

    /// Whether any descendant of the node matches `predicate`.
    pub fn children_need_maintenance<F>(&self, id: NodeId, predicate: F) -> bool
    where
        F: Fn(&R) -> bool,
    {
        self.descendants(id).iter().any(|node| predicate(&node.record))
    }
}

impl<R: AlertRecord + Clone> AssetTree<R> {
    /// Alert shown on the node's row.
    ///
    /// An expanded node shows only its own priority since its children have
    /// rows of their own. A collapsed node shows the most severe of its own
    /// priority and each child's shown priority.
    pub fn max_open_alert_priority(&self, id: NodeId) -> Option<OispAlertPriority> {
        let node = self.node(id)?;
        let own = node.record.open_alert_priority();
        if node.expanded {
            return own;
        }
        node.children.iter().fold(own, |shown, child| {
            OispAlertPriority::most_severe(shown, self.max_open_alert_priority(*child))
        })
    }
}

impl<R> AssetTree<R> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<R>> {
        self.nodes.get(id.0)
    }

    pub fn record(&self, id: NodeId) -> Option<&R> {
        self.node(id).map(TreeNode::record)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(|node| node.depth)
    }

    /// Flip the node's expand flag. Returns the new state, or `None` for an
    /// unknown node.
    pub fn toggle(&mut self, id: NodeId) -> Option<bool> {
        let node = self.nodes.get_mut(id.0)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.expanded = expanded;
        }
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            if node.has_children() {
                node.expanded = true;
            }
        }
    }

    pub fn collapse_all(&mut self) {
        for node in &mut self.nodes {
            node.expanded = false;
        }
    }

    /// All nodes in depth-first pre-order.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = (NodeId, &TreeNode<R>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Nodes a list view renders: depth-first, skipping everything below a
    /// collapsed node.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut visible = Vec::new();
        let mut hidden_below: Option<usize> = None;
        for (id, node) in self.iter_depth_first() {
            if let Some(depth) = hidden_below {
                if node.depth > depth {
                    continue;
                }
                hidden_below = None;
            }
            visible.push(id);
            if !node.expanded && node.has_children() {
                hidden_below = Some(node.depth);
            }
        }
        visible
    }

    /// The contiguous run of nodes below `id` in pre-order.
    fn descendants(&self, id: NodeId) -> &[TreeNode<R>] {
        let Some(node) = self.node(id) else {
            return &[];
        };
        let start = id.0 + 1;
        let end = self.nodes[start..]
            .iter()
            .position(|n| n.depth <= node.depth)
            .map_or(self.nodes.len(), |offset| start + offset);
        &self.nodes[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        id: EntityId,
        subsystems: Vec<EntityId>,
        priority: Option<OispAlertPriority>,
    }

    fn item(id: EntityId, subsystems: &[EntityId]) -> Item {
        Item {
            id,
            subsystems: subsystems.to_vec(),
            priority: None,
        }
    }

    impl TreeRecord for Item {
        fn record_id(&self) -> EntityId {
            self.id
        }

        fn subsystem_ids(&self) -> &[EntityId] {
            &self.subsystems
        }
    }

    impl AlertRecord for Item {
        fn open_alert_priority(&self) -> Option<OispAlertPriority> {
            self.priority
        }
    }

    const A: EntityId = 1;
    const B: EntityId = 2;
    const C: EntityId = 3;
    const D: EntityId = 4;

    fn ids(tree: &AssetTree<Item>, nodes: &[NodeId]) -> Vec<EntityId> {
        nodes
            .iter()
            .map(|n| tree.record(*n).map(|r| r.id).unwrap())
            .collect()
    }

    fn sample() -> Vec<Item> {
        vec![item(A, &[B, C]), item(B, &[]), item(C, &[]), item(D, &[])]
    }

    #[test]
    fn test_roots_and_children() {
        let tree = AssetTree::build(&sample(), None);
        assert_eq!(ids(&tree, tree.roots()), vec![A, D]);

        let a = tree.find(A).unwrap();
        assert_eq!(ids(&tree, tree.children(a)), vec![B, C]);
        assert_eq!(tree.len(), 4);

        let c = tree.find(C).unwrap();
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.depth(c), Some(1));
        assert_eq!(tree.depth(a), Some(0));
    }

    #[test]
    fn test_is_last_child_element() {
        let tree = AssetTree::build(&sample(), None);
        assert!(tree.is_last_child_element(tree.find(C).unwrap()));
        assert!(!tree.is_last_child_element(tree.find(B).unwrap()));
        assert!(!tree.is_last_child_element(tree.find(A).unwrap()));
    }

    #[test]
    fn test_dangling_reference_dropped() {
        let tree = AssetTree::build(&[item(A, &[B, 99]), item(B, &[])], None);
        let a = tree.find(A).unwrap();
        assert_eq!(ids(&tree, tree.children(a)), vec![B]);
        assert_eq!(ids(&tree, tree.roots()), vec![A]);
        // The last listed id is missing, so no child is the last one.
        assert!(!tree.is_last_child_element(tree.find(B).unwrap()));
    }

    #[test]
    fn test_duplicate_subsystem_ids_attach_once() {
        let tree = AssetTree::build(&[item(A, &[B, B]), item(B, &[])], None);
        let a = tree.find(A).unwrap();
        assert_eq!(tree.children(a).len(), 1);
    }

    #[test]
    fn test_repeated_id_is_not_last_child() {
        let records = vec![item(A, &[B, C, B]), item(B, &[]), item(C, &[])];
        let tree = AssetTree::build(&records, None);
        let a = tree.find(A).unwrap();
        assert_eq!(ids(&tree, tree.children(a)), vec![B, C]);
        assert!(!tree.is_last_child_element(tree.find(B).unwrap()));
        assert!(!tree.is_last_child_element(tree.find(C).unwrap()));
    }

    #[test]
    fn test_cycles_terminate() {
        let records = vec![item(D, &[A]), item(A, &[B]), item(B, &[A])];
        let tree = AssetTree::build(&records, None);
        assert_eq!(ids(&tree, tree.roots()), vec![D]);
        let b = tree.find(B).unwrap();
        assert!(tree.children(b).is_empty());
        assert_eq!(tree.len(), 3);

        let closed = AssetTree::build(&[item(A, &[B]), item(B, &[A])], None);
        assert!(closed.is_empty());
    }

    #[test]
    fn test_shared_child_appears_under_each_parent() {
        let records = vec![item(A, &[C]), item(B, &[C]), item(C, &[])];
        let tree = AssetTree::build(&records, None);
        assert_eq!(ids(&tree, tree.roots()), vec![A, B]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_build_view_resolves_children_outside_display() {
        let all = sample();
        let displayed = vec![all[0].clone()];
        let tree = AssetTree::build_view(&all, &displayed, None);
        assert_eq!(ids(&tree, tree.roots()), vec![A]);
        assert_eq!(tree.len(), 3);

        // A displayed child whose parent is filtered out becomes a root.
        let only_b = vec![all[1].clone()];
        let tree = AssetTree::build_view(&all, &only_b, None);
        assert_eq!(ids(&tree, tree.roots()), vec![B]);
    }

    #[test]
    fn test_expand_state_survives_rebuild() {
        let mut tree = AssetTree::build(&sample(), None);
        let a = tree.find(A).unwrap();
        assert_eq!(tree.toggle(a), Some(true));

        let rebuilt = AssetTree::build(&sample(), Some(&tree));
        assert!(rebuilt.node(rebuilt.find(A).unwrap()).unwrap().is_expanded());
        assert!(!rebuilt.node(rebuilt.find(D).unwrap()).unwrap().is_expanded());

        let without_a: Vec<Item> = sample().into_iter().filter(|r| r.id != A).collect();
        let shrunk = AssetTree::build(&without_a, Some(&rebuilt));
        assert!(shrunk.expanded_ids().is_empty());

        let restored = AssetTree::build(&sample(), Some(&shrunk));
        assert!(!restored.node(restored.find(A).unwrap()).unwrap().is_expanded());
    }

    #[test]
    fn test_expanded_ids_include_nested_nodes() {
        let records = vec![item(A, &[B]), item(B, &[C]), item(C, &[])];
        let mut tree = AssetTree::build(&records, None);
        let b = tree.find(B).unwrap();
        tree.set_expanded(b, true);
        assert_eq!(tree.expanded_ids(), BTreeSet::from([B]));

        let rebuilt = AssetTree::build(&records, Some(&tree));
        assert!(rebuilt.node(rebuilt.find(B).unwrap()).unwrap().is_expanded());
    }

    #[test]
    fn test_expand_all_only_touches_parents() {
        let mut tree = AssetTree::build(&sample(), None);
        tree.expand_all();
        assert_eq!(tree.expanded_ids(), BTreeSet::from([A]));
        tree.collapse_all();
        assert!(tree.expanded_ids().is_empty());
    }

    #[test]
    fn test_visible_nodes_follow_expansion() {
        let mut tree = AssetTree::build(&sample(), None);
        let visible = tree.visible_nodes();
        assert_eq!(ids(&tree, &visible), vec![A, D]);

        tree.toggle(tree.find(A).unwrap());
        let visible = tree.visible_nodes();
        assert_eq!(ids(&tree, &visible), vec![A, B, C, D]);
    }

    #[test]
    fn test_max_open_alert_priority_collapsed_vs_expanded() {
        let mut parent = item(A, &[B]);
        parent.priority = Some(OispAlertPriority::High);
        let mut child = item(B, &[]);
        child.priority = Some(OispAlertPriority::Urgent);

        let mut tree = AssetTree::build(&[parent, child], None);
        let a = tree.find(A).unwrap();
        assert_eq!(tree.max_open_alert_priority(a), Some(OispAlertPriority::Urgent));

        tree.set_expanded(a, true);
        assert_eq!(tree.max_open_alert_priority(a), Some(OispAlertPriority::High));
    }

    #[test]
    fn test_max_open_alert_priority_without_own_alert() {
        let mut grandchild = item(C, &[]);
        grandchild.priority = Some(OispAlertPriority::Low);
        let records = vec![item(A, &[B]), item(B, &[C]), grandchild];

        let mut tree = AssetTree::build(&records, None);
        let a = tree.find(A).unwrap();
        assert_eq!(tree.max_open_alert_priority(a), Some(OispAlertPriority::Low));

        // An expanded child shows its grandchild separately.
        let b = tree.find(B).unwrap();
        tree.set_expanded(b, true);
        assert_eq!(tree.max_open_alert_priority(a), None);
    }

    #[test]
    fn test_children_need_maintenance() {
        let records = vec![item(A, &[B]), item(B, &[C]), item(C, &[]), item(D, &[])];
        let tree = AssetTree::build(&records, None);
        let a = tree.find(A).unwrap();
        let d = tree.find(D).unwrap();
        assert!(tree.children_need_maintenance(a, |r| r.id == C));
        assert!(!tree.children_need_maintenance(a, |r| r.id == A));
        assert!(!tree.children_need_maintenance(d, |_| true));
    }

    #[test]
    fn test_unknown_node_is_harmless() {
        let mut tree = AssetTree::build(&sample(), None);
        let bogus = NodeId(100);
        assert_eq!(tree.toggle(bogus), None);
        assert!(tree.children(bogus).is_empty());
        assert_eq!(tree.parent(bogus), None);
        assert!(!tree.is_last_child_element(bogus));
        assert_eq!(tree.max_open_alert_priority(bogus), None);
    }
}
