//! Fusion Tree - Asset Hierarchy
//!
//! Turns a flat list of asset-like records, each listing the ids of its
//! subsystems, into a parent-linked tree for list views. Nodes live in an
//! arena and refer to each other by [`NodeId`]. Expand/collapse state is a
//! view concern carried on the node, and survives rebuilds by entity id.

mod node;
mod record;
mod tree;

pub use node::{NodeId, TreeNode};
pub use record::{AlertRecord, TreeRecord};
pub use tree::AssetTree;
