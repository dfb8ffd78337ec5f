//! Scene Graph Module
//!
//! The retained tree of positioned nodes that decides final visual order.
//! The compositor library owns the real tree; this module only describes the
//! narrow set of operations the stacking core needs, plus an in-memory tree
//! used headless and in tests.

pub mod layers;
pub mod tree;

use thiserror::Error;

pub use layers::{SceneLayer, SceneLayers};
pub use tree::SceneTree;

/// Handle to a node in the scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Scene graph failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("scene node {0:?} cannot be moved (it is the root)")]
    RootNode(NodeId),
    #[error("reparenting {node:?} under {parent:?} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("scene nodes {node:?} and {sibling:?} are not siblings")]
    NotSiblings { node: NodeId, sibling: NodeId },
}

/// Operations the stacking core performs on the external scene graph.
///
/// Children of a node are ordered bottom-to-top. Newly created or
/// reparented nodes land on top of their new parent.
pub trait SceneGraph {
    /// The root all layer containers hang off
    fn root(&self) -> NodeId;

    fn create_node(&mut self, parent: NodeId) -> Result<NodeId, SceneError>;

    fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), SceneError>;

    fn raise_to_top(&mut self, node: NodeId) -> Result<(), SceneError>;

    /// Move `node` directly above `sibling` (both must share a parent)
    fn place_above(&mut self, node: NodeId, sibling: NodeId) -> Result<(), SceneError>;

    /// Move `node` directly below `sibling` (both must share a parent)
    fn place_below(&mut self, node: NodeId, sibling: NodeId) -> Result<(), SceneError>;

    fn set_enabled(&mut self, node: NodeId, enabled: bool) -> Result<(), SceneError>;

    /// Destroy `node` and its whole subtree
    fn destroy_node(&mut self, node: NodeId) -> Result<(), SceneError>;

    fn contains(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The sibling directly below `node`, if any
    fn node_below(&self, node: NodeId) -> Option<NodeId>;

    /// The sibling directly above `node`, if any
    fn node_above(&self, node: NodeId) -> Option<NodeId>;

    fn is_enabled(&self, node: NodeId) -> Option<bool>;
}
