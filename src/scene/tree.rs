//! In-memory retained scene tree
//!
//! Stands in for the compositor's scene graph when running headless and
//! under test. Counts every mutation so callers can assert that a pass was
//! free of redundant work.

use std::collections::HashMap;

use tracing::trace;

use super::{NodeId, SceneError, SceneGraph};

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    /// Bottom-to-top
    children: Vec<NodeId>,
    enabled: bool,
}

/// Scene tree with a single root node
#[derive(Debug)]
pub struct SceneTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    mutations: u64,
    #[cfg(test)]
    fail_in: Option<u64>,
}

impl SceneTree {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: None,
                children: Vec::new(),
                enabled: true,
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
            mutations: 0,
            #[cfg(test)]
            fail_in: None,
        }
    }

    /// Number of mutating calls that succeeded so far
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Children of `node`, bottom-to-top
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `node` sits somewhere below `ancestor` in the tree
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Make the mutation `n` calls from now fail with `UnknownNode`
    #[cfg(test)]
    pub fn fail_after(&mut self, n: u64) {
        self.fail_in = Some(n);
    }

    fn begin_mutation(&mut self, node: NodeId) -> Result<(), SceneError> {
        #[cfg(test)]
        if let Some(remaining) = self.fail_in {
            if remaining == 0 {
                self.fail_in = None;
                return Err(SceneError::UnknownNode(node));
            }
            self.fail_in = Some(remaining - 1);
        }
        if !self.nodes.contains_key(&node) {
            return Err(SceneError::UnknownNode(node));
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&node)?.parent?;
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != node);
        }
        Some(parent)
    }

    fn siblings_check(&self, node: NodeId, sibling: NodeId) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(&sibling) {
            return Err(SceneError::UnknownNode(sibling));
        }
        if node == self.root {
            return Err(SceneError::RootNode(node));
        }
        match (self.parent(node), self.parent(sibling)) {
            (Some(a), Some(b)) if a == b && node != sibling => Ok(a),
            _ => Err(SceneError::NotSiblings { node, sibling }),
        }
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for SceneTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: NodeId) -> Result<NodeId, SceneError> {
        self.begin_mutation(parent)?;
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                children: Vec::new(),
                enabled: true,
            },
        );
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        self.mutations += 1;
        trace!("scene: created {:?} under {:?}", id, parent);
        Ok(id)
    }

    fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        if !self.nodes.contains_key(&new_parent) {
            return Err(SceneError::UnknownNode(new_parent));
        }
        if node == self.root {
            return Err(SceneError::RootNode(node));
        }
        if new_parent == node || self.is_descendant(new_parent, node) {
            return Err(SceneError::Cycle {
                node,
                parent: new_parent,
            });
        }
        self.detach(node);
        if let Some(p) = self.nodes.get_mut(&new_parent) {
            p.children.push(node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = Some(new_parent);
        }
        self.mutations += 1;
        Ok(())
    }

    fn raise_to_top(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        let parent = self.detach(node).ok_or(SceneError::RootNode(node))?;
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(node);
        }
        self.mutations += 1;
        Ok(())
    }

    fn place_above(&mut self, node: NodeId, sibling: NodeId) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        let parent = self.siblings_check(node, sibling)?;
        self.detach(node);
        if let Some(p) = self.nodes.get_mut(&parent) {
            let index = p.children.iter().position(|&c| c == sibling).unwrap_or(0);
            p.children.insert(index + 1, node);
        }
        self.mutations += 1;
        Ok(())
    }

    fn place_below(&mut self, node: NodeId, sibling: NodeId) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        let parent = self.siblings_check(node, sibling)?;
        self.detach(node);
        if let Some(p) = self.nodes.get_mut(&parent) {
            let index = p.children.iter().position(|&c| c == sibling).unwrap_or(0);
            p.children.insert(index, node);
        }
        self.mutations += 1;
        Ok(())
    }

    fn set_enabled(&mut self, node: NodeId, enabled: bool) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        if let Some(n) = self.nodes.get_mut(&node) {
            n.enabled = enabled;
        }
        self.mutations += 1;
        Ok(())
    }

    fn destroy_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.begin_mutation(node)?;
        if node == self.root {
            return Err(SceneError::RootNode(node));
        }
        self.detach(node);
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&id) {
                pending.extend(removed.children);
            }
        }
        self.mutations += 1;
        Ok(())
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn node_below(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    fn node_above(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn is_enabled(&self, node: NodeId) -> Option<bool> {
        self.nodes.get(&node).map(|n| n.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_above_and_below() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node(root).unwrap();
        let b = tree.create_node(root).unwrap();
        let c = tree.create_node(root).unwrap();
        assert_eq!(tree.children(root), &[a, b, c]);

        tree.place_above(a, c).unwrap();
        assert_eq!(tree.children(root), &[b, c, a]);

        tree.place_below(a, b).unwrap();
        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree.node_below(b), Some(a));
        assert_eq!(tree.node_above(b), Some(c));
        assert_eq!(tree.node_below(a), None);
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let outer = tree.create_node(root).unwrap();
        let inner = tree.create_node(outer).unwrap();
        assert_eq!(
            tree.reparent(outer, inner),
            Err(SceneError::Cycle {
                node: outer,
                parent: inner
            })
        );
        assert!(tree.is_descendant(inner, root));
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let outer = tree.create_node(root).unwrap();
        let inner = tree.create_node(outer).unwrap();
        tree.destroy_node(outer).unwrap();
        assert!(!tree.contains(outer));
        assert!(!tree.contains(inner));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_place_above_requires_siblings() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node(root).unwrap();
        let b = tree.create_node(a).unwrap();
        let before = tree.mutations();
        assert!(tree.place_above(b, a).is_err());
        assert_eq!(tree.mutations(), before);
    }
}
