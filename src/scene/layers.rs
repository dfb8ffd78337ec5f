//! Layer containers
//!
//! One container node per compositing tier, created once under the scene
//! root. Client and decor nodes are only ever reparented between these.

use super::{NodeId, SceneError, SceneGraph};

/// Compositing tiers, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SceneLayer {
    Background,
    Desktop,
    Below,
    Normal,
    Decor,
    Above,
    Fullscreen,
    Ontop,
    Overlay,
}

impl SceneLayer {
    pub const ALL: [SceneLayer; 9] = [
        SceneLayer::Background,
        SceneLayer::Desktop,
        SceneLayer::Below,
        SceneLayer::Normal,
        SceneLayer::Decor,
        SceneLayer::Above,
        SceneLayer::Fullscreen,
        SceneLayer::Ontop,
        SceneLayer::Overlay,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// The container node of every tier
#[derive(Debug, Clone)]
pub struct SceneLayers {
    containers: [NodeId; 9],
}

impl SceneLayers {
    /// Create the tier containers under the scene root, in order
    pub fn create<S: SceneGraph + ?Sized>(scene: &mut S) -> Result<Self, SceneError> {
        let root = scene.root();
        let mut containers = [root; 9];
        for layer in SceneLayer::ALL {
            containers[layer.index()] = scene.create_node(root)?;
        }
        Ok(Self { containers })
    }

    pub fn container(&self, layer: SceneLayer) -> NodeId {
        self.containers[layer.index()]
    }

    /// Reverse lookup of a container node
    pub fn layer_of(&self, container: NodeId) -> Option<SceneLayer> {
        SceneLayer::ALL
            .into_iter()
            .find(|&layer| self.container(layer) == container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneTree;

    #[test]
    fn test_containers_are_ordered_under_root() {
        let mut tree = SceneTree::new();
        let layers = SceneLayers::create(&mut tree).unwrap();
        let expected: Vec<NodeId> = SceneLayer::ALL
            .iter()
            .map(|&layer| layers.container(layer))
            .collect();
        assert_eq!(tree.children(tree.root()), expected.as_slice());
        assert_eq!(
            layers.layer_of(layers.container(SceneLayer::Fullscreen)),
            Some(SceneLayer::Fullscreen)
        );
    }
}
