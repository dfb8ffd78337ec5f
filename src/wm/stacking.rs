//! Stacking Module
//!
//! Turns the Stack Array into scene-graph order. Work is coalesced: setters
//! only mark the engine dirty and the run loop calls `refresh` once per
//! turn. A refresh plans the whole arrangement first, then applies only the
//! reparent/reorder/enable calls that differ from the current tree.

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;
use tracing::{debug, error, warn};

use crate::scene::{NodeId, SceneError, SceneGraph, SceneLayer, SceneLayers};
use crate::wm::client::{Client, ClientId};
use crate::wm::client_flags::WindowLayer;
use crate::wm::decor::{DecorId, DecorSurface};
use crate::wm::layer::classify;
use crate::wm::stack::StackArray;
use crate::wm::transients;

/// Read-only view of everything a refresh pass looks at
#[derive(Debug, Clone, Copy)]
pub struct StackingView<'a> {
    pub clients: &'a SlotMap<ClientId, Client>,
    pub stack: &'a StackArray,
    pub decors: &'a SlotMap<DecorId, DecorSurface>,
    /// Bottom to top
    pub decor_order: &'a [DecorId],
    pub focused: Option<ClientId>,
    pub current_desktop: u32,
}

/// Target position of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    node: NodeId,
    container: NodeId,
    enabled: bool,
}

/// How to put a node back where it was
#[derive(Debug, Clone, Copy)]
enum Undo {
    Position {
        node: NodeId,
        parent: NodeId,
        below: Option<NodeId>,
        above: Option<NodeId>,
    },
    Enabled {
        node: NodeId,
        was: bool,
    },
}

/// Failed passes in a row before the engine stops retrying on its own
const MAX_FAILED_PASSES: u32 = 3;

/// Stacking manager
#[derive(Debug)]
pub struct StackingEngine {
    layers: SceneLayers,
    dirty: bool,
    failed_passes: u32,
}

impl StackingEngine {
    pub fn new(layers: SceneLayers) -> Self {
        Self {
            layers,
            dirty: false,
            failed_passes: 0,
        }
    }

    pub fn layers(&self) -> &SceneLayers {
        &self.layers
    }

    /// Schedule a pass without doing any work
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.failed_passes = 0;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply the current order to the scene if anything changed.
    ///
    /// Returns the number of scene mutations issued. On failure the tree is
    /// rolled back to the arrangement it had before the pass and the engine
    /// stays dirty, so the next call tries again. After `MAX_FAILED_PASSES`
    /// failures in a row it waits for the next `mark_dirty`.
    pub fn refresh<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        view: StackingView<'_>,
    ) -> Result<usize, SceneError> {
        if !self.dirty {
            return Ok(0);
        }
        self.dirty = false;

        match self.pass(scene, view) {
            Ok(calls) => {
                self.failed_passes = 0;
                Ok(calls)
            }
            Err(err) => {
                self.failed_passes += 1;
                if self.failed_passes < MAX_FAILED_PASSES {
                    self.dirty = true;
                } else {
                    error!(
                        "Stacking: {} passes failed in a row, waiting for the next change",
                        self.failed_passes
                    );
                }
                Err(err)
            }
        }
    }

    fn pass<S: SceneGraph + ?Sized>(
        &self,
        scene: &mut S,
        view: StackingView<'_>,
    ) -> Result<usize, SceneError> {
        let plan = self.plan(view);
        for placement in &plan {
            for node in [placement.node, placement.container] {
                if !scene.contains(node) {
                    warn!("Stacking: scene node {:?} vanished, skipping pass", node);
                    return Err(SceneError::UnknownNode(node));
                }
            }
        }

        let mut journal = Vec::new();
        match apply(scene, &plan, &mut journal) {
            Ok(()) => {
                debug!(
                    "Stacking: placed {} nodes with {} scene calls",
                    plan.len(),
                    journal.len()
                );
                Ok(journal.len())
            }
            Err(err) => {
                warn!(
                    "Stacking: scene call failed ({}), rolling back {} calls",
                    err,
                    journal.len()
                );
                rollback(scene, journal);
                Err(err)
            }
        }
    }

    /// Target arrangement, in placement order
    fn plan(&self, view: StackingView<'_>) -> Vec<Placement> {
        let mut plan = Vec::with_capacity(view.stack.len() + view.decor_order.len());
        let mut placed = HashSet::new();

        for id in view.stack.iter() {
            let Some(client) = view.clients.get(id) else {
                continue;
            };
            let layer = classify(client, view.focused);
            if layer == WindowLayer::Ignore {
                // Placed together with its ancestor
                continue;
            }
            let container = self.client_container(layer);
            self.place_group(view, id, container, &mut placed, &mut plan);
        }

        // Anything not reached through a living ancestor degrades to Normal
        for id in view.stack.iter() {
            if !placed.contains(&id) && view.clients.contains_key(id) {
                warn!("Stacking: client {:?} unreachable from its ancestors, using normal layer", id);
                let container = self.layers.container(SceneLayer::Normal);
                self.place_group(view, id, container, &mut placed, &mut plan);
            }
        }

        for &decor_id in view.decor_order {
            if let Some(decor) = view.decors.get(decor_id) {
                plan.push(Placement {
                    node: decor.node,
                    container: self.layers.container(decor.layer()),
                    enabled: decor.visible,
                });
            }
        }

        plan
    }

    /// Place `id`, then its layerless transients directly above it, depth
    /// first, in Stack Array order
    fn place_group(
        &self,
        view: StackingView<'_>,
        id: ClientId,
        container: NodeId,
        placed: &mut HashSet<ClientId>,
        plan: &mut Vec<Placement>,
    ) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !placed.insert(current) {
                continue;
            }
            let Some(client) = view.clients.get(current) else {
                continue;
            };
            plan.push(Placement {
                node: client.node,
                container,
                enabled: client.is_visible_on(view.current_desktop),
            });
            let children = transients::children(view.clients, view.stack, current);
            // Reverse so the bottom-most child is popped first
            for child in children.into_iter().rev() {
                let stacked_with_parent = view
                    .clients
                    .get(child)
                    .is_some_and(|c| classify(c, view.focused) == WindowLayer::Ignore);
                if stacked_with_parent {
                    pending.push(child);
                }
            }
        }
    }

    fn client_container(&self, layer: WindowLayer) -> NodeId {
        let scene_layer = layer.scene_layer().unwrap_or(SceneLayer::Normal);
        self.layers.container(scene_layer)
    }
}

/// Issue only the calls that differ from the current tree
fn apply<S: SceneGraph + ?Sized>(
    scene: &mut S,
    plan: &[Placement],
    journal: &mut Vec<Undo>,
) -> Result<(), SceneError> {
    let mut last_in: HashMap<NodeId, NodeId> = HashMap::new();

    for placement in plan {
        let node = placement.node;

        if scene.parent(node) != Some(placement.container) {
            let undo = position_of(scene, node)?;
            scene.reparent(node, placement.container)?;
            journal.push(undo);
        }

        if let Some(&previous) = last_in.get(&placement.container) {
            if scene.node_below(node) != Some(previous) {
                let undo = position_of(scene, node)?;
                scene.place_above(node, previous)?;
                journal.push(undo);
            }
        }
        last_in.insert(placement.container, node);

        let was = scene
            .is_enabled(node)
            .ok_or(SceneError::UnknownNode(node))?;
        if was != placement.enabled {
            scene.set_enabled(node, placement.enabled)?;
            journal.push(Undo::Enabled { node, was });
        }
    }

    Ok(())
}

fn position_of<S: SceneGraph + ?Sized>(scene: &S, node: NodeId) -> Result<Undo, SceneError> {
    let parent = scene.parent(node).ok_or(SceneError::UnknownNode(node))?;
    Ok(Undo::Position {
        node,
        parent,
        below: scene.node_below(node),
        above: scene.node_above(node),
    })
}

fn rollback<S: SceneGraph + ?Sized>(scene: &mut S, journal: Vec<Undo>) {
    for undo in journal.into_iter().rev() {
        let result = match undo {
            Undo::Position {
                node,
                parent,
                below,
                above,
            } => restore_position(scene, node, parent, below, above),
            Undo::Enabled { node, was } => scene.set_enabled(node, was),
        };
        if let Err(err) = result {
            error!("Stacking: rollback step failed: {}", err);
        }
    }
}

fn restore_position<S: SceneGraph + ?Sized>(
    scene: &mut S,
    node: NodeId,
    parent: NodeId,
    below: Option<NodeId>,
    above: Option<NodeId>,
) -> Result<(), SceneError> {
    if scene.parent(node) != Some(parent) {
        scene.reparent(node, parent)?;
    }
    match (below, above) {
        (Some(below), _) => scene.place_above(node, below),
        (None, Some(above)) => scene.place_below(node, above),
        (None, None) => Ok(()),
    }
}
