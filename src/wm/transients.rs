//! Transients Module
//!
//! Walks the transient-for relation (child -> ancestor). The relation is
//! kept acyclic by the setter, but every walk is still bounded by the number
//! of clients.

use slotmap::SlotMap;

use crate::wm::client::{Client, ClientId};
use crate::wm::stack::StackArray;

/// Ancestors of `id`, nearest first, skipping handles that no longer resolve
pub fn ancestors(clients: &SlotMap<ClientId, Client>, id: ClientId) -> Vec<ClientId> {
    let mut chain = Vec::new();
    let mut current = clients.get(id).and_then(|c| c.transient_for);
    while let Some(parent) = current {
        if chain.len() >= clients.len() || chain.contains(&parent) || parent == id {
            break;
        }
        let Some(client) = clients.get(parent) else {
            break;
        };
        chain.push(parent);
        current = client.transient_for;
    }
    chain
}

/// Topmost living ancestor of `id`, or `id` itself
pub fn root_ancestor(clients: &SlotMap<ClientId, Client>, id: ClientId) -> ClientId {
    ancestors(clients, id).last().copied().unwrap_or(id)
}

/// Whether making `id` transient for `parent` would close a loop
pub fn would_cycle(clients: &SlotMap<ClientId, Client>, id: ClientId, parent: ClientId) -> bool {
    parent == id || ancestors(clients, parent).contains(&id)
}

/// Direct transients of `parent`, in Stack Array order (bottom to top)
pub fn children(
    clients: &SlotMap<ClientId, Client>,
    stack: &StackArray,
    parent: ClientId,
) -> Vec<ClientId> {
    stack
        .iter()
        .filter(|&id| {
            clients
                .get(id)
                .is_some_and(|c| c.transient_for == Some(parent))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeId;
    use crate::wm::client::ClientKind;

    fn add(clients: &mut SlotMap<ClientId, Client>, parent: Option<ClientId>) -> ClientId {
        clients.insert_with_key(|id| {
            let mut c = Client::new(id, ClientKind::Native { surface: 0 }, NodeId(0), 0);
            c.transient_for = parent;
            c
        })
    }

    #[test]
    fn test_ancestor_chain_and_root() {
        let mut clients = SlotMap::with_key();
        let a = add(&mut clients, None);
        let b = add(&mut clients, Some(a));
        let c = add(&mut clients, Some(b));
        assert_eq!(ancestors(&clients, c), vec![b, a]);
        assert_eq!(root_ancestor(&clients, c), a);
        assert_eq!(root_ancestor(&clients, a), a);
    }

    #[test]
    fn test_cycle_detection() {
        let mut clients = SlotMap::with_key();
        let a = add(&mut clients, None);
        let b = add(&mut clients, Some(a));
        assert!(would_cycle(&clients, a, b));
        assert!(would_cycle(&clients, a, a));
        assert!(!would_cycle(&clients, b, a));
    }

    #[test]
    fn test_children_follow_stack_order() {
        let mut clients = SlotMap::with_key();
        let a = add(&mut clients, None);
        let b = add(&mut clients, Some(a));
        let c = add(&mut clients, Some(a));
        let mut stack = StackArray::new();
        stack.push_top(a);
        stack.push_top(c);
        stack.push_top(b);
        assert_eq!(children(&clients, &stack, a), vec![c, b]);
    }

    #[test]
    fn test_walk_stops_at_dead_handle() {
        let mut clients = SlotMap::with_key();
        let a = add(&mut clients, None);
        let b = add(&mut clients, Some(a));
        clients.remove(a);
        assert!(ancestors(&clients, b).is_empty());
        assert_eq!(root_ancestor(&clients, b), b);
    }
}
