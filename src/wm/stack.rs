//! Stack Array
//!
//! The single bottom-to-top order of managed clients. Relative order inside
//! a layer comes only from here; every insertion removes any previous
//! occurrence first.

use crate::wm::client::ClientId;

#[derive(Debug, Default, Clone)]
pub struct StackArray {
    /// Bottom to top
    order: Vec<ClientId>,
}

impl StackArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `id` above everything else
    pub fn push_top(&mut self, id: ClientId) {
        self.remove(id);
        self.order.push(id);
    }

    /// Put `id` below everything else
    pub fn push_bottom(&mut self, id: ClientId) {
        self.remove(id);
        self.order.insert(0, id);
    }

    /// Returns whether `id` was present
    pub fn remove(&mut self, id: ClientId) -> bool {
        let before = self.order.len();
        self.order.retain(|&c| c != id);
        self.order.len() != before
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.order.contains(&id)
    }

    pub fn is_top(&self, id: ClientId) -> bool {
        self.order.last() == Some(&id)
    }

    pub fn is_bottom(&self, id: ClientId) -> bool {
        self.order.first() == Some(&id)
    }

    /// Bottom to top
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ClientId> + '_ {
        self.order.iter().copied()
    }

    pub fn as_slice(&self) -> &[ClientId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
