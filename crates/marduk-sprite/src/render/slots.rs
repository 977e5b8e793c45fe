use std::collections::HashMap;

use crate::error::{RenderError, Result};

use super::TextureId;

/// Slot arena addressed by small integer IDs, with a name index.
///
/// Free IDs are kept sorted in descending order so the smallest free ID is
/// popped from the back. When no ID is free the capacity doubles and the new
/// upper half joins the free list.
///
/// Invariant: every name maps to an occupied slot.
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
    free: Vec<TextureId>,
    names: HashMap<String, TextureId>,
}

impl<T> SlotTable<T> {
    pub fn new(capacity: usize) -> Self {
        let mut table = Self {
            slots: Vec::new(),
            free: Vec::new(),
            names: HashMap::new(),
        };
        table.grow_to(capacity.max(1));
        table
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Stores `value` under `name` in the lowest free slot.
    ///
    /// Fails with `DuplicateKey` if the name is taken; the table is unchanged
    /// and `value` is dropped.
    pub fn insert(&mut self, name: &str, value: T) -> Result<TextureId> {
        if self.names.contains_key(name) {
            return Err(RenderError::DuplicateKey(name.to_string()));
        }

        let id = self.allocate();
        self.slots[id.index()] = Some(value);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Vacates the slot registered under `name` and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let id = self.names.remove(name)?;
        let value = self.slots[id.index()].take();

        // Descending order: the insertion point is after every larger ID.
        match self.free.binary_search_by(|probe| id.cmp(probe)) {
            Ok(_) => debug_assert!(false, "slot {id} was already free"),
            Err(pos) => self.free.insert(pos, id),
        }

        value
    }

    /// Removes every entry and returns the values in ID order. Capacity is kept.
    pub fn drain(&mut self) -> Vec<T> {
        self.names.clear();
        self.free = (0..self.slots.len() as u32).rev().map(TextureId).collect();
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    fn allocate(&mut self) -> TextureId {
        if self.free.is_empty() {
            self.grow_to(self.slots.len() * 2);
        }
        // grow_to always adds at least one free ID.
        self.free.pop().unwrap_or(TextureId(self.slots.len() as u32))
    }

    fn grow_to(&mut self, capacity: usize) {
        let old = self.slots.len();
        if capacity <= old {
            return;
        }
        self.slots.resize_with(capacity, || None);

        // New IDs are all larger than existing free ones; they go in front.
        let mut free: Vec<TextureId> = (old as u32..capacity as u32).rev().map(TextureId).collect();
        free.append(&mut self.free);
        self.free = free;

        if old > 0 {
            log::debug!("texture slot table grown {old} -> {capacity}");
        }
    }
}
