//! Ordered item collection with address lookup.

use roster_core::RosterItem;
use roster_types::Address;
use std::collections::HashMap;

/// Items in insertion order, indexed by address.
#[derive(Debug, Clone)]
pub struct ItemList<T> {
    items: Vec<T>,
    positions: HashMap<Address, usize>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: RosterItem> ItemList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Returns its index, or `None` if the address is taken.
    pub fn push(&mut self, item: T) -> Option<usize> {
        if self.positions.contains_key(item.address()) {
            return None;
        }
        let index = self.items.len();
        self.positions.insert(item.address().clone(), index);
        self.items.push(item);
        Some(index)
    }

    /// Remove the item with `address`, returning its former index.
    pub fn remove(&mut self, address: &Address) -> Option<(usize, T)> {
        let index = self.positions.remove(address)?;
        let item = self.items.remove(index);
        for later in &self.items[index..] {
            if let Some(pos) = self.positions.get_mut(later.address()) {
                *pos -= 1;
            }
        }
        Some((index, item))
    }

    /// Index of the item with `address`.
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.positions.get(address).copied()
    }

    /// Item with `address` and its index.
    pub fn get(&self, address: &Address) -> Option<(usize, &T)> {
        let index = self.position(address)?;
        Some((index, &self.items[index]))
    }

    /// Mutable item with `address` and its index.
    pub fn get_mut(&mut self, address: &Address) -> Option<(usize, &mut T)> {
        let index = self.position(address)?;
        Some((index, &mut self.items[index]))
    }

    /// Item at `index`.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Items in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }
}
