//! Reference-counted tag index.
//!
//! A tag is present iff at least one item carries it. Presence order is the
//! order in which tags first appeared, which is what a tag list displays.

use std::collections::HashMap;

/// A presence transition of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagChange {
    /// Count went from 0 to 1.
    Appeared(String),
    /// Count went from 1 to 0.
    Disappeared(String),
}

/// Tag to reference count, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl TagIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more carrier of `tag`.
    pub fn add(&mut self, tag: &str) -> Option<TagChange> {
        let count = self.counts.entry(tag.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.order.push(tag.to_string());
            Some(TagChange::Appeared(tag.to_string()))
        } else {
            None
        }
    }

    /// Count one less carrier of `tag`.
    ///
    /// Removing a tag the index does not hold changes nothing.
    pub fn remove(&mut self, tag: &str) -> Option<TagChange> {
        let count = self.counts.get_mut(tag)?;
        *count -= 1;
        if *count > 0 {
            return None;
        }

        self.counts.remove(tag);
        self.order.retain(|t| t != tag);
        Some(TagChange::Disappeared(tag.to_string()))
    }

    /// Carriers of `tag`, zero when absent.
    pub fn count(&self, tag: &str) -> usize {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// Check if `tag` is present.
    pub fn contains(&self, tag: &str) -> bool {
        self.counts.contains_key(tag)
    }

    /// Tags with their counts, in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.order
            .iter()
            .map(move |tag| (tag.as_str(), self.count(tag)))
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no tag is present.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
