//! Identity registry: identifier minting, entity kinds and containment edges.
//!
//! Edges are directed `parent -> child` and counted with multiplicity, so a
//! layer listed twice in one collection holds two edges to that collection.

use crate::domain::{EntityKind, ReflError, ReflResult};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    entries: BTreeMap<String, EntityKind>,
    children: BTreeMap<String, Vec<String>>,
    parents: BTreeMap<String, Vec<String>>,
    reserved: BTreeSet<String>,
    counter: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.entries.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = (&str, EntityKind)> {
        self.entries.iter().map(|(id, kind)| (id.as_str(), *kind))
    }

    /// Returns an identifier `{prefix}_{n}` neither registered nor reserved.
    /// The counter only moves forward, so two calls never hand out the same
    /// name even if neither is registered in between.
    pub fn generate_unique_name(&mut self, kind: EntityKind) -> String {
        loop {
            let candidate = format!("{}_{}", kind.as_str(), self.counter);
            self.counter += 1;
            if !self.entries.contains_key(&candidate) && !self.reserved.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Keeps `ids` out of generated names until [`Self::release_reservations`].
    /// Reserved ids can still be registered explicitly.
    pub(crate) fn reserve(&mut self, ids: impl IntoIterator<Item = String>) {
        self.reserved.extend(ids);
    }

    pub(crate) fn release_reservations(&mut self) {
        self.reserved.clear();
    }

    pub fn register(&mut self, id: &str, kind: EntityKind) -> ReflResult<()> {
        if let Some(existing) = self.entries.get(id) {
            return Err(ReflError::validation(
                "VALIDATION.IDENTIFIER_COLLISION",
                format!("identifier '{}' is already registered as {}", id, existing),
            ));
        }
        trace!(id, kind = kind.as_str(), "identifier registered");
        self.entries.insert(id.to_string(), kind);
        Ok(())
    }

    pub(crate) fn mint(&mut self, kind: EntityKind) -> String {
        let id = self.generate_unique_name(kind);
        self.entries.insert(id.clone(), kind);
        trace!(id = id.as_str(), kind = kind.as_str(), "identifier minted");
        id
    }

    /// Drops the entry and every edge touching it.
    pub fn deregister(&mut self, id: &str) -> Option<EntityKind> {
        let kind = self.entries.remove(id)?;
        if let Some(children) = self.children.remove(id) {
            for child in children {
                remove_one(&mut self.parents, &child, id);
            }
        }
        if let Some(parents) = self.parents.remove(id) {
            for parent in parents {
                remove_all(&mut self.children, &parent, id);
            }
        }
        trace!(id, "identifier deregistered");
        Some(kind)
    }

    pub fn link(&mut self, parent: &str, child: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
        self.parents
            .entry(child.to_string())
            .or_default()
            .push(parent.to_string());
    }

    /// Removes a single `parent -> child` edge.
    pub fn unlink(&mut self, parent: &str, child: &str) -> bool {
        let removed = remove_one(&mut self.children, parent, child);
        if removed {
            remove_one(&mut self.parents, child, parent);
        }
        removed
    }

    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_parents(&self, id: &str) -> bool {
        !self.parents_of(id).is_empty()
    }

    /// Breadth-first containment path `from ..= to`; empty when `to` is not
    /// reachable from `from`.
    pub fn find_path(&self, from: &str, to: &str) -> Vec<String> {
        if !self.contains(from) || !self.contains(to) {
            return Vec::new();
        }
        if from == to {
            return vec![from.to_string()];
        }

        let mut previous: BTreeMap<&str, &str> = BTreeMap::new();
        let mut visited: BTreeSet<&str> = BTreeSet::from([from]);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(current) {
                if !visited.insert(child.as_str()) {
                    continue;
                }
                previous.insert(child.as_str(), current);
                if child == to {
                    let mut path = vec![to.to_string()];
                    let mut cursor = to;
                    while let Some(&step) = previous.get(cursor) {
                        path.push(step.to_string());
                        cursor = step;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(child.as_str());
            }
        }
        Vec::new()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.parents.clear();
        self.reserved.clear();
        self.counter = 0;
    }
}

fn remove_one(edges: &mut BTreeMap<String, Vec<String>>, key: &str, value: &str) -> bool {
    let Some(list) = edges.get_mut(key) else {
        return false;
    };
    let Some(position) = list.iter().position(|candidate| candidate == value) else {
        return false;
    };
    list.remove(position);
    if list.is_empty() {
        edges.remove(key);
    }
    true
}

fn remove_all(edges: &mut BTreeMap<String, Vec<String>>, key: &str, value: &str) {
    if let Some(list) = edges.get_mut(key) {
        list.retain(|candidate| candidate != value);
        if list.is_empty() {
            edges.remove(key);
        }
    }
}
