//! Independently owned entity collections.
//!
//! Two shapes: [`PointRegistry`] holds at most one entry per tile,
//! [`BoxRegistry`] holds bounding-box entries in insertion order (which
//! fixes the order side effects fire in). Both carry a version counter and
//! a change log that collaborators caching derived state can follow through
//! a [`Subscription`]. The collision engine itself only reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryKind, WorldError};
use crate::geometry::Tile;

/// Stable handle to a bounding-box registry entry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntryId(pub u32);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent<K> {
    Added(K),
    Removed(K),
}

/// Cursor into a registry's change log.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    cursor: usize,
}

/// Version counter plus append-only event log. The log is local state:
/// a mirrored copy starts with an empty log at the same version.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChangeLog<K> {
    version: u64,
    #[serde(skip)]
    events: Vec<RegistryEvent<K>>,
}

impl<K> Default for ChangeLog<K> {
    fn default() -> Self {
        Self {
            version: 0,
            events: Vec::new(),
        }
    }
}

impl<K: Copy> ChangeLog<K> {
    fn record(&mut self, event: RegistryEvent<K>) {
        self.version += 1;
        self.events.push(event);
    }

    fn subscribe(&self) -> Subscription {
        Subscription {
            cursor: self.events.len(),
        }
    }

    fn since(&self, sub: &mut Subscription) -> Vec<RegistryEvent<K>> {
        let start = sub.cursor.min(self.events.len());
        sub.cursor = self.events.len();
        self.events[start..].to_vec()
    }
}

/// Tile-keyed registry, at most one entry per tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRegistry<T> {
    kind: RegistryKind,
    entries: BTreeMap<Tile, T>,
    log: ChangeLog<Tile>,
}

impl<T> PointRegistry<T> {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            log: ChangeLog::default(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn insert(&mut self, tile: Tile, value: T) -> Result<(), WorldError> {
        if self.entries.contains_key(&tile) {
            return Err(WorldError::TileOccupied {
                tile,
                owner: self.kind,
            });
        }
        self.entries.insert(tile, value);
        self.log.record(RegistryEvent::Added(tile));
        Ok(())
    }

    pub fn remove(&mut self, tile: Tile) -> Option<T> {
        let removed = self.entries.remove(&tile);
        if removed.is_some() {
            self.log.record(RegistryEvent::Removed(tile));
        }
        removed
    }

    pub fn get(&self, tile: Tile) -> Option<&T> {
        self.entries.get(&tile)
    }

    pub fn get_mut(&mut self, tile: Tile) -> Option<&mut T> {
        self.entries.get_mut(&tile)
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.entries.contains_key(&tile)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tile, &T)> {
        self.entries.iter().map(|(t, v)| (*t, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.log.version
    }

    /// Start following adds/removes from now on.
    pub fn subscribe(&self) -> Subscription {
        self.log.subscribe()
    }

    /// Adds/removes since the subscription's last poll.
    pub fn changes(&self, sub: &mut Subscription) -> Vec<RegistryEvent<Tile>> {
        self.log.since(sub)
    }
}

/// Insertion-ordered registry of bounding-box entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxRegistry<T> {
    kind: RegistryKind,
    next_id: u32,
    entries: Vec<(EntryId, T)>,
    log: ChangeLog<EntryId>,
}

impl<T> BoxRegistry<T> {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            next_id: 0,
            entries: Vec::new(),
            log: ChangeLog::default(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn insert(&mut self, value: T) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, value));
        self.log.record(RegistryEvent::Added(id));
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Result<T, WorldError> {
        let pos = self
            .entries
            .iter()
            .position(|(e, _)| *e == id)
            .ok_or(WorldError::UnknownEntry {
                registry: self.kind,
                id,
            })?;
        let (_, value) = self.entries.remove(pos);
        self.log.record(RegistryEvent::Removed(id));
        Ok(value)
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.entries.iter().find(|(e, _)| *e == id).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(e, _)| *e == id)
            .map(|(_, v)| v)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (EntryId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    /// Newest first.
    pub fn iter_rev(&self) -> impl Iterator<Item = (EntryId, &T)> {
        self.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.log.version
    }

    pub fn subscribe(&self) -> Subscription {
        self.log.subscribe()
    }

    pub fn changes(&self, sub: &mut Subscription) -> Vec<RegistryEvent<EntryId>> {
        self.log.since(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_registry_rejects_second_entry() {
        let mut reg = PointRegistry::new(RegistryKind::Objects);
        reg.insert(Tile::new(1, 1), "chest").unwrap();
        let err = reg.insert(Tile::new(1, 1), "keg").unwrap_err();
        assert_eq!(
            err,
            WorldError::TileOccupied {
                tile: Tile::new(1, 1),
                owner: RegistryKind::Objects
            }
        );
        assert_eq!(reg.get(Tile::new(1, 1)), Some(&"chest"));
    }

    #[test]
    fn box_registry_keeps_insertion_order_after_removal() {
        let mut reg = BoxRegistry::new(RegistryKind::Buildings);
        let a = reg.insert('a');
        let b = reg.insert('b');
        let c = reg.insert('c');
        reg.remove(b).unwrap();
        let order: Vec<_> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, c]);
        let rev: Vec<_> = reg.iter().rev().map(|(_, v)| *v).collect();
        assert_eq!(rev, vec!['c', 'a']);
    }

    #[test]
    fn removing_unknown_entry_errors() {
        let mut reg: BoxRegistry<u8> = BoxRegistry::new(RegistryKind::Furnishings);
        assert!(matches!(
            reg.remove(EntryId(9)),
            Err(WorldError::UnknownEntry { .. })
        ));
    }

    #[test]
    fn subscriptions_see_only_later_changes() {
        let mut reg = BoxRegistry::new(RegistryKind::Furnishings);
        let early = reg.insert(1u8);
        let mut sub = reg.subscribe();
        let late = reg.insert(2u8);
        reg.remove(early).unwrap();

        assert_eq!(
            reg.changes(&mut sub),
            vec![RegistryEvent::Added(late), RegistryEvent::Removed(early)]
        );
        assert!(reg.changes(&mut sub).is_empty());
        assert_eq!(reg.version(), 3);
    }
}
