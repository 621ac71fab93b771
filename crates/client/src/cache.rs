//! The object cache: every object the server has shown us.
//!
//! Keyed by the structural ObjectId, one entry per previously-seen object.
//! An entry is created the moment its id first appears in an enumeration,
//! carrying only the kinematic snapshot; template id and compiled mesh are
//! filled in once the resolver has done its two-step lookup. Entries are
//! never created twice and never removed unless the opt-in eviction limit
//! is configured.

use std::collections::{HashMap, HashSet};

use orrery_protocol::{ObjectId, StateVariable, TemplateId};
use tracing::debug;

use crate::mesh::Mesh;

/// The local record of one previously-seen object.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Which template the object was spawned from; set once resolved.
    pub template_id: Option<TemplateId>,
    /// Snapshot from the most recent enumeration that included the object.
    pub state: StateVariable,
    /// Compiled renderable; present once template resolution succeeded.
    pub mesh: Option<Mesh>,
    /// Consecutive enumerations the object was absent from.
    missed_cycles: u32,
}

impl CacheEntry {
    /// A fresh, unresolved entry as created on first sighting.
    pub fn sighted(state: StateVariable) -> Self {
        Self {
            template_id: None,
            state,
            mesh: None,
            missed_cycles: 0,
        }
    }

    /// True once template id and mesh are both in place.
    pub fn is_resolved(&self) -> bool {
        self.template_id.is_some() && self.mesh.is_some()
    }
}

/// Mapping from object identifier to locally-known entity state.
#[derive(Debug, Default)]
pub struct ObjectCache {
    entries: HashMap<ObjectId, CacheEntry>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Creates the entry for a newly-sighted object. Existing entries are
    /// never replaced; the session checks [`ObjectCache::contains`] first.
    pub fn insert_sighted(&mut self, id: ObjectId, state: StateVariable) {
        debug!(object = %id, "object sighted");
        self.entries.entry(id).or_insert_with(|| CacheEntry::sighted(state));
    }

    /// Records the template an object was spawned from.
    pub fn set_template_id(&mut self, id: &ObjectId, template_id: TemplateId) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.template_id = Some(template_id);
        }
    }

    /// Attaches the compiled renderable, completing resolution.
    pub fn set_mesh(&mut self, id: &ObjectId, mesh: Mesh) {
        if let Some(entry) = self.entries.get_mut(id) {
            debug!(object = %id, triangles = mesh.triangle_count(), "mesh compiled");
            entry.mesh = Some(mesh);
        }
    }

    /// Overwrites the kinematic snapshot of a known object. Orientation is
    /// stored verbatim.
    pub fn update_state(&mut self, id: &ObjectId, state: StateVariable) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.state = state;
        }
    }

    /// Closes one enumeration cycle: resets the miss counter of every
    /// sighted entry, bumps the rest, and removes entries that have been
    /// missing `evict_after` consecutive times when a limit is set.
    ///
    /// Returns the evicted ids.
    pub fn finish_cycle(
        &mut self,
        seen: &HashSet<ObjectId>,
        evict_after: Option<u32>,
    ) -> Vec<ObjectId> {
        for (id, entry) in self.entries.iter_mut() {
            if seen.contains(id) {
                entry.missed_cycles = 0;
            } else {
                entry.missed_cycles += 1;
            }
        }

        let Some(limit) = evict_after else {
            return Vec::new();
        };

        let evicted: Vec<ObjectId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.missed_cycles >= limit)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &evicted {
            self.entries.remove(id);
            debug!(object = %id, "object evicted after repeated absence");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &CacheEntry)> {
        self.entries.iter()
    }
}
