// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change feed for renderers.
//!
//! The store records changes on two dirty channels as they happen:
//!
//! 1. **STATE**: any imagery whose state changed. Local only.
//! 2. **APPEARANCE**: any imagery that became `Ready` or swapped a texture.
//!    Marks propagate eagerly to every live descendant, since a loading child
//!    is drawn with its closest ready ancestor.
//!
//! [`ImageryStore::take_changes`] drains both channels and moves the pending
//! created/destroyed lists out. Drained indices whose slot has since been
//! freed are skipped, so every handle in the `state` and `appearance` lists
//! is live at the time of the call.

use alloc::vec::Vec;

use super::id::ImageryId;
use super::store::ImageryStore;
use crate::dirty;

/// Changes accumulated since the previous [`ImageryStore::take_changes`].
#[derive(Clone, Debug, Default)]
pub struct ImageryChanges {
    /// Imagery whose state changed.
    pub state: Vec<ImageryId>,
    /// Imagery whose drawn texture (its own or an ancestor's) may differ.
    pub appearance: Vec<ImageryId>,
    /// Imagery constructed.
    pub created: Vec<ImageryId>,
    /// Imagery destroyed. These handles are already stale.
    pub destroyed: Vec<ImageryId>,
}

impl ImageryChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.state.clear();
        self.appearance.clear();
        self.created.clear();
        self.destroyed.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
            && self.appearance.is_empty()
            && self.created.is_empty()
            && self.destroyed.is_empty()
    }
}

impl ImageryStore {
    /// Returns the changes recorded since the last call.
    pub fn take_changes(&mut self) -> ImageryChanges {
        let mut changes = ImageryChanges::default();
        self.take_changes_into(&mut changes);
        changes
    }

    /// Like [`take_changes`](Self::take_changes), but reuses a caller-provided
    /// buffer.
    pub fn take_changes_into(&mut self, changes: &mut ImageryChanges) {
        changes.clear();

        let state: Vec<u32> = self
            .dirty
            .drain(dirty::STATE)
            .deterministic()
            .run()
            .collect();
        changes.state.extend(self.live_handles(&state));

        let appearance: Vec<u32> = self
            .dirty
            .drain(dirty::APPEARANCE)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.appearance.extend(self.live_handles(&appearance));

        core::mem::swap(&mut self.pending_created, &mut changes.created);
        core::mem::swap(&mut self.pending_destroyed, &mut changes.destroyed);
    }

    fn live_handles<'a>(&'a self, indices: &'a [u32]) -> impl Iterator<Item = ImageryId> + 'a {
        indices.iter().filter_map(|&idx| {
            self.slots
                .get(idx as usize)
                .is_some_and(Option::is_some)
                .then(|| ImageryId {
                    idx,
                    generation: self.generation[idx as usize],
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::imagery::ImageryState;
    use crate::resource::TextureKey;
    use crate::testing::RecordingLoader;
    use crate::tiling::TileKey;

    #[test]
    fn created_and_destroyed_are_reported_once() {
        let mut store = ImageryStore::new();
        let mut loader = RecordingLoader::default();
        let child = store.get_from_cache(TileKey::new(1, 0, 1), None);
        let root = store.parent(child).unwrap();

        let changes = store.take_changes();
        assert_eq!(changes.created, vec![root, child]);
        assert!(changes.destroyed.is_empty());

        store.release_reference(child, &mut loader);
        let changes = store.take_changes();
        assert!(changes.created.is_empty());
        assert_eq!(changes.destroyed, vec![root, child]);

        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn state_changes_are_local() {
        let mut store = ImageryStore::new();
        let child = store.get_from_cache(TileKey::new(1, 0, 1), None);
        let root = store.parent(child).unwrap();
        let _ = store.take_changes();

        store.set_state(root, ImageryState::Transitioning);
        let changes = store.take_changes();
        assert_eq!(changes.state, vec![root]);
        assert!(changes.appearance.is_empty());
    }

    #[test]
    fn ready_parent_marks_descendants_appearance() {
        let mut store = ImageryStore::new();
        let child = store.get_from_cache(TileKey::new(3, 0, 2), None);
        let parent = store.parent(child).unwrap();
        let root = store.parent(parent).unwrap();
        let _ = store.take_changes();

        store.set_state(parent, ImageryState::Ready);
        let changes = store.take_changes();
        assert!(changes.appearance.contains(&parent));
        assert!(changes.appearance.contains(&child));
        assert!(!changes.appearance.contains(&root));
    }

    #[test]
    fn texture_swap_marks_appearance() {
        let mut store = ImageryStore::new();
        let id = store.get_from_cache(TileKey::new(0, 0, 0), None);
        let _ = store.take_changes();

        let before = store.get(id).snapshot();
        store.get_mut(id).texture = Some(TextureKey(4));
        store.note_changes(id, before);

        let changes = store.take_changes();
        assert!(changes.state.is_empty());
        assert_eq!(changes.appearance, vec![id]);
    }

    #[test]
    fn destroyed_imagery_is_filtered_from_channels() {
        let mut store = ImageryStore::new();
        let mut loader = RecordingLoader::default();
        let id = store.get_from_cache(TileKey::new(0, 0, 0), None);
        store.set_state(id, ImageryState::Ready);
        store.release_reference(id, &mut loader);

        let changes = store.take_changes();
        assert!(changes.state.is_empty());
        assert!(changes.appearance.is_empty());
        assert_eq!(changes.destroyed, vec![id]);
    }
}
