// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot storage with the tile cache and reference-count lifetime management.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use kurbo::Rect;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::ImageryId;
use super::record::{Snapshot, TileImagery};
use super::state::ImageryState;
use crate::dirty;
use crate::resource::{ImageKey, ImageryResources, TextureKey};
use crate::tiling::TileKey;
use crate::trace::{DestroyEvent, ReleaseEvent, Tracer};

/// Storage for every tile imagery of one layer.
///
/// Imagery is addressed by [`ImageryId`] handles. Each imagery occupies a
/// slot; destroyed imagery is recycled via a free list, and generation
/// counters prevent stale handle access. A key index doubles as the layer's
/// tile cache, so that each (x, y, level) has at most one cached imagery.
#[derive(Debug)]
pub struct ImageryStore {
    // -- Records --
    pub(crate) slots: Vec<Option<TileImagery>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    pub(crate) live: usize,

    // -- Cache index --
    pub(crate) cache: BTreeMap<TileKey, u32>,

    // -- Change tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) pending_created: Vec<ImageryId>,
    pub(crate) pending_destroyed: Vec<ImageryId>,
}

impl Default for ImageryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty store with room for `capacity` imagery.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            generation: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
            live: 0,
            cache: BTreeMap::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_created: Vec::new(),
            pending_destroyed: Vec::new(),
        }
    }

    // -- Cache API --

    /// Returns the cached imagery for `key`, constructing it if needed, and
    /// adds one reference to it.
    ///
    /// A new imagery at `level > 0` resolves its parent through the cache
    /// too, which adds one reference to the parent for the child's lifetime.
    pub fn get_from_cache(&mut self, key: TileKey, rectangle: Option<Rect>) -> ImageryId {
        self.get_from_cache_with(key, rectangle, &mut |_| None)
    }

    /// Like [`get_from_cache`](Self::get_from_cache), but computes the
    /// rectangle of any newly constructed imagery (including ancestors) with
    /// `resolve_rectangle` when none is supplied.
    pub fn get_from_cache_with(
        &mut self,
        key: TileKey,
        rectangle: Option<Rect>,
        resolve_rectangle: &mut dyn FnMut(TileKey) -> Option<Rect>,
    ) -> ImageryId {
        let id = match self.cached(key) {
            Some(id) => id,
            None => {
                let parent = key
                    .parent()
                    .map(|parent_key| self.get_from_cache_with(parent_key, None, resolve_rectangle));
                let rectangle = rectangle.or_else(|| resolve_rectangle(key));
                let id = self.allocate(TileImagery::new(key, parent, rectangle));
                self.cache.insert(key, id.idx);
                id
            }
        };
        self.record_mut(id).increment();
        id
    }

    /// Returns the cached imagery for `key` without adding a reference.
    #[must_use]
    pub fn cached(&self, key: TileKey) -> Option<ImageryId> {
        self.cache.get(&key).map(|&idx| ImageryId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Removes `id` from the cache so that future lookups of its key construct
    /// a fresh imagery.
    ///
    /// Returns `false` if the cache entry for the key belongs to another
    /// imagery (or there is none).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove_from_cache(&mut self, id: ImageryId) -> bool {
        self.validate(id);
        self.uncache(id)
    }

    /// Number of cached keys.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    // -- Construction --

    /// Creates an uncached placeholder imagery at (0, 0, 0).
    ///
    /// Placeholders stand in for a layer's imagery before its provider is
    /// ready. The result holds one reference and is in
    /// [`ImageryState::Placeholder`], which the driver never advances; the
    /// caller moves it on with [`set_state`](Self::set_state) or releases it.
    pub fn create_placeholder(&mut self, rectangle: Option<Rect>) -> ImageryId {
        let mut record = TileImagery::new(TileKey::default(), None, rectangle);
        record.increment();
        record.state = ImageryState::Placeholder;
        self.allocate(record)
    }

    // -- Reference counting --

    /// Adds one reference.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn add_reference(&mut self, id: ImageryId) {
        self.record_mut(id).increment();
    }

    /// Releases one reference and returns the remaining count.
    ///
    /// At zero the imagery is removed from the cache, its parent reference is
    /// released (which may cascade up the chain), its image, textures, and any
    /// multi-source leftovers are released through `resources`, and its handle
    /// becomes stale. A texture shared by both texture slots is destroyed once.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn release_reference<R: ImageryResources + ?Sized>(
        &mut self,
        id: ImageryId,
        resources: &mut R,
    ) -> u32 {
        self.release_reference_traced(id, resources, &mut Tracer::none())
    }

    /// Like [`release_reference`](Self::release_reference), emitting release
    /// and destroy events.
    pub fn release_reference_traced<R: ImageryResources + ?Sized>(
        &mut self,
        id: ImageryId,
        resources: &mut R,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        let remaining = self.release_one(id, tracer);
        if remaining > 0 {
            return remaining;
        }

        // Collect the chain that reaches zero, then destroy it ancestors-first.
        let mut doomed = vec![id];
        let mut next = self.get(id).parent();
        while let Some(current) = next {
            if self.release_one(current, tracer) > 0 {
                break;
            }
            doomed.push(current);
            next = self.get(current).parent();
        }

        for &current in doomed.iter().rev() {
            self.destroy(current, resources, tracer);
        }
        0
    }

    // -- Queries --

    /// Returns whether the handle refers to a live imagery.
    #[must_use]
    pub fn is_alive(&self, id: ImageryId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    /// Returns the imagery for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn get(&self, id: ImageryId) -> &TileImagery {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_ref()
            .unwrap_or_else(|| unreachable!("validated slot is occupied"))
    }

    /// Returns the imagery for `id` mutably.
    ///
    /// Writes to `state` through this reference are not recorded in the
    /// change feed; use [`set_state`](Self::set_state) for that.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn get_mut(&mut self, id: ImageryId) -> &mut TileImagery {
        self.record_mut(id)
    }

    /// Returns the imagery for `id`, or `None` if the handle is stale.
    #[must_use]
    pub fn try_get(&self, id: ImageryId) -> Option<&TileImagery> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    /// Returns the imagery for `id` mutably, or `None` if the handle is stale.
    #[must_use]
    pub fn try_get_mut(&mut self, id: ImageryId) -> Option<&mut TileImagery> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_mut()
        } else {
            None
        }
    }

    /// Returns the reference count of a live imagery.
    #[must_use]
    pub fn reference_count(&self, id: ImageryId) -> u32 {
        self.get(id).reference_count()
    }

    /// Returns the parent of a live imagery.
    #[must_use]
    pub fn parent(&self, id: ImageryId) -> Option<ImageryId> {
        self.get(id).parent()
    }

    /// Returns the closest imagery in the chain starting at `id` (inclusive)
    /// that is [`Ready`](ImageryState::Ready).
    ///
    /// Renderers draw a tile with this imagery while its own is still loading.
    #[must_use]
    pub fn ready_ancestor(&self, id: ImageryId) -> Option<ImageryId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let record = self.get(candidate);
            if record.state == ImageryState::Ready {
                return Some(candidate);
            }
            current = record.parent();
        }
        None
    }

    /// Number of live imagery.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no imagery is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates live imagery in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageryId, &TileImagery)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref().map(|record| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot count is bounded by the u32 `len` counter"
                )]
                let idx = idx as u32;
                (
                    ImageryId {
                        idx,
                        generation: self.generation[idx as usize],
                    },
                    record,
                )
            })
        })
    }

    // -- Mutation API (records changes) --

    /// Sets the state of an imagery and records the change.
    ///
    /// Returns the previous state.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_state(&mut self, id: ImageryId, state: ImageryState) -> ImageryState {
        let record = self.record_mut(id);
        let before = record.snapshot();
        record.state = state;
        self.note_changes(id, before);
        before.state
    }

    /// Records whatever differs between `before` and the current record.
    pub(crate) fn note_changes(&mut self, id: ImageryId, before: Snapshot) {
        let after = self.get(id).snapshot();
        if after == before {
            return;
        }
        if after.state != before.state {
            self.dirty.mark(id.idx, dirty::STATE);
        }
        let became_ready = after.state == ImageryState::Ready && before.state != ImageryState::Ready;
        let textures_changed = after.texture != before.texture
            || after.texture_web_mercator != before.texture_web_mercator;
        if became_ready || textures_changed {
            self.dirty.mark_with(id.idx, dirty::APPEARANCE, &EagerPolicy);
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: ImageryId) {
        assert!(
            self.is_alive(id),
            "stale ImageryId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn record_mut(&mut self, id: ImageryId) -> &mut TileImagery {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_mut()
            .unwrap_or_else(|| unreachable!("validated slot is occupied"))
    }

    fn allocate(&mut self, record: TileImagery) -> ImageryId {
        let parent = record.parent();
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on destroy.
            self.slots[idx as usize] = Some(record);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.slots.push(Some(record));
            self.generation.push(0);
            idx
        };
        self.live += 1;

        // A child's appearance depends on its parent while it is loading.
        if let Some(parent) = parent {
            let _ = self.dirty.add_dependency(idx, parent.idx, dirty::APPEARANCE);
        }

        let id = ImageryId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.pending_created.push(id);
        id
    }

    fn uncache(&mut self, id: ImageryId) -> bool {
        let key = self.get(id).key();
        if self.cache.get(&key) == Some(&id.idx) {
            self.cache.remove(&key);
            true
        } else {
            false
        }
    }

    /// Drops one reference; at zero, removes the imagery from the cache.
    fn release_one(&mut self, id: ImageryId, tracer: &mut Tracer<'_>) -> u32 {
        let record = self.record_mut(id);
        let remaining = record.decrement();
        let key = record.key();
        tracer.release(&ReleaseEvent {
            imagery: id,
            key,
            remaining,
        });
        if remaining == 0 {
            self.uncache(id);
        }
        remaining
    }

    /// Releases every resource the imagery owns and frees its slot.
    fn destroy<R: ImageryResources + ?Sized>(
        &mut self,
        id: ImageryId,
        resources: &mut R,
        tracer: &mut Tracer<'_>,
    ) {
        let idx = id.idx as usize;
        let Some(record) = self.slots[idx].take() else {
            return;
        };
        let key = record.key();

        let mut disposed: Vec<ImageKey> = Vec::new();
        let mut destroyed: Vec<TextureKey> = Vec::new();

        let images = record
            .image
            .into_iter()
            .chain(record.projected_images.into_iter().flatten());
        for image in images {
            if !disposed.contains(&image.key) && image.release(resources) {
                disposed.push(image.key);
            }
        }

        let textures = record
            .texture
            .into_iter()
            .chain(record.texture_web_mercator)
            .chain(record.projected_textures.into_iter().flatten());
        for texture in textures {
            if !destroyed.contains(&texture) {
                resources.destroy_texture(texture);
                destroyed.push(texture);
            }
        }

        self.dirty.remove_key(id.idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx] += 1;
        self.free_list.push(id.idx);
        self.live -= 1;
        self.pending_destroyed.push(id);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "an imagery owns a handful of resources"
        )]
        let (images_disposed, textures_destroyed) = (disposed.len() as u32, destroyed.len() as u32);
        tracer.destroy(&DestroyEvent {
            imagery: id,
            key,
            images_disposed,
            textures_destroyed,
        });
    }
}
