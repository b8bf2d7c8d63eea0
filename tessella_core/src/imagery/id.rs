// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Imagery identity.

use core::fmt;

/// A handle to a tile imagery in an [`ImageryStore`](super::ImageryStore).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after the imagery is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageryId {
    /// Slot index into the store.
    pub(crate) idx: u32,
    /// Generation counter; must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl ImageryId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Reassembles a handle from its raw parts.
    ///
    /// Intended for decoding recorded diagnostics. A handle built this way is
    /// only live if the store still holds that generation in that slot.
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }
}

impl fmt::Debug for ImageryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageryId({}@gen{})", self.idx, self.generation)
    }
}
