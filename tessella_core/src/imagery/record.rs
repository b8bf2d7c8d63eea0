// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-tile imagery record.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;

use super::id::ImageryId;
use super::state::ImageryState;
use crate::resource::{Credit, DecodedImage, TextureKey};
use crate::tiling::TileKey;

/// Imagery for one (x, y, level) tile of a layer.
///
/// Identity (`key`, `parent`, `reference_count`) is managed by the
/// [`ImageryStore`](super::ImageryStore) and exposed read-only. `state` and the
/// payload slots are public so that collaborators can write their results
/// directly, either synchronously inside a delegation call or later through a
/// [`Completion`](crate::completion::Completion).
#[derive(Debug)]
pub struct TileImagery {
    key: TileKey,
    parent: Option<ImageryId>,
    reference_count: u32,

    /// Current lifecycle state.
    pub state: ImageryState,
    /// Extent of the tile, once known.
    pub rectangle: Option<Rect>,

    // -- Single-source payload --
    /// Where the raw image was fetched from.
    pub image_url: Option<String>,
    /// Decoded image awaiting upload.
    pub image: Option<DecodedImage>,
    /// Texture in geographic projection.
    pub texture: Option<TextureKey>,
    /// Texture in Web Mercator projection. May alias `texture`.
    pub texture_web_mercator: Option<TextureKey>,
    /// Attribution attached by the fetch.
    pub credits: Option<Vec<Credit>>,

    // -- Multi-source payload (index-aligned) --
    /// Extent of each contributing source tile.
    pub projected_rectangles: Vec<Rect>,
    /// Decoded image of each contributing source tile.
    pub projected_images: Vec<Option<DecodedImage>>,
    /// Texture of each contributing source tile.
    pub projected_textures: Vec<Option<TextureKey>>,
}

/// The fields whose change the store reports after a collaborator call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) state: ImageryState,
    pub(crate) texture: Option<TextureKey>,
    pub(crate) texture_web_mercator: Option<TextureKey>,
}

impl TileImagery {
    pub(crate) fn new(key: TileKey, parent: Option<ImageryId>, rectangle: Option<Rect>) -> Self {
        Self {
            key,
            parent,
            reference_count: 0,
            state: ImageryState::Unloaded,
            rectangle,
            image_url: None,
            image: None,
            texture: None,
            texture_web_mercator: None,
            credits: None,
            projected_rectangles: Vec::new(),
            projected_images: Vec::new(),
            projected_textures: Vec::new(),
        }
    }

    /// Returns the tile address.
    #[inline]
    #[must_use]
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Returns the tile column.
    #[inline]
    #[must_use]
    pub fn x(&self) -> u32 {
        self.key.x
    }

    /// Returns the tile row.
    #[inline]
    #[must_use]
    pub fn y(&self) -> u32 {
        self.key.y
    }

    /// Returns the tile level.
    #[inline]
    #[must_use]
    pub fn level(&self) -> u32 {
        self.key.level
    }

    /// Returns the imagery one level up, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ImageryId> {
        self.parent
    }

    /// Returns the number of active owners.
    #[inline]
    #[must_use]
    pub fn reference_count(&self) -> u32 {
        self.reference_count
    }

    /// Number of contributing source tiles (0 for single-source imagery).
    #[inline]
    #[must_use]
    pub fn projected_len(&self) -> usize {
        self.projected_rectangles.len()
    }

    /// Clears and resizes the three multi-source sequences to `len` entries.
    pub(crate) fn reset_projected(&mut self, len: usize) {
        self.projected_rectangles.clear();
        self.projected_rectangles.resize(len, Rect::ZERO);
        self.projected_images.clear();
        self.projected_images.resize(len, None);
        self.projected_textures.clear();
        self.projected_textures.resize(len, None);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            texture: self.texture,
            texture_web_mercator: self.texture_web_mercator,
        }
    }

    pub(crate) fn increment(&mut self) {
        self.reference_count += 1;
    }

    /// Decrements and returns the new count.
    pub(crate) fn decrement(&mut self) -> u32 {
        assert!(
            self.reference_count > 0,
            "reference count underflow for {:?}",
            self.key
        );
        self.reference_count -= 1;
        self.reference_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ImageKey;

    #[test]
    fn new_record_is_unloaded_and_unowned() {
        let record = TileImagery::new(TileKey::new(3, 1, 2), None, None);
        assert_eq!(record.state, ImageryState::Unloaded);
        assert_eq!(record.reference_count(), 0);
        assert_eq!((record.x(), record.y(), record.level()), (3, 1, 2));
        assert_eq!(record.projected_len(), 0);
    }

    #[test]
    fn reset_projected_keeps_sequences_aligned() {
        let mut record = TileImagery::new(TileKey::new(0, 0, 0), None, None);
        record.reset_projected(2);
        record.projected_images[1] = Some(DecodedImage::plain(ImageKey(1), 4, 4));
        record.reset_projected(3);
        assert_eq!(record.projected_rectangles.len(), 3);
        assert_eq!(record.projected_images.len(), 3);
        assert_eq!(record.projected_textures.len(), 3);
        assert!(record.projected_images.iter().all(Option::is_none));
    }

    #[test]
    #[should_panic(expected = "reference count underflow")]
    fn decrement_below_zero_panics() {
        let mut record = TileImagery::new(TileKey::new(0, 0, 0), None, None);
        let _ = record.decrement();
    }
}
