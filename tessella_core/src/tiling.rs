// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile addressing, tiling-scheme contracts, and source-mode selection.
//!
//! Geometry is owned by the caller: this module only defines the contracts the
//! imagery state machine consumes. Rectangles are [`kurbo::Rect`] values in the
//! scheme's own units (typically radians, `x` = longitude, `y` = latitude).

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

/// Address of a tile in a layer's native tiling scheme.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TileKey {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Level of detail; 0 is the coarsest.
    pub level: u32,
}

impl TileKey {
    /// Creates a tile key.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    /// Returns the key of the tile one level up that covers this one, or
    /// `None` at level 0.
    #[inline]
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        if self.level == 0 {
            None
        } else {
            Some(Self {
                x: self.x >> 1,
                y: self.y >> 1,
                level: self.level - 1,
            })
        }
    }
}

impl fmt::Debug for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileKey({}, {} @L{})", self.x, self.y, self.level)
    }
}

/// Maps tile addresses to geographic extents.
pub trait TilingScheme {
    /// Returns the extent covered by `key`.
    fn tile_to_rectangle(&self, key: TileKey) -> Rect;

    /// Returns the projected view of this scheme when each native tile has to
    /// be assembled from tiles of another projection.
    ///
    /// The default is `None`: every native tile maps to exactly one source tile.
    fn as_projected(&self) -> Option<&dyn ProjectedTilingScheme> {
        None
    }
}

/// A tiling scheme whose native tiles are composed of source tiles in a
/// different projection.
pub trait ProjectedTilingScheme {
    /// Returns the source tiles that overlap the native tile `key`.
    fn contributing_tiles(&self, key: TileKey) -> ContributingTiles;

    /// Returns the extent of the source tile `(x, y)` at `level`.
    fn contributing_rectangle(&self, x: u32, y: u32, level: u32) -> Rect;
}

/// Source-tile indices packed as interleaved `x, y` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContributingTiles {
    indices: Vec<u32>,
}

impl ContributingTiles {
    /// Wraps a flat `[x0, y0, x1, y1, ...]` list.
    ///
    /// # Panics
    ///
    /// Panics if `indices` has an odd length.
    #[must_use]
    pub fn from_flat(indices: Vec<u32>) -> Self {
        assert!(
            indices.len() % 2 == 0,
            "contributing tile indices must come in x/y pairs (got {} values)",
            indices.len()
        );
        Self { indices }
    }

    /// Builds the flat list from `(x, y)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut indices = Vec::new();
        for (x, y) in pairs {
            indices.push(x);
            indices.push(y);
        }
        Self { indices }
    }

    /// Number of contributing tiles (half the flat length).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len() / 2
    }

    /// Returns `true` if no source tile contributes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the `(x, y)` pair at position `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<(u32, u32)> {
        let x = *self.indices.get(i * 2)?;
        let y = *self.indices.get(i * 2 + 1)?;
        Some((x, y))
    }

    /// Iterates the `(x, y)` pairs in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u32, u32)> + '_ {
        self.indices.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Data-free form of [`SourceMode`], for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// One source tile per native tile.
    Single,
    /// Several source-projection tiles per native tile.
    Multi,
}

/// How a layer's imagery is sourced, chosen from its tiling scheme.
#[derive(Clone, Copy)]
pub enum SourceMode<'a> {
    /// Each native tile's imagery comes from exactly one source tile.
    Single,
    /// Each native tile is assembled from several source tiles.
    Multi(&'a dyn ProjectedTilingScheme),
}

impl<'a> SourceMode<'a> {
    /// Classifies `scheme`. Pure and cheap, so the driver calls it on every
    /// invocation.
    #[must_use]
    pub fn select<S: TilingScheme + ?Sized>(scheme: &'a S) -> Self {
        match scheme.as_projected() {
            Some(projected) => Self::Multi(projected),
            None => Self::Single,
        }
    }

    /// Returns the data-free kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Single => SourceKind::Single,
            Self::Multi(_) => SourceKind::Multi,
        }
    }
}

impl fmt::Debug for SourceMode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceMode::{:?}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::testing::{GeographicScheme, ProjectedScheme};

    #[test]
    fn parent_key_halves_coordinates() {
        assert_eq!(TileKey::new(5, 3, 2).parent(), Some(TileKey::new(2, 1, 1)));
        assert_eq!(TileKey::new(1, 1, 1).parent(), Some(TileKey::new(0, 0, 0)));
        assert_eq!(TileKey::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn contributing_tiles_pairs() {
        let tiles = ContributingTiles::from_flat(vec![4, 7, 5, 7, 4, 8]);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles.get(1), Some((5, 7)));
        assert_eq!(tiles.get(3), None);
        let pairs: Vec<_> = tiles.iter().collect();
        assert_eq!(pairs, vec![(4, 7), (5, 7), (4, 8)]);
        assert_eq!(ContributingTiles::from_pairs(pairs), tiles);
    }

    #[test]
    #[should_panic(expected = "x/y pairs")]
    fn odd_flat_list_panics() {
        let _ = ContributingTiles::from_flat(vec![1, 2, 3]);
    }

    #[test]
    fn selector_follows_scheme() {
        let geographic = GeographicScheme;
        assert_eq!(SourceMode::select(&geographic).kind(), SourceKind::Single);

        let projected = ProjectedScheme::default();
        assert_eq!(SourceMode::select(&projected).kind(), SourceKind::Multi);
    }
}
