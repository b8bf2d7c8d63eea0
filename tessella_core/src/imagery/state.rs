// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Imagery lifecycle states.

/// Where a tile imagery is in its load pipeline.
///
/// The normal progression is
/// `Unloaded → Transitioning → Received → Transitioning → TextureLoaded →
/// Transitioning → Ready`. `Transitioning` marks work handed to a
/// collaborator and is what keeps the per-frame driver from issuing the same
/// request twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageryState {
    /// Nothing requested yet.
    #[default]
    Unloaded,
    /// A collaborator owns the next step.
    Transitioning,
    /// Raw image data arrived and is waiting for texture creation.
    Received,
    /// Texture created, waiting for reprojection.
    TextureLoaded,
    /// Renderable.
    Ready,
    /// Stand-in used before the provider is ready; never driven.
    Placeholder,
    /// No source tile contributes to this tile. Terminal.
    Empty,
    /// The provider reported the tile as invalid. Terminal.
    Invalid,
    /// Fetching or decoding failed. Terminal.
    Failed,
}

impl ImageryState {
    /// Returns `true` for states the driver never leaves.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Empty | Self::Invalid | Self::Failed)
    }

    /// Returns `true` if a collaborator currently owns the next step.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Transitioning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ImageryState::Empty.is_terminal());
        assert!(ImageryState::Invalid.is_terminal());
        assert!(ImageryState::Failed.is_terminal());
        assert!(!ImageryState::Ready.is_terminal());
        assert!(!ImageryState::Placeholder.is_terminal());
    }

    #[test]
    fn only_transitioning_is_in_flight() {
        assert!(ImageryState::Transitioning.is_in_flight());
        assert!(!ImageryState::Unloaded.is_in_flight());
        assert!(!ImageryState::Received.is_in_flight());
        assert!(!ImageryState::Ready.is_in_flight());
    }

    #[test]
    fn default_is_unloaded() {
        assert_eq!(ImageryState::default(), ImageryState::Unloaded);
    }
}
