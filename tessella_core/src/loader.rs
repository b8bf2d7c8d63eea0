// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contracts for the imagery state machine.
//!
//! A layer is wired to two collaborators:
//!
//! - **Provider** — Implements [`ImageryProvider`]: reports readiness and owns
//!   the tiling scheme that decides between single-source and multi-source
//!   imagery.
//!
//! - **Loader** — Implements [`ImageryLoader`]: fetches source images, uploads
//!   textures, reprojects them, and releases everything it created through
//!   the [`ImageryResources`] supertrait.
//!
//! Every loader method receives the imagery handle together with a mutable
//! view of the record. A loader may finish synchronously by writing payload
//! fields and `state` directly, or keep the handle and finish later by
//! pushing a [`Completion`](crate::completion::Completion). In both cases the
//! driver has already moved the imagery to
//! [`Transitioning`](crate::imagery::ImageryState::Transitioning) before the
//! call, so the same work is never dispatched twice.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_frame(frame_index: u64) {
//!     // Write back whatever finished since the last frame.
//!     layer.apply_completions(frame_index, &mut tracer);
//!
//!     // Advance every visible tile's imagery by at most one step.
//!     let mut frame = FrameState::new(frame_index, &mut gpu);
//!     for tile in visible_tiles {
//!         layer.process_state_machine(tile.imagery, &mut frame, true, Some(&tile.priority), &mut tracer);
//!     }
//!
//!     // Redraw tiles whose imagery changed.
//!     let changes = layer.store_mut().take_changes();
//!     renderer.apply(layer.store(), &changes);
//! }
//! ```

use alloc::rc::Rc;

use crate::imagery::{ImageryId, TileImagery};
use crate::resource::ImageryResources;
use crate::tiling::{ContributingTiles, TilingScheme};

/// Optional callback giving the current request priority of a tile.
///
/// Called by the fetch collaborator, possibly many times while the request is
/// queued. Lower values are more urgent.
pub type PriorityFunction = Rc<dyn Fn() -> f64>;

/// Per-frame data handed to texture and reprojection collaborators.
#[derive(Debug)]
pub struct FrameState<'a, C: ?Sized> {
    /// Frame counter.
    pub frame_index: u64,
    /// Rendering context (GPU device, command encoder, etc).
    pub context: &'a mut C,
}

impl<'a, C: ?Sized> FrameState<'a, C> {
    /// Creates a frame state.
    #[inline]
    #[must_use]
    pub fn new(frame_index: u64, context: &'a mut C) -> Self {
        Self {
            frame_index,
            context,
        }
    }
}

/// Source of a layer's imagery.
pub trait ImageryProvider {
    /// Tiling scheme type.
    type Scheme: TilingScheme;

    /// Returns whether the provider has finished initializing. Until then the
    /// driver does nothing.
    fn is_ready(&self) -> bool;

    /// Returns the provider's tiling scheme.
    fn tiling_scheme(&self) -> &Self::Scheme;
}

/// Fetch, upload, and reprojection collaborator.
pub trait ImageryLoader: ImageryResources {
    /// Rendering context passed through [`FrameState`].
    type Context: ?Sized;

    /// Starts fetching the single source image for `imagery`.
    ///
    /// On success the image, URL, and credits are stored and the state becomes
    /// `Received`; on failure it becomes `Failed` or `Invalid`.
    fn request_imagery(
        &mut self,
        id: ImageryId,
        imagery: &mut TileImagery,
        priority: Option<&PriorityFunction>,
    );

    /// Starts fetching every contributing source image, beginning at pair
    /// index `start` of `indices` at source `level`.
    ///
    /// Images land in `projected_images` at their pair index. The state
    /// becomes `Received` once all are present.
    fn request_projected_images(
        &mut self,
        id: ImageryId,
        imagery: &mut TileImagery,
        indices: &ContributingTiles,
        level: u32,
        start: usize,
        priority: Option<&PriorityFunction>,
    );

    /// Uploads `imagery.image` as a texture, then drops the CPU image.
    ///
    /// The texture lands in `texture_web_mercator` for Web Mercator sources
    /// and in `texture` otherwise. The state becomes `TextureLoaded`, or
    /// `Ready` when no reprojection is needed.
    fn create_texture(&mut self, context: &mut Self::Context, id: ImageryId, imagery: &mut TileImagery);

    /// Uploads every `projected_images` entry into `projected_textures`.
    fn create_multiple_textures(
        &mut self,
        context: &mut Self::Context,
        id: ImageryId,
        imagery: &mut TileImagery,
    );

    /// Produces the geographic texture (if `need_geographic_projection`)
    /// and ends in `Ready`.
    fn reproject_texture(
        &mut self,
        frame: &mut FrameState<'_, Self::Context>,
        id: ImageryId,
        imagery: &mut TileImagery,
        need_geographic_projection: bool,
    );

    /// Reprojects and composites `projected_textures` into `texture` and ends
    /// in `Ready`.
    fn multisource_reproject_texture(
        &mut self,
        frame: &mut FrameState<'_, Self::Context>,
        id: ImageryId,
        imagery: &mut TileImagery,
    );
}
