// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by the unit tests.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::imagery::{ImageryId, ImageryState, TileImagery};
use crate::loader::{FrameState, ImageryLoader, ImageryProvider, PriorityFunction};
use crate::resource::{ImageKey, ImageryResources, TextureKey};
use crate::tiling::{ContributingTiles, ProjectedTilingScheme, TileKey, TilingScheme};

/// Unit-square tiles; never projected.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct GeographicScheme;

impl TilingScheme for GeographicScheme {
    fn tile_to_rectangle(&self, key: TileKey) -> Rect {
        let (x, y) = (f64::from(key.x), f64::from(key.y));
        Rect::new(x, y, x + 1.0, y + 1.0)
    }
}

/// Projected scheme with a fixed contributing-tile table.
#[derive(Clone, Debug, Default)]
pub(crate) struct ProjectedScheme {
    tiles: BTreeMap<TileKey, ContributingTiles>,
}

impl ProjectedScheme {
    pub(crate) fn with_tiles(mut self, key: TileKey, pairs: &[(u32, u32)]) -> Self {
        self.tiles
            .insert(key, ContributingTiles::from_pairs(pairs.iter().copied()));
        self
    }
}

impl TilingScheme for ProjectedScheme {
    fn tile_to_rectangle(&self, key: TileKey) -> Rect {
        GeographicScheme.tile_to_rectangle(key)
    }

    fn as_projected(&self) -> Option<&dyn ProjectedTilingScheme> {
        Some(self)
    }
}

impl ProjectedTilingScheme for ProjectedScheme {
    fn contributing_tiles(&self, key: TileKey) -> ContributingTiles {
        self.tiles.get(&key).cloned().unwrap_or_default()
    }

    fn contributing_rectangle(&self, x: u32, y: u32, level: u32) -> Rect {
        let (x, y) = (f64::from(x), f64::from(y));
        let level = f64::from(level);
        Rect::new(x, y, x + level, y + level)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TestProvider<S> {
    pub(crate) ready: bool,
    pub(crate) scheme: S,
}

impl<S> TestProvider<S> {
    pub(crate) fn ready(scheme: S) -> Self {
        Self {
            ready: true,
            scheme,
        }
    }
}

impl<S: TilingScheme> ImageryProvider for TestProvider<S> {
    type Scheme = S;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn tiling_scheme(&self) -> &S {
        &self.scheme
    }
}

/// One delegation observed by [`RecordingLoader`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoaderCall {
    RequestImagery {
        id: ImageryId,
        with_priority: bool,
    },
    RequestProjectedImages {
        id: ImageryId,
        pairs: Vec<(u32, u32)>,
        level: u32,
        start: usize,
        /// Lengths of the three projected sequences at call time.
        sequence_lens: [usize; 3],
    },
    CreateTexture(ImageryId),
    CreateMultipleTextures(ImageryId),
    ReprojectTexture {
        id: ImageryId,
        need_geographic_projection: bool,
    },
    MultisourceReprojectTexture(ImageryId),
}

/// Frame context that counts how often it was handed out.
#[derive(Debug, Default)]
pub(crate) struct TestContext {
    pub(crate) uses: u32,
}

/// Loader that records every call and every released resource.
#[derive(Debug, Default)]
pub(crate) struct RecordingLoader {
    pub(crate) calls: Vec<LoaderCall>,
    pub(crate) disposed_images: Vec<ImageKey>,
    pub(crate) destroyed_textures: Vec<TextureKey>,
    /// When set, every delegation writes this state before returning.
    pub(crate) finish_with: Option<ImageryState>,
}

impl RecordingLoader {
    fn finish(&self, imagery: &mut TileImagery) {
        if let Some(state) = self.finish_with {
            imagery.state = state;
        }
    }
}

impl ImageryResources for RecordingLoader {
    fn destroy_image(&mut self, image: ImageKey) {
        self.disposed_images.push(image);
    }

    fn destroy_texture(&mut self, texture: TextureKey) {
        self.destroyed_textures.push(texture);
    }
}

impl ImageryLoader for RecordingLoader {
    type Context = TestContext;

    fn request_imagery(
        &mut self,
        id: ImageryId,
        imagery: &mut TileImagery,
        priority: Option<&PriorityFunction>,
    ) {
        self.calls.push(LoaderCall::RequestImagery {
            id,
            with_priority: priority.is_some(),
        });
        self.finish(imagery);
    }

    fn request_projected_images(
        &mut self,
        id: ImageryId,
        imagery: &mut TileImagery,
        indices: &ContributingTiles,
        level: u32,
        start: usize,
        _priority: Option<&PriorityFunction>,
    ) {
        self.calls.push(LoaderCall::RequestProjectedImages {
            id,
            pairs: indices.iter().collect(),
            level,
            start,
            sequence_lens: [
                imagery.projected_rectangles.len(),
                imagery.projected_images.len(),
                imagery.projected_textures.len(),
            ],
        });
        self.finish(imagery);
    }

    fn create_texture(&mut self, context: &mut TestContext, id: ImageryId, imagery: &mut TileImagery) {
        context.uses += 1;
        self.calls.push(LoaderCall::CreateTexture(id));
        self.finish(imagery);
    }

    fn create_multiple_textures(
        &mut self,
        context: &mut TestContext,
        id: ImageryId,
        imagery: &mut TileImagery,
    ) {
        context.uses += 1;
        self.calls.push(LoaderCall::CreateMultipleTextures(id));
        self.finish(imagery);
    }

    fn reproject_texture(
        &mut self,
        frame: &mut FrameState<'_, TestContext>,
        id: ImageryId,
        imagery: &mut TileImagery,
        need_geographic_projection: bool,
    ) {
        frame.context.uses += 1;
        self.calls.push(LoaderCall::ReprojectTexture {
            id,
            need_geographic_projection,
        });
        self.finish(imagery);
    }

    fn multisource_reproject_texture(
        &mut self,
        frame: &mut FrameState<'_, TestContext>,
        id: ImageryId,
        imagery: &mut TileImagery,
    ) {
        frame.context.uses += 1;
        self.calls.push(LoaderCall::MultisourceReprojectTexture(id));
        self.finish(imagery);
    }
}
