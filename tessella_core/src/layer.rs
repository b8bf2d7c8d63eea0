// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An imagery layer and its per-tile state machine driver.
//!
//! [`ImageryLayer`] ties an [`ImageryStore`] to the provider and loader that
//! feed it. Renderers call
//! [`process_state_machine`](ImageryLayer::process_state_machine) once per
//! frame for every visible tile; each call advances the tile's imagery by at
//! most one step per state and never blocks:
//!
//! ```text
//! UNLOADED ──► TRANSITIONING ──► RECEIVED ──► TRANSITIONING ──► TEXTURE_LOADED
//!     │           (fetch)                       (upload)              │
//!     │ (no contributing tiles)                                       ▼
//!     ▼                                   READY ◄── TRANSITIONING (reproject)
//!   EMPTY                                   │                 ▲
//!                                           └─────────────────┘
//!                               (geographic texture needed but missing)
//! ```
//!
//! `TRANSITIONING` is written before each delegation so a re-entry in the same
//! or a later frame never dispatches the same work twice.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::completion::{Completion, CompletionQueue, CompletionReport};
use crate::config::ImageryLayerConfig;
use crate::imagery::{ImageryId, ImageryState, ImageryStore, TileImagery};
use crate::loader::{FrameState, ImageryLoader, ImageryProvider, PriorityFunction};
use crate::tiling::{ContributingTiles, SourceKind, SourceMode, TileKey, TilingScheme};
use crate::trace::{DispatchEvent, DispatchKind, StateTransitionEvent, Tracer, TransitionCause};

/// One imagery layer: provider, loader, imagery store, and pending
/// completions.
#[derive(Debug)]
pub struct ImageryLayer<P, L> {
    provider: P,
    loader: L,
    store: ImageryStore,
    completions: CompletionQueue,
    config: ImageryLayerConfig,
}

impl<P: ImageryProvider, L: ImageryLoader> ImageryLayer<P, L> {
    /// Creates a layer with the default configuration.
    pub fn new(provider: P, loader: L) -> Self {
        Self::with_config(provider, loader, ImageryLayerConfig::DEFAULT)
    }

    /// Creates a layer with the given configuration.
    pub fn with_config(provider: P, loader: L, config: ImageryLayerConfig) -> Self {
        Self {
            provider,
            loader,
            store: ImageryStore::with_capacity(config.initial_capacity),
            completions: CompletionQueue::new(),
            config,
        }
    }

    /// Returns the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the provider mutably.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Returns the loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the loader mutably.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Returns the imagery store.
    pub fn store(&self) -> &ImageryStore {
        &self.store
    }

    /// Returns the imagery store mutably.
    pub fn store_mut(&mut self) -> &mut ImageryStore {
        &mut self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ImageryLayerConfig {
        &self.config
    }

    /// Returns the pending completions.
    pub fn completions(&self) -> &CompletionQueue {
        &self.completions
    }

    // -- Lifetime --

    /// Returns the cached imagery for `key`, constructing it (and its
    /// ancestors) if needed, and adds one reference.
    ///
    /// When no rectangle is given and the provider is ready, new imagery gets
    /// its rectangle from the tiling scheme.
    pub fn get_imagery_from_cache(&mut self, key: TileKey, rectangle: Option<Rect>) -> ImageryId {
        let provider = &self.provider;
        self.store.get_from_cache_with(key, rectangle, &mut |key| {
            provider
                .is_ready()
                .then(|| provider.tiling_scheme().tile_to_rectangle(key))
        })
    }

    /// Creates an uncached placeholder imagery holding one reference.
    pub fn create_placeholder(&mut self) -> ImageryId {
        let rectangle = self
            .provider
            .is_ready()
            .then(|| self.provider.tiling_scheme().tile_to_rectangle(TileKey::default()));
        self.store.create_placeholder(rectangle)
    }

    /// Adds one reference.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn add_reference(&mut self, id: ImageryId) {
        self.store.add_reference(id);
    }

    /// Releases one reference, destroying the imagery (and any ancestors that
    /// reach zero) through the loader. Returns the remaining count.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn release_reference(&mut self, id: ImageryId, tracer: &mut Tracer<'_>) -> u32 {
        self.store.release_reference_traced(id, &mut self.loader, tracer)
    }

    /// Moves an imagery to `state` on behalf of application code, e.g. out of
    /// [`Placeholder`](ImageryState::Placeholder).
    pub fn set_state(
        &mut self,
        id: ImageryId,
        state: ImageryState,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) {
        self.transition(id, state, frame_index, TransitionCause::Caller, tracer);
    }

    // -- Completions --

    /// Queues a completion for the next
    /// [`apply_completions`](Self::apply_completions).
    pub fn enqueue(&mut self, completion: Completion) {
        self.completions.push(completion);
    }

    /// Applies queued completions in order, up to the configured budget.
    ///
    /// Completions that no longer match their imagery are dropped, their
    /// resources released through the loader, and reported in the result.
    pub fn apply_completions(&mut self, frame_index: u64, tracer: &mut Tracer<'_>) -> CompletionReport {
        let budget = self.config.completion_budget.unwrap_or(usize::MAX);
        let mut report = CompletionReport::default();
        let mut handled = 0;
        while handled < budget {
            let Some(completion) = self.completions.pop() else {
                break;
            };
            handled += 1;
            match self
                .store
                .apply_completion(completion, &mut self.loader, frame_index, tracer)
            {
                Ok(()) => report.applied += 1,
                Err(error) => report.errors.push(error),
            }
        }
        report
    }

    // -- Driver --

    /// Advances the imagery `id` by at most one step per state.
    ///
    /// Does nothing while the provider is not ready or once the imagery is
    /// [`Empty`](ImageryState::Empty). Otherwise the tiling scheme selects
    /// single- or multi-source handling and:
    ///
    /// - `Unloaded` starts the fetch (multi-source imagery with no
    ///   contributing tiles becomes `Empty` instead);
    /// - `Received` starts texture creation with the frame's context;
    /// - `TextureLoaded`, or `Ready` without a geographic texture when
    ///   `need_geographic_projection` is set, starts reprojection.
    ///
    /// Steps run in that order within one call, so a collaborator that
    /// finishes synchronously lets the imagery advance several states at once.
    /// Every other state is left alone.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn process_state_machine(
        &mut self,
        id: ImageryId,
        frame: &mut FrameState<'_, L::Context>,
        need_geographic_projection: bool,
        priority: Option<&PriorityFunction>,
        tracer: &mut Tracer<'_>,
    ) {
        if !self.provider.is_ready() || self.store.get(id).state == ImageryState::Empty {
            return;
        }

        let frame_index = frame.frame_index;
        let record = self.store.get(id);
        let key = record.key();
        let unloaded = record.state == ImageryState::Unloaded;
        let missing_rectangle = record.rectangle.is_none();

        // Everything needed from the scheme is read up front.
        let scheme = self.provider.tiling_scheme();
        let mode = SourceMode::select(scheme);
        let source = mode.kind();
        let rectangle = missing_rectangle.then(|| scheme.tile_to_rectangle(key));
        let contributing = match mode {
            SourceMode::Multi(projected) if unloaded => {
                let indices = projected.contributing_tiles(key);
                let rectangles: Vec<Rect> = indices
                    .iter()
                    .map(|(x, y)| projected.contributing_rectangle(x, y, key.level))
                    .collect();
                Some((indices, rectangles))
            }
            _ => None,
        };

        if rectangle.is_some() {
            self.store.get_mut(id).rectangle = rectangle;
        }

        if unloaded {
            match contributing {
                None => {
                    self.delegate(
                        id,
                        DispatchKind::RequestImagery,
                        source,
                        frame_index,
                        tracer,
                        |loader, imagery| loader.request_imagery(id, imagery, priority),
                    );
                }
                Some((indices, rectangles)) => {
                    if !self.begin_projected(id, &indices, rectangles, frame_index, tracer) {
                        return;
                    }
                    let level = key.level;
                    self.delegate(
                        id,
                        DispatchKind::RequestProjectedImages,
                        source,
                        frame_index,
                        tracer,
                        |loader, imagery| {
                            loader.request_projected_images(id, imagery, &indices, level, 0, priority);
                        },
                    );
                }
            }
        }

        if self.state(id) == ImageryState::Received {
            let context = &mut *frame.context;
            match source {
                SourceKind::Single => self.delegate(
                    id,
                    DispatchKind::CreateTexture,
                    source,
                    frame_index,
                    tracer,
                    |loader, imagery| loader.create_texture(context, id, imagery),
                ),
                SourceKind::Multi => self.delegate(
                    id,
                    DispatchKind::CreateMultipleTextures,
                    source,
                    frame_index,
                    tracer,
                    |loader, imagery| loader.create_multiple_textures(context, id, imagery),
                ),
            }
        }

        let record = self.store.get(id);
        let needs_reprojection = record.state == ImageryState::Ready
            && need_geographic_projection
            && record.texture.is_none();

        if record.state == ImageryState::TextureLoaded || needs_reprojection {
            match source {
                SourceKind::Single => self.delegate(
                    id,
                    DispatchKind::ReprojectTexture,
                    source,
                    frame_index,
                    tracer,
                    |loader, imagery| {
                        loader.reproject_texture(frame, id, imagery, need_geographic_projection);
                    },
                ),
                SourceKind::Multi => self.delegate(
                    id,
                    DispatchKind::MultisourceReprojectTexture,
                    source,
                    frame_index,
                    tracer,
                    |loader, imagery| loader.multisource_reproject_texture(frame, id, imagery),
                ),
            }
        }
    }

    // -- Internal helpers --

    fn state(&self, id: ImageryId) -> ImageryState {
        self.store.get(id).state
    }

    /// Moves to `Transitioning` and lays out the multi-source sequences.
    ///
    /// Returns `false` if no source tile contributes, in which case the
    /// imagery is now `Empty`.
    fn begin_projected(
        &mut self,
        id: ImageryId,
        indices: &ContributingTiles,
        rectangles: Vec<Rect>,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        self.transition(
            id,
            ImageryState::Transitioning,
            frame_index,
            TransitionCause::Driver,
            tracer,
        );
        let record = self.store.get_mut(id);
        record.reset_projected(indices.len());
        record.projected_rectangles = rectangles;

        if indices.is_empty() {
            self.transition(id, ImageryState::Empty, frame_index, TransitionCause::Driver, tracer);
            return false;
        }
        true
    }

    /// Writes `state`, recording and tracing the change.
    fn transition(
        &mut self,
        id: ImageryId,
        state: ImageryState,
        frame_index: u64,
        cause: TransitionCause,
        tracer: &mut Tracer<'_>,
    ) {
        let from = self.store.set_state(id, state);
        if from != state {
            tracer.state_transition(&StateTransitionEvent {
                frame_index,
                imagery: id,
                key: self.store.get(id).key(),
                from,
                to: state,
                cause,
            });
        }
    }

    /// Moves to `Transitioning`, then hands the record to the loader.
    ///
    /// Whatever the loader changed synchronously is recorded afterwards.
    fn delegate(
        &mut self,
        id: ImageryId,
        kind: DispatchKind,
        source: SourceKind,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
        call: impl FnOnce(&mut L, &mut TileImagery),
    ) {
        self.transition(
            id,
            ImageryState::Transitioning,
            frame_index,
            TransitionCause::Driver,
            tracer,
        );

        let record = self.store.get_mut(id);
        let key = record.key();
        tracer.dispatch(&DispatchEvent {
            frame_index,
            imagery: id,
            key,
            kind,
            source,
        });

        let before = record.snapshot();
        call(&mut self.loader, record);
        let after = record.state;

        if after != before.state {
            tracer.state_transition(&StateTransitionEvent {
                frame_index,
                imagery: id,
                key,
                from: before.state,
                to: after,
                cause: TransitionCause::Collaborator,
            });
        }
        self.store.note_changes(id, before);
    }
}
