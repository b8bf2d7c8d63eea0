// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the imagery lifecycle.
//!
//! This module provides an [`ImageryTraceSink`] trait with per-event methods
//! that the state machine, the reference-count manager, and the completion
//! queue call as imagery moves through its lifecycle. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn ImageryTraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::imagery::{ImageryId, ImageryState};
use crate::tiling::{SourceKind, TileKey};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Who moved an imagery to a new state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionCause {
    /// The per-frame driver.
    Driver,
    /// A collaborator writing the state inside a delegation call.
    Collaborator,
    /// A queued completion applied on the frame thread.
    Completion,
    /// Application code via [`ImageryStore::set_state`](crate::imagery::ImageryStore::set_state).
    Caller,
}

/// Which collaborator operation the driver delegated to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    /// Fetch one source image.
    RequestImagery,
    /// Fetch every contributing source image.
    RequestProjectedImages,
    /// Upload one decoded image.
    CreateTexture,
    /// Upload one texture per contributing image.
    CreateMultipleTextures,
    /// Reproject one texture.
    ReprojectTexture,
    /// Reproject and composite contributing textures.
    MultisourceReprojectTexture,
}

/// Why a completion was discarded instead of applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The imagery was destroyed while the work was in flight.
    Stale,
    /// The imagery was not in the state the completion expects.
    UnexpectedState,
    /// A per-source index was outside the projected sequences.
    IndexOutOfRange,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted whenever an imagery changes state.
#[derive(Clone, Copy, Debug)]
pub struct StateTransitionEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The imagery that moved.
    pub imagery: ImageryId,
    /// Its tile address.
    pub key: TileKey,
    /// State before.
    pub from: ImageryState,
    /// State after.
    pub to: ImageryState,
    /// What caused the change.
    pub cause: TransitionCause,
}

/// Emitted when the driver hands work to a collaborator.
#[derive(Clone, Copy, Debug)]
pub struct DispatchEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The imagery the work is for.
    pub imagery: ImageryId,
    /// Its tile address.
    pub key: TileKey,
    /// Operation delegated.
    pub kind: DispatchKind,
    /// Source mode the operation was chosen for.
    pub source: SourceKind,
}

/// Emitted for every reference released, including cascaded parent releases.
#[derive(Clone, Copy, Debug)]
pub struct ReleaseEvent {
    /// The imagery released.
    pub imagery: ImageryId,
    /// Its tile address.
    pub key: TileKey,
    /// Count after the release.
    pub remaining: u32,
}

/// Emitted when an imagery reaches zero references and is destroyed.
#[derive(Clone, Copy, Debug)]
pub struct DestroyEvent {
    /// The now-stale handle.
    pub imagery: ImageryId,
    /// Its tile address.
    pub key: TileKey,
    /// Number of image dispose calls made.
    pub images_disposed: u32,
    /// Number of texture destroy calls made.
    pub textures_destroyed: u32,
}

/// Emitted when a completion is discarded.
#[derive(Clone, Copy, Debug)]
pub struct CompletionDroppedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Target handle of the completion.
    pub imagery: ImageryId,
    /// Why it was dropped.
    pub reason: DropReason,
}

// ---------------------------------------------------------------------------
// ImageryTraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the imagery lifecycle.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait ImageryTraceSink {
    /// Called when an imagery changes state.
    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        _ = e;
    }

    /// Called when the driver delegates to a collaborator.
    fn on_dispatch(&mut self, e: &DispatchEvent) {
        _ = e;
    }

    /// Called for every released reference.
    fn on_release(&mut self, e: &ReleaseEvent) {
        _ = e;
    }

    /// Called when an imagery is destroyed.
    fn on_destroy(&mut self, e: &DestroyEvent) {
        _ = e;
    }

    /// Called when a completion is dropped.
    fn on_completion_dropped(&mut self, e: &CompletionDroppedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// An [`ImageryTraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl ImageryTraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`ImageryTraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn ImageryTraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn ImageryTraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn ImageryTraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`StateTransitionEvent`].
    #[inline]
    pub fn state_transition(&mut self, e: &StateTransitionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_state_transition(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DispatchEvent`].
    #[inline]
    pub fn dispatch(&mut self, e: &DispatchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dispatch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ReleaseEvent`].
    #[inline]
    pub fn release(&mut self, e: &ReleaseEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_release(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DestroyEvent`].
    #[inline]
    pub fn destroy(&mut self, e: &DestroyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_destroy(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompletionDroppedEvent`].
    #[inline]
    pub fn completion_dropped(&mut self, e: &CompletionDroppedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_completion_dropped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
