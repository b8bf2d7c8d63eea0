// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Asynchronous collaborator results.
//!
//! Loaders that finish work outside a delegation call (a network response, a
//! decode on a worker thread, a GPU readback) push a [`Completion`] into the
//! layer's [`CompletionQueue`]. The layer applies queued completions on the
//! frame thread, which keeps the store single-threaded.
//!
//! Every completion expects its imagery to still be
//! [`Transitioning`](ImageryState::Transitioning). If the imagery was released
//! while the work was in flight (its handle is stale), or has moved on, the
//! completion is dropped: whatever image or texture it carries is released
//! through [`ImageryResources`] and a [`CompletionError`] is reported. Nothing
//! is retried.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::imagery::{ImageryId, ImageryState, ImageryStore};
use crate::resource::{Credit, DecodedImage, ImageryResources, TextureKey, TextureProjection};
use crate::trace::{
    CompletionDroppedEvent, DropReason, StateTransitionEvent, Tracer, TransitionCause,
};

/// How a fetch failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchFailure {
    /// The request failed (network error, decode error).
    Failed,
    /// The provider reported that the tile does not exist.
    Invalid,
}

impl FetchFailure {
    /// Returns the terminal state this failure leads to.
    #[must_use]
    pub const fn state(self) -> ImageryState {
        match self {
            Self::Failed => ImageryState::Failed,
            Self::Invalid => ImageryState::Invalid,
        }
    }
}

/// A finished piece of collaborator work.
///
/// A completion owns the image or texture it carries until it is applied or
/// dropped.
#[derive(Debug)]
pub enum Completion {
    /// The single source image arrived.
    ImageryReceived {
        /// Target imagery.
        imagery: ImageryId,
        /// Decoded image.
        image: DecodedImage,
        /// Where it came from.
        image_url: Option<String>,
        /// Attribution.
        credits: Option<Vec<Credit>>,
    },
    /// One contributing source image arrived.
    ProjectedImageReceived {
        /// Target imagery.
        imagery: ImageryId,
        /// Pair index into the contributing tiles.
        index: usize,
        /// Decoded image.
        image: DecodedImage,
    },
    /// A fetch failed.
    FetchFailed {
        /// Target imagery.
        imagery: ImageryId,
        /// Failure kind.
        failure: FetchFailure,
    },
    /// The single-source texture was uploaded.
    TextureCreated {
        /// Target imagery.
        imagery: ImageryId,
        /// Uploaded texture.
        texture: TextureKey,
        /// Projection of the texture's pixels.
        projection: TextureProjection,
        /// Go straight to `Ready` instead of `TextureLoaded`.
        skip_reprojection: bool,
    },
    /// One contributing texture was uploaded.
    ProjectedTextureCreated {
        /// Target imagery.
        imagery: ImageryId,
        /// Pair index into the contributing tiles.
        index: usize,
        /// Uploaded texture.
        texture: TextureKey,
    },
    /// A geographic texture was produced by reprojection.
    Reprojected {
        /// Target imagery.
        imagery: ImageryId,
        /// Reprojected texture.
        texture: TextureKey,
    },
    /// Reprojection was not needed.
    ReadyWithoutReprojection {
        /// Target imagery.
        imagery: ImageryId,
        /// Whether the caller asked for a geographic texture; if so and none
        /// exists, the Web Mercator texture is used for both.
        geographic: bool,
    },
    /// Contributing textures were reprojected and composited.
    Composited {
        /// Target imagery.
        imagery: ImageryId,
        /// Composited texture.
        texture: TextureKey,
    },
}

impl Completion {
    /// Returns the target imagery.
    #[must_use]
    pub fn imagery(&self) -> ImageryId {
        match self {
            Self::ImageryReceived { imagery, .. }
            | Self::ProjectedImageReceived { imagery, .. }
            | Self::FetchFailed { imagery, .. }
            | Self::TextureCreated { imagery, .. }
            | Self::ProjectedTextureCreated { imagery, .. }
            | Self::Reprojected { imagery, .. }
            | Self::ReadyWithoutReprojection { imagery, .. }
            | Self::Composited { imagery, .. } => *imagery,
        }
    }

    fn index(&self) -> Option<usize> {
        match self {
            Self::ProjectedImageReceived { index, .. }
            | Self::ProjectedTextureCreated { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Releases whatever the completion carries.
    fn discard<R: ImageryResources + ?Sized>(self, resources: &mut R) {
        match self {
            Self::ImageryReceived { image, .. } | Self::ProjectedImageReceived { image, .. } => {
                image.release(resources);
            }
            Self::TextureCreated { texture, .. }
            | Self::ProjectedTextureCreated { texture, .. }
            | Self::Reprojected { texture, .. }
            | Self::Composited { texture, .. } => resources.destroy_texture(texture),
            Self::FetchFailed { .. } | Self::ReadyWithoutReprojection { .. } => {}
        }
    }
}

/// Why a completion was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionError {
    /// The imagery was destroyed while the work was in flight.
    Stale {
        /// The stale handle.
        imagery: ImageryId,
    },
    /// The imagery was not in the expected state.
    UnexpectedState {
        /// Target imagery.
        imagery: ImageryId,
        /// State the completion requires.
        expected: ImageryState,
        /// State found.
        found: ImageryState,
    },
    /// A pair index was outside the projected sequences.
    IndexOutOfRange {
        /// Target imagery.
        imagery: ImageryId,
        /// Index carried by the completion.
        index: usize,
        /// Length of the projected sequences.
        len: usize,
    },
}

impl CompletionError {
    /// Returns the target imagery.
    #[must_use]
    pub fn imagery(&self) -> ImageryId {
        match self {
            Self::Stale { imagery }
            | Self::UnexpectedState { imagery, .. }
            | Self::IndexOutOfRange { imagery, .. } => *imagery,
        }
    }

    /// Returns the data-free reason, for tracing.
    #[must_use]
    pub fn reason(&self) -> DropReason {
        match self {
            Self::Stale { .. } => DropReason::Stale,
            Self::UnexpectedState { .. } => DropReason::UnexpectedState,
            Self::IndexOutOfRange { .. } => DropReason::IndexOutOfRange,
        }
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale { imagery } => {
                write!(f, "{imagery:?} was destroyed while work was in flight")
            }
            Self::UnexpectedState {
                imagery,
                expected,
                found,
            } => write!(f, "{imagery:?} is {found:?}, expected {expected:?}"),
            Self::IndexOutOfRange {
                imagery,
                index,
                len,
            } => write!(
                f,
                "source index {index} out of range for {imagery:?} ({len} contributing tiles)"
            ),
        }
    }
}

impl core::error::Error for CompletionError {}

/// Outcome of one [`apply_completions`](crate::layer::ImageryLayer::apply_completions) call.
#[derive(Clone, Debug, Default)]
pub struct CompletionReport {
    /// Number of completions applied.
    pub applied: usize,
    /// Completions dropped, in queue order.
    pub errors: Vec<CompletionError>,
}

impl CompletionReport {
    /// Returns `true` if nothing was dropped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// FIFO of completions waiting for the frame thread.
#[derive(Debug, Default)]
pub struct CompletionQueue {
    pending: VecDeque<Completion>,
}

impl CompletionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a completion.
    pub fn push(&mut self, completion: Completion) {
        self.pending.push_back(completion);
    }

    /// Dequeues the oldest completion.
    pub fn pop(&mut self) -> Option<Completion> {
        self.pending.pop_front()
    }

    /// Number of queued completions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Extend<Completion> for CompletionQueue {
    fn extend<T: IntoIterator<Item = Completion>>(&mut self, iter: T) {
        self.pending.extend(iter);
    }
}

/// Stores `texture` in `slot`, destroying the previous occupant unless it is
/// the same texture or aliased by `keep`.
fn replace_texture<R: ImageryResources + ?Sized>(
    slot: &mut Option<TextureKey>,
    texture: TextureKey,
    keep: Option<TextureKey>,
    resources: &mut R,
) {
    if let Some(old) = slot.replace(texture)
        && old != texture
        && Some(old) != keep
    {
        resources.destroy_texture(old);
    }
}

impl ImageryStore {
    /// Applies one completion.
    ///
    /// On error the completion's resources have been released through
    /// `resources` and the imagery (if still alive) is unchanged.
    pub fn apply_completion<R: ImageryResources + ?Sized>(
        &mut self,
        completion: Completion,
        resources: &mut R,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), CompletionError> {
        let id = completion.imagery();
        if let Err(error) = self.check_completion(&completion) {
            tracer.completion_dropped(&CompletionDroppedEvent {
                frame_index,
                imagery: id,
                reason: error.reason(),
            });
            completion.discard(resources);
            return Err(error);
        }

        let record = self.get_mut(id);
        let before = record.snapshot();
        match completion {
            Completion::ImageryReceived {
                image,
                image_url,
                credits,
                ..
            } => {
                if let Some(old) = record.image.replace(image)
                    && old.key != image.key
                {
                    old.release(resources);
                }
                record.image_url = image_url;
                record.credits = credits;
                record.state = ImageryState::Received;
            }
            Completion::ProjectedImageReceived { index, image, .. } => {
                if let Some(old) = record.projected_images[index].replace(image)
                    && old.key != image.key
                {
                    old.release(resources);
                }
                if record.projected_images.iter().all(Option::is_some) {
                    record.state = ImageryState::Received;
                }
            }
            Completion::FetchFailed { failure, .. } => {
                record.state = failure.state();
            }
            Completion::TextureCreated {
                texture,
                projection,
                skip_reprojection,
                ..
            } => {
                match projection {
                    TextureProjection::WebMercator => {
                        let keep = record.texture;
                        replace_texture(&mut record.texture_web_mercator, texture, keep, resources);
                    }
                    TextureProjection::Geographic => {
                        let keep = record.texture_web_mercator;
                        replace_texture(&mut record.texture, texture, keep, resources);
                    }
                }
                if let Some(image) = record.image.take() {
                    image.release(resources);
                }
                record.state = if skip_reprojection {
                    ImageryState::Ready
                } else {
                    ImageryState::TextureLoaded
                };
            }
            Completion::ProjectedTextureCreated { index, texture, .. } => {
                replace_texture(&mut record.projected_textures[index], texture, None, resources);
                if let Some(image) = record.projected_images[index].take() {
                    image.release(resources);
                }
                if record.projected_textures.iter().all(Option::is_some) {
                    record.state = ImageryState::TextureLoaded;
                }
            }
            Completion::Reprojected { texture, .. } => {
                let keep = record.texture_web_mercator;
                replace_texture(&mut record.texture, texture, keep, resources);
                record.state = ImageryState::Ready;
            }
            Completion::ReadyWithoutReprojection { geographic, .. } => {
                if geographic && record.texture.is_none() {
                    record.texture = record.texture_web_mercator;
                }
                record.state = ImageryState::Ready;
            }
            Completion::Composited { texture, .. } => {
                let keep = record.texture_web_mercator;
                replace_texture(&mut record.texture, texture, keep, resources);
                for consumed in record.projected_textures.iter_mut() {
                    if let Some(consumed) = consumed.take()
                        && consumed != texture
                        && Some(consumed) != keep
                    {
                        resources.destroy_texture(consumed);
                    }
                }
                record.state = ImageryState::Ready;
            }
        }

        let after = record.state;
        let key = record.key();
        if after != before.state {
            tracer.state_transition(&StateTransitionEvent {
                frame_index,
                imagery: id,
                key,
                from: before.state,
                to: after,
                cause: TransitionCause::Completion,
            });
        }
        self.note_changes(id, before);
        Ok(())
    }

    fn check_completion(&self, completion: &Completion) -> Result<(), CompletionError> {
        let imagery = completion.imagery();
        let Some(record) = self.try_get(imagery) else {
            return Err(CompletionError::Stale { imagery });
        };
        if !record.state.is_in_flight() {
            return Err(CompletionError::UnexpectedState {
                imagery,
                expected: ImageryState::Transitioning,
                found: record.state,
            });
        }
        match completion.index() {
            Some(index) if index >= record.projected_len() => {
                Err(CompletionError::IndexOutOfRange {
                    imagery,
                    index,
                    len: record.projected_len(),
                })
            }
            _ => Ok(()),
        }
    }
}
