// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`ImageryTraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Handles are stored as raw `(index, generation)` parts and tile keys as
//! `(x, y, level)`; enums are stored as one byte each.

use tessella_core::imagery::{ImageryId, ImageryState};
use tessella_core::tiling::{SourceKind, TileKey};
use tessella_core::trace::{
    CompletionDroppedEvent, DestroyEvent, DispatchEvent, DispatchKind, DropReason,
    ImageryTraceSink, ReleaseEvent, StateTransitionEvent, TransitionCause,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_STATE_TRANSITION: u8 = 1;
const TAG_DISPATCH: u8 = 2;
const TAG_RELEASE: u8 = 3;
const TAG_DESTROY: u8 = 4;
const TAG_COMPLETION_DROPPED: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// An [`ImageryTraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_imagery(&mut self, id: ImageryId, key: TileKey) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
        self.write_u32(key.x);
        self.write_u32(key.y);
        self.write_u32(key.level);
    }

    fn write_state(&mut self, s: ImageryState) {
        self.write_u8(match s {
            ImageryState::Unloaded => 0,
            ImageryState::Transitioning => 1,
            ImageryState::Received => 2,
            ImageryState::TextureLoaded => 3,
            ImageryState::Ready => 4,
            ImageryState::Placeholder => 5,
            ImageryState::Empty => 6,
            ImageryState::Invalid => 7,
            ImageryState::Failed => 8,
        });
    }

    fn write_cause(&mut self, c: TransitionCause) {
        self.write_u8(match c {
            TransitionCause::Driver => 0,
            TransitionCause::Collaborator => 1,
            TransitionCause::Completion => 2,
            TransitionCause::Caller => 3,
        });
    }

    fn write_dispatch_kind(&mut self, k: DispatchKind) {
        self.write_u8(match k {
            DispatchKind::RequestImagery => 0,
            DispatchKind::RequestProjectedImages => 1,
            DispatchKind::CreateTexture => 2,
            DispatchKind::CreateMultipleTextures => 3,
            DispatchKind::ReprojectTexture => 4,
            DispatchKind::MultisourceReprojectTexture => 5,
        });
    }
}

impl ImageryTraceSink for RecorderSink {
    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        self.write_u8(TAG_STATE_TRANSITION);
        self.write_u64(e.frame_index);
        self.write_imagery(e.imagery, e.key);
        self.write_state(e.from);
        self.write_state(e.to);
        self.write_cause(e.cause);
    }

    fn on_dispatch(&mut self, e: &DispatchEvent) {
        self.write_u8(TAG_DISPATCH);
        self.write_u64(e.frame_index);
        self.write_imagery(e.imagery, e.key);
        self.write_dispatch_kind(e.kind);
        self.write_u8(match e.source {
            SourceKind::Single => 0,
            SourceKind::Multi => 1,
        });
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        self.write_u8(TAG_RELEASE);
        self.write_imagery(e.imagery, e.key);
        self.write_u32(e.remaining);
    }

    fn on_destroy(&mut self, e: &DestroyEvent) {
        self.write_u8(TAG_DESTROY);
        self.write_imagery(e.imagery, e.key);
        self.write_u32(e.images_disposed);
        self.write_u32(e.textures_destroyed);
    }

    fn on_completion_dropped(&mut self, e: &CompletionDroppedEvent) {
        self.write_u8(TAG_COMPLETION_DROPPED);
        self.write_u64(e.frame_index);
        self.write_u32(e.imagery.index());
        self.write_u32(e.imagery.generation());
        self.write_u8(match e.reason {
            DropReason::Stale => 0,
            DropReason::UnexpectedState => 1,
            DropReason::IndexOutOfRange => 2,
        });
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`StateTransitionEvent`].
    StateTransition(StateTransitionEvent),
    /// A [`DispatchEvent`].
    Dispatch(DispatchEvent),
    /// A [`ReleaseEvent`].
    Release(ReleaseEvent),
    /// A [`DestroyEvent`].
    Destroy(DestroyEvent),
    /// A [`CompletionDroppedEvent`].
    CompletionDropped(CompletionDroppedEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_id(&mut self) -> Option<ImageryId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(ImageryId::from_raw_parts(index, generation))
    }

    fn read_imagery(&mut self) -> Option<(ImageryId, TileKey)> {
        let id = self.read_id()?;
        let key = TileKey::new(self.read_u32()?, self.read_u32()?, self.read_u32()?);
        Some((id, key))
    }

    fn read_state(&mut self) -> Option<ImageryState> {
        Some(match self.read_u8()? {
            0 => ImageryState::Unloaded,
            1 => ImageryState::Transitioning,
            2 => ImageryState::Received,
            3 => ImageryState::TextureLoaded,
            4 => ImageryState::Ready,
            5 => ImageryState::Placeholder,
            6 => ImageryState::Empty,
            7 => ImageryState::Invalid,
            _ => ImageryState::Failed,
        })
    }

    fn read_cause(&mut self) -> Option<TransitionCause> {
        Some(match self.read_u8()? {
            0 => TransitionCause::Driver,
            1 => TransitionCause::Collaborator,
            2 => TransitionCause::Completion,
            _ => TransitionCause::Caller,
        })
    }

    fn read_dispatch_kind(&mut self) -> Option<DispatchKind> {
        Some(match self.read_u8()? {
            0 => DispatchKind::RequestImagery,
            1 => DispatchKind::RequestProjectedImages,
            2 => DispatchKind::CreateTexture,
            3 => DispatchKind::CreateMultipleTextures,
            4 => DispatchKind::ReprojectTexture,
            _ => DispatchKind::MultisourceReprojectTexture,
        })
    }

    fn decode_state_transition(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let (imagery, key) = self.read_imagery()?;
        Some(RecordedEvent::StateTransition(StateTransitionEvent {
            frame_index,
            imagery,
            key,
            from: self.read_state()?,
            to: self.read_state()?,
            cause: self.read_cause()?,
        }))
    }

    fn decode_dispatch(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let (imagery, key) = self.read_imagery()?;
        Some(RecordedEvent::Dispatch(DispatchEvent {
            frame_index,
            imagery,
            key,
            kind: self.read_dispatch_kind()?,
            source: match self.read_u8()? {
                0 => SourceKind::Single,
                _ => SourceKind::Multi,
            },
        }))
    }

    fn decode_release(&mut self) -> Option<RecordedEvent> {
        let (imagery, key) = self.read_imagery()?;
        Some(RecordedEvent::Release(ReleaseEvent {
            imagery,
            key,
            remaining: self.read_u32()?,
        }))
    }

    fn decode_destroy(&mut self) -> Option<RecordedEvent> {
        let (imagery, key) = self.read_imagery()?;
        Some(RecordedEvent::Destroy(DestroyEvent {
            imagery,
            key,
            images_disposed: self.read_u32()?,
            textures_destroyed: self.read_u32()?,
        }))
    }

    fn decode_completion_dropped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CompletionDropped(CompletionDroppedEvent {
            frame_index: self.read_u64()?,
            imagery: self.read_id()?,
            reason: match self.read_u8()? {
                0 => DropReason::Stale,
                1 => DropReason::UnexpectedState,
                _ => DropReason::IndexOutOfRange,
            },
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_STATE_TRANSITION => self.decode_state_transition(),
            TAG_DISPATCH => self.decode_dispatch(),
            TAG_RELEASE => self.decode_release(),
            TAG_DESTROY => self.decode_destroy(),
            TAG_COMPLETION_DROPPED => self.decode_completion_dropped(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transition() -> StateTransitionEvent {
        StateTransitionEvent {
            frame_index: 12,
            imagery: ImageryId::from_raw_parts(3, 1),
            key: TileKey::new(5, 2, 3),
            from: ImageryState::TextureLoaded,
            to: ImageryState::Transitioning,
            cause: TransitionCause::Driver,
        }
    }

    #[test]
    fn round_trip_state_transition() {
        let mut rec = RecorderSink::new();
        let orig = sample_transition();
        rec.on_state_transition(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::StateTransition(e) => {
                assert_eq!(e.frame_index, orig.frame_index);
                assert_eq!(e.imagery, orig.imagery);
                assert_eq!(e.key, orig.key);
                assert_eq!(e.from, orig.from);
                assert_eq!(e.to, orig.to);
                assert_eq!(e.cause, orig.cause);
            }
            other => panic!("expected StateTransition, got {other:?}"),
        }
    }

    #[test]
    fn lifecycle_sequence_decodes_in_order() {
        let mut rec = RecorderSink::new();
        let imagery = ImageryId::from_raw_parts(0, 0);
        let key = TileKey::new(0, 0, 0);
        rec.on_state_transition(&sample_transition());
        rec.on_dispatch(&DispatchEvent {
            frame_index: 12,
            imagery,
            key,
            kind: DispatchKind::MultisourceReprojectTexture,
            source: SourceKind::Multi,
        });
        rec.on_release(&ReleaseEvent {
            imagery,
            key,
            remaining: 0,
        });
        rec.on_destroy(&DestroyEvent {
            imagery,
            key,
            images_disposed: 0,
            textures_destroyed: 3,
        });
        rec.on_completion_dropped(&CompletionDroppedEvent {
            frame_index: 13,
            imagery,
            reason: DropReason::Stale,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], RecordedEvent::StateTransition(_)));
        match &events[1] {
            RecordedEvent::Dispatch(e) => {
                assert_eq!(e.kind, DispatchKind::MultisourceReprojectTexture);
                assert_eq!(e.source, SourceKind::Multi);
            }
            other => panic!("expected Dispatch, got {other:?}"),
        }
        assert!(matches!(events[2], RecordedEvent::Release(ReleaseEvent { remaining: 0, .. })));
        match &events[3] {
            RecordedEvent::Destroy(e) => assert_eq!(e.textures_destroyed, 3),
            other => panic!("expected Destroy, got {other:?}"),
        }
        match &events[4] {
            RecordedEvent::CompletionDropped(e) => {
                assert_eq!(e.frame_index, 13);
                assert_eq!(e.reason, DropReason::Stale);
            }
            other => panic!("expected CompletionDropped, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_state_transition(&sample_transition());
        rec.on_state_transition(&sample_transition());
        let bytes = rec.into_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
