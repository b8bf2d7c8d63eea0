// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`ImageryTraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use tessella_core::trace::{
    CompletionDroppedEvent, DestroyEvent, DispatchEvent, ImageryTraceSink, ReleaseEvent,
    StateTransitionEvent, TransitionCause,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn cause_name(cause: TransitionCause) -> &'static str {
    match cause {
        TransitionCause::Driver => "driver",
        TransitionCause::Collaborator => "collaborator",
        TransitionCause::Completion => "completion",
        TransitionCause::Caller => "caller",
    }
}

impl<W: Write> ImageryTraceSink for PrettyPrintSink<W> {
    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        let _ = writeln!(
            self.writer,
            "[state] frame={} {:?} {:?} {:?} -> {:?} ({})",
            e.frame_index,
            e.imagery,
            e.key,
            e.from,
            e.to,
            cause_name(e.cause),
        );
    }

    fn on_dispatch(&mut self, e: &DispatchEvent) {
        let _ = writeln!(
            self.writer,
            "[dispatch] frame={} {:?} {:?} {:?} source={:?}",
            e.frame_index, e.imagery, e.key, e.kind, e.source,
        );
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        let _ = writeln!(
            self.writer,
            "[release] {:?} {:?} remaining={}",
            e.imagery, e.key, e.remaining,
        );
    }

    fn on_destroy(&mut self, e: &DestroyEvent) {
        let _ = writeln!(
            self.writer,
            "[destroy] {:?} {:?} images={} textures={}",
            e.imagery, e.key, e.images_disposed, e.textures_destroyed,
        );
    }

    fn on_completion_dropped(&mut self, e: &CompletionDroppedEvent) {
        let _ = writeln!(
            self.writer,
            "[dropped] frame={} {:?} reason={:?}",
            e.frame_index, e.imagery, e.reason,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessella_core::imagery::{ImageryId, ImageryState};
    use tessella_core::tiling::TileKey;

    #[test]
    fn pretty_print_transition() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_state_transition(&StateTransitionEvent {
            frame_index: 4,
            imagery: ImageryId::from_raw_parts(2, 0),
            key: TileKey::new(1, 0, 1),
            from: ImageryState::Unloaded,
            to: ImageryState::Transitioning,
            cause: TransitionCause::Driver,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[state]"), "got: {output}");
        assert!(output.contains("frame=4"), "got: {output}");
        assert!(output.contains("Unloaded -> Transitioning (driver)"), "got: {output}");
    }

    #[test]
    fn pretty_print_destroy() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_destroy(&DestroyEvent {
            imagery: ImageryId::from_raw_parts(0, 3),
            key: TileKey::new(0, 0, 0),
            images_disposed: 1,
            textures_destroyed: 2,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("ImageryId(0@gen3)"), "got: {output}");
        assert!(output.contains("images=1 textures=2"), "got: {output}");
    }
}
