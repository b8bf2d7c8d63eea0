// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each imagery slot gets its own track (`tid` = slot index). Time spent in
//! `Transitioning` is shown as a duration span, everything else as instant
//! events. A span still open when its imagery is destroyed is closed at the
//! destroy, so a later imagery reusing the slot starts on a clean track.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::collections::HashSet;
use std::io::{self, Write};

use serde_json::{Value, json};

use tessella_core::imagery::ImageryState;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Recordings carry frame indices rather than wall-clock time, so timestamps
/// are `frame_index * frame_interval_us`. Release and destroy events carry no
/// frame index and are placed at the most recent frame seen before them.
pub fn export(bytes: &[u8], frame_interval_us: f64, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;
    let mut open_spans: HashSet<u32> = HashSet::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::StateTransition(e) => {
                let ts = frame_ts(e.frame_index, frame_interval_us);
                last_ts = ts;
                let tid = e.imagery.index();
                if e.from == ImageryState::Transitioning && open_spans.remove(&tid) {
                    events.push(json!({
                        "ph": "E",
                        "name": "Transitioning",
                        "cat": "State",
                        "ts": ts,
                        "pid": 0,
                        "tid": tid,
                    }));
                }
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.to),
                    "cat": "State",
                    "ts": ts,
                    "pid": 0,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "key": [e.key.x, e.key.y, e.key.level],
                        "from": format!("{:?}", e.from),
                        "cause": format!("{:?}", e.cause),
                    }
                }));
                if e.to == ImageryState::Transitioning && open_spans.insert(tid) {
                    events.push(json!({
                        "ph": "B",
                        "name": "Transitioning",
                        "cat": "State",
                        "ts": ts,
                        "pid": 0,
                        "tid": tid,
                    }));
                }
            }
            RecordedEvent::Dispatch(e) => {
                let ts = frame_ts(e.frame_index, frame_interval_us);
                last_ts = ts;
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.kind),
                    "cat": "Dispatch",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.imagery.index(),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "key": [e.key.x, e.key.y, e.key.level],
                        "source": format!("{:?}", e.source),
                    }
                }));
            }
            RecordedEvent::Release(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Release",
                    "cat": "Lifetime",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": e.imagery.index(),
                    "s": "t",
                    "args": {
                        "key": [e.key.x, e.key.y, e.key.level],
                        "remaining": e.remaining,
                    }
                }));
            }
            RecordedEvent::Destroy(e) => {
                let tid = e.imagery.index();
                if open_spans.remove(&tid) {
                    events.push(json!({
                        "ph": "E",
                        "name": "Transitioning",
                        "cat": "State",
                        "ts": last_ts,
                        "pid": 0,
                        "tid": tid,
                    }));
                }
                events.push(json!({
                    "ph": "i",
                    "name": "Destroy",
                    "cat": "Lifetime",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "key": [e.key.x, e.key.y, e.key.level],
                        "generation": e.imagery.generation(),
                        "images_disposed": e.images_disposed,
                        "textures_destroyed": e.textures_destroyed,
                    }
                }));
            }
            RecordedEvent::CompletionDropped(e) => {
                let ts = frame_ts(e.frame_index, frame_interval_us);
                last_ts = ts;
                events.push(json!({
                    "ph": "i",
                    "name": "CompletionDropped",
                    "cat": "Completion",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.imagery.index(),
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn frame_ts(frame_index: u64, frame_interval_us: f64) -> f64 {
    frame_index as f64 * frame_interval_us
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use tessella_core::imagery::ImageryId;
    use tessella_core::tiling::TileKey;
    use tessella_core::trace::{
        DestroyEvent, ImageryTraceSink, StateTransitionEvent, TransitionCause,
    };

    fn transition(frame_index: u64, from: ImageryState, to: ImageryState) -> StateTransitionEvent {
        StateTransitionEvent {
            frame_index,
            imagery: ImageryId::from_raw_parts(4, 0),
            key: TileKey::new(1, 1, 1),
            from,
            to,
            cause: TransitionCause::Driver,
        }
    }

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_state_transition(&transition(
            1,
            ImageryState::Unloaded,
            ImageryState::Transitioning,
        ));
        rec.on_state_transition(&transition(
            3,
            ImageryState::Transitioning,
            ImageryState::Received,
        ));
        rec.on_destroy(&DestroyEvent {
            imagery: ImageryId::from_raw_parts(4, 0),
            key: TileKey::new(1, 1, 1),
            images_disposed: 1,
            textures_destroyed: 0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), 16_000.0, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 5);

        // Entering Transitioning opens a span on the imagery's track.
        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Transitioning");
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["tid"], 4);
        assert_eq!(parsed[1]["ts"], 16_000.0);

        // Leaving it closes the span.
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 48_000.0);
        assert_eq!(parsed[3]["name"], "Received");

        // Destroy inherits the last frame's timestamp.
        assert_eq!(parsed[4]["name"], "Destroy");
        assert_eq!(parsed[4]["ts"], 48_000.0);
    }

    #[test]
    fn destroy_closes_open_transitioning_span() {
        let mut rec = RecorderSink::new();
        rec.on_state_transition(&transition(
            2,
            ImageryState::Unloaded,
            ImageryState::Transitioning,
        ));
        rec.on_destroy(&DestroyEvent {
            imagery: ImageryId::from_raw_parts(4, 0),
            key: TileKey::new(1, 1, 1),
            images_disposed: 0,
            textures_destroyed: 0,
        });
        // A new imagery in the same slot opens its own span.
        rec.on_state_transition(&StateTransitionEvent {
            imagery: ImageryId::from_raw_parts(4, 1),
            ..transition(3, ImageryState::Unloaded, ImageryState::Transitioning)
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), 1_000.0, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();

        let phases: Vec<&str> = parsed.iter().filter_map(|e| e["ph"].as_str()).collect();
        assert_eq!(phases, ["i", "B", "E", "i", "i", "B"]);
        assert_eq!(parsed[2]["ts"], 2_000.0);
        assert_eq!(parsed[2]["tid"], 4);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], 16_000.0, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
