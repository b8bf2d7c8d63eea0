// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for tessella imagery
//! diagnostics.
//!
//! This crate provides [`ImageryTraceSink`](tessella_core::trace::ImageryTraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from recorded
//!   bytes, one track per imagery slot.

pub mod chrome;
pub mod pretty;
pub mod recorder;
