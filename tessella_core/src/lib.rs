// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted tile imagery lifecycle for tiled map and globe renderers.
//!
//! `tessella_core` tracks how the imagery for one tile of a layer is fetched,
//! decoded into a GPU texture, optionally reprojected, and released once no
//! tile references it. It is `no_std` compatible (with `alloc`) and stores
//! imagery in a slot array addressed by generational handles.
//!
//! # Architecture
//!
//! The driver is re-entered once per frame for every visible tile. Work that
//! takes longer than a frame is handed to collaborators, whose results come
//! back through the completion queue:
//!
//! ```text
//!   renderer (per visible tile)
//!       │
//!       ▼
//!   ImageryLayer::process_state_machine() ──► ImageryLoader
//!       ▲                                          │ (fetch, decode,
//!       │                                          │  upload, reproject)
//!   ImageryLayer::apply_completions() ◄── Completion queue
//!       │
//!       ▼
//!   ImageryStore::take_changes() ──► ImageryChanges ──► renderer
//! ```
//!
//! **[`imagery`]** — The [`TileImagery`](imagery::TileImagery) record and the
//! [`ImageryStore`](imagery::ImageryStore) that owns it: the (x, y, level)
//! cache, reference counting with cascading parent release, and placeholder
//! construction.
//!
//! **[`layer`]** — [`ImageryLayer`](layer::ImageryLayer), which ties a store
//! to its provider and loader and runs the per-tile state machine.
//!
//! **[`tiling`]** — Tile addressing, the tiling-scheme contracts, and the
//! single-source / multi-source [`SourceMode`](tiling::SourceMode) selector.
//!
//! **[`loader`]** — Collaborator traits for providers, fetching, texture
//! creation, and reprojection.
//!
//! **[`completion`]** — Asynchronous results written back on the frame
//! thread, tolerant of imagery destroyed while work was in flight.
//!
//! **[`resource`]** — Opaque image, texture, and credit handles plus the
//! release contract.
//!
//! **[`dirty`]** — Change channels drained into
//! [`ImageryChanges`](imagery::ImageryChanges).
//!
//! **[`config`]** — Layer configuration.
//!
//! **[`trace`]** — [`ImageryTraceSink`](trace::ImageryTraceSink) trait and
//! event types, with the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod completion;
pub mod config;
pub mod dirty;
pub mod imagery;
pub mod layer;
pub mod loader;
pub mod resource;
pub mod tiling;
pub mod trace;

#[cfg(test)]
mod testing;
