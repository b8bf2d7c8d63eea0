// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile imagery data model and lifetime management.
//!
//! A *tile imagery* is the imagery resource for one (x, y, level) tile of a
//! layer. Each one has:
//!
//! - An identity ([`ImageryId`]) — a generational handle that becomes stale
//!   when the imagery is destroyed, so late completions and forgotten handles
//!   are detected instead of touching a recycled slot.
//! - A parent link to the imagery one level up, which holds one reference on
//!   the parent for as long as the child exists.
//! - A [`state`](ImageryState) advanced by the layer's state machine and by
//!   collaborators.
//! - Payload slots for decoded images and textures, owned until release.
//! - A reference count owned by callers. The imagery is destroyed
//!   synchronously when it drops to zero.
//!
//! # Change tracking
//!
//! State and appearance changes are recorded in [`dirty`](crate::dirty)
//! channels and drained by [`ImageryStore::take_changes`] together with the
//! lists of created and destroyed imagery.

mod changes;
mod id;
mod record;
mod state;
mod store;

pub use changes::ImageryChanges;
pub use id::ImageryId;
pub use record::TileImagery;
pub use state::ImageryState;
pub use store::ImageryStore;
