// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-tracking channel constants.
//!
//! The imagery store records changes in an [`understory_dirty`] tracker so
//! renderers can update only the tiles whose imagery moved this frame.
//!
//! # Propagation semantics
//!
//! - **Local** — [`STATE`] is marked with the default policy whenever an
//!   imagery's state changes, either by the driver, by a completion, or by a
//!   collaborator writing the state directly.
//!
//! - **Propagating** — [`APPEARANCE`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) along dependency edges from
//!   child to parent. A tile that is still loading renders with its closest
//!   ready ancestor, so when an imagery becomes ready or its textures change,
//!   every descendant imagery may now look different.
//!
//! # Consumption
//!
//! [`ImageryStore::take_changes`](crate::imagery::ImageryStore::take_changes)
//! drains both channels and surfaces the results as
//! [`ImageryChanges`](crate::imagery::ImageryChanges).

use understory_dirty::Channel;

/// Imagery state changed.
pub const STATE: Channel = Channel::new(0);

/// The texture an imagery (or one of its ancestors) renders with changed.
pub const APPEARANCE: Channel = Channel::new(1);
