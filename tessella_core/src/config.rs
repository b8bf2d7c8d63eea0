// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer configuration.

/// Configuration for an [`ImageryLayer`](crate::layer::ImageryLayer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageryLayerConfig {
    /// Maximum number of completions applied per
    /// [`apply_completions`](crate::layer::ImageryLayer::apply_completions)
    /// call. `None` drains the whole queue.
    ///
    /// Uploads and reprojections arrive as completions, so a budget spreads a
    /// burst of finished work over several frames.
    pub completion_budget: Option<usize>,
    /// Number of imagery slots reserved up front.
    pub initial_capacity: usize,
}

impl ImageryLayerConfig {
    /// Unbounded completions, no preallocation.
    pub const DEFAULT: Self = Self {
        completion_budget: None,
        initial_capacity: 0,
    };

    /// Defaults for a globe view: a few hundred visible tiles and at most a
    /// frame's worth of uploads at a time.
    #[must_use]
    pub const fn globe() -> Self {
        Self {
            completion_budget: Some(32),
            initial_capacity: 512,
        }
    }

    /// Returns a copy with the given completion budget.
    #[must_use]
    pub const fn with_completion_budget(mut self, budget: Option<usize>) -> Self {
        self.completion_budget = budget;
        self
    }

    /// Returns a copy with the given initial capacity.
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for ImageryLayerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_presets() {
        let config = ImageryLayerConfig::globe()
            .with_completion_budget(None)
            .with_initial_capacity(8);
        assert_eq!(config.completion_budget, None);
        assert_eq!(config.initial_capacity, 8);
        assert_eq!(ImageryLayerConfig::default(), ImageryLayerConfig::DEFAULT);
    }
}
