// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque handles for collaborator-managed resources.
//!
//! Decoded images and GPU textures are created and destroyed by the loader.
//! The core only stores their keys, compares them for aliasing, and hands them
//! back through [`ImageryResources`] exactly once when they are released.

use core::fmt;

/// An opaque handle to a decoded image owned by the loader.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey(pub u64);

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({})", self.0)
    }
}

/// An opaque handle to a GPU texture owned by the loader.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureKey(pub u64);

impl fmt::Debug for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureKey({})", self.0)
    }
}

/// An opaque attribution entry attached after a successful fetch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Credit(pub u32);

/// A decoded raw image waiting to be uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodedImage {
    /// Loader-side handle.
    pub key: ImageKey,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Whether the loader must be told when the image is dropped.
    ///
    /// Plain pixel buffers need no disposal; decoder-backed bitmaps do.
    pub disposable: bool,
}

impl DecodedImage {
    /// Creates an image that must be disposed through
    /// [`ImageryResources::destroy_image`].
    #[must_use]
    pub const fn disposable(key: ImageKey, width: u32, height: u32) -> Self {
        Self {
            key,
            width,
            height,
            disposable: true,
        }
    }

    /// Creates an image that needs no disposal.
    #[must_use]
    pub const fn plain(key: ImageKey, width: u32, height: u32) -> Self {
        Self {
            key,
            width,
            height,
            disposable: false,
        }
    }

    /// Disposes the image through `resources` if it requires it.
    ///
    /// Returns whether a dispose call was made.
    pub fn release<R: ImageryResources + ?Sized>(self, resources: &mut R) -> bool {
        if self.disposable {
            resources.destroy_image(self.key);
        }
        self.disposable
    }
}

/// Which projection a texture's pixels are laid out in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureProjection {
    /// Equirectangular latitude/longitude.
    Geographic,
    /// Spherical Web Mercator.
    WebMercator,
}

/// Releases collaborator-owned resources.
///
/// Each key handed to these methods is handed over exactly once.
pub trait ImageryResources {
    /// Disposes a decoded image.
    fn destroy_image(&mut self, image: ImageKey);

    /// Destroys a GPU texture.
    fn destroy_texture(&mut self, texture: TextureKey);
}
