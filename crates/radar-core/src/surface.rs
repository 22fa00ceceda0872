// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering surface abstraction.
//!
//! The core never draws anything itself. A map implementation provides a
//! [`RadarSurface`] and the controller drives it through opaque
//! [`LayerHandle`]s.

use std::fmt;
use std::ops::Mul;

use crate::frames::Frame;

/// Opaque handle to one overlay layer owned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerHandle(u64);

impl LayerHandle {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Screen-space translation applied to a layer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelOffset {
    pub x: f32,
    pub y: f32,
}

impl PixelOffset {
    /// No translation.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Mul<u32> for PixelOffset {
    type Output = Self;

    #[allow(clippy::cast_precision_loss, reason = "step counts are tiny")]
    fn mul(self, rhs: u32) -> Self {
        let k = rhs as f32;
        Self::new(self.x * k, self.y * k)
    }
}

/// Map-side operations the core needs to show radar overlays.
///
/// Implementations are called from the controller's runtime thread and must
/// not block.
pub trait RadarSurface: Send + Sync + 'static {
    /// Create (but do not show) an overlay bound to `frame`.
    fn create_overlay(&self, frame: Frame) -> LayerHandle;

    /// Make the layer visible.
    fn add_to_surface(&self, layer: LayerHandle);

    /// Hide the layer and release everything it holds.
    fn remove_from_surface(&self, layer: LayerHandle);

    fn set_opacity(&self, layer: LayerHandle, opacity: f32);

    /// Shift the layer's rendering by `offset`. [`PixelOffset::ZERO`]
    /// restores the identity transform.
    fn translate(&self, layer: LayerHandle, offset: PixelOffset);
}

impl<S: RadarSurface> RadarSurface for std::sync::Arc<S> {
    fn create_overlay(&self, frame: Frame) -> LayerHandle {
        (**self).create_overlay(frame)
    }

    fn add_to_surface(&self, layer: LayerHandle) {
        (**self).add_to_surface(layer);
    }

    fn remove_from_surface(&self, layer: LayerHandle) {
        (**self).remove_from_surface(layer);
    }

    fn set_opacity(&self, layer: LayerHandle, opacity: f32) {
        (**self).set_opacity(layer, opacity);
    }

    fn translate(&self, layer: LayerHandle, offset: PixelOffset) {
        (**self).translate(layer, offset);
    }
}
