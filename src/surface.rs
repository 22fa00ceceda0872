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

//! Radar layers as seen by the map painter.
//!
//! The controller drives layers from the radar worker thread; the UI thread
//! reads a snapshot each repaint. Both sides share one map of layer states.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use radar_core::{Frame, LayerHandle, PixelOffset, RadarSurface};

/// Drawing state of one radar layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayState {
    pub frame: Frame,
    pub opacity: f32,
    pub offset: PixelOffset,
    visible: bool,
}

type Layers = Arc<Mutex<BTreeMap<LayerHandle, OverlayState>>>;

/// [`RadarSurface`] backed by shared state the egui map draws from
#[derive(Clone)]
pub struct EguiSurface {
    layers: Layers,
    next_id: Arc<AtomicU64>,
    ctx: egui::Context,
}

impl std::fmt::Debug for EguiSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EguiSurface")
            .field("layers", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl EguiSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            layers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            ctx,
        }
    }

    /// Layers currently on the map, oldest first so newer ones paint on top
    pub fn visible_layers(&self) -> Vec<OverlayState> {
        self.lock()
            .values()
            .filter(|layer| layer.visible && layer.opacity > 0.0)
            .copied()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<LayerHandle, OverlayState>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, layer: LayerHandle, apply: impl FnOnce(&mut OverlayState)) {
        let changed = match self.lock().get_mut(&layer) {
            Some(state) => {
                apply(state);
                true
            }
            None => false,
        };

        if changed {
            self.ctx.request_repaint();
        } else {
            debug!("Ignoring update for unknown {layer}");
        }
    }
}

impl RadarSurface for EguiSurface {
    fn create_overlay(&self, frame: Frame) -> LayerHandle {
        let handle = LayerHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(
            handle,
            OverlayState {
                frame,
                opacity: 0.0,
                offset: PixelOffset::ZERO,
                visible: false,
            },
        );
        handle
    }

    fn add_to_surface(&self, layer: LayerHandle) {
        self.update(layer, |state| state.visible = true);
    }

    fn remove_from_surface(&self, layer: LayerHandle) {
        if self.lock().remove(&layer).is_some() {
            self.ctx.request_repaint();
        }
    }

    fn set_opacity(&self, layer: LayerHandle, opacity: f32) {
        self.update(layer, |state| state.opacity = opacity.clamp(0.0, 1.0));
    }

    fn translate(&self, layer: LayerHandle, offset: PixelOffset) {
        self.update(layer, |state| state.offset = offset);
    }
}
