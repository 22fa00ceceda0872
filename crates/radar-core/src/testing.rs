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

//! Test doubles for the surface and frame source.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FrameError;
use crate::frames::{Frame, FrameSet, FrameSource};
use crate::surface::{LayerHandle, PixelOffset, RadarSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Created(LayerHandle, Frame),
    Added(LayerHandle),
    Removed(LayerHandle),
    Opacity(LayerHandle, f32),
    Translated(LayerHandle, PixelOffset),
}

/// Surface that records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: AtomicU64,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Frames of every layer created so far, in creation order.
    pub fn created_frames(&self) -> Vec<i64> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Created(_, frame) => Some(frame.timestamp()),
                _ => None,
            })
            .collect()
    }

    pub fn removal_counts(&self) -> HashMap<LayerHandle, usize> {
        let mut counts = HashMap::new();
        for event in self.events() {
            if let SurfaceEvent::Removed(layer) = event {
                *counts.entry(layer).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn translations(&self) -> Vec<(LayerHandle, PixelOffset)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Translated(layer, offset) => Some((*layer, *offset)),
                _ => None,
            })
            .collect()
    }

    pub fn opacities(&self, layer: LayerHandle) -> Vec<f32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Opacity(l, o) if *l == layer => Some(*o),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SurfaceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RadarSurface for RecordingSurface {
    fn create_overlay(&self, frame: Frame) -> LayerHandle {
        let layer = LayerHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(SurfaceEvent::Created(layer, frame));
        layer
    }

    fn add_to_surface(&self, layer: LayerHandle) {
        self.record(SurfaceEvent::Added(layer));
    }

    fn remove_from_surface(&self, layer: LayerHandle) {
        self.record(SurfaceEvent::Removed(layer));
    }

    fn set_opacity(&self, layer: LayerHandle, opacity: f32) {
        self.record(SurfaceEvent::Opacity(layer, opacity));
    }

    fn translate(&self, layer: LayerHandle, offset: PixelOffset) {
        self.record(SurfaceEvent::Translated(layer, offset));
    }
}

/// Frame source that replays queued responses, then repeats a fallback.
#[derive(Debug)]
pub struct ScriptedSource {
    queued: Mutex<VecDeque<Result<Vec<i64>, String>>>,
    fallback: Mutex<Vec<i64>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl ScriptedSource {
    pub fn new(fallback: &[i64]) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback.to_vec()),
            delay: Mutex::new(None),
            fetches: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
        }
    }

    pub fn push_failure(&self, message: &str) {
        self.queued.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn set_fallback(&self, frames: &[i64]) {
        *self.fallback.lock().unwrap() = frames.to_vec();
    }

    /// Make every following fetch take `delay` of (virtual) time.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were ever running at once.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn fetch_frames(&self) -> Result<FrameSet, FrameError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.queued.lock().unwrap().pop_front();
        match next {
            Some(Ok(frames)) => Ok(frames.into_iter().collect()),
            Some(Err(message)) => Err(FrameError::Network(message)),
            None => Ok(self.fallback.lock().unwrap().iter().copied().collect()),
        }
    }
}
