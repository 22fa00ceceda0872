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

use tokio_util::sync::CancellationToken;

use super::{Mode, OverlayLayer};
use crate::frames::{Frame, FrameSet};
use crate::surface::{LayerHandle, PixelOffset};

/// The one recurring timer a mode may own. Dropping it stops the task.
#[derive(Debug)]
pub(super) struct PlaybackTimer {
    mode: Mode,
    cancel: CancellationToken,
}

impl PlaybackTimer {
    pub(super) fn new(mode: Mode, cancel: CancellationToken) -> Self {
        Self { mode, cancel }
    }

    pub(super) fn mode(&self) -> Mode {
        self.mode
    }
}

impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Translation currently applied by the simulation.
#[derive(Debug, Clone, Copy)]
pub(super) struct SimulationOffset {
    pub layer: LayerHandle,
    pub offset: PixelOffset,
}

/// Everything the controller mutates. Only touched under its lock.
#[derive(Debug, Default)]
pub(super) struct ControllerState {
    pub mode: Mode,
    /// Bumped whenever timers are torn down; ticks from older generations
    /// are ignored.
    pub generation: u64,
    /// Bumped by every mode request; fetches that finish after a newer
    /// request are dropped.
    pub request: u64,
    pub frames: FrameSet,
    pub current: Option<OverlayLayer>,
    pub timer: Option<PlaybackTimer>,
    pub simulation: Option<SimulationOffset>,
}

impl ControllerState {
    pub(super) fn begin_request(&mut self) -> u64 {
        self.request += 1;
        self.request
    }

    pub(super) fn is_superseded(&self, request: u64) -> bool {
        self.request != request
    }

    pub(super) fn is_current(&self, generation: u64, mode: Mode) -> bool {
        self.generation == generation && self.mode == mode
    }

    pub(super) fn displayed_frame(&self) -> Option<Frame> {
        self.current.map(|layer| layer.frame())
    }
}
