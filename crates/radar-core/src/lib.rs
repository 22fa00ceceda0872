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

//! Frame lifecycle core for a live weather-radar map overlay.
//!
//! The crate is split into small layers that the map application wires
//! together:
//!
//! - **Frames**: radar frame timestamps fetched from RainViewer
//! - **Surface**: the trait a map implements so overlays can be shown
//! - **Fader**: cross-fade between the outgoing and incoming overlay
//! - **Clock**: `HH:MM` label for the displayed frame
//! - **Controller**: the Live / History / Simulation state machine that owns
//!   every playback timer
//!
//! # Quick Start
//!
//! ```no_run
//! use radar_core::{ControllerConfig, ModeController, RainViewerSource, RadarSurface};
//!
//! async fn run<S: RadarSurface>(surface: S) {
//!     let source = RainViewerSource::new();
//!     let controller = ModeController::new(surface, source, ControllerConfig::default());
//!
//!     if let Err(e) = controller.enter_live().await {
//!         log::warn!("Live radar unavailable: {e}");
//!     }
//!
//!     // Later, from a button handler
//!     controller.enter_simulation(30);
//! }
//! ```

pub mod clock;
pub mod controller;
pub mod error;
pub mod fader;
pub mod frames;
pub mod surface;

#[cfg(test)]
mod testing;

pub use clock::{format_frame_time, ClockDisplay, ClockReading, ClockZone};
pub use controller::{ControllerConfig, Mode, ModeController, OverlayLayer, SimulationConfig};
pub use error::{ControllerError, FrameError};
pub use fader::{FaderConfig, LayerFader};
pub use frames::{Frame, FrameSet, FrameSource, RainViewerSource};
pub use surface::{LayerHandle, PixelOffset, RadarSurface};
