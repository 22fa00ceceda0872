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

//! Error types shared by the frame source and the mode controller.

use thiserror::Error;

/// Errors that can occur while fetching radar frames.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected weather-maps response: {0}")]
    Format(String),
}

impl From<reqwest::Error> for FrameError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for FrameError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

/// Errors reported by mode transitions.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("could not load radar frames: {0}")]
    Frames(#[from] FrameError),

    /// Simulation needs a displayed layer to move.
    #[error("no radar layer is displayed")]
    NoActiveLayer,
}
