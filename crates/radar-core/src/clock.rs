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

//! Clock label for the displayed radar frame.

use chrono::{FixedOffset, Local};
use tokio::sync::watch;

use crate::frames::Frame;

const CLOCK_FORMAT: &str = "%H:%M";
const INVALID_LABEL: &str = "--:--";

/// Time zone the clock label is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockZone {
    /// System local time.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

/// What the clock currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockReading {
    pub frame: Frame,
    pub label: String,
}

/// Render `frame` as a two-digit 24-hour `HH:MM` label.
#[must_use]
pub fn format_frame_time(frame: Frame, zone: ClockZone) -> String {
    let Some(utc) = frame.to_datetime() else {
        return INVALID_LABEL.to_string();
    };

    match zone {
        ClockZone::Local => utc.with_timezone(&Local).format(CLOCK_FORMAT).to_string(),
        ClockZone::Fixed(offset) => utc.with_timezone(&offset).format(CLOCK_FORMAT).to_string(),
    }
}

/// Publishes the label of the displayed frame to whoever draws it.
#[derive(Debug)]
pub struct ClockDisplay {
    zone: ClockZone,
    reading_tx: watch::Sender<Option<ClockReading>>,
}

impl ClockDisplay {
    #[must_use]
    pub fn new(zone: ClockZone) -> Self {
        let (reading_tx, _) = watch::channel(None);
        Self { zone, reading_tx }
    }

    pub fn show(&self, frame: Frame) {
        let label = format_frame_time(frame, self.zone);
        self.reading_tx.send_replace(Some(ClockReading { frame, label }));
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<ClockReading>> {
        self.reading_tx.subscribe()
    }

    /// Last reading shown, if any.
    #[must_use]
    pub fn current(&self) -> Option<ClockReading> {
        self.reading_tx.borrow().clone()
    }
}
