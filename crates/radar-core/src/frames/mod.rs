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

//! Radar frame timestamps and the sources that provide them.
//!
//! A [`Frame`] identifies one radar snapshot by its Unix timestamp. A
//! [`FrameSource`] returns the frames currently published by a provider as an
//! ordered, immutable [`FrameSet`].

mod rainviewer;

pub use rainviewer::{parse_weather_maps, RainViewerSource, DEFAULT_TIMEOUT, DEFAULT_WEATHER_MAPS_URL};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FrameError;

/// One radar snapshot, identified by its Unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame(i64);

impl Frame {
    #[must_use]
    pub const fn from_unix(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Unix timestamp in seconds.
    #[must_use]
    pub const fn timestamp(self) -> i64 {
        self.0
    }

    /// `None` when the timestamp is outside chrono's representable range.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frames returned by one fetch, oldest first.
///
/// Cloning is cheap; the frames themselves are never mutated after the set is
/// built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    frames: Arc<[Frame]>,
}

impl FrameSet {
    /// Build a set from frames in any order. Frames are sorted so the set is
    /// always oldest to newest.
    #[must_use]
    pub fn new(mut frames: Vec<Frame>) -> Self {
        frames.sort_unstable();
        Self {
            frames: frames.into(),
        }
    }

    /// Most recent frame.
    #[must_use]
    pub fn latest(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    /// The last `count` frames in chronological order (all of them if the set
    /// is shorter).
    #[must_use]
    pub fn recent(&self, count: usize) -> &[Frame] {
        let start = self.frames.len().saturating_sub(count);
        &self.frames[start..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.iter().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }
}

impl Default for FrameSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<i64> for FrameSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Frame::from_unix).collect())
    }
}

/// Provider of radar frame timestamps.
///
/// Implementations perform no retries; callers decide what a failed fetch
/// means.
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    async fn fetch_frames(&self) -> Result<FrameSet, FrameError>;
}

#[async_trait]
impl<T: FrameSource> FrameSource for Arc<T> {
    async fn fetch_frames(&self) -> Result<FrameSet, FrameError> {
        (**self).fetch_frames().await
    }
}
