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

//! RainViewer weather-maps frame source.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use super::{Frame, FrameSet, FrameSource};
use crate::error::FrameError;

/// Public RainViewer index of available radar frames.
pub const DEFAULT_WEATHER_MAPS_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct WeatherMaps {
    radar: Option<RadarSection>,
}

#[derive(Debug, Deserialize)]
struct RadarSection {
    past: Option<Vec<FrameDescriptor>>,
}

#[derive(Debug, Deserialize)]
struct FrameDescriptor {
    time: i64,
}

/// Decode a weather-maps document into the past radar frames it lists.
pub fn parse_weather_maps(body: &[u8]) -> Result<FrameSet, FrameError> {
    let maps: WeatherMaps = serde_json::from_slice(body)?;

    let past = maps
        .radar
        .ok_or_else(|| FrameError::Format("missing 'radar' section".to_string()))?
        .past
        .ok_or_else(|| FrameError::Format("missing 'radar.past' list".to_string()))?;

    if past.is_empty() {
        return Err(FrameError::Format("'radar.past' lists no frames".to_string()));
    }

    Ok(FrameSet::new(
        past.into_iter().map(|d| Frame::from_unix(d.time)).collect(),
    ))
}

/// Fetches radar frames from the RainViewer public API.
#[derive(Debug, Clone)]
pub struct RainViewerSource {
    client: reqwest::Client,
    url: String,
}

impl RainViewerSource {
    /// Source for the public endpoint with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(DEFAULT_WEATHER_MAPS_URL, DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        let client = build_client(
            reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("radar-overlay/", env!("CARGO_PKG_VERSION"))),
        );

        Self {
            client,
            url: url.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn build_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            warn!("HTTP client setup failed, using defaults without timeout: {e}");
            reqwest::Client::new()
        }
    }
}

impl Default for RainViewerSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for RainViewerSource {
    async fn fetch_frames(&self) -> Result<FrameSet, FrameError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FrameError::Network(format!("HTTP error: {status}")));
        }

        let body = response.bytes().await?;
        let frames = parse_weather_maps(&body)?;
        debug!(
            "Fetched {} radar frames (latest {:?})",
            frames.len(),
            frames.latest()
        );
        Ok(frames)
    }
}
