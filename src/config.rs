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

//! Application configuration management.
//!
//! Settings are stored as TOML through `confy`. Every field has a serde
//! default, so a partial or older file still loads.

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use log::warn;
use radar_core::frames::DEFAULT_WEATHER_MAPS_URL;
use radar_core::{ClockZone, ControllerConfig, FaderConfig};
use serde::{Deserialize, Serialize};

use crate::weather::rainviewer;

pub const APP_NAME: &str = "radar-overlay";
const CONFIG_NAME: &str = "config";
const CONFIG_VERSION: u32 = 1;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Map center used until a location is known
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    /// Initial map zoom level
    #[serde(default = "default_zoom")]
    pub default_zoom: f32,

    /// Zoom level used after flying to the user's location
    #[serde(default = "default_located_zoom")]
    pub located_zoom: f32,

    /// Opacity of a freshly shown radar layer (0.0 - 1.0)
    #[serde(default = "default_radar_opacity")]
    pub radar_opacity: f32,

    /// Highest zoom the radar tile server renders natively
    #[serde(default = "default_radar_max_zoom")]
    pub radar_max_zoom: u8,

    /// Live poll period in seconds
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Delay between history frames in milliseconds
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,

    /// Number of frames replayed by the history button
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Minutes covered by the simulate button
    #[serde(default = "default_simulate_minutes")]
    pub simulate_minutes: u32,

    /// Fixed user location (skips IP geolocation)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    #[serde(default)]
    pub override_longitude: Option<f64>,

    /// Look up the user's location by IP address at startup
    #[serde(default = "default_true")]
    pub geolocate: bool,

    /// Clock offset from UTC in minutes; local time when unset
    #[serde(default)]
    pub clock_utc_offset_minutes: Option<i32>,

    /// RainViewer weather-maps endpoint
    #[serde(default = "default_weather_maps_url")]
    pub weather_maps_url: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    CONFIG_VERSION
}

fn default_latitude() -> f64 {
    -23.55
}

fn default_longitude() -> f64 {
    -46.63
}

fn default_zoom() -> f32 {
    6.0
}

fn default_located_zoom() -> f32 {
    8.0
}

fn default_radar_opacity() -> f32 {
    0.7
}

fn default_radar_max_zoom() -> u8 {
    rainviewer::DEFAULT_MAX_ZOOM
}

fn default_update_interval_secs() -> u64 {
    180
}

fn default_frame_delay_ms() -> u64 {
    700
}

fn default_max_history() -> usize {
    10
}

fn default_simulate_minutes() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_weather_maps_url() -> String {
    DEFAULT_WEATHER_MAPS_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            default_zoom: default_zoom(),
            located_zoom: default_located_zoom(),
            radar_opacity: default_radar_opacity(),
            radar_max_zoom: default_radar_max_zoom(),
            update_interval_secs: default_update_interval_secs(),
            frame_delay_ms: default_frame_delay_ms(),
            max_history: default_max_history(),
            simulate_minutes: default_simulate_minutes(),
            override_latitude: None,
            override_longitude: None,
            geolocate: true,
            clock_utc_offset_minutes: None,
            weather_maps_url: default_weather_maps_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Load configuration from an explicit file
    pub fn load_path(path: &Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Load from `path` (or the default location), falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::load_path(path),
            None => Self::load(),
        };

        loaded.unwrap_or_else(|e| {
            warn!("Failed to load configuration, using defaults: {e}");
            Self::default()
        })
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Fixed user location, when both coordinates are configured
    pub fn override_location(&self) -> Option<(f64, f64)> {
        self.override_latitude.zip(self.override_longitude)
    }

    pub fn clock_zone(&self) -> ClockZone {
        self.clock_utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .map_or(ClockZone::Local, ClockZone::Fixed)
    }

    /// Radar playback settings for the core controller
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            update_interval: Duration::from_secs(self.update_interval_secs.max(1)),
            frame_delay: Duration::from_millis(self.frame_delay_ms.max(1)),
            max_history: self.max_history.max(1),
            fader: FaderConfig {
                base_opacity: self.radar_opacity.clamp(0.0, 1.0),
                ..FaderConfig::default()
            },
            clock_zone: self.clock_zone(),
            ..ControllerConfig::default()
        }
    }
}
