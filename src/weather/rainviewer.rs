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

//! RainViewer radar tile source implementation.

use radar_core::Frame;
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

use crate::map::TILE_SIZE;

/// Highest zoom RainViewer renders natively
pub const DEFAULT_MAX_ZOOM: u8 = 10;

pub const ATTRIBUTION: &str = "Radar data © RainViewer";

/// Color scheme 2 (universal blue), smoothing on, snow colors on
const TILE_OPTIONS: &str = "2/1_1";

/// Tile source for a single radar frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainViewerTileSource {
    frame: Frame,
    max_zoom: u8,
}

impl RainViewerTileSource {
    pub fn new(frame: Frame, max_zoom: u8) -> Self {
        Self { frame, max_zoom }
    }
}

impl TileSource for RainViewerTileSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tilecache.rainviewer.com/v2/radar/{}/256/{}/{}/{}/{TILE_OPTIONS}.png",
            self.frame.timestamp(),
            tile_id.zoom,
            tile_id.x,
            tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: ATTRIBUTION,
            url: "https://www.rainviewer.com/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

/// Zoom to fetch radar tiles at, and the on-screen size of one tile.
///
/// Beyond the native maximum, tiles from the maximum zoom are scaled up.
pub fn radar_tile_zoom(view_zoom: u8, max_zoom: u8) -> (u8, f32) {
    if view_zoom <= max_zoom {
        return (view_zoom, TILE_SIZE);
    }

    let scale = 2_f32.powi(i32::from(view_zoom - max_zoom));
    (max_zoom, TILE_SIZE * scale)
}
