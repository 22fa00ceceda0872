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

//! Map viewport, tile fetching and Web Mercator projection utilities.

pub mod osm;
pub mod tiles;

pub use osm::OsmTileSource;
pub use tiles::{get_visible_tiles, TileManager, WebMercator, TILE_SIZE};

pub const MIN_ZOOM: f32 = 3.0;
pub const MAX_ZOOM: f32 = 18.0;

const MAX_LATITUDE: f64 = 85.0;

/// Center and zoom of the map view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    /// Float for smoother pinch-zoom
    pub zoom: f32,
}

impl MapView {
    pub fn new(center_lat: f64, center_lon: f64, zoom: f32) -> Self {
        Self {
            center_lat: center_lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center_lon,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Integer zoom used for fetching tiles
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "zoom is clamped to a small positive range"
    )]
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.round().clamp(MIN_ZOOM, MAX_ZOOM) as u8
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn fly_to(&mut self, lat: f64, lon: f64, zoom: f32) {
        *self = Self::new(lat, lon, zoom);
    }

    /// Move the view by a screen drag of `dx`/`dy` pixels
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let zoom = self.tile_zoom();
        let tile_px = f64::from(TILE_SIZE);

        let x = WebMercator::lon_to_x(self.center_lon, zoom) - f64::from(dx) / tile_px;
        let y = WebMercator::lat_to_y(self.center_lat, zoom) - f64::from(dy) / tile_px;

        let lon = WebMercator::tile_to_lon(x, zoom);
        self.center_lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        self.center_lat = WebMercator::tile_to_lat(y, zoom).clamp(-MAX_LATITUDE, MAX_LATITUDE);
    }

    /// Screen position of a coordinate, given the screen position of the
    /// view center
    #[allow(clippy::cast_possible_truncation, reason = "screen coordinates")]
    pub fn project(&self, lat: f64, lon: f64, center: egui::Pos2) -> egui::Pos2 {
        let zoom = self.tile_zoom();
        let tile_px = f64::from(TILE_SIZE);

        let dx = (WebMercator::lon_to_x(lon, zoom) - WebMercator::lon_to_x(self.center_lon, zoom))
            * tile_px;
        let dy = (WebMercator::lat_to_y(lat, zoom) - WebMercator::lat_to_y(self.center_lat, zoom))
            * tile_px;

        egui::pos2(center.x + dx as f32, center.y + dy as f32)
    }
}
