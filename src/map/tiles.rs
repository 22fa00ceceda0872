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

//! Tile download, decoding and texture caching.
//!
//! Tiles are keyed by URL, so one manager serves the basemap and every radar
//! frame. Downloads run on background threads and request a repaint once the
//! texture is ready.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use egui::{ColorImage, TextureHandle, TextureOptions};
use log::{debug, warn};
use walkers::sources::TileSource;
use walkers::TileId;

pub const TILE_SIZE: f32 = 256.0;

// Old radar frames pile up quickly, keep the cache bounded
const MAX_CACHED_TILES: usize = 1024;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to Web Mercator Y coordinate in tile units
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to Web Mercator X coordinate in tile units
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert tile coordinates back to latitude
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        x / n * 360.0 - 180.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    pub fn tile_id(self) -> TileId {
        TileId {
            x: self.x,
            y: self.y,
            zoom: self.zoom,
        }
    }
}

/// A tile to draw, with its top-left corner relative to the view center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleTile {
    pub coord: TileCoord,
    pub offset_x: f32,
    pub offset_y: f32,
}

enum TileState {
    Loading,
    Loaded { texture: TextureHandle, last_used: u64 },
    Failed,
}

type TileCache = Arc<Mutex<HashMap<String, TileState>>>;

/// In-memory texture cache for map and radar tiles.
pub struct TileManager {
    client: reqwest::blocking::Client,
    tiles: TileCache,
    frame_counter: AtomicU64,
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("cached", &lock(&self.tiles).len())
            .finish_non_exhaustive()
    }
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(tiles: &TileCache) -> MutexGuard<'_, HashMap<String, TileState>> {
    tiles.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TileManager {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("radar-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure tile client, using defaults: {e}");
                reqwest::blocking::Client::new()
            });

        Self {
            client,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            frame_counter: AtomicU64::new(0),
        }
    }

    /// Mark the start of a repaint. Tiles not used for a while are evicted
    /// once the cache is full.
    pub fn begin_frame(&self) {
        let frame = self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1;

        let mut tiles = lock(&self.tiles);
        if tiles.len() <= MAX_CACHED_TILES {
            return;
        }

        tiles.retain(|_, state| match state {
            TileState::Loading => true,
            TileState::Loaded { last_used, .. } => frame.saturating_sub(*last_used) < 2,
            TileState::Failed => false,
        });
        debug!("Evicted stale tiles, {} remain", tiles.len());
    }

    /// Get tile from cache or queue it for download
    pub fn get_tile<S: TileSource + ?Sized>(
        &self,
        source: &S,
        coord: TileCoord,
        ctx: &egui::Context,
    ) -> Option<TextureHandle> {
        let url = source.tile_url(coord.tile_id());
        let frame = self.frame_counter.load(Ordering::Relaxed);

        let mut tiles = lock(&self.tiles);
        match tiles.get_mut(&url) {
            Some(TileState::Loaded { texture, last_used }) => {
                *last_used = frame;
                Some(texture.clone())
            }
            Some(TileState::Loading | TileState::Failed) => None,
            None => {
                tiles.insert(url.clone(), TileState::Loading);
                drop(tiles);
                self.queue_download(url, ctx.clone());
                None
            }
        }
    }

    fn queue_download(&self, url: String, ctx: egui::Context) {
        let client = self.client.clone();
        let tiles = Arc::clone(&self.tiles);

        std::thread::spawn(move || {
            let state = match download_tile(&client, &url) {
                Ok(image) => {
                    let texture = ctx.load_texture(url.clone(), image, TextureOptions::default());
                    TileState::Loaded {
                        texture,
                        last_used: 0,
                    }
                }
                Err(e) => {
                    warn!("Failed to load tile {url}: {e}");
                    TileState::Failed
                }
            };

            lock(&tiles).insert(url, state);
            ctx.request_repaint();
        });
    }

    pub fn has_loading_tiles(&self) -> bool {
        lock(&self.tiles)
            .values()
            .any(|state| matches!(state, TileState::Loading))
    }

    pub fn get_error_count(&self) -> usize {
        lock(&self.tiles)
            .values()
            .filter(|state| matches!(state, TileState::Failed))
            .count()
    }
}

fn download_tile(client: &reqwest::blocking::Client, url: &str) -> Result<ColorImage, String> {
    debug!("Downloading tile: {url}");

    let response = client.get(url).send().map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = response.bytes().map_err(|e| e.to_string())?;
    let img = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];

    Ok(ColorImage::from_rgba_unmultiplied(size, &rgba.into_raw()))
}

/// Tiles at `zoom` covering a viewport centered on the given position.
///
/// `tile_px` is the on-screen size of one tile, larger than [`TILE_SIZE`]
/// when tiles from a lower zoom are scaled up. With `wrap` unset, columns
/// past the antimeridian are left out instead of repeating the world.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "tile indices are bounded by the zoom level"
)]
pub fn get_visible_tiles(
    center_lat: f64,
    center_lon: f64,
    zoom: u8,
    tile_px: f32,
    viewport_width: f32,
    viewport_height: f32,
    wrap: bool,
) -> Vec<VisibleTile> {
    let mut tiles = Vec::new();

    let center_tile_x = WebMercator::lon_to_x(center_lon, zoom);
    let center_tile_y = WebMercator::lat_to_y(center_lat, zoom);

    let tiles_wide = (viewport_width / tile_px).ceil() as i64 + 2;
    let tiles_high = (viewport_height / tile_px).ceil() as i64 + 2;

    let start_x = center_tile_x.floor() as i64 - tiles_wide / 2;
    let start_y = center_tile_y.floor() as i64 - tiles_high / 2;

    let max_tile = 1_i64 << zoom;

    for dy in 0..tiles_high {
        for dx in 0..tiles_wide {
            let tile_x = start_x + dx;
            let tile_y = start_y + dy;

            // Latitude doesn't wrap
            if tile_y < 0 || tile_y >= max_tile {
                continue;
            }
            if !wrap && (tile_x < 0 || tile_x >= max_tile) {
                continue;
            }
            let wrapped_x = tile_x.rem_euclid(max_tile);

            tiles.push(VisibleTile {
                coord: TileCoord::new(wrapped_x as u32, tile_y as u32, zoom),
                offset_x: ((tile_x as f64 - center_tile_x) * f64::from(tile_px)) as f32,
                offset_y: ((tile_y as f64 - center_tile_y) * f64::from(tile_px)) as f32,
            });
        }
    }

    tiles
}
