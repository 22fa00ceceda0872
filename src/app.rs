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

use std::sync::mpsc::{self, TryRecvError};
use std::time::Duration;

use eframe::egui;
use log::{error, info};
use radar_core::frames::DEFAULT_TIMEOUT;
use radar_core::{Mode, RainViewerSource};
use walkers::sources::TileSource;

use crate::config::AppConfig;
use crate::geolocation;
use crate::map::{get_visible_tiles, MapView, OsmTileSource, TileManager, TILE_SIZE};
use crate::radar_service::{RadarCommand, RadarService};
use crate::surface::EguiSurface;
use crate::weather::{radar_tile_zoom, rainviewer, RainLegend, RainViewerTileSource};

const USER_MARKER_RADIUS: f32 = 6.0;
const USER_MARKER_COLOR: egui::Color32 = egui::Color32::from_rgb(30, 110, 230);
const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 50, 50);
// Scroll pixels per zoom level
const SCROLL_ZOOM_RATE: f32 = 200.0;

type Radar = RadarService<EguiSurface, RainViewerSource>;

pub struct RadarApp {
    config: AppConfig,
    view: MapView,
    tiles: TileManager,
    basemap: OsmTileSource,
    surface: EguiSurface,
    radar: Option<Radar>,
    legend: RainLegend,
    user_location: Option<(f64, f64)>,
    location_rx: Option<mpsc::Receiver<(f64, f64)>>,
}

impl std::fmt::Debug for RadarApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarApp")
            .field("view", &self.view)
            .field("user_location", &self.user_location)
            .finish_non_exhaustive()
    }
}

impl RadarApp {
    pub fn new(ctx: egui::Context, config: AppConfig) -> Self {
        let surface = EguiSurface::new(ctx.clone());
        let source = RainViewerSource::with_url(config.weather_maps_url.clone(), DEFAULT_TIMEOUT);

        let radar = match RadarService::spawn(surface.clone(), source, config.controller_config()) {
            Ok(radar) => Some(radar),
            Err(e) => {
                error!("Failed to start radar service: {e}");
                None
            }
        };

        let mut view = MapView::new(
            config.default_latitude,
            config.default_longitude,
            config.default_zoom,
        );

        let mut user_location = None;
        let mut location_rx = None;
        if let Some((lat, lon)) = config.override_location() {
            info!("Using configured location {lat}, {lon}");
            view.fly_to(lat, lon, config.located_zoom);
            user_location = Some((lat, lon));
        } else if config.geolocate {
            location_rx = Some(geolocation::locate_in_background(ctx));
        }

        Self {
            config,
            view,
            tiles: TileManager::new(),
            basemap: OsmTileSource,
            surface,
            radar,
            legend: RainLegend::default(),
            user_location,
            location_rx,
        }
    }

    fn poll_location(&mut self) {
        let Some(rx) = &self.location_rx else {
            return;
        };

        match rx.try_recv() {
            Ok((lat, lon)) => {
                self.view.fly_to(lat, lon, self.config.located_zoom);
                self.user_location = Some((lat, lon));
                self.location_rx = None;
            }
            Err(TryRecvError::Disconnected) => self.location_rx = None,
            Err(TryRecvError::Empty) => {}
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if response.hovered() {
            let (zoom_delta, scroll) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y));
            if (zoom_delta - 1.0).abs() > 0.001 {
                self.view.zoom_by(zoom_delta.log2());
            } else if scroll.abs() > f32::EPSILON {
                self.view.zoom_by(scroll / SCROLL_ZOOM_RATE);
            }
        }

        if response.dragged() {
            let delta = response.drag_delta();
            self.view.pan(delta.x, delta.y);
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        self.tiles.begin_frame();

        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );
        self.handle_input(ui, &response);

        let rect = response.rect;
        let center = rect.center();
        let full_uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 220, 240));

        let view_zoom = self.view.tile_zoom();
        for tile in get_visible_tiles(
            self.view.center_lat,
            self.view.center_lon,
            view_zoom,
            TILE_SIZE,
            rect.width(),
            rect.height(),
            true,
        ) {
            if let Some(texture) = self.tiles.get_tile(&self.basemap, tile.coord, ui.ctx()) {
                let tile_rect = egui::Rect::from_min_size(
                    center + egui::vec2(tile.offset_x, tile.offset_y),
                    egui::vec2(TILE_SIZE, TILE_SIZE),
                );
                painter.image(texture.id(), tile_rect, full_uv, egui::Color32::WHITE);
            }
        }

        // Radar layers, oldest first so the incoming frame ends up on top
        let (radar_zoom, radar_tile_px) = radar_tile_zoom(view_zoom, self.config.radar_max_zoom);
        for layer in self.surface.visible_layers() {
            let source = RainViewerTileSource::new(layer.frame, self.config.radar_max_zoom);
            let tint = egui::Color32::WHITE.gamma_multiply(layer.opacity);
            let shift = egui::vec2(layer.offset.x, layer.offset.y);

            for tile in get_visible_tiles(
                self.view.center_lat,
                self.view.center_lon,
                radar_zoom,
                radar_tile_px,
                rect.width(),
                rect.height(),
                false,
            ) {
                if let Some(texture) = self.tiles.get_tile(&source, tile.coord, ui.ctx()) {
                    let tile_rect = egui::Rect::from_min_size(
                        center + egui::vec2(tile.offset_x, tile.offset_y) + shift,
                        egui::vec2(radar_tile_px, radar_tile_px),
                    );
                    painter.image(texture.id(), tile_rect, full_uv, tint);
                }
            }
        }

        if let Some((lat, lon)) = self.user_location {
            let pos = self.view.project(lat, lon, center);
            if rect.contains(pos) {
                painter.circle_filled(pos, USER_MARKER_RADIUS, USER_MARKER_COLOR.gamma_multiply(0.6));
                painter.circle_stroke(
                    pos,
                    USER_MARKER_RADIUS,
                    egui::Stroke::new(2.0, USER_MARKER_COLOR),
                );
            }
        }

        // Attribution (required by OpenStreetMap)
        painter.text(
            rect.left_bottom() + egui::vec2(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            format!("{} | {}", self.basemap.attribution().text, rainviewer::ATTRIBUTION),
            egui::FontId::proportional(10.0),
            egui::Color32::from_black_alpha(180),
        );

        let failed = self.tiles.get_error_count();
        let status = if failed > 0 {
            Some(format!("Failed to load {failed} tiles"))
        } else if self.tiles.has_loading_tiles() {
            Some("Loading tiles...".to_string())
        } else {
            None
        };
        if let Some(status) = status {
            painter.text(
                rect.center_bottom() + egui::vec2(0.0, -10.0),
                egui::Align2::CENTER_BOTTOM,
                status,
                egui::FontId::proportional(11.0),
                egui::Color32::from_black_alpha(200),
            );
        }
    }

    fn draw_controls(&self, ctx: &egui::Context) {
        egui::Window::new("Radar")
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                let Some(radar) = &self.radar else {
                    ui.colored_label(WARNING_COLOR, "Radar service unavailable");
                    return;
                };

                let mode = radar.mode();
                let minutes = self.config.simulate_minutes;
                ui.horizontal(|ui| {
                    if ui.selectable_label(mode == Mode::Live, "Live").clicked() {
                        radar.send(RadarCommand::ShowLive);
                    }
                    if ui.selectable_label(mode == Mode::History, "History").clicked() {
                        radar.send(RadarCommand::ShowHistory);
                    }
                    if ui
                        .selectable_label(mode == Mode::Simulation, format!("Simulate {minutes} min"))
                        .clicked()
                    {
                        radar.send(RadarCommand::Simulate(minutes));
                    }
                    if ui.button("Stop simulation").clicked() {
                        radar.send(RadarCommand::StopSimulation);
                    }
                });

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    let clock = radar
                        .clock()
                        .map_or_else(|| "--:--".to_string(), |reading| reading.label);
                    ui.label(egui::RichText::new(clock).monospace().size(20.0).strong());
                    ui.label(egui::RichText::new(mode.label()).monospace().size(11.0));
                });

                if let Some(warning) = radar.warning() {
                    ui.colored_label(WARNING_COLOR, warning);
                }
            });
    }
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep the clock and warnings fresh between radar updates
        ctx.request_repaint_after(Duration::from_millis(500));

        self.poll_location();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui);
            });

        self.draw_controls(ctx);
        self.legend.show(ctx);
    }
}
