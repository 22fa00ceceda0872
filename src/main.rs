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

mod app;
mod config;
mod geolocation;
mod map;
mod radar_service;
mod surface;
mod weather;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use log::{debug, info};

use app::RadarApp;
use config::AppConfig;

/// Live weather radar over an interactive map
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Load configuration from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial map latitude
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Initial map longitude
    #[arg(long, allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Initial map zoom level
    #[arg(long)]
    zoom: Option<f32>,

    /// Skip IP geolocation at startup
    #[arg(long)]
    no_geolocate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(lat) = self.lat {
            config.default_latitude = lat;
        }
        if let Some(lon) = self.lon {
            config.default_longitude = lon;
        }
        if let Some(zoom) = self.zoom {
            config.default_zoom = zoom;
        }
        if self.no_geolocate {
            config.geolocate = false;
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("Starting Radar Overlay...");

    if cli.config.is_none() {
        if let Ok(path) = AppConfig::get_config_path() {
            debug!("Configuration file: {}", path.display());
        }
    }
    let mut config = AppConfig::load_or_default(cli.config.as_deref());
    cli.apply(&mut config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Radar Overlay"),
        ..Default::default()
    };

    eframe::run_native(
        "Radar Overlay",
        options,
        Box::new(|cc| Ok(Box::new(RadarApp::new(cc.egui_ctx.clone(), config)))),
    )
}
