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

//! IP-based user location lookup.

use std::sync::mpsc;
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

const IPAPI_URL: &str = "https://ipapi.co/json/";
const IP_API_URL: &str = "http://ip-api.com/json/";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Response shape of ipapi.co
#[derive(Deserialize, Debug)]
struct IpapiLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Response shape of ip-api.com
#[derive(Deserialize, Debug)]
struct IpApiLocation {
    lat: Option<f64>,
    lon: Option<f64>,
}

fn valid(lat: f64, lon: f64) -> Option<(f64, f64)> {
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

fn parse_ipapi(body: &str) -> Option<(f64, f64)> {
    let location: IpapiLocation = serde_json::from_str(body).ok()?;
    valid(location.latitude?, location.longitude?)
}

fn parse_ip_api(body: &str) -> Option<(f64, f64)> {
    let location: IpApiLocation = serde_json::from_str(body).ok()?;
    valid(location.lat?, location.lon?)
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> Option<String> {
    match client.get(url).send().and_then(reqwest::blocking::Response::text) {
        Ok(body) => Some(body),
        Err(e) => {
            warn!("Location lookup via {url} failed: {e}");
            None
        }
    }
}

/// Look up the current location, trying ipapi.co then ip-api.com
pub fn get_current_location() -> Option<(f64, f64)> {
    info!("Fetching current location...");

    let client = match reqwest::blocking::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build location client: {e}");
            return None;
        }
    };

    if let Some(location) = fetch(&client, IPAPI_URL).as_deref().and_then(parse_ipapi) {
        info!("Location found via ipapi.co: {}, {}", location.0, location.1);
        return Some(location);
    }

    if let Some(location) = fetch(&client, IP_API_URL).as_deref().and_then(parse_ip_api) {
        info!("Location found via ip-api.com: {}, {}", location.0, location.1);
        return Some(location);
    }

    warn!("Failed to fetch location from all sources");
    None
}

/// Run the lookup on a background thread. The receiver yields at most one
/// position; a repaint is requested once it arrives.
pub fn locate_in_background(ctx: egui::Context) -> mpsc::Receiver<(f64, f64)> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        if let Some(location) = get_current_location() {
            if tx.send(location).is_ok() {
                ctx.request_repaint();
            }
        }
    });

    rx
}
