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

use egui::Color32;

/// Rain intensity levels, lightest first, matching the radar color scheme
pub const RAIN_LEVELS: [(&str, Color32); 6] = [
    ("Very light", Color32::from_rgb(136, 221, 238)),
    ("Light", Color32::from_rgb(0, 153, 204)),
    ("Moderate", Color32::from_rgb(0, 85, 136)),
    ("Heavy", Color32::from_rgb(255, 238, 0)),
    ("Very heavy", Color32::from_rgb(255, 136, 0)),
    ("Extreme", Color32::from_rgb(193, 0, 0)),
];

/// Collapsible "Rain intensity" legend in the bottom-right corner
#[derive(Debug, Clone)]
pub struct RainLegend {
    expanded: bool,
}

impl Default for RainLegend {
    fn default() -> Self {
        Self { expanded: true }
    }
}

impl RainLegend {
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    /// Toggle button glyph: close when shown, menu when hidden
    pub fn toggle_label(&self) -> &'static str {
        if self.expanded {
            "✕"
        } else {
            "☰"
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("rain_legend"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -30.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.with_layout(egui::Layout::top_down(egui::Align::Max), |ui| {
                        if ui.small_button(self.toggle_label()).clicked() {
                            self.toggle();
                        }
                    });

                    if !self.is_expanded() {
                        return;
                    }

                    ui.label(egui::RichText::new("Rain intensity").strong().size(12.0));
                    ui.add_space(4.0);

                    for (label, color) in RAIN_LEVELS {
                        ui.horizontal(|ui| {
                            let (rect, _) =
                                ui.allocate_exact_size(egui::vec2(18.0, 10.0), egui::Sense::hover());
                            ui.painter().rect_filled(rect, 2.0, color);
                            ui.label(egui::RichText::new(label).size(11.0));
                        });
                    }
                });
            });
    }
}
