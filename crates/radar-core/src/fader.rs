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

//! Cross-fade between the outgoing and incoming radar layers.
//!
//! The incoming layer is shown at full base opacity right away; only the
//! outgoing layer is animated, losing a fixed amount of opacity per step
//! until it is removed. At most one fade runs at a time: starting a new
//! transition drops whatever layer the previous fade was still holding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::surface::{LayerHandle, RadarSurface};

// Keeps a misconfigured step from fading forever
const MIN_OPACITY_STEP: f32 = 0.01;

/// Fade timing and opacity settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaderConfig {
    /// Opacity of a freshly shown layer.
    pub base_opacity: f32,
    /// Delay between two fade steps.
    pub step_interval: Duration,
    /// Opacity removed from the outgoing layer per step.
    pub opacity_step: f32,
}

impl Default for FaderConfig {
    fn default() -> Self {
        Self {
            base_opacity: 0.7,
            step_interval: Duration::from_millis(50),
            opacity_step: 0.08,
        }
    }
}

impl FaderConfig {
    /// Number of steps a fade takes before the layer is removed.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "opacity ratios are small and positive"
    )]
    pub fn steps_to_clear(&self) -> u32 {
        (self.base_opacity.max(0.0) / self.effective_step()).ceil() as u32
    }

    fn effective_step(&self) -> f32 {
        self.opacity_step.max(MIN_OPACITY_STEP)
    }
}

struct ActiveFade {
    id: u64,
    layer: LayerHandle,
    cancel: CancellationToken,
}

/// Runs layer transitions on a [`RadarSurface`].
pub struct LayerFader<S> {
    surface: Arc<S>,
    config: FaderConfig,
    active: Arc<Mutex<Option<ActiveFade>>>,
    next_id: AtomicU64,
}

impl<S> std::fmt::Debug for LayerFader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerFader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: RadarSurface> LayerFader<S> {
    #[must_use]
    pub fn new(surface: Arc<S>, config: FaderConfig) -> Self {
        Self {
            surface,
            config,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Show `incoming` and fade `outgoing` out.
    ///
    /// Must be called from within a tokio runtime when `outgoing` is set,
    /// since the fade runs as a background task.
    pub fn transition(&self, outgoing: Option<LayerHandle>, incoming: LayerHandle) {
        self.surface.set_opacity(incoming, self.config.base_opacity);
        self.surface.add_to_surface(incoming);

        let outgoing = outgoing.filter(|layer| *layer != incoming);

        let mut active = lock(&self.active);
        if let Some(prior) = active.take() {
            prior.cancel.cancel();
            if Some(prior.layer) != outgoing {
                debug!("Fade of {} interrupted, removing it now", prior.layer);
                self.surface.remove_from_surface(prior.layer);
            }
        }

        let Some(layer) = outgoing else {
            return;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        *active = Some(ActiveFade {
            id,
            layer,
            cancel: cancel.clone(),
        });
        drop(active);

        tokio::spawn(run_fade(
            Arc::clone(&self.surface),
            Arc::clone(&self.active),
            self.config,
            id,
            layer,
            cancel,
        ));
    }

    /// Layer currently fading out, if any.
    #[must_use]
    pub fn fading_layer(&self) -> Option<LayerHandle> {
        lock(&self.active).as_ref().map(|fade| fade.layer)
    }

    #[must_use]
    pub fn config(&self) -> &FaderConfig {
        &self.config
    }
}

impl<S> Drop for LayerFader<S> {
    fn drop(&mut self) {
        if let Some(fade) = lock(&self.active).take() {
            fade.cancel.cancel();
        }
    }
}

fn lock(active: &Mutex<Option<ActiveFade>>) -> MutexGuard<'_, Option<ActiveFade>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_fade<S: RadarSurface>(
    surface: Arc<S>,
    active: Arc<Mutex<Option<ActiveFade>>>,
    config: FaderConfig,
    id: u64,
    layer: LayerHandle,
    cancel: CancellationToken,
) {
    let step = config.effective_step();
    let mut opacity = config.base_opacity;

    let mut ticker = interval_at(Instant::now() + config.step_interval, config.step_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        opacity -= step;

        // The slot decides who removes the layer, so it goes exactly once
        let mut slot = lock(&active);
        if !slot.as_ref().is_some_and(|fade| fade.id == id) {
            return;
        }

        surface.set_opacity(layer, opacity.max(0.0));

        if opacity <= 0.0 {
            *slot = None;
            surface.remove_from_surface(layer);
            debug!("Faded out {layer}");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::Frame;
    use crate::testing::{RecordingSurface, SurfaceEvent};

    fn fader() -> (Arc<RecordingSurface>, LayerFader<RecordingSurface>) {
        let surface = Arc::new(RecordingSurface::default());
        let fader = LayerFader::new(Arc::clone(&surface), FaderConfig::default());
        (surface, fader)
    }

    #[test]
    fn test_steps_to_clear() {
        assert_eq!(FaderConfig::default().steps_to_clear(), 9);

        let stuck = FaderConfig {
            opacity_step: 0.0,
            ..FaderConfig::default()
        };
        assert!((70..=71).contains(&stuck.steps_to_clear()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_layer_has_nothing_to_fade() {
        let (surface, fader) = fader();
        let layer = surface.create_overlay(Frame::from_unix(100));

        fader.transition(None, layer);

        assert_eq!(
            &surface.events()[1..],
            &[SurfaceEvent::Opacity(layer, 0.7), SurfaceEvent::Added(layer)]
        );
        assert!(fader.fading_layer().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_terminates_and_removes_once() {
        let (surface, fader) = fader();
        let old = surface.create_overlay(Frame::from_unix(100));
        let new = surface.create_overlay(Frame::from_unix(200));
        fader.transition(None, old);

        fader.transition(Some(old), new);
        assert_eq!(fader.fading_layer(), Some(old));

        tokio::time::sleep(Duration::from_millis(50 * 8 + 10)).await;
        assert_eq!(surface.removal_counts().get(&old), None);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(surface.removal_counts().get(&old), Some(&1));
        assert!(fader.fading_layer().is_none());

        // Base opacity, then nine decreasing steps ending at zero
        let steps = surface.opacities(old);
        assert_eq!(steps.len(), 10);
        assert!(steps.windows(2).all(|w| w[1] < w[0]));
        assert!(steps.last().copied().unwrap().abs() < f32::EPSILON);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(surface.removal_counts().get(&old), Some(&1));
        assert_eq!(surface.removal_counts().get(&new), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_transition_replaces_running_fade() {
        let (surface, fader) = fader();
        let first = surface.create_overlay(Frame::from_unix(100));
        let second = surface.create_overlay(Frame::from_unix(200));
        let third = surface.create_overlay(Frame::from_unix(300));
        fader.transition(None, first);

        fader.transition(Some(first), second);
        tokio::time::sleep(Duration::from_millis(120)).await;

        // First is dropped immediately rather than left fading
        fader.transition(Some(second), third);
        assert_eq!(surface.removal_counts().get(&first), Some(&1));
        assert_eq!(fader.fading_layer(), Some(second));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let removals = surface.removal_counts();
        assert_eq!(removals.get(&first), Some(&1));
        assert_eq!(removals.get(&second), Some(&1));
        assert_eq!(removals.get(&third), None);

        // No opacity updates reached the dropped layer after its removal
        let events = surface.events();
        let removed_at = events
            .iter()
            .position(|e| *e == SurfaceEvent::Removed(first))
            .unwrap();
        assert!(!events[removed_at..]
            .iter()
            .any(|e| matches!(e, SurfaceEvent::Opacity(l, _) if *l == first)));
    }
}
