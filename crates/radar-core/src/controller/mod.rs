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

//! Playback mode state machine.
//!
//! [`ModeController`] switches between three mutually exclusive modes:
//!
//! - **Live**: show the newest radar frame and poll for a newer one
//! - **History**: step through the most recent frames, then go back to Live
//! - **Simulation**: slide the displayed frame to suggest where rain is
//!   heading
//!
//! Each mode owns at most one recurring timer, and the controller keeps a
//! single slot for it, so entering a mode always tears down the previous
//! mode's timer first. Every tick re-checks under the controller lock that
//! its mode activation is still current before touching the map.

mod state;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::{ClockDisplay, ClockReading, ClockZone};
use crate::error::ControllerError;
use crate::fader::{FaderConfig, LayerFader};
use crate::frames::{Frame, FrameSet, FrameSource};
use crate::surface::{LayerHandle, PixelOffset, RadarSurface};

use state::{ControllerState, PlaybackTimer, SimulationOffset};

/// Active playback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Live,
    History,
    Simulation,
}

impl Mode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mode::Live => "LIVE",
            Mode::History => "HISTORY",
            Mode::Simulation => "SIMULATION",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settings for the cosmetic motion simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Delay between two offset updates.
    pub step_interval: Duration,
    /// Simulated minutes represented by one step.
    pub minutes_per_step: u32,
    /// Translation added per step.
    pub offset_per_step: PixelOffset,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(700),
            minutes_per_step: 5,
            offset_per_step: PixelOffset::new(14.0, 8.0),
        }
    }
}

impl SimulationConfig {
    /// Number of offset updates needed to cover `minutes`. Always at least one.
    #[must_use]
    pub fn steps_for(&self, minutes: u32) -> u32 {
        minutes.div_ceil(self.minutes_per_step.max(1)).max(1)
    }
}

/// Controller timing and presentation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Live mode poll period.
    pub update_interval: Duration,
    /// Delay between two history frames.
    pub frame_delay: Duration,
    /// Number of recent frames replayed in History mode.
    pub max_history: usize,
    pub simulation: SimulationConfig,
    pub fader: FaderConfig,
    pub clock_zone: ClockZone,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(3 * 60),
            frame_delay: Duration::from_millis(700),
            max_history: 10,
            simulation: SimulationConfig::default(),
            fader: FaderConfig::default(),
            clock_zone: ClockZone::Local,
        }
    }
}

/// A radar layer on the surface, bound to the frame it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayer {
    frame: Frame,
    handle: LayerHandle,
}

impl OverlayLayer {
    fn create<S: RadarSurface>(surface: &S, frame: Frame) -> Self {
        Self {
            frame,
            handle: surface.create_overlay(frame),
        }
    }

    #[must_use]
    pub fn frame(&self) -> Frame {
        self.frame
    }

    #[must_use]
    pub fn handle(&self) -> LayerHandle {
        self.handle
    }
}

enum HistoryStep {
    Shown,
    Stale,
    Finished { request: u64, generation: u64 },
}

struct Inner<S, F> {
    surface: Arc<S>,
    source: F,
    fader: LayerFader<S>,
    clock: ClockDisplay,
    config: ControllerConfig,
    state: Mutex<ControllerState>,
}

/// Owns the displayed radar layer, the current frame set, and every playback
/// timer.
///
/// Cloning yields another handle to the same controller. Timer tasks only
/// hold weak references, so dropping the last handle stops playback.
pub struct ModeController<S, F> {
    inner: Arc<Inner<S, F>>,
}

impl<S, F> Clone for ModeController<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, F> fmt::Debug for ModeController<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeController")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<S: RadarSurface, F: FrameSource> ModeController<S, F> {
    #[must_use]
    pub fn new(surface: S, source: F, config: ControllerConfig) -> Self {
        let surface = Arc::new(surface);
        let fader = LayerFader::new(Arc::clone(&surface), config.fader);
        let clock = ClockDisplay::new(config.clock_zone);

        Self {
            inner: Arc::new(Inner {
                surface,
                source,
                fader,
                clock,
                config,
                state: Mutex::new(ControllerState::default()),
            }),
        }
    }

    /// Show the newest frame and keep polling for newer ones.
    ///
    /// The previous mode's timer stops before the fetch starts. A failed
    /// fetch still leaves Live running with the current layer in place, so
    /// the next poll retries.
    pub async fn enter_live(&self) -> Result<(), ControllerError> {
        let (request, generation) = self.begin_live(&mut self.lock_state());
        self.live_for(request, generation).await
    }

    /// Replay the most recent frames, then return to Live.
    ///
    /// A failed fetch leaves the current mode running.
    pub async fn enter_history(&self) -> Result<(), ControllerError> {
        let request = self.lock_state().begin_request();

        let frames = match self.inner.source.fetch_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                if self.lock_state().is_superseded(request) {
                    debug!("History request {request} superseded, ignoring its failure");
                    return Ok(());
                }
                warn!("History playback unavailable, keeping current mode: {e}");
                return Err(e.into());
            }
        };

        let mut state = self.lock_state();
        if state.is_superseded(request) {
            debug!("History request {request} superseded, dropping its frames");
            return Ok(());
        }

        let generation = self.neutralize(&mut state);
        state.mode = Mode::History;

        let playlist = frames.recent(self.inner.config.max_history).to_vec();
        state.frames = frames;

        info!("Playing back {} radar frames", playlist.len());
        self.arm_history(&mut state, generation, playlist);
        Ok(())
    }

    /// Slide the displayed layer to suggest `minutes` of motion.
    ///
    /// Returns `false` without doing anything when no layer is displayed.
    pub fn enter_simulation(&self, minutes: u32) -> bool {
        match self.try_enter_simulation(minutes) {
            Ok(()) => true,
            Err(e) => {
                warn!("Simulation not started: {e}");
                false
            }
        }
    }

    /// Stop the simulation timer and put the layer back in place.
    pub fn stop_simulation(&self) {
        let mut state = self.lock_state();

        if state
            .timer
            .as_ref()
            .is_some_and(|timer| timer.mode() == Mode::Simulation)
        {
            state.timer = None;
            state.generation += 1;
        }

        if let Some(simulation) = state.simulation.take() {
            self.inner
                .surface
                .translate(simulation.layer, PixelOffset::ZERO);
            info!("Simulation stopped");
        }
    }

    /// Cancel every timer and ignore fetches still in flight.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        state.begin_request();
        self.neutralize(&mut state);
        info!("Radar playback stopped");
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock_state().mode
    }

    /// Frame of the layer currently shown.
    #[must_use]
    pub fn displayed_frame(&self) -> Option<Frame> {
        self.lock_state().displayed_frame()
    }

    /// Frames from the most recent successful fetch.
    #[must_use]
    pub fn frames(&self) -> FrameSet {
        self.lock_state().frames.clone()
    }

    /// Mode owning the running playback timer, if one is running.
    #[must_use]
    pub fn active_timer(&self) -> Option<Mode> {
        self.lock_state().timer.as_ref().map(PlaybackTimer::mode)
    }

    #[must_use]
    pub fn has_active_timer(&self) -> bool {
        self.active_timer().is_some()
    }

    /// Translation currently applied by the simulation.
    #[must_use]
    pub fn simulation_offset(&self) -> Option<PixelOffset> {
        self.lock_state().simulation.map(|s| s.offset)
    }

    #[must_use]
    pub fn clock(&self) -> &ClockDisplay {
        &self.inner.clock
    }

    #[must_use]
    pub fn subscribe_clock(&self) -> watch::Receiver<Option<ClockReading>> {
        self.inner.clock.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn upgrade(inner: &Weak<Inner<S, F>>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Tear down the running timer and any simulation offset. Returns the
    /// generation the next timer must carry.
    fn neutralize(&self, state: &mut ControllerState) -> u64 {
        if let Some(timer) = state.timer.take() {
            debug!("Cancelled {} timer", timer.mode());
        }

        if let Some(simulation) = state.simulation.take() {
            if !simulation.offset.is_zero() {
                self.inner
                    .surface
                    .translate(simulation.layer, PixelOffset::ZERO);
            }
        }

        state.generation += 1;
        state.generation
    }

    /// Build a layer for `frame`, swap it in and update the clock.
    fn display(&self, state: &mut ControllerState, frame: Frame) {
        let layer = OverlayLayer::create(&*self.inner.surface, frame);
        let outgoing = state.current.replace(layer).map(|l| l.handle());

        self.inner.fader.transition(outgoing, layer.handle());
        self.inner.clock.show(frame);
    }

    /// Switch to Live ahead of its fetch. Returns the request and timer
    /// generation the fetch must still own when it finishes.
    fn begin_live(&self, state: &mut ControllerState) -> (u64, u64) {
        let request = state.begin_request();
        let generation = self.neutralize(state);
        state.mode = Mode::Live;
        (request, generation)
    }

    async fn live_for(&self, request: u64, generation: u64) -> Result<(), ControllerError> {
        let fetched = self.inner.source.fetch_frames().await;

        let mut state = self.lock_state();
        if state.is_superseded(request) {
            debug!("Live request {request} superseded, dropping its frames");
            return Ok(());
        }

        let result = match fetched {
            Ok(frames) => {
                if let Some(latest) = frames.latest() {
                    info!("Live radar showing frame {latest}");
                    self.display(&mut state, latest);
                }
                state.frames = frames;
                Ok(())
            }
            Err(e) => {
                warn!("Live radar refresh failed, keeping current frame: {e}");
                Err(e.into())
            }
        };

        self.arm_live_poll(&mut state, generation);
        result
    }

    fn arm_live_poll(&self, state: &mut ControllerState, generation: u64) {
        let period = self.inner.config.update_interval;
        let cancel = CancellationToken::new();
        state.timer = Some(PlaybackTimer::new(Mode::Live, cancel.clone()));

        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let Some(controller) = Self::upgrade(&weak) else {
                    return;
                };
                controller.poll_live(generation).await;
            }
        });
    }

    async fn poll_live(&self, generation: u64) {
        let still_live = self.lock_state().is_current(generation, Mode::Live);
        if !still_live {
            debug!("Skipping stale live poll");
            return;
        }

        let frames = match self.inner.source.fetch_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Live radar poll failed, keeping current frame: {e}");
                return;
            }
        };

        let mut state = self.lock_state();
        if !state.is_current(generation, Mode::Live) {
            debug!("Mode changed during live poll, dropping its frames");
            return;
        }

        let Some(latest) = frames.latest() else {
            return;
        };
        let unchanged = state.displayed_frame() == Some(latest);
        state.frames = frames;

        if unchanged {
            debug!("Radar frame {latest} unchanged");
            return;
        }

        info!("New radar frame {latest}");
        self.display(&mut state, latest);
    }

    fn arm_history(&self, state: &mut ControllerState, generation: u64, playlist: Vec<Frame>) {
        let delay = self.inner.config.frame_delay;
        let cancel = CancellationToken::new();
        state.timer = Some(PlaybackTimer::new(Mode::History, cancel.clone()));

        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + delay, delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut next = 0;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let Some(controller) = Self::upgrade(&weak) else {
                    return;
                };

                match controller.history_step(generation, &playlist, &mut next) {
                    HistoryStep::Shown => {}
                    HistoryStep::Stale => return,
                    HistoryStep::Finished { request, generation } => {
                        if let Err(e) = controller.live_for(request, generation).await {
                            debug!("Back in live mode without a fresh frame: {e}");
                        }
                        return;
                    }
                }
            }
        });
    }

    fn history_step(&self, generation: u64, playlist: &[Frame], next: &mut usize) -> HistoryStep {
        let mut state = self.lock_state();
        if !state.is_current(generation, Mode::History) {
            return HistoryStep::Stale;
        }

        let Some(&frame) = playlist.get(*next) else {
            info!("History playback finished, returning to live radar");
            let (request, generation) = self.begin_live(&mut state);
            return HistoryStep::Finished {
                request,
                generation,
            };
        };

        debug!("History frame {}/{}: {frame}", *next + 1, playlist.len());
        self.display(&mut state, frame);
        *next += 1;
        HistoryStep::Shown
    }

    fn try_enter_simulation(&self, minutes: u32) -> Result<(), ControllerError> {
        let mut state = self.lock_state();
        let layer = state
            .current
            .map(|l| l.handle())
            .ok_or(ControllerError::NoActiveLayer)?;

        state.begin_request();
        let generation = self.neutralize(&mut state);
        state.mode = Mode::Simulation;
        state.simulation = Some(SimulationOffset {
            layer,
            offset: PixelOffset::ZERO,
        });

        let steps = self.inner.config.simulation.steps_for(minutes);
        info!("Simulating {minutes} minutes of radar motion in {steps} steps");
        self.arm_simulation(&mut state, generation, layer, steps);
        Ok(())
    }

    fn arm_simulation(
        &self,
        state: &mut ControllerState,
        generation: u64,
        layer: LayerHandle,
        steps: u32,
    ) {
        let period = self.inner.config.simulation.step_interval;
        let cancel = CancellationToken::new();
        state.timer = Some(PlaybackTimer::new(Mode::Simulation, cancel.clone()));

        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut step = 0;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let Some(controller) = Self::upgrade(&weak) else {
                    return;
                };
                if !controller.simulation_step(generation, layer, steps, &mut step) {
                    return;
                }
            }
        });
    }

    /// Apply the next offset. Returns `false` once the timer should stop.
    fn simulation_step(
        &self,
        generation: u64,
        layer: LayerHandle,
        steps: u32,
        step: &mut u32,
    ) -> bool {
        let mut state = self.lock_state();
        if !state.is_current(generation, Mode::Simulation) {
            return false;
        }

        *step += 1;
        let offset = self.inner.config.simulation.offset_per_step * *step;
        self.inner.surface.translate(layer, offset);
        state.simulation = Some(SimulationOffset { layer, offset });

        if *step >= steps {
            // Timer ends here; the offset stays until another mode or a stop
            state.timer = None;
            debug!("Simulation reached step {steps}, holding offset");
            return false;
        }
        true
    }
}
