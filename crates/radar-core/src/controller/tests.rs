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

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tokio::time::sleep;

use super::*;
use crate::error::FrameError;
use crate::testing::{RecordingSurface, ScriptedSource};

type TestController = ModeController<Arc<RecordingSurface>, Arc<ScriptedSource>>;

const POLL: Duration = Duration::from_secs(180);
const STEP: Duration = Duration::from_millis(700);

fn setup(frames: &[i64]) -> (Arc<RecordingSurface>, Arc<ScriptedSource>, TestController) {
    let surface = Arc::new(RecordingSurface::default());
    let source = Arc::new(ScriptedSource::new(frames));
    let config = ControllerConfig {
        clock_zone: ClockZone::Fixed(FixedOffset::east_opt(0).unwrap()),
        ..ControllerConfig::default()
    };
    let controller = ModeController::new(Arc::clone(&surface), Arc::clone(&source), config);
    (surface, source, controller)
}

fn frame(seconds: i64) -> Frame {
    Frame::from_unix(seconds)
}

#[test]
fn test_simulation_steps() {
    let config = SimulationConfig::default();
    assert_eq!(config.steps_for(30), 6);
    assert_eq!(config.steps_for(7), 2);
    assert_eq!(config.steps_for(0), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enter_live_shows_latest_frame() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);

    controller.enter_live().await.unwrap();

    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.displayed_frame(), Some(frame(300)));
    assert_eq!(controller.frames().len(), 3);
    assert_eq!(surface.created_frames(), vec![300]);
    assert_eq!(controller.active_timer(), Some(Mode::Live));

    let reading = controller.clock().current().unwrap();
    assert_eq!(reading.frame, frame(300));
    assert_eq!(reading.label, "00:05");
}

#[tokio::test(start_paused = true)]
async fn test_live_poll_skips_unchanged_frame() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    let mut clock = controller.subscribe_clock();
    clock.borrow_and_update();

    sleep(POLL + Duration::from_secs(1)).await;
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(surface.created_frames(), vec![300]);
    assert!(!clock.has_changed().unwrap());

    source.set_fallback(&[100, 200, 300, 400]);
    sleep(POLL).await;
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(surface.created_frames(), vec![300, 400]);
    assert!(clock.has_changed().unwrap());
    assert_eq!(controller.displayed_frame(), Some(frame(400)));
}

#[tokio::test(start_paused = true)]
async fn test_live_poll_failure_keeps_display() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    source.push_failure("connection reset");
    sleep(POLL + Duration::from_secs(1)).await;
    assert_eq!(controller.displayed_frame(), Some(frame(300)));
    assert_eq!(controller.active_timer(), Some(Mode::Live));

    // Next cycle retries on its own
    source.set_fallback(&[200, 300, 400]);
    sleep(POLL).await;
    assert_eq!(surface.created_frames(), vec![300, 400]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_enter_live_falls_back_to_polling() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    source.push_failure("dns failure");

    let result = controller.enter_live().await;
    assert!(matches!(result, Err(ControllerError::Frames(_))));
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), Some(Mode::Live));
    assert!(surface.created_frames().is_empty());

    sleep(POLL + Duration::from_secs(1)).await;
    assert_eq!(surface.created_frames(), vec![300]);
}

#[tokio::test(start_paused = true)]
async fn test_history_plays_last_ten_then_returns_live() {
    let frames: Vec<i64> = (1..=12).map(|i| i * 100).collect();
    let (surface, source, controller) = setup(&frames);

    controller.enter_history().await.unwrap();
    assert_eq!(controller.mode(), Mode::History);
    assert_eq!(controller.active_timer(), Some(Mode::History));
    assert!(surface.created_frames().is_empty());

    sleep(Duration::from_millis(1)).await;
    for shown in 1..=10 {
        sleep(STEP).await;
        assert_eq!(surface.created_frames().len(), shown);
        assert_eq!(controller.mode(), Mode::History);
    }
    assert_eq!(surface.created_frames(), frames[2..].to_vec());
    assert_eq!(controller.clock().current().unwrap().frame, frame(1200));

    // One more tick exhausts the playlist and goes back to live
    sleep(STEP).await;
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), Some(Mode::Live));
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(surface.created_frames().len(), 11);
    assert_eq!(controller.displayed_frame(), Some(frame(1200)));
}

#[tokio::test(start_paused = true)]
async fn test_history_with_three_frames() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);

    controller.enter_history().await.unwrap();
    sleep(STEP * 3 + Duration::from_millis(1)).await;
    assert_eq!(surface.created_frames(), vec![100, 200, 300]);
    assert_eq!(controller.mode(), Mode::History);

    sleep(STEP).await;
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(surface.created_frames(), vec![100, 200, 300, 300]);
}

#[tokio::test(start_paused = true)]
async fn test_history_fetch_failure_keeps_live() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    source.push_failure("timeout");
    let result = controller.enter_history().await;
    assert!(matches!(result, Err(ControllerError::Frames(FrameError::Network(_)))));
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), Some(Mode::Live));

    // The live poll armed before the failure is still running
    source.set_fallback(&[100, 200, 300, 400]);
    sleep(POLL + Duration::from_secs(1)).await;
    assert_eq!(surface.created_frames(), vec![300, 400]);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_moves_layer_six_times() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();
    let layer = surface.events().iter().find_map(|e| match e {
        crate::testing::SurfaceEvent::Created(layer, _) => Some(*layer),
        _ => None,
    });
    let layer = layer.unwrap();

    assert!(controller.enter_simulation(30));
    assert_eq!(controller.mode(), Mode::Simulation);
    assert_eq!(controller.active_timer(), Some(Mode::Simulation));

    sleep(STEP * 6 + Duration::from_millis(1)).await;
    let moves = surface.translations();
    assert_eq!(moves.len(), 6);
    for (i, (moved, offset)) in moves.iter().enumerate() {
        let step = u32::try_from(i).unwrap() + 1;
        assert_eq!(*moved, layer);
        assert_eq!(*offset, PixelOffset::new(14.0, 8.0) * step);
    }
    assert_eq!(controller.active_timer(), None);

    // Final offset holds
    sleep(Duration::from_secs(10)).await;
    assert_eq!(surface.translations().len(), 6);
    assert_eq!(
        controller.simulation_offset(),
        Some(PixelOffset::new(84.0, 48.0))
    );

    controller.stop_simulation();
    let moves = surface.translations();
    assert_eq!(moves.len(), 7);
    assert_eq!(moves[6], (layer, PixelOffset::ZERO));
    assert_eq!(controller.simulation_offset(), None);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_without_layer_is_noop() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);

    assert!(!controller.enter_simulation(30));
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), None);

    sleep(Duration::from_secs(5)).await;
    assert!(surface.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_simulation_mid_run() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();
    controller.enter_simulation(30);

    sleep(STEP * 2 + Duration::from_millis(1)).await;
    controller.stop_simulation();
    assert_eq!(controller.active_timer(), None);

    sleep(Duration::from_secs(10)).await;
    let moves = surface.translations();
    assert_eq!(moves.len(), 3);
    assert_eq!(moves[2].1, PixelOffset::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_entering_live_resets_simulation_offset() {
    let (surface, _source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();
    controller.enter_simulation(30);
    sleep(STEP * 3 + Duration::from_millis(1)).await;

    controller.enter_live().await.unwrap();
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), Some(Mode::Live));
    assert_eq!(controller.simulation_offset(), None);

    sleep(Duration::from_secs(10)).await;
    let moves = surface.translations();
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[3].1, PixelOffset::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_switching_mode_silences_history_timer() {
    let frames: Vec<i64> = (1..=12).collect();
    let (surface, _source, controller) = setup(&frames);

    controller.enter_history().await.unwrap();
    sleep(STEP * 2 + Duration::from_millis(1)).await;
    assert_eq!(surface.created_frames(), vec![3, 4]);

    assert!(controller.enter_simulation(30));
    sleep(Duration::from_secs(20)).await;

    // No more history frames, and no automatic return to live
    assert_eq!(surface.created_frames(), vec![3, 4]);
    assert_eq!(controller.mode(), Mode::Simulation);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_timer_across_switches() {
    let frames: Vec<i64> = (1..=12).collect();
    let (_surface, _source, controller) = setup(&frames);
    controller.enter_live().await.unwrap();

    for round in 0u64..30 {
        match round % 4 {
            0 => controller.enter_history().await.unwrap(),
            1 => {
                controller.enter_simulation(15);
            }
            2 => controller.enter_live().await.unwrap(),
            _ => controller.stop_simulation(),
        }

        let timer = controller.active_timer();
        assert!(timer.is_none() || timer == Some(controller.mode()));

        sleep(Duration::from_millis(350 * (round % 5 + 1))).await;

        let timer = controller.active_timer();
        assert!(timer.is_none() || timer == Some(controller.mode()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_superseded_fetch_is_dropped() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    source.set_delay(Duration::from_secs(1));
    let slow = controller.clone();
    let history = tokio::spawn(async move { slow.enter_history().await });

    sleep(Duration::from_millis(10)).await;
    assert!(controller.enter_simulation(30));

    assert!(history.await.unwrap().is_ok());
    assert_eq!(controller.mode(), Mode::Simulation);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(surface.created_frames(), vec![300]);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_history_failure_is_silent() {
    let (_surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    source.set_delay(Duration::from_secs(1));
    source.push_failure("timeout");
    let slow = controller.clone();
    let history = tokio::spawn(async move { slow.enter_history().await });

    sleep(Duration::from_millis(10)).await;
    assert!(controller.enter_simulation(30));

    // The newer request already won; the stale failure is not reported
    assert!(history.await.unwrap().is_ok());
    assert_eq!(controller.mode(), Mode::Simulation);
}

#[tokio::test(start_paused = true)]
async fn test_enter_live_stops_history_before_fetching() {
    let frames: Vec<i64> = (1..=12).collect();
    let (surface, source, controller) = setup(&frames);

    controller.enter_history().await.unwrap();
    sleep(STEP + Duration::from_millis(1)).await;
    assert_eq!(surface.created_frames(), vec![3]);

    source.set_delay(Duration::from_secs(5));
    let live = controller.clone();
    let pending = tokio::spawn(async move { live.enter_live().await });

    // History is silent while the live fetch is still running
    sleep(Duration::from_secs(3)).await;
    assert_eq!(surface.created_frames(), vec![3]);
    assert_eq!(controller.mode(), Mode::Live);
    assert_eq!(controller.active_timer(), None);

    pending.await.unwrap().unwrap();
    assert_eq!(controller.active_timer(), Some(Mode::Live));
    assert_eq!(surface.created_frames(), vec![3, 12]);
}

#[tokio::test(start_paused = true)]
async fn test_enter_live_resets_simulation_before_fetching() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();
    controller.enter_simulation(30);
    sleep(STEP * 2 + Duration::from_millis(1)).await;

    source.set_delay(Duration::from_secs(5));
    let live = controller.clone();
    let pending = tokio::spawn(async move { live.enter_live().await });

    sleep(Duration::from_secs(3)).await;
    let moves = surface.translations();
    assert_eq!(moves.len(), 3);
    assert_eq!(moves[2].1, PixelOffset::ZERO);
    assert_eq!(controller.simulation_offset(), None);

    pending.await.unwrap().unwrap();
    assert_eq!(surface.translations().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_live_polls_never_overlap() {
    let (_surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    // Fetches slower than the poll period
    source.set_delay(POLL + Duration::from_secs(20));
    sleep(Duration::from_secs(1000)).await;

    assert!(source.fetch_count() >= 4);
    assert_eq!(source.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_timers() {
    let (surface, source, controller) = setup(&[100, 200, 300]);
    controller.enter_live().await.unwrap();

    assert!(controller.has_active_timer());
    controller.shutdown();
    assert!(!controller.has_active_timer());

    source.set_fallback(&[400]);
    sleep(POLL * 3).await;
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(surface.created_frames(), vec![300]);
}
