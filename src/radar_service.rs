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

//! Bridge between the UI thread and the radar controller.
//!
//! The controller lives on a dedicated thread with a current-thread tokio
//! runtime. Button clicks become [`RadarCommand`]s on an unbounded channel;
//! each command runs as its own task so a slow fetch never holds up the
//! next click.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info, warn};
use radar_core::{ClockReading, ControllerConfig, FrameSource, Mode, ModeController, RadarSurface};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Requests from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarCommand {
    ShowLive,
    ShowHistory,
    Simulate(u32),
    StopSimulation,
}

/// Handle to the radar worker thread
pub struct RadarService<S, F> {
    controller: ModeController<S, F>,
    commands: mpsc::UnboundedSender<RadarCommand>,
    warning_rx: watch::Receiver<Option<String>>,
    cancel_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<S, F> std::fmt::Debug for RadarService<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarService")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<S: RadarSurface, F: FrameSource> RadarService<S, F> {
    /// Start the worker thread and enter Live mode
    pub fn spawn(surface: S, source: F, config: ControllerConfig) -> io::Result<Self> {
        let controller = ModeController::new(surface, source, config);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (warning_tx, warning_rx) = watch::channel(None);
        let cancel_token = CancellationToken::new();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker = {
            let controller = controller.clone();
            let cancel_token = cancel_token.clone();
            std::thread::Builder::new()
                .name("radar".to_string())
                .spawn(move || {
                    runtime.block_on(run_commands(
                        controller,
                        command_rx,
                        Arc::new(warning_tx),
                        cancel_token,
                    ));
                })?
        };

        info!("Radar service started");
        Ok(Self {
            controller,
            commands,
            warning_rx,
            cancel_token,
            worker: Some(worker),
        })
    }

    pub fn send(&self, command: RadarCommand) {
        if self.commands.send(command).is_err() {
            warn!("Radar service stopped, dropping {command:?}");
        }
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn clock(&self) -> Option<ClockReading> {
        self.controller.clock().current()
    }

    /// Last error from a command, cleared by the next success
    pub fn warning(&self) -> Option<String> {
        self.warning_rx.borrow().clone()
    }

    /// Stop every timer and wait for the worker thread to exit
    pub fn shutdown(&mut self) {
        if self.stop_worker().is_some() {
            info!("Radar service stopped");
        }
    }
}

impl<S, F> RadarService<S, F> {
    /// Cancel and join the worker. `Some(false)` means it panicked.
    fn stop_worker(&mut self) -> Option<bool> {
        self.cancel_token.cancel();

        let worker = self.worker.take()?;
        let clean = worker.join().is_ok();
        if !clean {
            error!("Radar worker thread panicked");
        }
        Some(clean)
    }
}

impl<S, F> Drop for RadarService<S, F> {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

async fn run_commands<S: RadarSurface, F: FrameSource>(
    controller: ModeController<S, F>,
    mut command_rx: mpsc::UnboundedReceiver<RadarCommand>,
    warnings: Arc<watch::Sender<Option<String>>>,
    cancel_token: CancellationToken,
) {
    dispatch(&controller, RadarCommand::ShowLive, &warnings);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            command = command_rx.recv() => match command {
                Some(command) => dispatch(&controller, command, &warnings),
                None => break,
            },
        }
    }

    controller.shutdown();
}

fn dispatch<S: RadarSurface, F: FrameSource>(
    controller: &ModeController<S, F>,
    command: RadarCommand,
    warnings: &Arc<watch::Sender<Option<String>>>,
) {
    let controller = controller.clone();
    let warnings = Arc::clone(warnings);

    tokio::spawn(async move {
        let outcome = execute(&controller, command).await;
        warnings.send_replace(outcome.err());
    });
}

async fn execute<S: RadarSurface, F: FrameSource>(
    controller: &ModeController<S, F>,
    command: RadarCommand,
) -> Result<(), String> {
    match command {
        RadarCommand::ShowLive => controller
            .enter_live()
            .await
            .map_err(|e| format!("Live radar unavailable: {e}")),
        RadarCommand::ShowHistory => controller
            .enter_history()
            .await
            .map_err(|e| format!("History unavailable: {e}")),
        RadarCommand::Simulate(minutes) => {
            if controller.enter_simulation(minutes) {
                Ok(())
            } else {
                Err("No radar frame to simulate yet".to_string())
            }
        }
        RadarCommand::StopSimulation => {
            controller.stop_simulation();
            Ok(())
        }
    }
}
