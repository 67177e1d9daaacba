//! Runtime bridge between the shell command queue and the session controller.

use std::{path::PathBuf, sync::Arc, thread};

use anyhow::{bail, Result};
use chrono::Local;
use client_core::{
    CommandGateway, FaceEngine, HttpFaceEngine, MissingFaceEngine, SessionController,
    SessionState,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::Mode;
use tokio::sync::broadcast::error::RecvError;

use crate::{
    backend_bridge::commands::BackendCommand,
    config::Settings,
    controller::events::{UiError, UiErrorContext, UiEvent},
    export, picker, preview,
};

/// Engine client from settings. Without an engine URL every request fails with a transport error.
pub fn build_gateway(settings: &Settings) -> Result<CommandGateway> {
    let engine: Arc<dyn FaceEngine> = match settings.engine_url.as_deref() {
        Some(url) => {
            let engine = HttpFaceEngine::new(url, settings.request_timeout)?;
            tracing::info!(engine_url = %engine.base_url(), "using face engine");
            Arc::new(engine)
        }
        None => {
            tracing::warn!("no engine_url configured; requests will fail until one is set");
            Arc::new(MissingFaceEngine)
        }
    };
    Ok(CommandGateway::new(engine))
}

pub fn build_controller(settings: &Settings) -> Result<Arc<SessionController>> {
    let gateway = build_gateway(settings)?;
    Ok(SessionController::with_state(
        gateway,
        SessionState::with_nudge_origin(settings.default_strength),
    ))
}

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    settings: Settings,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let controller = match build_controller(&settings) {
                Ok(controller) => controller,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err:#}"),
                    )));
                    tracing::error!("failed to build engine client: {err:#}");
                    return;
                }
            };

            let event_task = forward_session_events(&controller, ui_tx.clone());
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&controller, &settings, &ui_tx, cmd).await;
            }

            event_task.abort();
            tracing::debug!("backend command channel closed; worker exiting");
        });
    })
}

fn forward_session_events(
    controller: &Arc<SessionController>,
    ui_tx: Sender<UiEvent>,
) -> tokio::task::JoinHandle<()> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let _ = ui_tx.try_send(UiEvent::Session(event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session event forwarder lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

pub async fn handle_command(
    controller: &Arc<SessionController>,
    settings: &Settings,
    ui_tx: &Sender<UiEvent>,
    cmd: BackendCommand,
) {
    tracing::debug!(command = cmd.name(), "backend: handling command");
    match cmd {
        BackendCommand::SetMode(mode) => controller.set_mode(mode).await,
        BackendCommand::SelectImage { slot, path } => {
            match picker::resolve_selection(path.as_deref()) {
                Ok(selection) => controller.select_image(slot, selection).await,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Selection,
                        format!("{err:#}"),
                    )));
                }
            }
        }
        BackendCommand::SetColorCorrection(color_correction) => {
            controller.set_color_correction(color_correction).await;
        }
        BackendCommand::NudgeColorCorrection { delta } => {
            controller.nudge_color_correction(delta).await;
        }
        BackendCommand::Submit => {
            let mode = controller.mode().await;
            tokio::spawn(run_request(controller.clone(), mode, ui_tx.clone()));
        }
        BackendCommand::ClearResults(mode) => {
            let mode = match mode {
                Some(mode) => mode,
                None => controller.mode().await,
            };
            if let Err(err) = controller.clear_results(mode).await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_session_error(
                    UiErrorContext::General,
                    &err,
                )));
            }
        }
        BackendCommand::Export => {
            let state = controller.snapshot().await;
            match export_session(&state, settings) {
                Ok(paths) => {
                    tracing::info!(files = paths.len(), "backend: exported results");
                    let _ = ui_tx.try_send(UiEvent::Exported(paths));
                }
                Err(err) => {
                    tracing::error!("backend: export failed: {err:#}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Export,
                        format!("{err:#}"),
                    )));
                }
            }
        }
        BackendCommand::Status => {
            let state = controller.snapshot().await;
            let _ = ui_tx.try_send(UiEvent::Status(preview::status_lines(&state)));
        }
    }
}

/// One request per task so the other mode stays usable while this one is in flight.
async fn run_request(controller: Arc<SessionController>, mode: Mode, ui_tx: Sender<UiEvent>) {
    let event = match mode {
        Mode::Extract => match controller.extract().await {
            Ok(faces) => UiEvent::ExtractFinished {
                lines: faces
                    .iter()
                    .enumerate()
                    .map(|(index, face)| preview::describe_face(index, face))
                    .collect(),
            },
            Err(err) => {
                UiEvent::Error(UiError::from_session_error(UiErrorContext::Extract, &err))
            }
        },
        Mode::Swap => match controller.swap().await {
            Ok(result) => UiEvent::SwapFinished {
                summary: preview::describe_swap(&result),
                strength_label: controller.strength_display().await.label(),
            },
            Err(err) => UiEvent::Error(UiError::from_session_error(UiErrorContext::Swap, &err)),
        },
    };
    let _ = ui_tx.try_send(event);
}

/// Writes the active mode's results into the export directory.
pub fn export_session(state: &SessionState, settings: &Settings) -> Result<Vec<PathBuf>> {
    match state.mode() {
        Mode::Extract => {
            let faces = state.extract().results();
            if faces.is_empty() {
                bail!("no extracted faces to export");
            }
            export::export_extraction(&settings.export_dir, faces)
        }
        Mode::Swap => {
            let Some(result) = state.swap().results() else {
                bail!("no composite to export");
            };
            let path = export::export_composite(&settings.export_dir, result, Local::now())?;
            Ok(vec![path])
        }
    }
}
