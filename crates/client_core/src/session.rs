//! Session state machine for the extract and swap modes.
//!
//! [`SessionState`] holds every piece of mutable session data and exposes pure transition
//! functions; [`SessionController`] runs those transitions around the gateway calls. Each mode
//! cycles independently through `Idle -> Pending -> Ready | Failed`, and a mode accepts a new
//! submission only once it is no longer `Pending`.

use std::sync::Arc;

use shared::domain::{ColorCorrection, ImageRef, ImageSlot, Mode, Strength};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error};

use crate::{
    gateway::CommandGateway,
    types::{FaceExtractionResult, FaceSwapResult},
    EngineError, SessionError,
};

/// Starting point for manual adjustments when no numeric strength is on display.
pub const DEFAULT_NUDGE_ORIGIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Pending,
    Ready,
    Failed,
}

/// Identifies the outstanding request of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    mode: Mode,
    id: u64,
}

impl RequestTicket {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeState<R> {
    phase: RequestPhase,
    outstanding: Option<u64>,
    results: R,
    last_error: Option<String>,
}

impl<R: Default> Default for ModeState<R> {
    fn default() -> Self {
        Self {
            phase: RequestPhase::Idle,
            outstanding: None,
            results: R::default(),
            last_error: None,
        }
    }
}

impl<R: Default> ModeState<R> {
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == RequestPhase::Pending
    }

    /// Results of the last successful request; kept through later failures.
    pub fn results(&self) -> &R {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn begin(&mut self, id: u64) {
        self.phase = RequestPhase::Pending;
        self.outstanding = Some(id);
    }

    fn check_ticket(&self, ticket: RequestTicket) -> Result<(), SessionError> {
        if self.phase != RequestPhase::Pending || self.outstanding != Some(ticket.id) {
            return Err(SessionError::StaleTicket(ticket.mode));
        }
        Ok(())
    }

    fn finish(&mut self, outcome: Result<R, EngineError>) {
        self.outstanding = None;
        match outcome {
            Ok(results) => {
                self.results = results;
                self.phase = RequestPhase::Ready;
                self.last_error = None;
            }
            Err(err) => {
                self.phase = RequestPhase::Failed;
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn clear(&mut self) {
        self.results = R::default();
        self.phase = RequestPhase::Idle;
        self.last_error = None;
    }
}

/// What presentation shows for color correction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StrengthDisplay {
    /// No measured or chosen value; shown as an explicit "auto" label.
    #[default]
    Auto,
    Manual(Strength),
    /// Value the engine reported after resolving an automatic request.
    Measured(Strength),
}

impl StrengthDisplay {
    pub fn value(self) -> Option<Strength> {
        match self {
            StrengthDisplay::Auto => None,
            StrengthDisplay::Manual(strength) | StrengthDisplay::Measured(strength) => {
                Some(strength)
            }
        }
    }

    pub fn label(self) -> String {
        match self {
            StrengthDisplay::Auto => "auto".to_string(),
            StrengthDisplay::Manual(strength) => strength.to_string(),
            StrengthDisplay::Measured(strength) => format!("{strength} (auto)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    pub ticket: RequestTicket,
    pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub ticket: RequestTicket,
    pub source: ImageRef,
    pub target: ImageRef,
    pub strength_override: Option<Strength>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    mode: Mode,
    source_image: Option<ImageRef>,
    target_image: Option<ImageRef>,
    color_correction: ColorCorrection,
    strength_display: StrengthDisplay,
    nudge_origin: Strength,
    extract: ModeState<Vec<FaceExtractionResult>>,
    swap: ModeState<Option<FaceSwapResult>>,
    swap_requested_auto: bool,
    next_ticket: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_nudge_origin(Strength::clamped(DEFAULT_NUDGE_ORIGIN))
    }

    pub fn with_nudge_origin(nudge_origin: Strength) -> Self {
        Self {
            mode: Mode::Extract,
            source_image: None,
            target_image: None,
            color_correction: ColorCorrection::Auto,
            strength_display: StrengthDisplay::Auto,
            nudge_origin,
            extract: ModeState::default(),
            swap: ModeState::default(),
            swap_requested_auto: false,
            next_ticket: 1,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&ImageRef> {
        match slot {
            ImageSlot::Source => self.source_image.as_ref(),
            ImageSlot::Target => self.target_image.as_ref(),
        }
    }

    pub fn color_correction(&self) -> ColorCorrection {
        self.color_correction
    }

    pub fn strength_display(&self) -> StrengthDisplay {
        self.strength_display
    }

    /// Numeric strength currently in effect for display, if any is known.
    pub fn active_strength(&self) -> Option<Strength> {
        self.strength_display.value()
    }

    pub fn extract(&self) -> &ModeState<Vec<FaceExtractionResult>> {
        &self.extract
    }

    pub fn swap(&self) -> &ModeState<Option<FaceSwapResult>> {
        &self.swap
    }

    pub fn phase(&self, mode: Mode) -> RequestPhase {
        match mode {
            Mode::Extract => self.extract.phase(),
            Mode::Swap => self.swap.phase(),
        }
    }

    pub fn is_pending(&self, mode: Mode) -> bool {
        self.phase(mode) == RequestPhase::Pending
    }

    pub fn last_error(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Extract => self.extract.last_error(),
            Mode::Swap => self.swap.last_error(),
        }
    }

    /// Switching modes never interrupts or clears the other mode.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    /// `None` is a cancelled selection and leaves the slot untouched. Results computed from
    /// the previous image are kept until replaced or cleared.
    pub fn select_image(&mut self, slot: ImageSlot, selection: Option<ImageRef>) -> bool {
        let Some(image) = selection else {
            return false;
        };
        let current = match slot {
            ImageSlot::Source => &mut self.source_image,
            ImageSlot::Target => &mut self.target_image,
        };
        if current.as_ref() == Some(&image) {
            return false;
        }
        *current = Some(image);
        true
    }

    pub fn set_color_correction(&mut self, color_correction: ColorCorrection) {
        self.color_correction = color_correction;
        self.strength_display = match color_correction {
            ColorCorrection::Auto => StrengthDisplay::Auto,
            ColorCorrection::Manual(strength) => StrengthDisplay::Manual(strength),
        };
    }

    /// Manual adjustment relative to the displayed value; switches to manual mode.
    pub fn nudge_color_correction(&mut self, delta: f64) -> Strength {
        let origin = self
            .strength_display
            .value()
            .unwrap_or(self.nudge_origin)
            .value();
        let strength = Strength::clamped(origin + delta);
        self.set_color_correction(ColorCorrection::Manual(strength));
        strength
    }

    pub fn clear_results(&mut self, mode: Mode) -> Result<(), SessionError> {
        if self.is_pending(mode) {
            return Err(SessionError::AlreadyPending(mode));
        }
        match mode {
            Mode::Extract => self.extract.clear(),
            Mode::Swap => self.swap.clear(),
        }
        Ok(())
    }

    /// Extraction runs on the source slot.
    pub fn begin_extract(&mut self) -> Result<ExtractRequest, SessionError> {
        if self.extract.is_pending() {
            return Err(SessionError::AlreadyPending(Mode::Extract));
        }
        let Some(image) = self.source_image.clone() else {
            return Err(SessionError::MissingInput {
                mode: Mode::Extract,
                slots: vec![ImageSlot::Source],
            });
        };
        let ticket = self.issue_ticket(Mode::Extract);
        self.extract.begin(ticket.id);
        Ok(ExtractRequest { ticket, image })
    }

    pub fn complete_extract(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<Vec<FaceExtractionResult>, EngineError>,
    ) -> Result<(), SessionError> {
        if ticket.mode != Mode::Extract {
            return Err(SessionError::StaleTicket(ticket.mode));
        }
        self.extract.check_ticket(ticket)?;
        self.extract.finish(outcome);
        Ok(())
    }

    pub fn begin_swap(&mut self) -> Result<SwapRequest, SessionError> {
        if self.swap.is_pending() {
            return Err(SessionError::AlreadyPending(Mode::Swap));
        }
        let missing: Vec<ImageSlot> = [ImageSlot::Source, ImageSlot::Target]
            .into_iter()
            .filter(|slot| self.image(*slot).is_none())
            .collect();
        let (Some(source), Some(target)) = (self.source_image.clone(), self.target_image.clone())
        else {
            return Err(SessionError::MissingInput {
                mode: Mode::Swap,
                slots: missing,
            });
        };
        let strength_override = self.color_correction.override_value();
        let ticket = self.issue_ticket(Mode::Swap);
        self.swap.begin(ticket.id);
        self.swap_requested_auto = strength_override.is_none();
        Ok(SwapRequest {
            ticket,
            source,
            target,
            strength_override,
        })
    }

    /// On success of an automatic request the engine's reported strength becomes the
    /// displayed value, unless the user picked a manual value while the request was out.
    pub fn complete_swap(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<FaceSwapResult, EngineError>,
    ) -> Result<(), SessionError> {
        if ticket.mode != Mode::Swap {
            return Err(SessionError::StaleTicket(ticket.mode));
        }
        self.swap.check_ticket(ticket)?;
        let requested_auto = std::mem::take(&mut self.swap_requested_auto);
        if let Ok(result) = &outcome {
            if requested_auto && self.color_correction == ColorCorrection::Auto {
                self.strength_display = match result.color_correction_applied {
                    Some(applied) => StrengthDisplay::Measured(applied),
                    None => StrengthDisplay::Auto,
                };
            }
        }
        self.swap.finish(outcome.map(Some));
        Ok(())
    }

    fn issue_ticket(&mut self, mode: Mode) -> RequestTicket {
        let id = self.next_ticket;
        self.next_ticket += 1;
        RequestTicket { mode, id }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ModeChanged(Mode),
    ImageSelected { slot: ImageSlot, image: ImageRef },
    PhaseChanged { mode: Mode, phase: RequestPhase },
    StrengthDisplayChanged(StrengthDisplay),
    RequestFailed { mode: Mode, message: String },
    ResultsCleared(Mode),
}

/// Owns the session state and runs requests through the gateway. The state lock is released
/// while a gateway call is outstanding, so the two modes can have requests in flight at once.
pub struct SessionController {
    gateway: CommandGateway,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(gateway: CommandGateway) -> Arc<Self> {
        Self::with_state(gateway, SessionState::new())
    }

    pub fn with_state(gateway: CommandGateway, state: SessionState) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            gateway,
            state: Mutex::new(state),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn set_mode(&self, mode: Mode) {
        let changed = self.state.lock().await.set_mode(mode);
        if changed {
            self.emit(SessionEvent::ModeChanged(mode));
        }
    }

    pub async fn select_image(&self, slot: ImageSlot, selection: Option<ImageRef>) {
        let Some(image) = selection else {
            debug!(%slot, "image selection cancelled");
            return;
        };
        let changed = self
            .state
            .lock()
            .await
            .select_image(slot, Some(image.clone()));
        if changed {
            self.emit(SessionEvent::ImageSelected { slot, image });
        }
    }

    pub async fn set_color_correction(&self, color_correction: ColorCorrection) {
        let display = {
            let mut guard = self.state.lock().await;
            guard.set_color_correction(color_correction);
            guard.strength_display()
        };
        self.emit(SessionEvent::StrengthDisplayChanged(display));
    }

    pub async fn nudge_color_correction(&self, delta: f64) -> Strength {
        let strength = self.state.lock().await.nudge_color_correction(delta);
        self.emit(SessionEvent::StrengthDisplayChanged(StrengthDisplay::Manual(
            strength,
        )));
        strength
    }

    pub async fn clear_results(&self, mode: Mode) -> Result<(), SessionError> {
        self.state.lock().await.clear_results(mode)?;
        self.emit(SessionEvent::ResultsCleared(mode));
        Ok(())
    }

    pub async fn mode(&self) -> Mode {
        self.state.lock().await.mode()
    }

    pub async fn strength_display(&self) -> StrengthDisplay {
        self.state.lock().await.strength_display()
    }

    /// Runs a request for the currently active mode.
    pub async fn submit(self: &Arc<Self>) -> Result<(), SessionError> {
        match self.mode().await {
            Mode::Extract => self.extract().await.map(|_| ()),
            Mode::Swap => self.swap().await.map(|_| ()),
        }
    }

    /// The engine call and its completion run on a spawned task, so a request finishes and
    /// leaves `Pending` even when the caller stops waiting for it.
    pub async fn extract(self: &Arc<Self>) -> Result<Vec<FaceExtractionResult>, SessionError> {
        let request = self.state.lock().await.begin_extract()?;
        let ticket = request.ticket;
        self.emit_submitted(ticket);

        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = controller.gateway.extract_faces(&request.image).await;
            controller.complete_extract(ticket, outcome).await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => Err(self.abandon(ticket, err).await),
        }
    }

    pub async fn swap(self: &Arc<Self>) -> Result<FaceSwapResult, SessionError> {
        let request = self.state.lock().await.begin_swap()?;
        let ticket = request.ticket;
        self.emit_submitted(ticket);

        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = controller
                .gateway
                .swap_faces(&request.source, &request.target, request.strength_override)
                .await;
            controller.complete_swap(ticket, outcome).await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => Err(self.abandon(ticket, err).await),
        }
    }

    async fn complete_extract(
        &self,
        ticket: RequestTicket,
        outcome: Result<Vec<FaceExtractionResult>, EngineError>,
    ) -> Result<Vec<FaceExtractionResult>, SessionError> {
        self.state
            .lock()
            .await
            .complete_extract(ticket, outcome.clone())
            .map_err(|err| {
                error!(error = %err, "extract completion rejected");
                err
            })?;
        self.finish(Mode::Extract, outcome)
    }

    async fn complete_swap(
        &self,
        ticket: RequestTicket,
        outcome: Result<FaceSwapResult, EngineError>,
    ) -> Result<FaceSwapResult, SessionError> {
        let display = {
            let mut guard = self.state.lock().await;
            let before = guard.strength_display();
            guard
                .complete_swap(ticket, outcome.clone())
                .map_err(|err| {
                    error!(error = %err, "swap completion rejected");
                    err
                })?;
            let after = guard.strength_display();
            (before != after).then_some(after)
        };
        if let Some(display) = display {
            self.emit(SessionEvent::StrengthDisplayChanged(display));
        }
        self.finish(Mode::Swap, outcome)
    }

    /// Fails the outstanding request when its task died before completing it.
    async fn abandon(&self, ticket: RequestTicket, err: tokio::task::JoinError) -> SessionError {
        let mode = ticket.mode();
        error!(%mode, ticket = ticket.id(), error = %err, "request task ended without completing");
        let failure = EngineError::Transport(format!("{mode} request abandoned: {err}"));
        let completed = {
            let mut guard = self.state.lock().await;
            match mode {
                Mode::Extract => guard.complete_extract(ticket, Err(failure.clone())),
                Mode::Swap => guard.complete_swap(ticket, Err(failure.clone())),
            }
        };
        if let Err(err) = completed {
            return err;
        }
        self.fail(mode, failure)
    }

    fn finish<T>(&self, mode: Mode, outcome: Result<T, EngineError>) -> Result<T, SessionError> {
        match outcome {
            Ok(value) => {
                self.emit_phase(mode, RequestPhase::Ready);
                Ok(value)
            }
            Err(err) => Err(self.fail(mode, err)),
        }
    }

    fn fail(&self, mode: Mode, err: EngineError) -> SessionError {
        self.emit_phase(mode, RequestPhase::Failed);
        self.emit(SessionEvent::RequestFailed {
            mode,
            message: err.to_string(),
        });
        SessionError::Engine(err)
    }

    fn emit_submitted(&self, ticket: RequestTicket) {
        debug!(mode = %ticket.mode(), ticket = ticket.id(), "request submitted");
        self.emit_phase(ticket.mode(), RequestPhase::Pending);
    }

    fn emit_phase(&self, mode: Mode, phase: RequestPhase) {
        debug!(%mode, ?phase, "session phase changed");
        self.emit(SessionEvent::PhaseChanged { mode, phase });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; state stays the source of truth.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
