//! Client-side state machine for a logo session.
//!
//! `Idle -> Loading -> {Success, Error}`; `Success`/`Error` go back to
//! `Loading` on the next attempt, and a mode switch shows `Idle` without
//! touching either mode's working data. While `Loading`, further generate
//! calls are ignored.

use markforge_contracts::{
    DataUri, GenerationRequest, GenerationResult, HistoryEntry, HistoryStore, Mode,
    MAX_REFERENCE_IMAGES,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::Relay;
use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Loading,
    Success,
    Error,
}

/// Working data of one mode. Each mode keeps its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub images: Vec<DataUri>,
    pub prompt: String,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
}

/// Proof that a generation was started; hand it back to
/// [`ClientController::complete_generation`].
#[derive(Debug)]
pub struct PendingGeneration {
    request: GenerationRequest,
}

impl PendingGeneration {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug)]
pub struct ClientController {
    active_mode: Mode,
    modernize: SessionState,
    create: SessionState,
    status: Status,
    history: HistoryStore,
}

impl Default for ClientController {
    fn default() -> Self {
        Self::new(Mode::Modernize)
    }
}

impl ClientController {
    pub fn new(mode: Mode) -> Self {
        Self {
            active_mode: mode,
            modernize: SessionState::default(),
            create: SessionState::default(),
            status: Status::Idle,
            history: HistoryStore::new(),
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.active_mode
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn session(&self, mode: Mode) -> &SessionState {
        match mode {
            Mode::Modernize => &self.modernize,
            Mode::Create => &self.create,
        }
    }

    pub fn active_session(&self) -> &SessionState {
        self.session(self.active_mode)
    }

    fn session_mut(&mut self, mode: Mode) -> &mut SessionState {
        match mode {
            Mode::Modernize => &mut self.modernize,
            Mode::Create => &mut self.create,
        }
    }

    fn edit_active(&mut self) -> &mut SessionState {
        let session = self.session_mut(self.active_mode);
        session.error = None;
        session
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        if mode == self.active_mode {
            return;
        }
        debug!(from = self.active_mode.as_str(), to = mode.as_str(), "switching mode");
        self.active_mode = mode;
        if self.status != Status::Loading {
            self.status = Status::Idle;
        }
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.edit_active().prompt = prompt.into();
    }

    /// Adds a reference image; returns `false` once the session is full.
    pub fn add_image(&mut self, image: DataUri) -> bool {
        let session = self.edit_active();
        if session.images.len() >= MAX_REFERENCE_IMAGES {
            warn!(limit = MAX_REFERENCE_IMAGES, "reference image limit reached");
            return false;
        }
        session.images.push(image);
        true
    }

    pub fn set_images(&mut self, mut images: Vec<DataUri>) {
        images.truncate(MAX_REFERENCE_IMAGES);
        self.edit_active().images = images;
    }

    pub fn remove_image(&mut self, index: usize) -> Option<DataUri> {
        let session = self.edit_active();
        (index < session.images.len()).then(|| session.images.remove(index))
    }

    pub fn clear_images(&mut self) {
        self.edit_active().images.clear();
    }

    /// Starts a generation for the active mode.
    ///
    /// Returns `None` when one is already in flight, or when the input fails
    /// validation (the session then carries the message and status is `Error`).
    pub fn begin_generation(&mut self) -> Option<PendingGeneration> {
        if self.status == Status::Loading {
            debug!("generation already in flight; ignoring");
            return None;
        }
        let mode = self.active_mode;
        let session = self.session(mode);
        let request = GenerationRequest::new(mode, session.prompt.clone(), session.images.clone());
        if let Err(err) = request.validate() {
            self.session_mut(mode).error = Some(err.to_string());
            self.status = Status::Error;
            return None;
        }
        self.session_mut(mode).error = None;
        self.status = Status::Loading;
        Some(PendingGeneration { request })
    }

    pub fn complete_generation(
        &mut self,
        ticket: PendingGeneration,
        outcome: Result<DataUri, RelayError>,
    ) -> Status {
        let PendingGeneration { request } = ticket;
        let mode = request.mode;
        match outcome {
            Ok(image) => {
                let result = GenerationResult::new(image, mode, request.prompt);
                self.history
                    .push(HistoryEntry::new(result.clone(), request.reference_images));
                let session = self.session_mut(mode);
                session.result = Some(result);
                session.error = None;
                self.status = Status::Success;
                info!(mode = mode.as_str(), history = self.history.len(), "logo ready");
            }
            Err(err) => {
                warn!(mode = mode.as_str(), kind = err.kind(), "generation failed: {err}");
                self.session_mut(mode).error = Some(err.user_message());
                self.status = Status::Error;
            }
        }
        self.status
    }

    pub async fn generate<R: Relay + ?Sized>(&mut self, relay: &R) -> Status {
        let Some(ticket) = self.begin_generation() else {
            return self.status;
        };
        let outcome = relay.generate(ticket.request()).await;
        self.complete_generation(ticket, outcome)
    }
}
