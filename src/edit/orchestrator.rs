use super::credentials::CredentialSource;
use super::request::{build_payload, EditRequest};
use super::response::decode_prediction;
use super::transport::{HttpResponse, HttpTransport};
use crate::config::EditConfig;
use crate::error::EditError;
use crate::output::{ImageStore, StoredImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag shared between the caller and an edit
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits out a retry backoff
pub trait Sleeper {
    /// Sleep for `duration`, returning early once `cancel` fires
    fn sleep(&self, duration: Duration, cancel: &CancelToken);
}

/// Sleeps on the current thread in short slices, polling for cancellation
pub struct ThreadSleeper;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        let mut remaining = duration;
        while !remaining.is_zero() && !cancel.is_cancelled() {
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }
}

/// Lifecycle of one edit request
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Idle,
    Authenticating,
    /// `attempt` is the 1-based number of the send about to be issued
    Sending { attempt: u32 },
    /// `attempt` failed with `reason`; the next send follows after `delay`
    RetryWaiting {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    Succeeded {
        image: Vec<u8>,
        stored: StoredImage,
    },
    Failed(EditError),
    Cancelled,
}

impl EditState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EditState::Succeeded { .. } | EditState::Failed(_) | EditState::Cancelled
        )
    }

    /// Outcome reported on entering this state, if any
    pub fn outcome(&self) -> Option<EditOutcome> {
        match self {
            EditState::RetryWaiting {
                attempt, reason, ..
            } => Some(EditOutcome::RetryableFailure {
                reason: reason.clone(),
                attempt: *attempt,
            }),
            EditState::Succeeded { image, .. } => Some(EditOutcome::Success(image.clone())),
            EditState::Failed(error) => Some(EditOutcome::TerminalFailure(error.clone())),
            EditState::Cancelled => Some(EditOutcome::TerminalFailure(EditError::Cancelled)),
            EditState::Idle | EditState::Authenticating | EditState::Sending { .. } => None,
        }
    }
}

/// Outcome of an attempt sequence
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Decoded output image
    Success(Vec<u8>),
    /// An attempt failed and another one is scheduled
    RetryableFailure { reason: String, attempt: u32 },
    TerminalFailure(EditError),
}

/// Final result of [`EditOrchestrator::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct EditReport {
    /// `Success` or `TerminalFailure`
    pub outcome: EditOutcome,
    /// Number of sends issued
    pub attempts: u32,
    pub stored: Option<StoredImage>,
}

type Observer<'a> = Box<dyn FnMut(&EditState) + 'a>;

/// Drives a single edit request from credentials to stored result
///
/// Each orchestrator owns its own attempt counter; create one per request.
/// Rate-limit responses, other HTTP errors and transport failures share one
/// retry budget of `config.max_attempts` sends. Everything else is terminal
/// on first occurrence.
pub struct EditOrchestrator<'a> {
    config: &'a EditConfig,
    credentials: &'a dyn CredentialSource,
    transport: &'a dyn HttpTransport,
    store: &'a dyn ImageStore,
    sleeper: &'a dyn Sleeper,
    cancel: CancelToken,
    observer: Option<Observer<'a>>,
    request: EditRequest,
    body: Vec<u8>,
    token: String,
    state: EditState,
    attempts: u32,
}

impl<'a> EditOrchestrator<'a> {
    pub fn new(
        config: &'a EditConfig,
        credentials: &'a dyn CredentialSource,
        transport: &'a dyn HttpTransport,
        store: &'a dyn ImageStore,
        request: EditRequest,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            store,
            sleeper: &ThreadSleeper,
            cancel: CancelToken::new(),
            observer: None,
            request,
            body: Vec::new(),
            token: String::new(),
            state: EditState::Idle,
            attempts: 0,
        }
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called after every state transition. Never called once the edit has
    /// been cancelled.
    pub fn on_transition(mut self, observer: impl FnMut(&EditState) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Advance by exactly one transition
    ///
    /// Returns the outcome attached to the new state: `RetryableFailure` when
    /// a retry was scheduled, `Success`/`TerminalFailure` on reaching a
    /// terminal state, `None` otherwise. Does nothing once terminal.
    pub fn step(&mut self) -> Option<EditOutcome> {
        if self.state.is_terminal() {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        let next = match std::mem::replace(&mut self.state, EditState::Idle) {
            EditState::Idle => self.prepare(),
            EditState::Authenticating => self.authenticate(),
            EditState::Sending { attempt } => self.send(attempt),
            EditState::RetryWaiting { attempt, delay, .. } => {
                tracing::debug!("Waiting {:?} before attempt {}", delay, attempt + 1);
                self.sleeper.sleep(delay, &self.cancel);
                if self.cancel.is_cancelled() {
                    EditState::Cancelled
                } else {
                    EditState::Sending { attempt: attempt + 1 }
                }
            }
            terminal => terminal,
        };

        // A cancel that lands mid-transition wins over anything but a stored result
        if self.cancel.is_cancelled() && !matches!(next, EditState::Succeeded { .. }) {
            return self.cancelled();
        }

        match &next {
            EditState::Cancelled => return self.cancelled(),
            EditState::Failed(error) => {
                tracing::error!("Edit failed after {} attempts: {}", self.attempts, error);
            }
            _ => {}
        }

        self.state = next;
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.state);
        }
        self.state.outcome()
    }

    /// Drive the request to a terminal state
    pub fn run(mut self) -> EditReport {
        tracing::info!(
            "Starting edit: {} image bytes, mask={}",
            self.request.image.len(),
            self.request.mask.is_some()
        );

        while !self.state.is_terminal() {
            self.step();
        }

        let attempts = self.attempts;
        let (outcome, stored) = match self.state {
            EditState::Succeeded { image, stored } => (EditOutcome::Success(image), Some(stored)),
            EditState::Failed(error) => (EditOutcome::TerminalFailure(error), None),
            // Cancelled is the only other terminal state
            _ => (EditOutcome::TerminalFailure(EditError::Cancelled), None),
        };
        EditReport {
            outcome,
            attempts,
            stored,
        }
    }

    fn prepare(&mut self) -> EditState {
        let payload = match build_payload(&self.request) {
            Ok(payload) => payload,
            Err(e) => return EditState::Failed(e),
        };
        match serde_json::to_vec(&payload) {
            Ok(body) => {
                self.body = body;
                EditState::Authenticating
            }
            Err(e) => EditState::Failed(EditError::Encoding(e.to_string())),
        }
    }

    fn authenticate(&mut self) -> EditState {
        match self.credentials.access_token() {
            Ok(token) => {
                self.token = token;
                EditState::Sending { attempt: 1 }
            }
            Err(e) => EditState::Failed(EditError::Auth(format!("{:#}", e))),
        }
    }

    fn send(&mut self, attempt: u32) -> EditState {
        self.attempts = attempt;
        tracing::debug!(
            "Sending edit request (attempt {}/{})",
            attempt,
            self.config.max_attempts
        );

        let error = match self
            .transport
            .post_json(&self.config.endpoint, &self.token, &self.body)
        {
            Ok(response) if response.is_success() => return self.finish(&response),
            Ok(response) if response.is_rate_limited() => EditError::RateLimited { attempts: attempt },
            Ok(response) => EditError::Transport {
                reason: format!("HTTP {}: {}", response.status, body_excerpt(&response)),
                attempts: attempt,
            },
            Err(e) => EditError::Transport {
                reason: format!("{:#}", e),
                attempts: attempt,
            },
        };

        if attempt >= self.config.max_attempts {
            return EditState::Failed(error);
        }

        let delay = self.config.backoff(attempt);
        tracing::warn!("Attempt {} failed ({}), retrying in {:?}", attempt, error, delay);
        EditState::RetryWaiting {
            attempt,
            delay,
            reason: error.to_string(),
        }
    }

    fn finish(&mut self, response: &HttpResponse) -> EditState {
        let image = match decode_prediction(&response.body) {
            Ok(image) => image,
            Err(e) => return EditState::Failed(e),
        };

        // No side effects once the caller has walked away
        if self.cancel.is_cancelled() {
            return EditState::Cancelled;
        }

        match self.store.save(&image) {
            Ok(stored) => {
                tracing::info!(
                    "Edit succeeded after {} attempts ({} bytes)",
                    self.attempts,
                    image.len()
                );
                EditState::Succeeded { image, stored }
            }
            Err(e) => EditState::Failed(EditError::Persistence(format!("{:#}", e))),
        }
    }

    fn cancelled(&mut self) -> Option<EditOutcome> {
        tracing::info!("Edit cancelled after {} attempts", self.attempts);
        self.state = EditState::Cancelled;
        self.observer = None;
        self.state.outcome()
    }
}

fn body_excerpt(response: &HttpResponse) -> String {
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();
    match text.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
