//! Submission state machine around a [`FormController`]:
//! `Idle -> Submitting -> {Succeeded, Failed}`, back to `Idle` on the next
//! edit, reset or cleared result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{FormState, RawInput},
    error::{RequestError, UnknownField, ValidationError},
    protocol::PredictionResult,
};
use thiserror::Error;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{form::FormController, PredictionService};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting { submission_id: Uuid },
    Succeeded(PredictionResult),
    Failed(SubmissionFailure),
}

impl SubmissionState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(ValidationError),
    #[error(transparent)]
    Request(RequestError),
    #[error("a prediction request is already in flight")]
    AlreadySubmitting,
    #[error("prediction session is closed")]
    Closed,
    #[error("prediction outcome discarded: the session was reset or closed while the request was in flight")]
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SubmissionState),
    FormChanged(FormState),
    Closed,
}

struct SessionInner {
    form: FormController,
    state: SubmissionState,
    // Bumped on reset/close so outcomes of older requests are dropped.
    generation: u64,
    // Outstanding request and its cancel signal. Outlives `Submitting` after
    // a reset until the cancelled future has unwound.
    in_flight: Option<(Uuid, Arc<Notify>)>,
    closed: bool,
}

impl SessionInner {
    fn cancel_in_flight(&mut self) {
        if let Some((submission_id, cancel)) = &self.in_flight {
            debug!(%submission_id, "cancelling outstanding prediction request");
            cancel.notify_one();
            self.generation += 1;
        }
    }
}

pub struct PredictionSession {
    service: Arc<dyn PredictionService>,
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

/// Reverts `Submitting` to `Idle` if the submitting future is dropped before
/// the outcome is applied.
struct InFlight<'a> {
    session: &'a PredictionSession,
    submission_id: Uuid,
    generation: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn is_current(&self, inner: &SessionInner) -> bool {
        !inner.closed
            && inner.generation == self.generation
            && inner.state
                == SubmissionState::Submitting {
                    submission_id: self.submission_id,
                }
    }

    fn release(&self, inner: &mut SessionInner) {
        if matches!(&inner.in_flight, Some((id, _)) if *id == self.submission_id) {
            inner.in_flight = None;
        }
    }

    fn discard(mut self) -> Result<PredictionResult, SubmitError> {
        self.settled = true;
        let mut inner = self.session.lock_inner();
        self.release(&mut inner);
        info!(submission_id = %self.submission_id, "prediction request cancelled");
        Err(SubmitError::Discarded)
    }

    fn settle(
        mut self,
        outcome: Result<PredictionResult, RequestError>,
    ) -> Result<PredictionResult, SubmitError> {
        self.settled = true;
        let session = self.session;
        let submission_id = self.submission_id;
        let mut inner = session.lock_inner();
        self.release(&mut inner);

        if !self.is_current(&inner) {
            info!(%submission_id, "discarding outcome of superseded prediction request");
            return Err(SubmitError::Discarded);
        }

        match outcome {
            Ok(result) => {
                info!(
                    %submission_id,
                    label = %result.label,
                    confidence = result.confidence,
                    "prediction received"
                );
                session.transition(&mut inner, SubmissionState::Succeeded(result.clone()));
                Ok(result)
            }
            Err(error) => {
                warn!(
                    %submission_id,
                    %error,
                    retryable = error.is_retryable(),
                    "prediction request failed"
                );
                session.transition(
                    &mut inner,
                    SubmissionState::Failed(SubmissionFailure::Request(error.clone())),
                );
                Err(SubmitError::Request(error))
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.session.lock_inner();
        self.release(&mut inner);
        if self.is_current(&inner) {
            debug!(submission_id = %self.submission_id, "prediction request abandoned by caller");
            self.session.transition(&mut inner, SubmissionState::Idle);
        }
    }
}

impl PredictionSession {
    pub fn new(service: Arc<dyn PredictionService>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            service,
            inner: Mutex::new(SessionInner {
                form: FormController::new(),
                state: SubmissionState::Idle,
                generation: 0,
                in_flight: None,
                closed: false,
            }),
            events,
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut SessionInner, next: SubmissionState) {
        inner.state = next.clone();
        let _ = self.events.send(SessionEvent::StateChanged(next));
    }

    fn settle_to_idle(&self, inner: &mut SessionInner) {
        if matches!(
            inner.state,
            SubmissionState::Succeeded(_) | SubmissionState::Failed(_)
        ) {
            self.transition(inner, SubmissionState::Idle);
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn form(&self) -> FormState {
        self.lock_inner().form.state().clone()
    }

    pub fn state(&self) -> SubmissionState {
        self.lock_inner().state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock_inner().closed
    }

    /// Edits one field. A displayed result or failure is dismissed; an
    /// in-flight request is unaffected since it carries its own snapshot.
    pub fn set_field(
        &self,
        name: &str,
        raw: impl Into<RawInput>,
    ) -> Result<FormState, UnknownField> {
        let mut inner = self.lock_inner();
        let form = inner.form.set_field(name, raw)?.clone();
        self.settle_to_idle(&mut inner);
        let _ = self.events.send(SessionEvent::FormChanged(form.clone()));
        Ok(form)
    }

    /// Restores the defaults and returns to `Idle`. An outstanding request
    /// is cancelled; its `submit` call resolves to [`SubmitError::Discarded`]
    /// and new submissions are refused until it has.
    pub fn reset(&self) -> FormState {
        let mut inner = self.lock_inner();
        let form = inner.form.reset().clone();
        inner.cancel_in_flight();
        if inner.state != SubmissionState::Idle {
            self.transition(&mut inner, SubmissionState::Idle);
        }
        let _ = self.events.send(SessionEvent::FormChanged(form.clone()));
        form
    }

    /// Dismisses the last result or failure without touching the form.
    pub fn clear_result(&self) {
        let mut inner = self.lock_inner();
        self.settle_to_idle(&mut inner);
    }

    /// Tears the session down. Later submissions are refused and a response
    /// still in flight is dropped instead of applied.
    pub fn close(&self) {
        let mut inner = self.lock_inner();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.cancel_in_flight();
        if inner.state != SubmissionState::Idle {
            self.transition(&mut inner, SubmissionState::Idle);
        }
        let _ = self.events.send(SessionEvent::Closed);
    }

    pub async fn submit(&self) -> Result<PredictionResult, SubmitError> {
        let (request, cancel, in_flight) = {
            let mut inner = self.lock_inner();
            if inner.closed {
                return Err(SubmitError::Closed);
            }
            if let Some((submission_id, _)) = &inner.in_flight {
                warn!(%submission_id, "refusing submission while another request is in flight");
                return Err(SubmitError::AlreadySubmitting);
            }

            let request = match inner.form.build_request() {
                Ok(request) => request,
                Err(error) => {
                    info!(fields = ?error.fields(), "form failed validation; nothing sent");
                    self.transition(
                        &mut inner,
                        SubmissionState::Failed(SubmissionFailure::Validation(error.clone())),
                    );
                    return Err(SubmitError::Validation(error));
                }
            };

            let submission_id = Uuid::new_v4();
            let cancel = Arc::new(Notify::new());
            inner.in_flight = Some((submission_id, cancel.clone()));
            self.transition(&mut inner, SubmissionState::Submitting { submission_id });
            info!(%submission_id, "submitting prediction request");
            (
                request,
                cancel,
                InFlight {
                    session: self,
                    submission_id,
                    generation: inner.generation,
                    settled: false,
                },
            )
        };

        tokio::select! {
            outcome = self.service.predict(&request) => in_flight.settle(outcome),
            _ = cancel.notified() => in_flight.discard(),
        }
    }
}

impl std::fmt::Debug for PredictionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("PredictionSession")
            .field("state", &inner.state)
            .field("closed", &inner.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
