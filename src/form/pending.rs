use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Weak,
    task::{Context, Poll},
};

use parking_lot::Mutex;
use serde_json::Value;

use crate::backend::TransportError;

use super::{
    error::SubmitError,
    state::{FormState, Ticket},
};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The backend answered. `applied` fields had their error entry replaced;
    /// `superseded` fields were re-dispatched meanwhile and kept theirs.
    Settled {
        applied: Vec<String>,
        superseded: Vec<String>,
    },
    /// The trigger that produced this validation is disabled.
    Skipped,
    /// The controller was disposed or dropped before the answer arrived.
    Discarded,
    /// No answer; previous errors are untouched.
    Failed(TransportError),
}

impl ValidationOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, ValidationOutcome::Settled { .. })
    }

    pub fn applied(&self) -> &[String] {
        match self {
            ValidationOutcome::Settled { applied, .. } => applied,
            _ => &[],
        }
    }

    pub fn superseded(&self) -> &[String] {
        match self {
            ValidationOutcome::Settled { superseded, .. } => superseded,
            _ => &[],
        }
    }

    fn merge(self, other: Self) -> Self {
        use ValidationOutcome::*;
        match (self, other) {
            (Failed(err), _) | (_, Failed(err)) => Failed(err),
            (
                Settled {
                    mut applied,
                    mut superseded,
                },
                Settled {
                    applied: more_applied,
                    superseded: more_superseded,
                },
            ) => {
                applied.extend(more_applied);
                superseded.extend(more_superseded);
                Settled {
                    applied,
                    superseded,
                }
            }
            (Skipped, outcome) | (outcome, Skipped) => outcome,
            (Discarded, _) | (_, Discarded) => Discarded,
        }
    }
}

/// A dispatched field validation. The request goes out when this future is
/// first polled; drop it to abandon the answer.
#[must_use = "validation requests are only sent when the future is awaited or spawned"]
pub struct PendingValidation {
    fields: Vec<String>,
    future: BoxFuture<ValidationOutcome>,
}

impl PendingValidation {
    pub(crate) fn new(
        fields: Vec<String>,
        future: impl Future<Output = ValidationOutcome> + Send + 'static,
    ) -> Self {
        Self {
            fields,
            future: Box::pin(future),
        }
    }

    pub(crate) fn ready(fields: Vec<String>, outcome: ValidationOutcome) -> Self {
        Self::new(fields, std::future::ready(outcome))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Runs `self`, then `next`, and merges both outcomes.
    pub fn then(self, next: PendingValidation) -> PendingValidation {
        let mut fields = self.fields;
        fields.extend(next.fields.iter().cloned());
        let first = self.future;
        let second = next.future;
        Self::new(fields, async move {
            let outcome = first.await;
            outcome.merge(second.await)
        })
    }
}

impl fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingValidation")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Future for PendingValidation {
    type Output = ValidationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

/// A submission that already holds the controller's processing slot.
#[must_use = "the submission is only sent when the future is awaited or spawned"]
pub struct PendingSubmit {
    future: BoxFuture<Result<Value, SubmitError>>,
}

impl PendingSubmit {
    pub(crate) fn new(
        future: impl Future<Output = Result<Value, SubmitError>> + Send + 'static,
    ) -> Self {
        Self {
            future: Box::pin(future),
        }
    }

    pub(crate) fn ready(result: Result<Value, SubmitError>) -> Self {
        Self::new(std::future::ready(result))
    }
}

impl fmt::Debug for PendingSubmit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSubmit").finish_non_exhaustive()
    }
}

impl Future for PendingSubmit {
    type Output = Result<Value, SubmitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

/// Releases in-flight counters even when a validation future is dropped early.
pub(crate) struct InFlightGuard {
    state: Weak<Mutex<FormState>>,
    tickets: Vec<Ticket>,
}

impl InFlightGuard {
    pub fn new(state: Weak<Mutex<FormState>>, tickets: Vec<Ticket>) -> Self {
        Self { state, tickets }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().release(&self.tickets);
        }
    }
}

/// Frees the processing slot of the submission it was created for.
pub(crate) struct SubmissionGuard {
    state: Weak<Mutex<FormState>>,
    id: u64,
}

impl SubmissionGuard {
    pub fn new(state: Weak<Mutex<FormState>>, id: u64) -> Self {
        Self { state, id }
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().end_submission(self.id);
        }
    }
}
