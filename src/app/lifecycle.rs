//! Idle → pending → resolved/failed cycle for one outbound call.

use crate::backend::BackendError;
use crate::model::{BackendCommand, RequestId, RequestState, WorkbenchKind};
use tokio::sync::mpsc::UnboundedSender;

/// Shown when a 2xx response lacks its result and the policy is [`MalformedPolicy::Fail`].
pub const MALFORMED_MESSAGE: &str = "The backend returned a response without a result.";

/// How a 2xx response without the expected result field is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Leave the request pending and log a warning.
    #[default]
    Absorb,
    /// Fail with [`MALFORMED_MESSAGE`].
    Fail,
}

/// What `complete` did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Resolved,
    Failed,
    /// Malformed response left the state pending.
    Absorbed,
    /// An older request finished after a newer one was issued.
    Stale,
    /// The owner was unmounted.
    Disposed,
}

pub struct RequestLifecycle<T = String> {
    state: RequestState<T>,
    latest: Option<RequestId>,
    disposed: bool,
    policy: MalformedPolicy,
    failure_message: &'static str,
    malformed_message: &'static str,
}

impl<T> RequestLifecycle<T> {
    pub fn new(failure_message: &'static str, policy: MalformedPolicy) -> Self {
        Self {
            state: RequestState::Idle,
            latest: None,
            disposed: false,
            policy,
            failure_message,
            malformed_message: MALFORMED_MESSAGE,
        }
    }

    /// Message shown when [`MalformedPolicy::Fail`] rejects a response.
    pub fn with_malformed_message(mut self, message: &'static str) -> Self {
        self.malformed_message = message;
        self
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    /// Enter `Pending` for a fresh request, dropping any previous result or error.
    pub fn begin(&mut self) -> RequestId {
        let id = RequestId::next();
        self.state = RequestState::Pending;
        self.latest = Some(id);
        id
    }

    /// Apply the outcome of request `id`.
    ///
    /// Only the most recently issued request may change the state; the raw error of a
    /// failure goes to the log and the state carries the fixed user-facing message.
    pub fn complete(&mut self, id: RequestId, outcome: Result<T, BackendError>) -> Applied {
        if self.disposed {
            tracing::debug!(request = %id, "completion after unmount discarded");
            return Applied::Disposed;
        }
        if self.latest != Some(id) {
            tracing::debug!(request = %id, latest = ?self.latest, "stale completion discarded");
            return Applied::Stale;
        }
        match outcome {
            Ok(v) => {
                self.state = RequestState::Resolved(v);
                Applied::Resolved
            }
            Err(e) if e.is_malformed() => match self.policy {
                MalformedPolicy::Absorb => {
                    tracing::warn!(
                        request = %id,
                        error = %e,
                        "response without result ignored; request stays pending"
                    );
                    Applied::Absorbed
                }
                MalformedPolicy::Fail => {
                    tracing::warn!(request = %id, error = %e, "response without result");
                    self.state = RequestState::Failed(self.malformed_message.to_string());
                    Applied::Failed
                }
            },
            Err(e) => {
                tracing::error!(request = %id, error = %e, endpoint = e.endpoint(), "request failed");
                self.state = RequestState::Failed(self.failure_message.to_string());
                Applied::Failed
            }
        }
    }

    /// Fail the current request without waiting for a completion.
    pub fn fail(&mut self) {
        self.state = RequestState::Failed(self.failure_message.to_string());
    }

    /// Stop accepting completions. Used when the owning component goes away.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}

impl RequestLifecycle<String> {
    /// Start a transformation of `input` against `kind`'s endpoint.
    ///
    /// Empty or absent input is a no-op: no state change and nothing sent.
    pub fn submit(
        &mut self,
        kind: WorkbenchKind,
        input: Option<&str>,
        tx: &UnboundedSender<BackendCommand>,
    ) -> Option<RequestId> {
        let text = input.filter(|t| !t.is_empty())?;
        let request_id = self.begin();
        tracing::info!(request = %request_id, endpoint = kind.endpoint(), "submitting note");
        if tx
            .send(BackendCommand::Transform {
                kind,
                request_id,
                text: text.to_string(),
            })
            .is_err()
        {
            // Dispatcher is gone; nothing will ever complete this request.
            tracing::error!(request = %request_id, "dispatcher unavailable");
            self.fail();
        }
        Some(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn lifecycle(policy: MalformedPolicy) -> RequestLifecycle<String> {
        RequestLifecycle::new(WorkbenchKind::Explainer.failure_message(), policy)
    }

    fn transport_error() -> BackendError {
        BackendError::Status {
            endpoint: "/explain_note",
            status: 500,
            body: "Failed to generate explanation: CUDA out of memory".into(),
        }
    }

    fn malformed() -> BackendError {
        BackendError::MalformedResponse {
            endpoint: "/explain_note",
            detail: "missing `simplified_explanation`".into(),
        }
    }

    #[test]
    fn submit_goes_pending_before_any_completion_and_sends_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc
            .submit(WorkbenchKind::Explainer, Some("BP 150/90"), &tx)
            .unwrap();
        assert!(lc.state().is_pending());
        match rx.try_recv().unwrap() {
            BackendCommand::Transform {
                kind,
                request_id,
                text,
            } => {
                assert_eq!(kind, WorkbenchKind::Explainer);
                assert_eq!(request_id, id);
                assert_eq!(text, "BP 150/90");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn empty_or_absent_input_is_a_no_op() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        assert!(lc.submit(WorkbenchKind::Explainer, Some(""), &tx).is_none());
        assert!(lc.submit(WorkbenchKind::Explainer, None, &tx).is_none());
        assert_eq!(lc.state(), &RequestState::Idle);
        assert!(rx.try_recv().is_err());

        let id = lc.begin();
        lc.complete(id, Ok("done".into()));
        assert!(lc.submit(WorkbenchKind::Explainer, Some(""), &tx).is_none());
        assert_eq!(lc.state(), &RequestState::Resolved("done".into()));
    }

    #[test]
    fn success_resolves_with_result_text() {
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc.begin();
        assert_eq!(lc.complete(id, Ok("X".into())), Applied::Resolved);
        assert_eq!(lc.state(), &RequestState::Resolved("X".into()));
    }

    #[test]
    fn failure_uses_fixed_message_without_raw_error() {
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc.begin();
        assert_eq!(lc.complete(id, Err(transport_error())), Applied::Failed);
        let msg = lc.state().failure().unwrap();
        assert_eq!(msg, WorkbenchKind::Explainer.failure_message());
        assert!(!msg.contains("CUDA"));
        assert!(!msg.contains("500"));
    }

    #[test]
    fn malformed_response_stays_pending_by_default() {
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc.begin();
        assert_eq!(lc.complete(id, Err(malformed())), Applied::Absorbed);
        assert!(lc.state().is_pending());
    }

    #[test]
    fn strict_policy_fails_malformed_response_with_distinct_message() {
        let mut lc = lifecycle(MalformedPolicy::Fail);
        let id = lc.begin();
        assert_eq!(lc.complete(id, Err(malformed())), Applied::Failed);
        assert_eq!(lc.state().failure(), Some(MALFORMED_MESSAGE));
        assert_ne!(MALFORMED_MESSAGE, WorkbenchKind::Explainer.failure_message());
    }

    #[test]
    fn terminal_states_are_reentered_through_pending() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc.begin();
        lc.complete(id, Err(transport_error()));
        lc.submit(WorkbenchKind::Explainer, Some("again"), &tx);
        assert!(lc.state().is_pending());
        assert!(lc.state().failure().is_none());
    }

    #[test]
    fn only_latest_request_may_complete() {
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let first = lc.begin();
        let second = lc.begin();
        assert_eq!(lc.complete(second, Ok("new".into())), Applied::Resolved);
        assert_eq!(lc.complete(first, Ok("old".into())), Applied::Stale);
        assert_eq!(lc.state(), &RequestState::Resolved("new".into()));

        // An older failure arriving after the newer call is still pending.
        let third = lc.begin();
        assert_eq!(lc.complete(second, Err(transport_error())), Applied::Stale);
        assert!(lc.state().is_pending());
        assert_eq!(lc.complete(third, Ok("newest".into())), Applied::Resolved);
    }

    #[test]
    fn disposed_lifecycle_ignores_late_completion() {
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        let id = lc.begin();
        lc.dispose();
        assert_eq!(lc.complete(id, Ok("late".into())), Applied::Disposed);
        assert!(lc.state().is_pending());
    }

    #[test]
    fn closed_dispatcher_fails_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut lc = lifecycle(MalformedPolicy::Absorb);
        assert!(lc.submit(WorkbenchKind::Explainer, Some("x"), &tx).is_some());
        assert_eq!(
            lc.state().failure(),
            Some(WorkbenchKind::Explainer.failure_message())
        );
    }
}
