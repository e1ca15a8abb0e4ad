use super::lifecycle::{Applied, MalformedPolicy, RequestLifecycle};
use crate::backend::BackendError;
use crate::model::{BackendCommand, NoteHandoff, RequestId, RequestState, WorkbenchKind};
use tokio::sync::mpsc::UnboundedSender;

/// A text buffer paired with one request lifecycle bound to one endpoint.
pub struct NoteWorkbench {
    kind: WorkbenchKind,
    buffer: String,
    lifecycle: RequestLifecycle<String>,
    last_handoff_token: Option<u64>,
}

impl NoteWorkbench {
    pub fn new(kind: WorkbenchKind, policy: MalformedPolicy) -> Self {
        Self {
            kind,
            buffer: String::new(),
            lifecycle: RequestLifecycle::new(kind.failure_message(), policy),
            last_handoff_token: None,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn state(&self) -> &RequestState<String> {
        self.lifecycle.state()
    }

    pub fn last_handoff_token(&self) -> Option<u64> {
        self.last_handoff_token
    }

    pub fn submit(&mut self, tx: &UnboundedSender<BackendCommand>) -> Option<RequestId> {
        self.lifecycle.submit(self.kind, Some(&self.buffer), tx)
    }

    pub fn complete(&mut self, id: RequestId, outcome: Result<String, BackendError>) -> Applied {
        self.lifecycle.complete(id, outcome)
    }

    /// Load a handoff into the buffer if its token has not been seen yet.
    ///
    /// Returns whether the buffer was overwritten. The request state is untouched and
    /// nothing is submitted; the user reviews the text first.
    pub fn observe_handoff(&mut self, handoff: Option<&NoteHandoff>) -> bool {
        let Some(handoff) = handoff else {
            return false;
        };
        if self.last_handoff_token == Some(handoff.token) {
            return false;
        }
        self.last_handoff_token = Some(handoff.token);
        self.buffer.clone_from(&handoff.text);
        true
    }

    pub fn insert_char(&mut self, c: char) {
        self.buffer.push(c);
    }

    pub fn newline(&mut self) {
        self.buffer.push('\n');
    }

    /// Append pasted text, normalizing line endings.
    pub fn paste(&mut self, text: &str) {
        self.buffer.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn replace(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Detach from outstanding requests; their completions will be discarded.
    pub fn unmount(&mut self) {
        self.lifecycle.dispose();
    }
}
