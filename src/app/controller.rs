//! Top-level owner of shared UI state.
//!
//! `selection` and `handoff` live here and change only through [`AppController::handle_select`]
//! and [`AppController::handle_explain_requested`]. Components receive them as read-only
//! snapshots. Backend completions are routed to the component that issued the request.

use super::directory::PatientDirectory;
use super::lifecycle::{Applied, MalformedPolicy};
use super::record::PatientRecordView;
use super::workbench::NoteWorkbench;
use crate::model::{AppEvent, BackendCommand, NoteHandoff, Patient, RequestId, WorkbenchKind};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub struct AppController {
    selection: Option<Arc<Patient>>,
    handoff: Option<NoteHandoff>,
    next_token: u64,
    directory: PatientDirectory,
    explainer: Option<NoteWorkbench>,
    summarizer: Option<NoteWorkbench>,
    policy: MalformedPolicy,
    cmd_tx: UnboundedSender<BackendCommand>,
}

impl AppController {
    pub fn new(cmd_tx: UnboundedSender<BackendCommand>, policy: MalformedPolicy) -> Self {
        Self {
            selection: None,
            handoff: None,
            next_token: 0,
            directory: PatientDirectory::new(),
            explainer: Some(NoteWorkbench::new(WorkbenchKind::Explainer, policy)),
            summarizer: Some(NoteWorkbench::new(WorkbenchKind::Summarizer, policy)),
            policy,
            cmd_tx,
        }
    }

    /// Mount the directory, which issues its single patient fetch.
    pub fn start(&mut self) {
        self.directory.mount(&self.cmd_tx);
    }

    pub fn selection(&self) -> Option<&Arc<Patient>> {
        self.selection.as_ref()
    }

    pub fn handoff(&self) -> Option<&NoteHandoff> {
        self.handoff.as_ref()
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    pub fn record_view(&self) -> PatientRecordView<'_> {
        PatientRecordView::new(self.selection.as_deref())
    }

    pub fn workbench(&self, kind: WorkbenchKind) -> Option<&NoteWorkbench> {
        match kind {
            WorkbenchKind::Explainer => self.explainer.as_ref(),
            WorkbenchKind::Summarizer => self.summarizer.as_ref(),
        }
    }

    pub fn workbench_mut(&mut self, kind: WorkbenchKind) -> Option<&mut NoteWorkbench> {
        match kind {
            WorkbenchKind::Explainer => self.explainer.as_mut(),
            WorkbenchKind::Summarizer => self.summarizer.as_mut(),
        }
    }

    /// Replace the selection. Last write wins.
    pub fn handle_select(&mut self, patient: Arc<Patient>) {
        tracing::info!(patient = %patient.id, "patient selected");
        self.selection = Some(patient);
    }

    /// Replace the handoff with a freshly tokenized record and let the Explainer see it.
    ///
    /// The token changes on every call, so the same note sent twice loads twice.
    pub fn handle_explain_requested(&mut self, note_text: impl Into<String>) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.handoff = Some(NoteHandoff {
            text: note_text.into(),
            token,
        });
        if let Some(explainer) = self.explainer.as_mut() {
            explainer.observe_handoff(self.handoff.as_ref());
        }
        tracing::debug!(token, "note handed off to explainer");
        token
    }

    /// Activate the directory entry at `index`.
    pub fn select_patient_at(&mut self, index: usize) -> Option<Arc<Patient>> {
        let patient = self.directory.activate(index)?;
        self.handle_select(patient.clone());
        Some(patient)
    }

    /// Activate the "explain" control of note `index` in the record view.
    pub fn explain_note_at(&mut self, index: usize) -> Option<u64> {
        let text = self.record_view().explain_requested(index)?;
        Some(self.handle_explain_requested(text))
    }

    pub fn submit(&mut self, kind: WorkbenchKind) -> Option<RequestId> {
        let tx = self.cmd_tx.clone();
        self.workbench_mut(kind)?.submit(&tx)
    }

    /// Unmount a mounted workbench or mount a fresh one. Returns whether it is now mounted.
    ///
    /// A freshly mounted Explainer picks up the current handoff.
    pub fn toggle_workbench(&mut self, kind: WorkbenchKind) -> bool {
        let slot = match kind {
            WorkbenchKind::Explainer => &mut self.explainer,
            WorkbenchKind::Summarizer => &mut self.summarizer,
        };
        if let Some(mut wb) = slot.take() {
            wb.unmount();
            tracing::info!(?kind, "workbench closed");
            return false;
        }
        let mut wb = NoteWorkbench::new(kind, self.policy);
        if kind == WorkbenchKind::Explainer {
            wb.observe_handoff(self.handoff.as_ref());
        }
        *slot = Some(wb);
        tracing::info!(?kind, "workbench opened");
        true
    }

    /// Route one backend completion to its owner.
    pub fn apply_event(&mut self, ev: AppEvent) -> Option<Applied> {
        match ev {
            AppEvent::PatientsLoaded {
                request_id,
                outcome,
            } => Some(self.directory.complete(request_id, outcome)),
            AppEvent::TransformCompleted {
                kind,
                request_id,
                outcome,
            } => match self.workbench_mut(kind) {
                Some(wb) => Some(wb.complete(request_id, outcome)),
                None => {
                    tracing::debug!(?kind, request = %request_id, "completion for closed workbench discarded");
                    Some(Applied::Disposed)
                }
            },
            AppEvent::Info(_) => None,
        }
    }
}
