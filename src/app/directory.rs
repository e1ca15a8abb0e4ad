use super::lifecycle::{Applied, MalformedPolicy, RequestLifecycle};
use crate::backend::BackendError;
use crate::model::{BackendCommand, Patient, RequestId, RequestState};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub const DIRECTORY_FAILURE_MESSAGE: &str =
    "Failed to fetch patients. Please ensure the backend is running.";

/// The patient list. Fetched once when mounted; a failure is final until restart.
pub struct PatientDirectory {
    lifecycle: RequestLifecycle<Vec<Arc<Patient>>>,
    mounted: bool,
}

impl Default for PatientDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientDirectory {
    pub fn new() -> Self {
        Self {
            // An undecodable list must not leave the directory loading forever.
            lifecycle: RequestLifecycle::new(DIRECTORY_FAILURE_MESSAGE, MalformedPolicy::Fail)
                .with_malformed_message(DIRECTORY_FAILURE_MESSAGE),
            mounted: false,
        }
    }

    /// Issue the one fetch of this directory's lifetime.
    pub fn mount(&mut self, tx: &UnboundedSender<BackendCommand>) -> Option<RequestId> {
        if self.mounted {
            return None;
        }
        self.mounted = true;
        let request_id = self.lifecycle.begin();
        tracing::info!(request = %request_id, "loading patient directory");
        if tx.send(BackendCommand::FetchPatients { request_id }).is_err() {
            tracing::error!(request = %request_id, "dispatcher unavailable");
            self.lifecycle.fail();
        }
        Some(request_id)
    }

    pub fn complete(
        &mut self,
        id: RequestId,
        outcome: Result<Vec<Patient>, BackendError>,
    ) -> Applied {
        let applied = self
            .lifecycle
            .complete(id, outcome.map(|ps| ps.into_iter().map(Arc::new).collect()));
        if applied == Applied::Resolved {
            tracing::info!(count = self.patients().len(), "patient directory loaded");
        }
        applied
    }

    pub fn state(&self) -> &RequestState<Vec<Arc<Patient>>> {
        self.lifecycle.state()
    }

    /// Loaded patients; empty while loading or after a failure.
    pub fn patients(&self) -> &[Arc<Patient>] {
        self.lifecycle
            .state()
            .resolved()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The selection event for the activation control at `index`.
    pub fn activate(&self, index: usize) -> Option<Arc<Patient>> {
        self.patients().get(index).cloned()
    }
}

#[cfg(test)]
pub(crate) fn sample_patients() -> Vec<Patient> {
    serde_json::from_value(serde_json::json!([
        {
            "_id": "p-1",
            "name": "Maria Lopez",
            "gender": "female",
            "birthDate": "1958-03-14",
            "conditions": ["Hypertension", "Type 2 diabetes"],
            "medications": ["Lisinopril 10 MG", "Metformin 500 MG"],
            "reports_text": [
                "<div>Patient seen for routine follow-up.</div>",
                "<div>BP 150/90. Plan: titrate <b>lisinopril</b>.</div>",
                "<p>HbA1c 7.9%.</p>"
            ]
        },
        {
            "_id": "p-2",
            "name": "John Carter",
            "gender": "male",
            "birthDate": "1990-07-02",
            "conditions": [],
            "medications": [],
            "reports_text": []
        }
    ]))
    .unwrap()
}
