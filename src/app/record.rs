use crate::model::{Patient, TrustedMarkup};

pub const SELECT_PROMPT: &str = "Select a patient from the list to see their details.";
pub const NO_NOTES_MESSAGE: &str = "No clinical report notes found for this patient.";

/// Read-only view of the selected patient, or of nothing.
#[derive(Debug, Clone, Copy)]
pub struct PatientRecordView<'a> {
    patient: Option<&'a Patient>,
}

impl<'a> PatientRecordView<'a> {
    pub fn new(patient: Option<&'a Patient>) -> Self {
        Self { patient }
    }

    pub fn patient(&self) -> Option<&'a Patient> {
        self.patient
    }

    pub fn notes(&self) -> &'a [TrustedMarkup] {
        self.patient.map(|p| p.reports_text.as_slice()).unwrap_or(&[])
    }

    /// Payload of the "explain" control on note `index`: the raw note text, verbatim.
    pub fn explain_requested(&self, index: usize) -> Option<String> {
        self.notes().get(index).map(|n| n.as_raw().to_string())
    }
}
