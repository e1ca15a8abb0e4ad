//! UI-thread state: the controller and the components it owns.
//!
//! Nothing in here performs I/O. Outbound calls leave as [`crate::model::BackendCommand`]s
//! and come back as [`crate::model::AppEvent`]s, which keeps every transition synchronous.

mod controller;
mod directory;
mod lifecycle;
mod record;
mod workbench;

pub(crate) use controller::AppController;
pub(crate) use lifecycle::{Applied, MalformedPolicy};
pub(crate) use record::{PatientRecordView, NO_NOTES_MESSAGE, SELECT_PROMPT};

#[cfg(test)]
pub(crate) use directory::sample_patients;
