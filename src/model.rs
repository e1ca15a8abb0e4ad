use crate::backend::BackendError;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Connection settings for the clinical assistant backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl BackendConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Absolute URL for an endpoint path such as `/patients`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// Raw note markup as delivered by the patient service.
///
/// This is the only text the record view renders as rich content. It can only be
/// produced by deserializing a [`Patient`], so strings from any other source
/// (workbench buffers, backend results) cannot reach the markup renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustedMarkup(String);

impl TrustedMarkup {
    pub fn as_raw(&self) -> &str {
        &self.0
    }
}

/// Patient records come from FHIR bundles where any demographic may be absent,
/// stored as `null`. Missing and `null` both read as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gender: String,
    #[serde(rename = "birthDate", default, deserialize_with = "null_as_default")]
    pub birth_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medications: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reports_text: Vec<TrustedMarkup>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Note text carried from the record view to the Explainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHandoff {
    pub text: String,
    /// Distinct for every handoff, even when `text` repeats.
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState<T = String> {
    #[default]
    Idle,
    Pending,
    Resolved(T),
    Failed(String),
}

impl<T> RequestState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            RequestState::Resolved(v) => Some(v),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            RequestState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Identity of one outbound call. Unique for the whole process so a late
/// completion can never be mistaken for a call issued by a remounted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two text-transformation workbenches and the endpoint each is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkbenchKind {
    Explainer,
    Summarizer,
}

impl WorkbenchKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            WorkbenchKind::Explainer => "/explain_note",
            WorkbenchKind::Summarizer => "/summarize_note",
        }
    }

    /// Response field holding the transformed text.
    pub fn result_field(self) -> &'static str {
        match self {
            WorkbenchKind::Explainer => "simplified_explanation",
            WorkbenchKind::Summarizer => "summary",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            WorkbenchKind::Explainer => {
                "Failed to get explanation. Please make sure the backend server is running and try again."
            }
            WorkbenchKind::Summarizer => {
                "Failed to get summary. Please make sure the backend server is running and try again."
            }
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WorkbenchKind::Explainer => "Patient Note Explainer",
            WorkbenchKind::Summarizer => "Clinical Note Summarizer",
        }
    }

    pub fn result_label(self) -> &'static str {
        match self {
            WorkbenchKind::Explainer => "Simplified Explanation",
            WorkbenchKind::Summarizer => "AI-Generated Summary",
        }
    }
}

/// Commands sent from the UI thread to the dispatcher.
#[derive(Debug, Clone)]
pub enum BackendCommand {
    FetchPatients {
        request_id: RequestId,
    },
    Transform {
        kind: WorkbenchKind,
        request_id: RequestId,
        text: String,
    },
    Quit,
}

/// Completion events delivered back to the UI thread.
#[derive(Debug)]
pub enum AppEvent {
    PatientsLoaded {
        request_id: RequestId,
        outcome: Result<Vec<Patient>, BackendError>,
    },
    TransformCompleted {
        kind: WorkbenchKind,
        request_id: RequestId,
        outcome: Result<String, BackendError>,
    },
    Info(String),
}
