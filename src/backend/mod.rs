//! HTTP access to the clinical assistant backend.
//!
//! The backend is a black box: `/patients` lists records, `/explain_note` and
//! `/summarize_note` transform a note's text. Errors are classified here so the
//! UI layer can decide what to surface without inspecting transport details.

mod client;

pub use client::BackendClient;

/// Path of the patient collection endpoint.
pub const PATIENTS_ENDPOINT: &str = "/patients";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("{endpoint} response is malformed: {detail}")]
    MalformedResponse {
        endpoint: &'static str,
        detail: String,
    },
}

impl BackendError {
    /// A 2xx response that did not carry the expected payload.
    pub fn is_malformed(&self) -> bool {
        matches!(self, BackendError::MalformedResponse { .. })
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            BackendError::Transport { endpoint, .. }
            | BackendError::Status { endpoint, .. }
            | BackendError::MalformedResponse { endpoint, .. } => endpoint,
        }
    }
}

/// Collapse a response body to one short line for error messages and logs.
pub(crate) fn body_snippet(s: &str) -> String {
    let single_line = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect::<String>();
    let trimmed = single_line.trim();
    if trimmed.chars().count() <= 200 {
        trimmed.to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::BackendConfig;
    use axum::Router;
    use std::time::Duration;
    use tokio::net::TcpListener;

    pub(crate) fn config_for_port(port: u16) -> BackendConfig {
        BackendConfig {
            scheme: "http".into(),
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            user_agent: "clinical-assistant-tests".into(),
        }
    }

    /// Serve `router` on an ephemeral local port and return a config pointing at it.
    pub(crate) async fn spawn_backend(router: Router) -> BackendConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        config_for_port(port)
    }

    /// A port nothing listens on.
    pub(crate) async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_single_line_and_capped() {
        let long = "x".repeat(500);
        assert_eq!(body_snippet(&long).chars().count(), 200);
        assert_eq!(body_snippet(" a\nb\r\n"), "a b");
    }

    #[test]
    fn only_missing_payload_counts_as_malformed() {
        let malformed = BackendError::MalformedResponse {
            endpoint: "/summarize_note",
            detail: "missing `summary`".into(),
        };
        let status = BackendError::Status {
            endpoint: "/summarize_note",
            status: 503,
            body: String::new(),
        };
        assert!(malformed.is_malformed());
        assert!(!status.is_malformed());
        assert_eq!(status.endpoint(), "/summarize_note");
    }
}
