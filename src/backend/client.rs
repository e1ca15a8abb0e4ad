use super::{body_snippet, BackendError, PATIENTS_ENDPOINT};
use crate::model::{BackendConfig, Patient, WorkbenchKind};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TransformRequest<'a> {
    medical_text: &'a str,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    cfg: BackendConfig,
}

impl BackendClient {
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    pub async fn fetch_patients(&self) -> std::result::Result<Vec<Patient>, BackendError> {
        let url = self.cfg.endpoint_url(PATIENTS_ENDPOINT);
        tracing::debug!(%url, "fetching patients");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: PATIENTS_ENDPOINT,
                source,
            })?;
        let body = read_success_body(PATIENTS_ENDPOINT, resp).await?;
        serde_json::from_slice::<Vec<Patient>>(&body).map_err(|e| {
            BackendError::MalformedResponse {
                endpoint: PATIENTS_ENDPOINT,
                detail: format!("expected a patient array: {e}"),
            }
        })
    }

    /// Send `text` to the workbench's endpoint and return the transformed text.
    pub async fn transform(
        &self,
        kind: WorkbenchKind,
        text: &str,
    ) -> std::result::Result<String, BackendError> {
        let endpoint = kind.endpoint();
        let url = self.cfg.endpoint_url(endpoint);
        tracing::debug!(%url, chars = text.chars().count(), "posting note");
        let resp = self
            .http
            .post(&url)
            .json(&TransformRequest { medical_text: text })
            .send()
            .await
            .map_err(|source| BackendError::Transport { endpoint, source })?;
        let body = read_success_body(endpoint, resp).await?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| BackendError::MalformedResponse {
                endpoint,
                detail: format!("body is not JSON: {e}"),
            })?;
        extract_result(&value, kind.result_field()).ok_or_else(|| {
            BackendError::MalformedResponse {
                endpoint,
                detail: format!("missing `{}`", kind.result_field()),
            }
        })
    }
}

async fn read_success_body(
    endpoint: &'static str,
    resp: reqwest::Response,
) -> std::result::Result<Vec<u8>, BackendError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            endpoint,
            status: status.as_u16(),
            body: body_snippet(&body),
        });
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|source| BackendError::Transport { endpoint, source })?;
    Ok(bytes.to_vec())
}

/// An empty string counts as missing, like an absent field.
fn extract_result(value: &serde_json::Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
