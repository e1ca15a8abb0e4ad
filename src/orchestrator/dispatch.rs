//! Backend dispatcher.
//!
//! Receives commands from the UI thread, runs each call as its own task and sends the
//! completion back. Calls are never de-duplicated or cancelled; ordering of completions
//! is whatever the network produces.

use crate::backend::BackendClient;
use crate::model::{AppEvent, BackendCommand};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Execute backend commands until `Quit` or until the UI side hangs up.
pub(crate) async fn run_dispatcher(
    client: BackendClient,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<BackendCommand>,
) -> Result<()> {
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(BackendCommand::FetchPatients { request_id }) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        in_flight.spawn(async move {
                            let outcome = client.fetch_patients().await;
                            let _ = tx.send(AppEvent::PatientsLoaded { request_id, outcome });
                        });
                    }
                    Some(BackendCommand::Transform { kind, request_id, text }) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        in_flight.spawn(async move {
                            let outcome = client.transform(kind, &text).await;
                            // The UI may be gone already; a dropped completion is fine.
                            let _ = tx.send(AppEvent::TransformCompleted { kind, request_id, outcome });
                        });
                    }
                    Some(BackendCommand::Quit) | None => {
                        if !in_flight.is_empty() {
                            tracing::info!(outstanding = in_flight.len(), "leaving with requests in flight");
                        }
                        break;
                    }
                }
            }
            // Reap finished tasks so a panicking call is at least logged.
            done = async {
                if in_flight.is_empty() {
                    futures::future::pending().await
                } else {
                    in_flight.join_next().await
                }
            } => {
                if let Some(Err(e)) = done {
                    tracing::error!(error = %e, "backend task failed");
                    let _ = event_tx.send(AppEvent::Info(format!("Backend task failed: {e}")));
                }
            }
        }
    }

    in_flight.detach_all();
    Ok(())
}
