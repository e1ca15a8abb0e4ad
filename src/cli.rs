use crate::app::{AppController, Applied, MalformedPolicy};
use crate::backend::BackendClient;
use crate::logging::LogTarget;
use crate::model::{AppEvent, BackendCommand, BackendConfig, Patient, RequestState, WorkbenchKind};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "clinical-assistant",
    version,
    about = "Browse patient records and explain or summarize clinical notes"
)]
pub struct Cli {
    /// Backend URL scheme
    #[arg(long, env = "CLINICAL_BACKEND_SCHEME", default_value = "http", value_parser = ["http", "https"])]
    pub scheme: String,

    /// Backend host name or address
    #[arg(long, env = "CLINICAL_BACKEND_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Backend port
    #[arg(long, env = "CLINICAL_BACKEND_PORT", default_value_t = 8000)]
    pub port: u16,

    /// TCP connect timeout for backend calls
    #[arg(long, default_value = "3s")]
    pub connect_timeout: humantime::Duration,

    /// Overall timeout for one backend call (model inference can be slow)
    #[arg(long, default_value = "60s")]
    pub request_timeout: humantime::Duration,

    /// Treat a success response without its result field as a failure instead of
    /// leaving the request pending
    #[arg(long)]
    pub strict_responses: bool,

    /// Print the patient list as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print the patient list as text and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// With --text, print the full record of the patient with this id
    #[arg(long, requires = "text")]
    pub patient: Option<String>,

    /// Explain the note in FILE ("-" for stdin) and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["json", "text", "summarize"])]
    pub explain: Option<PathBuf>,

    /// Summarize the note in FILE ("-" for stdin) and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["json", "text"])]
    pub summarize: Option<PathBuf>,

    /// Log file (TUI mode logs here; defaults to the user cache directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Any mode that prints and exits instead of starting the TUI.
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.explain.is_some() || self.summarize.is_some()
    }

    pub fn log_target(&self) -> Option<LogTarget> {
        if let Some(path) = &self.log_file {
            return Some(LogTarget::File(path.clone()));
        }
        if self.is_headless() || cfg!(not(feature = "tui")) {
            return Some(LogTarget::Stderr);
        }
        crate::logging::default_log_path().map(LogTarget::File)
    }

    pub fn malformed_policy(&self) -> MalformedPolicy {
        if self.strict_responses {
            MalformedPolicy::Fail
        } else {
            MalformedPolicy::Absorb
        }
    }
}

/// Build a `BackendConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> BackendConfig {
    BackendConfig {
        scheme: args.scheme.clone(),
        host: args.host.clone(),
        port: args.port,
        connect_timeout: Duration::from(args.connect_timeout),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("clinical-assistant/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    tracing::info!(backend = %cfg.base_url(), "starting");

    if let Some(path) = args.explain.clone() {
        return run_transform(&args, WorkbenchKind::Explainer, &path).await;
    }
    if let Some(path) = args.summarize.clone() {
        return run_transform(&args, WorkbenchKind::Summarizer, &path).await;
    }
    if args.json || args.text {
        return run_directory(args).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(args).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        run_directory(Cli { text: true, ..args }).await
    }
}

/// Controller wired to a freshly spawned dispatcher.
struct Session {
    app: AppController,
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    dispatcher: tokio::task::JoinHandle<Result<()>>,
}

impl Session {
    fn start(args: &Cli) -> Result<Self> {
        let client = BackendClient::new(&build_config(args))?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<BackendCommand>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
        let dispatcher = tokio::spawn(crate::orchestrator::run_dispatcher(
            client, event_tx, cmd_rx,
        ));
        let app = AppController::new(cmd_tx.clone(), args.malformed_policy());
        Ok(Self {
            app,
            cmd_tx,
            event_rx,
            dispatcher,
        })
    }

    /// Apply completions until one actually lands on its owner.
    async fn settle(&mut self) -> Result<Applied> {
        loop {
            let ev = tokio::select! {
                ev = self.event_rx.recv() => ev.context("backend dispatcher stopped unexpectedly")?,
                _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
            };
            match self.app.apply_event(ev) {
                Some(Applied::Stale) | Some(Applied::Disposed) | None => continue,
                Some(applied) => return Ok(applied),
            }
        }
    }

    async fn finish(self) {
        let _ = self.cmd_tx.send(BackendCommand::Quit);
        let _ = self.dispatcher.await;
    }
}

async fn run_directory(args: Cli) -> Result<()> {
    let mut session = Session::start(&args)?;
    session.app.start();
    session.settle().await?;

    if let Some(msg) = session.app.directory().state().failure() {
        let msg = msg.to_string();
        session.finish().await;
        return Err(anyhow::anyhow!(msg));
    }

    let (out_tx, out_handle) = spawn_output_writer();
    let patients: Vec<&Patient> = session
        .app
        .directory()
        .patients()
        .iter()
        .map(|p| p.as_ref())
        .collect();

    if args.json {
        let out = serde_json::to_string_pretty(&patients)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if let Some(id) = args.patient.as_deref() {
        let index = patients
            .iter()
            .position(|p| p.id == id)
            .with_context(|| format!("no patient with id {id}"))?;
        session.app.select_patient_at(index);
        let summary = crate::text_summary::build_record_summary(session.app.record_view());
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    } else {
        let summary = crate::text_summary::build_directory_summary(&patients);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    session.finish().await;
    Ok(())
}

async fn read_note(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("read note from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read note from {}", path.display()))
}

async fn run_transform(args: &Cli, kind: WorkbenchKind, path: &Path) -> Result<()> {
    let note = read_note(path).await?;
    let mut session = Session::start(args)?;
    if let Some(wb) = session.app.workbench_mut(kind) {
        wb.replace(note);
    }
    if session.app.submit(kind).is_none() {
        session.finish().await;
        return Err(anyhow::anyhow!("note is empty; nothing to send"));
    }
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "{}: sending to {}…",
        kind.title(),
        kind.endpoint()
    )));

    session.settle().await?;
    let state = session
        .app
        .workbench(kind)
        .map(|wb| wb.state().clone())
        .unwrap_or_default();

    let res = match state {
        RequestState::Resolved(text) => {
            let _ = out_tx.send(OutputLine::Stderr(format!("{}:", kind.result_label())));
            let _ = out_tx.send(OutputLine::Stdout(text));
            Ok(())
        }
        RequestState::Failed(msg) => Err(anyhow::anyhow!(msg)),
        RequestState::Pending => Err(anyhow::anyhow!(
            "backend answered without `{}`; request left pending (use --strict-responses to fail fast)",
            kind.result_field()
        )),
        RequestState::Idle => Err(anyhow::anyhow!("request was never sent")),
    };

    drop(out_tx);
    let _ = out_handle.await;
    session.finish().await;
    res
}
