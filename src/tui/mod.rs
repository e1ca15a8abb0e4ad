mod export;
mod help;
mod input;
mod panes;
mod state;

use crate::app::{AppController, Applied, MalformedPolicy};
use crate::backend::BackendClient;
use crate::cli::Cli;
use crate::model::{AppEvent, BackendCommand, RequestState, WorkbenchKind};
use crate::orchestrator;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use input::{map_key, UiAction};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{Focus, UiState, TAB_HELP, TAB_PATIENTS};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let client = BackendClient::new(&crate::cli::build_config(&args))?;
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<BackendCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let policy = args.malformed_policy();
    let ui_handle = std::thread::spawn(move || run_threaded(policy, event_rx, cmd_tx));

    let res = orchestrator::run_dispatcher(client, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread. The controller lives and dies here.
pub fn run_threaded(
    policy: MalformedPolicy,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<BackendCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut app = AppController::new(cmd_tx.clone(), policy);
    let mut ui = UiState::default();
    app.start();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_backend_event(&mut ui, &mut app, ev);
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &app, &ui)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) => {
                    let Some(action) = map_key(k, ui.is_editing()) else {
                        continue;
                    };
                    if apply_action(&mut ui, &mut app, action) {
                        let _ = cmd_tx.send(BackendCommand::Quit);
                        break Ok(());
                    }
                    // Redraw right away so typing does not lag behind the tick.
                    dirty = true;
                }
                Ok(Event::Paste(text)) => {
                    if let Some(wb) = ui
                        .focus
                        .workbench()
                        .filter(|_| ui.is_editing())
                        .and_then(|kind| app.workbench_mut(kind))
                    {
                        wb.paste(&text);
                    }
                    dirty = true;
                }
                Ok(_) => {}
                Err(e) => {
                    let _ = cmd_tx.send(BackendCommand::Quit);
                    break Err(anyhow::Error::new(e).context("read terminal event"));
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

/// Route one completion through the controller and reflect it in the status line.
fn apply_backend_event(ui: &mut UiState, app: &mut AppController, ev: AppEvent) {
    let kind = match &ev {
        AppEvent::TransformCompleted { kind, .. } => Some(*kind),
        AppEvent::Info(msg) => {
            ui.info = msg.clone();
            None
        }
        AppEvent::PatientsLoaded { .. } => None,
    };
    let Some(applied) = app.apply_event(ev) else {
        return;
    };

    match (kind, applied) {
        (None, Applied::Resolved) => {
            ui.info = format!("Loaded {} patients", app.directory().patients().len());
            ui.patient_cursor = 0;
        }
        (None, Applied::Failed) => {
            if let Some(msg) = app.directory().state().failure() {
                ui.info = msg.to_string();
            }
        }
        (Some(kind), Applied::Resolved) => {
            ui.info = format!("{}: result ready (Ctrl-Y copy, Ctrl-O save)", kind.title());
        }
        (Some(kind), Applied::Failed) => {
            ui.info = kind.failure_message().to_string();
        }
        (Some(kind), Applied::Absorbed) => {
            ui.info = format!(
                "{}: backend response had no `{}`; still waiting",
                kind.title(),
                kind.result_field()
            );
        }
        _ => {}
    }
}

/// Apply one key action. Returns `true` when the user asked to quit.
fn apply_action(ui: &mut UiState, app: &mut AppController, action: UiAction) -> bool {
    match action {
        UiAction::Quit => return true,
        UiAction::Help => {
            ui.tab = if ui.tab == TAB_HELP {
                ui.focus.tab()
            } else {
                TAB_HELP
            };
            return false;
        }
        UiAction::Back => {
            if ui.tab == TAB_HELP {
                ui.tab = ui.focus.tab();
            } else {
                ui.set_focus(Focus::Patients);
            }
            return false;
        }
        UiAction::NextFocus => {
            ui.set_focus(ui.focus.next());
            return false;
        }
        UiAction::PrevFocus => {
            ui.set_focus(ui.focus.prev());
            return false;
        }
        _ => {}
    }
    if ui.tab == TAB_HELP {
        return false;
    }

    match ui.focus.workbench() {
        Some(kind) => apply_workbench_action(ui, app, kind, action),
        None => apply_browse_action(ui, app, action),
    }
    false
}

fn apply_browse_action(ui: &mut UiState, app: &mut AppController, action: UiAction) {
    let down = action == UiAction::Down;
    match (ui.focus, action) {
        (Focus::Patients, UiAction::Up | UiAction::Down) => {
            let len = app.directory().patients().len();
            UiState::step_cursor(&mut ui.patient_cursor, len, down);
        }
        (Focus::Record, UiAction::Up | UiAction::Down) => {
            let len = app.record_view().notes().len();
            UiState::step_cursor(&mut ui.note_cursor, len, down);
        }
        (Focus::Patients, UiAction::Activate) => {
            if let Some(p) = app.select_patient_at(ui.patient_cursor) {
                ui.note_cursor = 0;
                ui.info = format!("Selected {}", p.name);
            }
        }
        (Focus::Record, UiAction::Activate | UiAction::Explain) => {
            if app.explain_note_at(ui.note_cursor).is_none() {
                return;
            }
            ui.info = if app.workbench(WorkbenchKind::Explainer).is_some() {
                format!(
                    "Note {} loaded into the explainer (Ctrl-S there to send)",
                    ui.note_cursor + 1
                )
            } else {
                "Explainer is closed; it will pick up this note when reopened".into()
            };
        }
        _ => {}
    }
}

fn apply_workbench_action(
    ui: &mut UiState,
    app: &mut AppController,
    kind: WorkbenchKind,
    action: UiAction,
) {
    if action == UiAction::ToggleWorkbench {
        let open = app.toggle_workbench(kind);
        ui.info = format!(
            "{} {}",
            kind.title(),
            if open { "opened" } else { "closed" }
        );
        return;
    }
    if action == UiAction::Submit {
        if app.submit(kind).is_some() {
            ui.info = format!("{}: sent to {}", kind.title(), kind.endpoint());
        } else if let Some(msg) = app.workbench(kind).and_then(|wb| wb.state().failure()) {
            ui.info = msg.to_string();
        } else if app.workbench(kind).is_some() {
            ui.info = "Nothing to send".into();
        }
        return;
    }

    let Some(wb) = app.workbench_mut(kind) else {
        ui.info = format!("{} is closed (Ctrl-W to reopen)", kind.title());
        return;
    };
    match action {
        UiAction::Insert(c) => wb.insert_char(c),
        UiAction::Newline => wb.newline(),
        UiAction::Backspace => wb.backspace(),
        UiAction::ClearBuffer => wb.clear(),
        UiAction::CopyResult => {
            ui.info = match wb.state() {
                RequestState::Resolved(text) => match export::copy_to_clipboard(text) {
                    Ok(()) => format!("Copied {} to clipboard", kind.result_label()),
                    Err(e) => format!("Clipboard failed: {e:#}"),
                },
                _ => "No result to copy yet".into(),
            };
        }
        UiAction::SaveResult => {
            ui.info = match wb.state() {
                RequestState::Resolved(text) => match export::export_result(kind, text) {
                    Ok(path) => format!("Saved: {}", path.display()),
                    Err(e) => format!("Save failed: {e:#}"),
                },
                _ => "No result to save yet".into(),
            };
        }
        _ => {}
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, app: &AppController, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Patients"),
        Line::from("Summarizer"),
        Line::from("Help"),
    ])
    .select(ui.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("clinical-assistant"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match ui.tab {
        TAB_PATIENTS => draw_patients_tab(chunks[1], f, app, ui),
        state::TAB_SUMMARIZER => {
            panes::draw_workbench(chunks[1], f, app, ui, WorkbenchKind::Summarizer)
        }
        _ => help::draw_help(chunks[1], f),
    }

    draw_status(chunks[2], f, ui);
}

fn draw_patients_tab(area: Rect, f: &mut ratatui::Frame, app: &AppController, ui: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(40),
                Constraint::Percentage(35),
            ]
            .as_ref(),
        )
        .split(area);
    panes::draw_directory(cols[0], f, app, ui);
    panes::draw_record(cols[1], f, app, ui);
    panes::draw_workbench(cols[2], f, app, ui, WorkbenchKind::Explainer);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let focus = match ui.focus {
        Focus::Patients => "patients",
        Focus::Record => "record",
        Focus::Explainer => "explainer",
        Focus::Summarizer => "summarizer",
    };
    let line = Line::from(vec![
        Span::styled(format!("[{focus}] "), Style::default().fg(Color::Magenta)),
        Span::raw(ui.info.clone()),
        Span::styled("  ·  tab: switch pane, F1: help", Style::default().fg(Color::Gray)),
    ]);
    let status = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sample_patients;
    use crate::backend::BackendError;
    use crate::model::RequestId;

    fn loaded() -> (UiState, AppController, UnboundedReceiver<BackendCommand>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = AppController::new(tx, MalformedPolicy::Absorb);
        let mut ui = UiState::default();
        app.start();
        let Ok(BackendCommand::FetchPatients { request_id }) = rx.try_recv() else {
            panic!("expected a patient fetch");
        };
        apply_backend_event(
            &mut ui,
            &mut app,
            AppEvent::PatientsLoaded {
                request_id,
                outcome: Ok(sample_patients()),
            },
        );
        (ui, app, rx)
    }

    fn press(ui: &mut UiState, app: &mut AppController, actions: &[UiAction]) {
        for a in actions {
            assert!(!apply_action(ui, app, *a), "{a:?} should not quit");
        }
    }

    #[test]
    fn browse_select_explain_and_send() {
        let (mut ui, mut app, mut rx) = loaded();
        assert_eq!(ui.info, "Loaded 2 patients");

        press(
            &mut ui,
            &mut app,
            &[
                UiAction::Activate,
                UiAction::NextFocus,
                UiAction::Down,
                UiAction::Explain,
            ],
        );
        assert_eq!(app.selection().map(|p| p.id.as_str()), Some("p-1"));
        let explainer = app.workbench(WorkbenchKind::Explainer).unwrap();
        assert_eq!(
            explainer.buffer(),
            "<div>BP 150/90. Plan: titrate <b>lisinopril</b>.</div>"
        );
        assert!(ui.info.starts_with("Note 2 loaded"));

        press(&mut ui, &mut app, &[UiAction::NextFocus, UiAction::Submit]);
        assert!(ui.is_editing());
        match rx.try_recv() {
            Ok(BackendCommand::Transform { kind, text, .. }) => {
                assert_eq!(kind, WorkbenchKind::Explainer);
                assert!(text.contains("lisinopril"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typing_only_reaches_the_focused_workbench() {
        let (mut ui, mut app, _rx) = loaded();
        ui.set_focus(Focus::Summarizer);
        press(
            &mut ui,
            &mut app,
            &[UiAction::Insert('h'), UiAction::Insert('i'), UiAction::Newline],
        );
        assert_eq!(app.workbench(WorkbenchKind::Summarizer).unwrap().buffer(), "hi\n");
        assert!(app
            .workbench(WorkbenchKind::Explainer)
            .unwrap()
            .buffer()
            .is_empty());
    }

    #[test]
    fn empty_submit_sends_nothing() {
        let (mut ui, mut app, mut rx) = loaded();
        ui.set_focus(Focus::Summarizer);
        press(&mut ui, &mut app, &[UiAction::Submit]);
        assert_eq!(ui.info, "Nothing to send");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_workbench_drops_late_result_and_reopens_empty() {
        let (mut ui, mut app, mut rx) = loaded();
        ui.set_focus(Focus::Summarizer);
        press(&mut ui, &mut app, &[UiAction::Insert('x'), UiAction::Submit]);
        let Ok(BackendCommand::Transform { request_id, .. }) = rx.try_recv() else {
            panic!("expected a transform");
        };
        press(&mut ui, &mut app, &[UiAction::ToggleWorkbench]);
        assert!(app.workbench(WorkbenchKind::Summarizer).is_none());

        press(&mut ui, &mut app, &[UiAction::Insert('y')]);
        assert!(ui.info.contains("closed"));

        apply_backend_event(
            &mut ui,
            &mut app,
            AppEvent::TransformCompleted {
                kind: WorkbenchKind::Summarizer,
                request_id,
                outcome: Ok("late".into()),
            },
        );
        press(&mut ui, &mut app, &[UiAction::ToggleWorkbench]);
        let wb = app.workbench(WorkbenchKind::Summarizer).unwrap();
        assert!(wb.buffer().is_empty());
        assert_eq!(wb.state(), &RequestState::Idle);
    }

    #[test]
    fn failures_surface_in_status_line() {
        let (mut ui, mut app, mut rx) = loaded();
        ui.set_focus(Focus::Explainer);
        press(&mut ui, &mut app, &[UiAction::Insert('x'), UiAction::Submit]);
        let Ok(BackendCommand::Transform { request_id, .. }) = rx.try_recv() else {
            panic!("expected a transform");
        };
        apply_backend_event(
            &mut ui,
            &mut app,
            AppEvent::TransformCompleted {
                kind: WorkbenchKind::Explainer,
                request_id,
                outcome: Err(BackendError::Status {
                    endpoint: WorkbenchKind::Explainer.endpoint(),
                    status: 500,
                    body: "boom".into(),
                }),
            },
        );
        assert_eq!(ui.info, WorkbenchKind::Explainer.failure_message());

        // A completion for an id nobody issued changes nothing.
        let before = ui.info.clone();
        apply_backend_event(
            &mut ui,
            &mut app,
            AppEvent::TransformCompleted {
                kind: WorkbenchKind::Explainer,
                request_id: RequestId::next(),
                outcome: Ok("ghost".into()),
            },
        );
        assert_eq!(ui.info, before);
    }

    #[test]
    fn help_toggles_without_losing_focus() {
        let (mut ui, mut app, _rx) = loaded();
        ui.set_focus(Focus::Summarizer);
        press(&mut ui, &mut app, &[UiAction::Help]);
        assert_eq!(ui.tab, TAB_HELP);
        assert!(!ui.is_editing());
        press(&mut ui, &mut app, &[UiAction::Back]);
        assert_eq!(ui.tab, state::TAB_SUMMARIZER);
        assert_eq!(ui.focus, Focus::Summarizer);
        assert!(apply_action(&mut ui, &mut app, UiAction::Quit));
    }
}
