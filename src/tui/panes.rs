use super::state::{Focus, UiState};
use crate::app::{AppController, NO_NOTES_MESSAGE, SELECT_PROMPT};
use crate::model::{RequestState, WorkbenchKind};
use crate::text_summary::patient_label;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title.to_string())
}

fn muted(s: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(s.into(), Style::default().fg(Color::Gray)))
}

fn error_line(s: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(s.into(), Style::default().fg(Color::Red)))
}

fn heading(s: &str) -> Line<'static> {
    Line::from(Span::styled(
        s.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

pub fn draw_directory(area: Rect, f: &mut Frame, app: &AppController, ui: &UiState) {
    let block = pane_block("Patients", ui.focus == Focus::Patients);
    match app.directory().state() {
        RequestState::Idle | RequestState::Pending => {
            f.render_widget(Paragraph::new(muted("Loading patients...")).block(block), area);
        }
        RequestState::Failed(msg) => {
            let p = Paragraph::new(error_line(msg.clone()))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, area);
        }
        RequestState::Resolved(patients) => {
            let selected_id = app.selection().map(|p| p.id.as_str());
            let items: Vec<ListItem> = patients
                .iter()
                .map(|p| {
                    let style = if Some(p.id.as_str()) == selected_id {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::from(Span::styled(patient_label(p), style)))
                })
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
            let mut list_state = ListState::default();
            if !patients.is_empty() {
                list_state.select(Some(ui.patient_cursor.min(patients.len() - 1)));
            }
            f.render_stateful_widget(list, area, &mut list_state);
        }
    }
}

/// Record lines plus the line index of the highlighted note's header.
fn record_lines(app: &AppController, ui: &UiState) -> (Vec<Line<'static>>, usize) {
    let view = app.record_view();
    let Some(p) = view.patient() else {
        return (vec![muted(SELECT_PROMPT)], 0);
    };

    let mut lines = vec![
        heading(&format!("Details for: {}", p.name)),
        Line::from(format!("Gender: {}", p.gender)),
        Line::from(format!("Date of Birth: {}", p.birth_date)),
        Line::from(""),
        heading("Conditions"),
    ];
    lines.extend(p.conditions.iter().map(|c| Line::from(format!("  • {c}"))));
    lines.push(Line::from(""));
    lines.push(heading("Medications"));
    lines.extend(p.medications.iter().map(|m| Line::from(format!("  • {m}"))));
    lines.push(Line::from(""));
    lines.push(heading("Clinical Report Notes"));

    if view.notes().is_empty() {
        lines.push(muted(NO_NOTES_MESSAGE));
        return (lines, 0);
    }

    let mut selected_at = 0;
    for (i, note) in view.notes().iter().enumerate() {
        let highlighted = i == ui.note_cursor && ui.focus == Focus::Record;
        if i == ui.note_cursor {
            selected_at = lines.len();
        }
        let marker_style = if highlighted {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Magenta)
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} Note {} ", if highlighted { ">" } else { " " }, i + 1),
                marker_style,
            ),
            Span::styled("[e: explain]", Style::default().fg(Color::Gray)),
        ]));
        lines.extend(
            crate::markup::render_lines(note)
                .into_iter()
                .map(|l| Line::from(format!("    {l}"))),
        );
    }
    (lines, selected_at)
}

pub fn draw_record(area: Rect, f: &mut Frame, app: &AppController, ui: &UiState) {
    let (lines, selected_at) = record_lines(app, ui);
    let visible = area.height.saturating_sub(2) as usize;
    // Keep the highlighted note header in the upper third once it would scroll off.
    let scroll = if selected_at >= visible {
        selected_at.saturating_sub(visible / 3)
    } else {
        0
    };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0))
        .block(pane_block("Record", ui.focus == Focus::Record));
    f.render_widget(p, area);
}

fn pending_label(kind: WorkbenchKind) -> &'static str {
    match kind {
        WorkbenchKind::Explainer => "Loading...",
        WorkbenchKind::Summarizer => "Summarizing...",
    }
}

fn placeholder(kind: WorkbenchKind) -> &'static str {
    match kind {
        WorkbenchKind::Explainer => "Paste a clinical note here, or press e on a note in the record.",
        WorkbenchKind::Summarizer => "Paste or type a clinical note to summarize.",
    }
}

pub fn draw_workbench(area: Rect, f: &mut Frame, app: &AppController, ui: &UiState, kind: WorkbenchKind) {
    let focused = ui.focus.workbench() == Some(kind);
    let Some(wb) = app.workbench(kind) else {
        let p = Paragraph::new(muted("Closed. Press Ctrl-W here to open a fresh one."))
            .block(pane_block(kind.title(), focused));
        f.render_widget(p, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let input = if wb.buffer().is_empty() {
        Text::from(muted(placeholder(kind)))
    } else {
        // Buffer text is user input and is never interpreted as markup.
        let mut text = Text::raw(wb.buffer().to_string());
        if focused {
            text.push_span(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }
        text
    };
    // Unedited text from the latest handoff.
    let from_record = app
        .handoff()
        .is_some_and(|h| wb.last_handoff_token() == Some(h.token) && h.text == wb.buffer());
    let action = match kind {
        WorkbenchKind::Explainer => "Explain This Note",
        WorkbenchKind::Summarizer => "Generate Summary",
    };
    let input_title = if from_record {
        format!("{} · note from record · Ctrl-S: {action}", kind.title())
    } else {
        format!("{} · Ctrl-S: {action}", kind.title())
    };
    let line_count = wb.buffer().lines().count() + 1;
    let visible = rows[0].height.saturating_sub(2) as usize;
    let scroll = line_count.saturating_sub(visible);
    f.render_widget(
        Paragraph::new(input)
            .wrap(Wrap { trim: false })
            .scroll((scroll.min(u16::MAX as usize) as u16, 0))
            .block(pane_block(&input_title, focused)),
        rows[0],
    );

    let (result, title): (Text, &str) = match wb.state() {
        RequestState::Idle => (Text::from(muted("Ctrl-S to send.")), kind.result_label()),
        RequestState::Pending => (
            Text::from(Line::from(Span::styled(
                pending_label(kind),
                Style::default().fg(Color::Cyan),
            ))),
            kind.result_label(),
        ),
        RequestState::Resolved(s) => (Text::raw(s.clone()), kind.result_label()),
        RequestState::Failed(msg) => (Text::from(error_line(msg.clone())), "Error"),
    };
    f.render_widget(
        Paragraph::new(result)
            .wrap(Wrap { trim: false })
            .block(pane_block(title, false)),
        rows[1],
    );
}
