use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn bind(keys: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(keys, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:pad$}{what}", "", pad = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        bind("Ctrl-C", 7, "Quit (q also works outside the editors)"),
        bind("tab", 10, "Next pane (shift-tab: previous)"),
        bind("F1", 11, "Show this help (? outside the editors)"),
        bind("Esc", 10, "Leave help, or return to the patient list"),
        Line::from(""),
        Line::from("Patients and record:"),
        bind("↑/↓ or j/k", 3, "Navigate"),
        bind("Enter", 8, "Select patient / send note to the explainer"),
        bind("e", 12, "Send highlighted note to the explainer"),
        Line::from(""),
        Line::from("Explainer and summarizer:"),
        bind("Ctrl-S", 7, "Send the text to the backend"),
        bind("Ctrl-L", 7, "Clear the text"),
        bind("Ctrl-Y", 7, "Copy the result to the clipboard"),
        bind("Ctrl-O", 7, "Save the result to a file in the current directory"),
        bind("Ctrl-W", 7, "Close the editor (again to reopen it empty)"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Generated text is informational only and not medical advice.",
            Style::default().fg(Color::Gray),
        )]),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
