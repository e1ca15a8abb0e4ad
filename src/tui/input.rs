use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Quit,
    Up,
    Down,
    Activate,
    Explain,
    NextFocus,
    PrevFocus,
    Help,
    Back,
    Submit,
    ToggleWorkbench,
    ClearBuffer,
    CopyResult,
    SaveResult,
    Insert(char),
    Newline,
    Backspace,
}

/// Map a key press to an action. `editing` means a workbench has focus, where plain
/// characters go into the buffer and commands need Ctrl.
pub fn map_key(key: KeyEvent, editing: bool) -> Option<UiAction> {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return Some(UiAction::Quit),
        KeyCode::Tab => return Some(UiAction::NextFocus),
        KeyCode::BackTab => return Some(UiAction::PrevFocus),
        KeyCode::F(1) => return Some(UiAction::Help),
        KeyCode::Esc => return Some(UiAction::Back),
        _ => {}
    }

    if editing {
        return match key.code {
            KeyCode::Char('s') if ctrl => Some(UiAction::Submit),
            KeyCode::Char('w') if ctrl => Some(UiAction::ToggleWorkbench),
            KeyCode::Char('l') if ctrl => Some(UiAction::ClearBuffer),
            KeyCode::Char('y') if ctrl => Some(UiAction::CopyResult),
            KeyCode::Char('o') if ctrl => Some(UiAction::SaveResult),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(UiAction::Insert(c))
            }
            KeyCode::Enter => Some(UiAction::Newline),
            KeyCode::Backspace => Some(UiAction::Backspace),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(UiAction::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(UiAction::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(UiAction::Up),
        KeyCode::Enter => Some(UiAction::Activate),
        KeyCode::Char('e') => Some(UiAction::Explain),
        KeyCode::Char('?') => Some(UiAction::Help),
        _ => None,
    }
}
