use crate::model::WorkbenchKind;

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Patients,
    Record,
    Explainer,
    Summarizer,
}

impl Focus {
    const ORDER: [Focus; 4] = [
        Focus::Patients,
        Focus::Record,
        Focus::Explainer,
        Focus::Summarizer,
    ];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn workbench(self) -> Option<WorkbenchKind> {
        match self {
            Focus::Explainer => Some(WorkbenchKind::Explainer),
            Focus::Summarizer => Some(WorkbenchKind::Summarizer),
            _ => None,
        }
    }

    /// Tab that shows this pane.
    pub fn tab(self) -> usize {
        match self {
            Focus::Summarizer => TAB_SUMMARIZER,
            _ => TAB_PATIENTS,
        }
    }
}

pub const TAB_PATIENTS: usize = 0;
pub const TAB_SUMMARIZER: usize = 1;
pub const TAB_HELP: usize = 2;

/// Presentation-only state. Patient, handoff and request state live in the controller.
pub struct UiState {
    pub tab: usize,
    pub focus: Focus,
    pub patient_cursor: usize,
    pub note_cursor: usize,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_PATIENTS,
            focus: Focus::Patients,
            patient_cursor: 0,
            note_cursor: 0,
            info: "Loading patients…".into(),
        }
    }
}

impl UiState {
    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.tab = focus.tab();
    }

    pub fn is_editing(&self) -> bool {
        self.tab != TAB_HELP && self.focus.workbench().is_some()
    }

    /// Move `cursor` by one within `0..len`.
    pub fn step_cursor(cursor: &mut usize, len: usize, down: bool) {
        if len == 0 {
            *cursor = 0;
        } else if down {
            *cursor = (*cursor + 1).min(len - 1);
        } else {
            *cursor = cursor.saturating_sub(1);
        }
    }
}
