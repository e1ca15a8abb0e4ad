//! Text output for the headless directory and record modes.

use crate::app::{PatientRecordView, NO_NOTES_MESSAGE, SELECT_PROMPT};
use crate::model::Patient;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One line per patient, like the directory's activation controls.
pub(crate) fn patient_label(p: &Patient) -> String {
    format!("{} ({}, born {})", p.name, p.gender, p.birth_date)
}

pub(crate) fn build_directory_summary(patients: &[&Patient]) -> TextSummary {
    let mut lines = Vec::with_capacity(patients.len() + 1);
    lines.push(format!("Patients: {}", patients.len()));
    for p in patients {
        lines.push(format!("  {}  {}", p.id, patient_label(p)));
    }
    TextSummary { lines }
}

pub(crate) fn build_record_summary(view: PatientRecordView<'_>) -> TextSummary {
    let Some(p) = view.patient() else {
        return TextSummary {
            lines: vec![SELECT_PROMPT.to_string()],
        };
    };

    let mut lines = vec![
        format!("Details for: {}", p.name),
        format!("Gender: {}", p.gender),
        format!("Date of Birth: {}", p.birth_date),
        String::new(),
        "Conditions:".to_string(),
    ];
    lines.extend(p.conditions.iter().map(|c| format!("  - {c}")));
    lines.push(String::new());
    lines.push("Medications:".to_string());
    lines.extend(p.medications.iter().map(|m| format!("  - {m}")));
    lines.push(String::new());
    lines.push("Clinical Report Notes:".to_string());
    if view.notes().is_empty() {
        lines.push(format!("  {NO_NOTES_MESSAGE}"));
    }
    for (i, note) in view.notes().iter().enumerate() {
        lines.push(format!("  [{}]", i + 1));
        lines.extend(
            crate::markup::render_lines(note)
                .into_iter()
                .map(|l| format!("    {l}")),
        );
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppController;
    use crate::app::MalformedPolicy;
    use crate::model::AppEvent;
    use tokio::sync::mpsc;

    #[test]
    fn record_summary_renders_markup_as_text() {
        let patients: Vec<Patient> = serde_json::from_value(serde_json::json!([{
            "id": "p-9",
            "name": "Lena Ortiz",
            "gender": "female",
            "birthDate": "1971-09-30",
            "conditions": ["Asthma"],
            "medications": [],
            "reports_text": ["<div>Wheeze <b>resolved</b></div>"]
        }]))
        .unwrap();
        let p = &patients[0];
        let summary = build_record_summary(PatientRecordView::new(Some(p)));
        assert_eq!(summary.lines[0], "Details for: Lena Ortiz");
        assert!(summary.lines.contains(&"  - Asthma".to_string()));
        assert!(summary.lines.contains(&"    Wheeze resolved".to_string()));
    }

    #[test]
    fn empty_record_prompts_for_selection() {
        let summary = build_record_summary(PatientRecordView::new(None));
        assert_eq!(summary.lines, vec![SELECT_PROMPT.to_string()]);
    }

    #[test]
    fn directory_summary_lists_every_patient() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = AppController::new(tx, MalformedPolicy::Absorb);
        app.start();
        let request_id = match rx.try_recv().unwrap() {
            crate::model::BackendCommand::FetchPatients { request_id } => request_id,
            other => panic!("unexpected command {other:?}"),
        };
        app.apply_event(AppEvent::PatientsLoaded {
            request_id,
            outcome: Ok(crate::app::sample_patients()),
        });
        let patients: Vec<&Patient> = app.directory().patients().iter().map(|p| p.as_ref()).collect();
        let summary = build_directory_summary(&patients);
        assert_eq!(summary.lines[0], "Patients: 2");
        assert_eq!(
            summary.lines[1],
            "  p-1  Maria Lopez (female, born 1958-03-14)"
        );
    }
}
