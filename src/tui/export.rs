use crate::model::WorkbenchKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;

// Global clipboard manager channel, initialized on first use.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

fn file_stem(kind: WorkbenchKind) -> &'static str {
    match kind {
        WorkbenchKind::Explainer => "explanation",
        WorkbenchKind::Summarizer => "summary",
    }
}

/// `clinical-summary-2026-10-15_09-30-12.txt`
pub fn export_file_name(kind: WorkbenchKind, at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("clinical-{}-{stamp}.txt", file_stem(kind))
}

/// Write a resolved result into `dir`. Returns the path written.
pub fn export_result_to(dir: &Path, kind: WorkbenchKind, text: &str) -> Result<PathBuf> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let path = dir.join(export_file_name(kind, now));
    let mut body = text.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Write a resolved result into the current directory.
pub fn export_result(kind: WorkbenchKind, text: &str) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    export_result_to(&current_dir, kind, text)
}

/// Initialize the clipboard manager thread if not already initialized.
///
/// Each clipboard instance is kept alive for a while after `set_text` so clipboard
/// managers on Linux have time to read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn file_name_carries_kind_and_timestamp() {
        let at = datetime!(2026-03-04 05:06:07 UTC);
        assert_eq!(
            export_file_name(WorkbenchKind::Summarizer, at),
            "clinical-summary-2026-03-04_05-06-07.txt"
        );
        assert_eq!(
            export_file_name(WorkbenchKind::Explainer, at),
            "clinical-explanation-2026-03-04_05-06-07.txt"
        );
    }

    #[test]
    fn export_writes_text_with_trailing_newline() {
        let dir = std::env::temp_dir().join(format!("clinical-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = export_result_to(&dir, WorkbenchKind::Explainer, "Your blood pressure is high.")
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Your blood pressure is high.\n"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
