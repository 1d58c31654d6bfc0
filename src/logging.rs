use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON-line sink for reconcile events. Write failures are swallowed so a
/// broken log never fails a pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileLog {
    path: Option<PathBuf>,
}

impl ReconcileLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, conversation_id: &str, message: &str) {
        self.append("info", event, conversation_id, message);
    }

    pub fn warn(&self, event: &str, conversation_id: &str, message: &str) {
        self.append("warn", event, conversation_id, message);
    }

    pub fn error(&self, event: &str, conversation_id: &str, message: &str) {
        self.append("error", event, conversation_id, message);
    }

    pub fn append(&self, level: &str, event: &str, conversation_id: &str, message: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": now_secs(),
            "level": level,
            "event": event,
            "conversation_id": conversation_id,
            "message": message,
        });

        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
