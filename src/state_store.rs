use crate::logging::now_secs;
use crate::members::{MemberExpression, MembershipPolicy, ReconciliationResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Last applied declaration for one conversation, as the CLI host records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub conversation_id: String,
    #[serde(default)]
    pub members: Vec<MemberExpression>,
    #[serde(default)]
    pub policy: MembershipPolicy,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl MembershipRecord {
    pub fn from_result(
        result: &ReconciliationResult,
        members: Vec<MemberExpression>,
        policy: MembershipPolicy,
    ) -> Self {
        Self {
            conversation_id: result.conversation_id.clone(),
            members,
            policy,
            member_ids: result.final_member_ids.clone(),
            updated_at: now_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

fn io_error(path: &Path, source: std::io::Error) -> StateStoreError {
    StateStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path, source: serde_json::Error) -> StateStoreError {
    StateStoreError::Json {
        path: path.display().to_string(),
        source,
    }
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, conversation_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_component(conversation_id)))
    }

    pub fn load(&self, conversation_id: &str) -> Result<Option<MembershipRecord>, StateStoreError> {
        let path = self.record_path(conversation_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| json_error(&path, e))
    }

    pub fn save(&self, record: &MembershipRecord) -> Result<(), StateStoreError> {
        let path = self.record_path(&record.conversation_id);
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let body = serde_json::to_vec_pretty(record).map_err(|e| json_error(&path, e))?;
        atomic_write_file(&path, &body).map_err(|e| io_error(&path, e))
    }

    pub fn remove(&self, conversation_id: &str) -> Result<(), StateStoreError> {
        let path = self.record_path(conversation_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

fn atomic_write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension(format!("json.tmp-{}", std::process::id()));
    {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}
