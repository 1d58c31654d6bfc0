use crate::config::{default_state_dir, load_global_settings, Settings};
use crate::logging::ReconcileLog;
use crate::slack::SlackApiClient;
use crate::state_store::StateStore;

/// Everything a command needs: one configured client shared by every verb.
pub struct CommandContext {
    pub settings: Settings,
    pub client: SlackApiClient,
    pub log: ReconcileLog,
    pub store: StateStore,
}

pub fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(|e| e.to_string())
}

pub fn load_context() -> Result<CommandContext, String> {
    let settings = load_settings()?;
    let client = SlackApiClient::from_settings(&settings.slack).map_err(|e| e.to_string())?;
    let log = match settings.resolve_log_path().map_err(|e| e.to_string())? {
        Some(path) => ReconcileLog::to_file(path),
        None => ReconcileLog::disabled(),
    };
    let store = StateStore::new(default_state_dir().map_err(|e| e.to_string())?);
    Ok(CommandContext {
        settings,
        client,
        log,
        store,
    })
}
