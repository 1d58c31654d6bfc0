use super::{default_global_config_path, ConfigError, Settings};

/// Loads `~/.member-sync/config.yaml`, falling back to defaults when the file is absent.
pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    let settings = if path.exists() {
        Settings::from_path(&path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
