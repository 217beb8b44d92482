//! Default paths for curfew components
//!
//! - Config: `$CURFEW_CONFIG`, else `<config dir>/curfew/config.toml`
//!   (`~/.config/curfew/config.toml` on Linux), else `/etc/curfew/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const CURFEW_CONFIG_ENV: &str = "CURFEW_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "curfew";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$CURFEW_CONFIG` environment variable (if set)
/// 2. the per-user config directory
/// 3. `/etc/curfew/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CURFEW_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the CURFEW_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
        .unwrap_or_else(system_config_path)
}

/// System-wide config location used when no user config directory exists
pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_curfew() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("curfew"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn system_config_path_is_absolute() {
        assert!(system_config_path().is_absolute());
    }
}
