use std::{env, path::PathBuf};

use super::schema::{Settings, StoreSettings};

/// Layering, lowest to highest: struct defaults, the config file (if any),
/// then `REPRISE__SECTION__KEY` environment variables.
impl Settings {
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let file = resolve_config_path()
            .map(|path| ::config::File::from(path).required(false));
        let env = ::config::Environment::with_prefix("REPRISE")
            .separator("__")
            .try_parsing(true);

        ::config::Config::builder()
            .add_source(file.into_iter().collect::<Vec<_>>())
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// Reject values the engine and session host cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.playback.position_poll_ms < 10 {
            return Err("playback.position_poll_ms must be >= 10".to_string());
        }
        if self.session.identity.trim().is_empty() {
            return Err("session.identity must not be empty".to_string());
        }
        Ok(())
    }
}

impl StoreSettings {
    /// Configured store path, or the XDG data default.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(default_store_path)
    }
}

/// Resolve the config path from `REPRISE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("REPRISE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/reprise/config.toml`
/// or `~/.config/reprise/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("reprise").join("config.toml"))
}

/// `$XDG_DATA_HOME/reprise/library.toml` or `~/.local/share/reprise/library.toml`.
pub fn default_store_path() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share").map(|d| d.join("reprise").join("library.toml"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
