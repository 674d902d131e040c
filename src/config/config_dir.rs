use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ConfigError, ConfigResult};

/// Names a config file explicitly, ahead of every other location.
pub const CONFIG_PATH_ENV: &str = "LESSON_TRACKER_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Per-user config root: `$XDG_CONFIG_HOME`, then `$HOME/.config` on unix,
/// `%APPDATA%` on windows.
fn user_config_root() -> Option<PathBuf> {
    let non_empty = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty());

    #[cfg(unix)]
    let root = non_empty("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".config")));
    #[cfg(windows)]
    let root = non_empty("APPDATA").map(PathBuf::from);
    #[cfg(not(any(unix, windows)))]
    let root = {
        let _ = non_empty;
        None
    };

    root
}

/// Where a config file may live, most specific first. `use_local` skips the
/// per-user location so a checkout always reads its own `./config.toml`.
pub fn config_candidates(use_local: bool) -> Vec<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let user_root = if use_local { None } else { user_config_root() };

    candidates_in(explicit, user_root.as_deref())
}

fn candidates_in(explicit: Option<PathBuf>, user_root: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = explicit.into_iter().collect();
    if let Some(root) = user_root {
        candidates.push(root.join(crate::APPLICATION_NAME).join(CONFIG_FILE_NAME));
    }
    candidates.push(Path::new(".").join(CONFIG_FILE_NAME));
    candidates
}

/// First candidate that exists as a file.
pub fn find_config_file(use_local: bool) -> Option<PathBuf> {
    first_existing(config_candidates(use_local))
}

fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| {
        tracing::trace!("looking for config at: {}", path.display());
        path.is_file()
    })
}

pub fn read_config(use_local: bool) -> ConfigResult<Vec<u8>> {
    let path = find_config_file(use_local).ok_or(ConfigError::ConfigNotFound)?;
    let path = path.canonicalize()?;
    debug!("using {} as configuration file", path.display());

    Ok(std::fs::read(path)?)
}
