use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "roundplan";

/// Where roundplan keeps its log and settings
pub struct AppDirs;

impl AppDirs {
    /// `~/.local/state/roundplan`, or the platform data dir when there is no home
    pub fn state_dir() -> Option<PathBuf> {
        match std::env::var_os("HOME") {
            Some(home) => Some(Self::state_dir_under(Path::new(&home))),
            None => {
                ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
            }
        }
    }

    fn state_dir_under(home: &Path) -> PathBuf {
        home.join(".local").join("state").join(APP_NAME)
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join(format!("{APP_NAME}.log")))
    }

    /// Platform config file, falling back to the working directory
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from(format!("{APP_NAME}_config.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_dir_follows_xdg_layout() {
        assert_eq!(
            AppDirs::state_dir_under(Path::new("/home/ana")),
            PathBuf::from("/home/ana/.local/state/roundplan")
        );
    }

    #[test]
    fn file_names() {
        if let Some(log) = AppDirs::log_path() {
            assert_eq!(log.file_name().unwrap(), "roundplan.log");
        }
        assert_eq!(AppDirs::config_path().file_name().unwrap(), "config.json");
    }
}
