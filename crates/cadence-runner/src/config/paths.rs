use std::env;
use std::path::PathBuf;

/// Where cadence keeps its files.
///
/// Unix-like systems follow the XDG base directory layout:
/// - config: `$XDG_CONFIG_HOME/{app}` (default `~/.config/{app}`)
/// - data:   `$XDG_DATA_HOME/{app}` (default `~/.local/share/{app}`)
///
/// Windows puts both under `%APPDATA%\{app}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    app: String,
    home: PathBuf,
}

impl ProjectPaths {
    /// Resolve paths for `app`. Returns `None` when no home directory can be found.
    pub fn new(app: &str) -> Option<Self> {
        Some(Self {
            app: app.to_string(),
            home: home_dir()?,
        })
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base("XDG_CONFIG_HOME", &[".config"]).join(&self.app)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base("XDG_DATA_HOME", &[".local", "share"]).join(&self.app)
    }

    /// `config.toml` inside the config directory
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.toml")
    }

    /// `logs/` inside the data directory
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    #[cfg(not(target_os = "windows"))]
    fn base(&self, xdg_var: &str, fallback: &[&str]) -> PathBuf {
        env::var_os(xdg_var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| fallback.iter().fold(self.home.clone(), |path, part| path.join(part)))
    }

    #[cfg(target_os = "windows")]
    fn base(&self, _xdg_var: &str, _fallback: &[&str]) -> PathBuf {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home.join("AppData").join("Roaming"))
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
