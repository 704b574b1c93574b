//! Engine configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::policy::ErrorPolicy;

/// Top-level configuration, usually read from `staycheck.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Directory of YAML form specs; `None` uses the built-in forms
    pub forms_dir: Option<PathBuf>,

    /// Suite seed; `None` draws a fresh one per run
    pub seed: Option<u64>,

    /// Scenarios allowed to run at once, each in its own browser session
    pub workers: usize,

    /// Where reports are written
    pub output_dir: PathBuf,

    pub timeouts: Timeouts,

    pub browser: BrowserConfig,

    pub policy: ErrorPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            forms_dir: None,
            seed: None,
            workers: 1,
            output_dir: PathBuf::from("test-results"),
            timeouts: Timeouts::default(),
            browser: BrowserConfig::default(),
            policy: ErrorPolicy::default(),
        }
    }
}

/// Wait windows, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// How long a UI expectation may take to hold
    pub ui_ms: u64,

    /// How long to wait for an intercepted call
    pub interception_ms: u64,

    /// Interval between UI expectation polls
    pub poll_ms: u64,

    /// How long the target may take to answer before the suite starts
    pub startup_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            ui_ms: 4_000,
            interception_ms: 10_000,
            poll_ms: 50,
            startup_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn ui(&self) -> Duration {
        Duration::from_millis(self.ui_ms)
    }

    pub fn interception(&self) -> Duration {
        Duration::from_millis(self.interception_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    pub fn startup(&self) -> Duration {
        Duration::from_millis(self.startup_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(EngineError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Browser bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,

    /// Node executable running the bridge script
    pub node_binary: PathBuf,

    /// `node_modules` directory holding `playwright`; defaults to `./node_modules`
    pub node_modules: Option<PathBuf>,

    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            node_binary: PathBuf::from("node"),
            node_modules: None,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> EngineResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("cannot serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.workers == 0 {
            return Err(EngineError::Config("workers must be at least 1".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(EngineError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.timeouts.interception_ms, 10_000);
        assert!(config.policy.suppress_uncaught);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staycheck.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://automationintesting.online"
seed = 42
workers = 3

[timeouts]
ui_ms = 2500

[browser]
kind = "firefox"

[policy]
suppress_uncaught = false
"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.workers, 3);
        assert_eq!(config.timeouts.ui_ms, 2500);
        assert_eq!(config.timeouts.poll_ms, 50);
        assert_eq!(config.browser.kind, BrowserKind::Firefox);
        assert!(config.browser.headless);
        assert!(!config.policy.suppress_uncaught);
        assert_eq!(config.policy.transient_patterns, vec!["NetworkError".to_string()]);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("staycheck.toml");
        let config = EngineConfig {
            seed: Some(7),
            workers: 2,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.workers, 2);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staycheck.toml");
        std::fs::write(&path, "workers = 0\n").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("WebKit".parse::<BrowserKind>().unwrap(), BrowserKind::Webkit);
        assert!("lynx".parse::<BrowserKind>().is_err());
    }
}
