//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::fixture::CourseFixture;
use crate::server::ServerConfig;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Application root URL
    pub base_url: String,

    /// Ceiling for the initial network-idle navigation
    pub navigation_timeout_ms: u64,

    /// Browser launch options
    pub browser: BrowserSettings,

    /// Per-phase settle durations
    pub settle: SettleConfig,

    /// DOM hooks exposed by the application
    pub selectors: SelectorConfig,

    /// Suggestion-service response capture
    pub network: NetworkConfig,

    /// Seeded course state
    pub fixture: FixtureConfig,

    /// Screenshot output
    pub artifacts: ArtifactConfig,

    /// Optional static server for the application
    pub server: Option<ServerConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            navigation_timeout_ms: 15_000,
            browser: BrowserSettings::default(),
            settle: SettleConfig::default(),
            selectors: SelectorConfig::default(),
            network: NetworkConfig::default(),
            fixture: FixtureConfig::default(),
            artifacts: ArtifactConfig::default(),
            server: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the harness cannot run with
    pub fn validate(&self) -> E2eResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(E2eError::InvalidConfig("base_url is empty".into()));
        }
        if self.navigation_timeout_ms == 0 {
            return Err(E2eError::InvalidConfig(
                "navigation_timeout_ms must be positive".into(),
            ));
        }
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            return Err(E2eError::InvalidConfig(format!(
                "viewport {}x{} has a zero dimension",
                self.browser.viewport.width, self.browser.viewport.height
            )));
        }
        if self.network.suggestion_host.is_empty() {
            return Err(E2eError::InvalidConfig(
                "network.suggestion_host is empty".into(),
            ));
        }
        if self.network.max_records == 0 {
            return Err(E2eError::InvalidConfig(
                "network.max_records must be positive".into(),
            ));
        }
        if self.settle.strategy == SettleStrategy::Poll && self.settle.poll_interval_ms == 0 {
            return Err(E2eError::InvalidConfig(
                "settle.poll_interval_ms must be positive in poll mode".into(),
            ));
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium binary (None = auto-detect)
    pub executable: Option<PathBuf>,

    /// Disable the Chrome sandbox (containers, CI)
    pub no_sandbox: bool,

    /// Profile directory; reuse one to run against warm localStorage
    pub user_data_dir: Option<PathBuf>,

    /// Fixed page viewport
    pub viewport: ViewportConfig,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            no_sandbox: true,
            user_data_dir: None,
            viewport: ViewportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 1280, height: 800 }
    }
}

/// How a phase waits for the application to catch up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SettleStrategy {
    /// Sleep the full phase duration
    #[default]
    Fixed,
    /// Poll the phase's readiness check, with the duration as a ceiling
    Poll,
}

/// Settle durations, in milliseconds, per navigation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub strategy: SettleStrategy,
    pub poll_interval_ms: u64,
    pub landing_ms: u64,
    pub builder_ms: u64,
    pub suggestions_ms: u64,
    pub dashboard_ms: u64,
    pub course_ms: u64,
    pub learn_ms: u64,
    pub transition_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            strategy: SettleStrategy::Fixed,
            poll_interval_ms: 100,
            landing_ms: 1000,
            builder_ms: 2000,
            suggestions_ms: 4000,
            dashboard_ms: 500,
            course_ms: 500,
            learn_ms: 500,
            transition_ms: 500,
        }
    }
}

/// Selectors for the application's DOM hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub landing_start: String,
    pub build_repertoire: String,
    pub dashboard: String,
    pub builder_board: String,
    pub trainer_board: String,
    pub suggestions: String,
    pub course_card: String,
    pub piece: String,
    /// Visible text of the control that starts a training session
    pub learn_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            landing_start: "#btn-landing-start".to_string(),
            build_repertoire: "#nav-build-repertoire".to_string(),
            dashboard: "#nav-dashboard".to_string(),
            builder_board: "#builder-board".to_string(),
            trainer_board: "#board".to_string(),
            suggestions: "#builder-suggestions".to_string(),
            course_card: ".course-card".to_string(),
            piece: "piece".to_string(),
            learn_text: "Learn".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Selector for the piece elements inside a board scope
    pub fn pieces_in(&self, board: &str) -> String {
        format!("{} {}", board, self.piece)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Substring identifying suggestion-service responses
    pub suggestion_host: String,

    /// Upper bound on recorded responses
    pub max_records: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            suggestion_host: "lichess".to_string(),
            max_records: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// localStorage key holding the course collection
    pub storage_key: String,

    /// Course written when the collection is empty
    pub course: CourseFixture,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            storage_key: "chess_courses".to_string(),
            course: CourseFixture::test_italian(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
    pub builder_screenshot: String,
    pub trainer_screenshot: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            builder_screenshot: "test_builder_final.png".to_string(),
            trainer_screenshot: "test_movetrainer_final.png".to_string(),
        }
    }
}
