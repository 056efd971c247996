//! Error types for the board-check harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Browser failed to launch: {0}")]
    BrowserLaunch(String),

    #[error("Navigation to {url} did not become ready within {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl E2eError {
    /// Whether the error came from the initial readiness timeout.
    pub fn is_navigation_timeout(&self) -> bool {
        matches!(self, E2eError::NavigationTimeout { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
