//! Optional static server for the application under test

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running app server process
pub struct AppServer {
    child: Child,
    health_url: String,
}

impl AppServer {
    /// Spawn the configured server command and wait until `base_url` answers
    pub async fn spawn(config: &ServerConfig, base_url: &str) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::InvalidConfig("server.command is empty".into()))?;

        info!(
            command = %config.command.join(" "),
            dir = %config.working_dir.display(),
            "Spawning app server"
        );

        let child = Command::new(program)
            .args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e)))?;

        let handle = AppServer {
            child,
            health_url: config
                .health_url
                .clone()
                .unwrap_or_else(|| base_url.to_string()),
        };

        handle
            .wait_for_healthy(Duration::from_millis(config.startup_timeout_ms))
            .await?;

        info!("App server is answering at {}", handle.health_url);
        Ok(handle)
    }

    /// Poll the health URL until it answers with a success status
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for app server to start...");
                    }
                    // Connection refused is expected while the server binds
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Stop the server: SIGTERM, a short grace period, then kill
    pub async fn shutdown(mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        info!("Stopping app server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                let deadline = std::time::Instant::now() + SHUTDOWN_GRACE;
                while std::time::Instant::now() < deadline {
                    if let Ok(Some(_)) = self.child.try_wait() {
                        return;
                    }
                    sleep(Duration::from_millis(20)).await;
                }
            }
        }

        if let Err(e) = self.kill_now() {
            warn!("Failed to stop app server: {}", e);
        }
    }

    /// Kill and reap without waiting for a graceful exit
    fn kill_now(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        let _ = self.child.kill();
        self.child.wait()?;
        Ok(())
    }
}

const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

impl Drop for AppServer {
    fn drop(&mut self) {
        let _ = self.kill_now();
    }
}

/// How to serve the application's static files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Program and arguments
    pub command: Vec<String>,

    /// Directory the command runs in (the app's static root)
    pub working_dir: PathBuf,

    /// URL polled for readiness (None = the harness base URL)
    pub health_url: Option<String>,

    pub startup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: ["python3", "-m", "http.server", "8000"]
                .map(String::from)
                .to_vec(),
            working_dir: PathBuf::from("."),
            health_url: None,
            startup_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper() -> AppServer {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        AppServer {
            child,
            health_url: "http://127.0.0.1:1".into(),
        }
    }

    fn reaped(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid as i32), None).is_err()
    }

    #[tokio::test]
    async fn test_shutdown_terminates_and_reaps() {
        let server = sleeper();
        let pid = server.child.id();
        server.shutdown().await;
        assert!(reaped(pid));
    }

    #[tokio::test]
    async fn test_drop_kills_without_grace_period() {
        let server = sleeper();
        let pid = server.child.id();
        let start = std::time::Instant::now();
        drop(server);
        assert!(start.elapsed() < SHUTDOWN_GRACE, "drop blocked for {:?}", start.elapsed());
        assert!(reaped(pid));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.command.join(" "), "python3 -m http.server 8000");
        assert_eq!(config.startup_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let config = ServerConfig {
            command: Vec::new(),
            ..Default::default()
        };
        let err = AppServer::spawn(&config, "http://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, E2eError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_startup() {
        let config = ServerConfig {
            command: vec!["definitely-not-a-server-binary".into()],
            ..Default::default()
        };
        let err = AppServer::spawn(&config, "http://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(_)));
    }
}
