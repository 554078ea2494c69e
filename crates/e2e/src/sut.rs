//! System under test - optionally spawning it and waiting until it serves the page

use std::collections::BTreeMap;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to the application serving the payment page
pub struct SutHandle {
    child: Option<Child>,
    base_url: String,
}

impl SutHandle {
    /// Start the configured command (if any) and wait for the page to answer
    pub async fn spawn(config: SutConfig) -> E2eResult<Self> {
        let child = match &config.command {
            Some(command) => Some(start_process(command, &config.env)?),
            None => None,
        };

        let handle = SutHandle {
            child,
            base_url: config.base_url.clone(),
        };

        handle.wait_until_serving(config.startup_timeout).await?;

        info!("Application is serving at {}", handle.base_url);
        Ok(handle)
    }

    /// Attach to an application someone else started
    pub async fn external(config: SutConfig) -> E2eResult<Self> {
        Self::spawn(SutConfig { command: None, ..config }).await
    }

    async fn wait_until_serving(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Page returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application to start...");
                    }
                    if !e.is_connect() {
                        warn!("Availability probe error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::SutHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether this handle owns the process
    pub fn is_managed(&self) -> bool {
        self.child.is_some()
    }

    /// Stop the process this handle started; a no-op for external applications
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping application (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for SutHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn start_process(command: &[String], env: &BTreeMap<String, String>) -> E2eResult<Child> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| E2eError::SutStartup("empty command".to_string()))?;

    info!("Spawning application: {}", command.join(" "));

    Command::new(program)
        .args(args)
        .envs(env)
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| E2eError::SutStartup(format!("Failed to spawn {}: {}", program, e)))
}

/// Configuration for reaching (and optionally starting) the application
#[derive(Debug, Clone)]
pub struct SutConfig {
    /// URL of the tour page
    pub base_url: String,

    /// Program and arguments that start the application
    pub command: Option<Vec<String>>,

    /// Extra environment for the spawned command
    pub env: BTreeMap<String, String>,

    pub startup_timeout: Duration,
}

impl Default for SutConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            command: None,
            env: BTreeMap::new(),
            startup_timeout: Duration::from_secs(60),
        }
    }
}

/// Split a shell-like command line on whitespace
pub fn parse_command(line: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    (!parts.is_empty()).then_some(parts)
}
