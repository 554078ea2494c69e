//! Playwright browser automation
//!
//! One Node process per run hosts the browser. Rust writes line-delimited
//! JSON commands to its stdin and reads one JSON reply per command from its
//! stdout; anything else the process prints is logged and skipped.

use async_trait::async_trait;
use checkout_common::{FormField, Marker, PurchaseMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::FormDriver;
use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, PaymentPage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    /// Parse a browser name; unknown names fall back to Chromium
    pub fn from_name(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
}

/// A bridge command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeCommand {
    Goto { url: String },
    Click { target: Locator, timeout_ms: u64 },
    Fill { target: Locator, value: String, timeout_ms: u64 },
    Wait { target: Locator, state: WaitState, timeout_ms: u64 },
    IsVisible { target: Locator },
    Close,
}

impl BridgeCommand {
    /// Time the bridge itself may spend on the command
    fn budget(&self) -> Duration {
        match self {
            BridgeCommand::Click { timeout_ms, .. }
            | BridgeCommand::Fill { timeout_ms, .. }
            | BridgeCommand::Wait { timeout_ms, .. } => Duration::from_millis(*timeout_ms),
            _ => Duration::ZERO,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: i64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

const BRIDGE_SCRIPT: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const readline = require('readline');

const escapeRegex = (s) => s.replace(/[.*+?^${}()|[\]\\]/g, '\\$&');

(async () => {
  const browser = await __BROWSER__.launch({ headless: __HEADLESS__ });
  const context = await browser.newContext({
    viewport: { width: __WIDTH__, height: __HEIGHT__ }
  });
  const page = await context.newPage();
  const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

  const locate = (target) => {
    switch (target.kind) {
      case 'exact_text':
        return page.locator(target.tag).filter({
          hasText: new RegExp('^\\s*' + escapeRegex(target.text) + '\\s*$')
        });
      case 'text':
        return page.getByText(target.text, { exact: true });
      case 'sibling':
        return page.getByText(target.anchor, { exact: true })
          .locator('xpath=..')
          .locator(target.selector);
      default:
        throw new Error('unknown locator kind: ' + target.kind);
    }
  };

  const anyVisible = async (locator) => {
    for (const candidate of await locator.all()) {
      if (await candidate.isVisible()) return true;
    }
    return false;
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const lines = readline.createInterface({ input: process.stdin });
  for await (const line of lines) {
    if (!line.trim()) continue;
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (error) {
      reply({ id: -1, ok: false, error: 'bad command: ' + error.message });
      continue;
    }
    try {
      let value = null;
      switch (cmd.op) {
        case 'goto':
          await page.goto(cmd.url);
          break;
        case 'click':
          await locate(cmd.target).first().click({ timeout: cmd.timeout_ms });
          break;
        case 'fill':
          await locate(cmd.target).first().fill(cmd.value, { timeout: cmd.timeout_ms });
          break;
        case 'wait':
          await locate(cmd.target).first().waitFor({ state: cmd.state, timeout: cmd.timeout_ms });
          break;
        case 'is_visible':
          value = await anyVisible(locate(cmd.target));
          break;
        case 'close':
          reply({ id: cmd.id, ok: true, value });
          await browser.close();
          process.exit(0);
        default:
          throw new Error('unknown op: ' + cmd.op);
      }
      reply({ id: cmd.id, ok: true, value });
    } catch (error) {
      reply({ id: cmd.id, ok: false, error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  console.error(JSON.stringify({ success: false, error: error.message, stack: error.stack }));
  process.exit(1);
});
"#;

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory whose node_modules provides `playwright`
    pub project_dir: Option<PathBuf>,

    /// Timeout for clicks, fills and page-structure waits
    pub action_timeout: Duration,

    /// Slack on top of a command's own timeout before the bridge is considered hung
    pub command_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            project_dir: None,
            action_timeout: Duration::from_secs(4),
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the bridge script for a configuration
pub fn build_script(config: &PlaywrightConfig) -> String {
    BRIDGE_SCRIPT
        .replace("__BROWSER__", config.browser.as_str())
        .replace("__HEADLESS__", if config.headless { "true" } else { "false" })
        .replace("__WIDTH__", &config.viewport_width.to_string())
        .replace("__HEIGHT__", &config.viewport_height.to_string())
}

/// Check if Playwright is installed
fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// Live connection to the bridge process
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    command_timeout: Duration,
    _workdir: TempDir,
}

impl PlaywrightSession {
    /// Spawn the bridge and wait for the browser to come up
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, build_script(config))?;

        info!("Launching {} via Playwright bridge", config.browser.as_str());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = &config.project_dir {
            cmd.current_dir(dir).env("NODE_PATH", dir.join("node_modules"));
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            command_timeout: config.command_timeout,
            _workdir: workdir,
        };

        session.read_reply(0, config.command_timeout).await?;
        debug!("Playwright bridge ready");
        Ok(session)
    }

    /// Send a command and wait for its reply value
    pub async fn request(&mut self, command: &BridgeCommand) -> E2eResult<serde_json::Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut line = serde_json::to_string(&Envelope { id, command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let limit = self.command_timeout + command.budget();
        let reply = self.read_reply(id, limit).await?;

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Playwright(
                reply.error.unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }

    async fn read_reply(&mut self, id: u64, limit: Duration) -> E2eResult<Reply> {
        let stdout = &mut self.stdout;
        let read = async move {
            while let Some(line) = stdout.next_line().await? {
                match serde_json::from_str::<Reply>(&line) {
                    Ok(reply) if reply.id == id as i64 => return Ok(reply),
                    Ok(reply) => warn!("Discarding bridge reply {} while waiting for {}", reply.id, id),
                    Err(_) => debug!("[playwright] {}", line),
                }
            }
            Err::<Reply, E2eError>(E2eError::Playwright("bridge exited".to_string()))
        };

        timeout(limit, read)
            .await
            .map_err(|_| E2eError::Timeout(format!("bridge reply to command {}", id)))?
    }

    /// Close the browser and reap the process
    pub async fn close(mut self) -> E2eResult<()> {
        if let Err(e) = self.request(&BridgeCommand::Close).await {
            warn!("Bridge did not close cleanly: {}", e);
        }
        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!("Bridge exited with {}", status);
            }
            Err(_) => {
                self.child.start_kill()?;
            }
        }
        Ok(())
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Payment form driven through a Playwright session
pub struct PlaywrightForm {
    session: Mutex<PlaywrightSession>,
    base_url: String,
    action_timeout: Duration,
}

impl PlaywrightForm {
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        let session = PlaywrightSession::launch(&config).await?;
        Ok(Self {
            session: Mutex::new(session),
            base_url: config.base_url,
            action_timeout: config.action_timeout,
        })
    }

    pub async fn close(self) -> E2eResult<()> {
        self.session.into_inner().close().await
    }

    async fn send(&self, command: BridgeCommand) -> E2eResult<serde_json::Value> {
        self.session.lock().await.request(&command).await
    }

    fn timeout_ms(&self) -> u64 {
        self.action_timeout.as_millis() as u64
    }

    async fn wait_visible(&self, target: Locator) -> E2eResult<()> {
        self.send(BridgeCommand::Wait {
            target,
            state: WaitState::Visible,
            timeout_ms: self.timeout_ms(),
        })
        .await
        .map(|_| ())
    }

    async fn click(&self, target: Locator) -> E2eResult<()> {
        self.send(BridgeCommand::Click { target, timeout_ms: self.timeout_ms() })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl FormDriver for PlaywrightForm {
    async fn open_form(&self, mode: PurchaseMode) -> E2eResult<()> {
        debug!("Opening {} form at {}", mode, self.base_url);
        self.send(BridgeCommand::Goto { url: self.base_url.clone() }).await?;
        self.wait_visible(PaymentPage::main_heading()).await?;
        self.click(PaymentPage::mode_button(mode)).await?;
        self.wait_visible(PaymentPage::mode_heading(mode)).await
    }

    async fn set_field(&self, field: FormField, value: &str) -> E2eResult<()> {
        self.send(BridgeCommand::Fill {
            target: PaymentPage::field(field),
            value: value.to_string(),
            timeout_ms: self.timeout_ms(),
        })
        .await
        .map(|_| ())
    }

    async fn submit(&self) -> E2eResult<()> {
        self.click(PaymentPage::continue_button()).await
    }

    async fn probe(&self, marker: Marker) -> E2eResult<bool> {
        let value = self
            .send(BridgeCommand::IsVisible { target: PaymentPage::marker(marker) })
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
