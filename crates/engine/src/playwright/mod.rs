//! Playwright browser automation
//!
//! Each session is a `node` process running a small bridge script that owns
//! one browser page. Commands go to its stdin and replies come back on stdout
//! as line-delimited JSON, matched up by request id. Page errors and failed
//! requests arrive as unsolicited events and are buffered as background
//! errors.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BrowserConfig;
use crate::driver::{BackgroundError, DriverFactory, UiDriver};
use crate::error::{EngineError, EngineResult};
use crate::form::Locator;
use crate::intercept::{Interception, RouteSpec};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// How long the browser may take to launch
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack on top of the browser-side timeout before the bridge is declared hung
const REPLY_GRACE: Duration = Duration::from_secs(2);

/// Commands understood by the bridge script
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command<'a> {
    Visit {
        path: &'a str,
    },
    Type {
        locator: &'a Locator,
        text: &'a str,
    },
    Select {
        locator: &'a Locator,
        value: &'a str,
    },
    Check {
        locator: &'a Locator,
    },
    Click {
        locator: &'a Locator,
    },
    ContainsText {
        locator: &'a Locator,
        text: &'a str,
    },
    IsVisible {
        locator: &'a Locator,
    },
    Exists {
        locator: &'a Locator,
    },
    Intercept {
        method: &'a str,
        pattern: String,
        alias: &'a str,
    },
    Await {
        alias: &'a str,
        timeout_ms: u64,
    },
    Close,
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: Command<'a>,
}

/// Anything the bridge writes on stdout: a reply when `id` is set, else an event
#[derive(Debug, Default, Deserialize)]
struct BridgeLine {
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
    event: Option<String>,
    message: Option<String>,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeLine>>>>;

/// A browser session driven through the bridge
pub struct PlaywrightDriver {
    child: AsyncMutex<Child>,
    stdin: AsyncMutex<ChildStdin>,
    pending: Pending,
    background: Arc<Mutex<Vec<BackgroundError>>>,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    action_timeout: Duration,
    // Holds the bridge script on disk for the life of the session
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start a bridge process and wait for its page to be ready
    pub async fn launch(
        config: &BrowserConfig,
        base_url: &str,
        action_timeout: Duration,
    ) -> EngineResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("staycheck-bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let node_modules = config
            .node_modules
            .clone()
            .unwrap_or_else(|| PathBuf::from("node_modules"));
        let node_modules = std::fs::canonicalize(&node_modules).unwrap_or(node_modules);

        let bridge_config = json!({
            "base_url": base_url,
            "browser": config.kind.as_str(),
            "headless": config.headless,
            "viewport_width": config.viewport_width,
            "viewport_height": config.viewport_height,
            "action_timeout_ms": action_timeout.as_millis() as u64,
        });

        debug!(
            "Launching {} bridge with {}",
            config.kind.as_str(),
            config.node_binary.display()
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", &node_modules)
            .env("STAYCHECK_BRIDGE_CONFIG", bridge_config.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::BridgeUnavailable(format!(
                    "cannot start {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::BridgeUnavailable("bridge stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::BridgeUnavailable("bridge stdout not captured".into()))?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let background = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = oneshot::channel();
        let reader = tokio::spawn(read_bridge(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&background),
            ready_tx,
        ));

        let ready = match tokio::time::timeout(LAUNCH_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(EngineError::BridgeUnavailable(message)),
            Ok(Err(_)) => Err(EngineError::BridgeUnavailable(
                "bridge exited before the browser was ready (is playwright installed?)".into(),
            )),
            Err(_) => Err(EngineError::BridgeUnavailable(format!(
                "browser not ready after {} s",
                LAUNCH_TIMEOUT.as_secs()
            ))),
        };
        if let Err(e) = ready {
            reader.abort();
            let _ = child.kill().await;
            return Err(e);
        }

        info!("{} session ready", config.kind.as_str());

        Ok(Self {
            child: AsyncMutex::new(child),
            stdin: AsyncMutex::new(stdin),
            pending,
            background,
            next_id: AtomicU64::new(1),
            reader,
            action_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check that the node executable can be run at all
    pub async fn check_node_installed(node_binary: &std::path::Path) -> EngineResult<()> {
        let status = TokioCommand::new(node_binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(EngineError::BridgeUnavailable(format!(
                "{} --version failed",
                node_binary.display()
            ))),
        }
    }

    async fn send(&self, command: Command<'_>, wait: Duration) -> EngineResult<BridgeLine> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&Envelope { id, command })?;
        line.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            let written = match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                self.pending.lock().remove(&id);
                return Err(EngineError::Driver(format!("writing to bridge failed: {}", e)));
            }
        }

        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(EngineError::Driver("browser bridge exited".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(EngineError::Driver(format!(
                    "no reply from browser within {} ms",
                    wait.as_millis()
                )))
            }
        }
    }

    /// Send a page action and return its value
    async fn call(&self, command: Command<'_>) -> EngineResult<Value> {
        let reply = self.send(command, self.action_timeout + REPLY_GRACE).await?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(EngineError::Driver(
                reply.error.unwrap_or_else(|| "unknown bridge error".into()),
            ))
        }
    }

    async fn query(&self, command: Command<'_>) -> EngineResult<bool> {
        let value = self.call(command).await?;
        value
            .as_bool()
            .ok_or_else(|| EngineError::Driver(format!("expected a boolean, bridge sent {}", value)))
    }
}

async fn read_bridge(
    stdout: ChildStdout,
    pending: Pending,
    background: Arc<Mutex<Vec<BackgroundError>>>,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut ready = Some(ready);
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Reading bridge output failed: {}", e);
                break;
            }
        };

        let parsed: BridgeLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(_) => {
                debug!("bridge: {}", line);
                continue;
            }
        };

        if let Some(id) = parsed.id {
            match pending.lock().remove(&id) {
                Some(tx) => {
                    let _ = tx.send(parsed);
                }
                None => debug!("Late reply for request {}", id),
            }
            continue;
        }

        let message = parsed.message.unwrap_or_default();
        match parsed.event.as_deref() {
            Some("ready") => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Some("fatal") => {
                error!("Browser bridge failed: {}", message);
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(message));
                }
            }
            Some("uncaught_exception") => {
                debug!("Page exception: {}", message);
                background.lock().push(BackgroundError::uncaught(message));
            }
            Some("network_failure") => {
                debug!("Network failure: {}", message);
                background.lock().push(BackgroundError::network(message));
            }
            other => warn!("Unexpected bridge event {:?}: {}", other, message),
        }
    }

    // Wake everyone still waiting for a reply
    pending.lock().clear();
}

#[async_trait]
impl UiDriver for PlaywrightDriver {
    async fn visit(&self, path: &str) -> EngineResult<()> {
        self.call(Command::Visit { path }).await.map(|_| ())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> EngineResult<()> {
        self.call(Command::Type { locator, text }).await.map(|_| ())
    }

    async fn select(&self, locator: &Locator, value: &str) -> EngineResult<()> {
        self.call(Command::Select { locator, value }).await.map(|_| ())
    }

    async fn check(&self, locator: &Locator) -> EngineResult<()> {
        self.call(Command::Check { locator }).await.map(|_| ())
    }

    async fn click(&self, locator: &Locator) -> EngineResult<()> {
        self.call(Command::Click { locator }).await.map(|_| ())
    }

    async fn contains_text(&self, locator: &Locator, text: &str) -> EngineResult<bool> {
        self.query(Command::ContainsText { locator, text }).await
    }

    async fn is_visible(&self, locator: &Locator) -> EngineResult<bool> {
        self.query(Command::IsVisible { locator }).await
    }

    async fn exists(&self, locator: &Locator) -> EngineResult<bool> {
        self.query(Command::Exists { locator }).await
    }

    async fn register_interception(&self, route: &RouteSpec) -> EngineResult<()> {
        route.validate()?;
        let pattern = route.pattern()?.regex_source().to_string();
        self.call(Command::Intercept {
            method: &route.method,
            pattern,
            alias: &route.alias,
        })
        .await
        .map(|_| ())
    }

    async fn await_interception(
        &self,
        alias: &str,
        timeout: Duration,
    ) -> EngineResult<Interception> {
        let timeout_ms = timeout.as_millis() as u64;
        let reply = self
            .send(Command::Await { alias, timeout_ms }, timeout + REPLY_GRACE)
            .await?;

        if reply.ok {
            return Ok(serde_json::from_value(reply.value)?);
        }
        if reply.timeout {
            return Err(EngineError::InterceptionTimeout {
                alias: alias.to_string(),
                waited_ms: timeout_ms,
            });
        }
        let message = reply.error.unwrap_or_default();
        if message.starts_with("no interception registered") {
            Err(EngineError::UnknownAlias(alias.to_string()))
        } else {
            Err(EngineError::Driver(message))
        }
    }

    async fn drain_background_errors(&self) -> Vec<BackgroundError> {
        std::mem::take(&mut *self.background.lock())
    }

    async fn close(&self) -> EngineResult<()> {
        if let Err(e) = self.send(Command::Close, Duration::from_secs(5)).await {
            debug!("Bridge did not acknowledge close: {}", e);
        }

        let mut child = self.child.lock().await;
        if tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .is_err()
        {
            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;
                if let Some(pid) = child.id() {
                    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                }
            }
            if tokio::time::timeout(Duration::from_millis(500), child.wait())
                .await
                .is_err()
            {
                warn!("Bridge ignored SIGTERM, killing it");
                child.kill().await?;
            }
        }

        self.reader.abort();
        Ok(())
    }
}

/// Opens one Playwright session per scenario
#[derive(Debug, Clone)]
pub struct PlaywrightFactory {
    config: BrowserConfig,
    base_url: String,
    action_timeout: Duration,
}

impl PlaywrightFactory {
    pub fn new(config: BrowserConfig, base_url: impl Into<String>, action_timeout: Duration) -> Self {
        Self {
            config,
            base_url: base_url.into(),
            action_timeout,
        }
    }

    /// Fail fast when node is missing, before any scenario runs
    pub async fn preflight(&self) -> EngineResult<()> {
        PlaywrightDriver::check_node_installed(&self.config.node_binary).await
    }
}

#[async_trait]
impl DriverFactory for PlaywrightFactory {
    async fn open(&self) -> EngineResult<Box<dyn UiDriver>> {
        let driver =
            PlaywrightDriver::launch(&self.config, &self.base_url, self.action_timeout).await?;
        Ok(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(id: u64, command: Command<'_>) -> Value {
        serde_json::to_value(Envelope { id, command }).unwrap()
    }

    #[test]
    fn test_bridge_matches_routes_when_requests_start() {
        let on_request = BRIDGE_SCRIPT.find("page.on('request'").unwrap();
        let on_response = BRIDGE_SCRIPT.find("page.on('response'").unwrap();
        assert!(on_request < on_response);
        assert!(BRIDGE_SCRIPT.contains("inFlight.get(request)"));
    }

    #[test]
    fn test_locator_commands_on_the_wire() {
        let locator = Locator::css("[data-testid=\"roomlisting\"]")
            .with_text("101")
            .last();
        let value = wire(
            7,
            Command::ContainsText {
                locator: &locator,
                text: "Twin",
            },
        );
        assert_eq!(
            value,
            json!({
                "id": 7,
                "cmd": "contains_text",
                "locator": {
                    "selector": "[data-testid=\"roomlisting\"]",
                    "has_text": "101",
                    "pick": "last"
                },
                "text": "Twin"
            })
        );
    }

    #[test]
    fn test_intercept_sends_compiled_pattern() {
        let route = RouteSpec::new("get", "/room/*", "getRoom");
        let pattern = route.pattern().unwrap().regex_source().to_string();
        let value = wire(
            1,
            Command::Intercept {
                method: &route.method,
                pattern,
                alias: &route.alias,
            },
        );
        assert_eq!(value["cmd"], "intercept");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["pattern"], "^/room/[^/]*$");
    }

    #[test]
    fn test_close_has_no_arguments() {
        assert_eq!(wire(3, Command::Close), json!({"id": 3, "cmd": "close"}));
    }

    #[test]
    fn test_reply_and_event_lines() {
        let reply: BridgeLine =
            serde_json::from_str(r#"{"id": 4, "ok": false, "error": "timed out", "timeout": true}"#)
                .unwrap();
        assert_eq!(reply.id, Some(4));
        assert!(reply.timeout);

        let event: BridgeLine =
            serde_json::from_str(r#"{"event": "network_failure", "message": "NetworkError"}"#)
                .unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.event.as_deref(), Some("network_failure"));
    }

    #[tokio::test]
    async fn test_missing_node_is_bridge_unavailable() {
        crate::test_support::init_tracing();
        let config = BrowserConfig {
            node_binary: PathBuf::from("/nonexistent/staycheck-node"),
            ..Default::default()
        };
        let factory = PlaywrightFactory::new(config, "http://127.0.0.1:9", Duration::from_secs(1));

        assert!(matches!(
            factory.preflight().await,
            Err(EngineError::BridgeUnavailable(_))
        ));
        assert!(matches!(
            factory.open().await,
            Err(EngineError::BridgeUnavailable(_))
        ));
    }
}
