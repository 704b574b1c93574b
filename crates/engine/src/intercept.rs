//! Network interception: route patterns and captured calls

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

const METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// A network call to watch for, e.g. `POST /message as @postMessage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    /// Exact path or glob (`*` within a segment, `**` across segments)
    pub path: String,
    pub alias: String,
}

impl RouteSpec {
    pub fn new(method: &str, path: &str, alias: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            alias: alias.to_string(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !METHODS.iter().any(|m| m.eq_ignore_ascii_case(&self.method)) {
            return Err(EngineError::SpecParse(format!(
                "unsupported method '{}' for @{}",
                self.method, self.alias
            )));
        }
        if self.alias.trim().is_empty() {
            return Err(EngineError::SpecParse(format!(
                "route {} {} has an empty alias",
                self.method, self.path
            )));
        }
        PathPattern::new(&self.path)?;
        Ok(())
    }

    pub fn pattern(&self) -> EngineResult<PathPattern> {
        PathPattern::new(&self.path)
    }

    pub fn matches(&self, method: &str, url: &str) -> EngineResult<bool> {
        Ok(self.method.eq_ignore_ascii_case(method) && self.pattern()?.matches(url))
    }
}

impl std::fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} as @{}", self.method, self.path, self.alias)
    }
}

/// Compiled path glob
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
}

impl PathPattern {
    pub fn new(glob: &str) -> EngineResult<Self> {
        let mut source = String::from("^");
        let mut rest = glob;

        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("**") {
                source.push_str(".*");
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('*') {
                source.push_str("[^/]*");
                rest = tail;
            } else {
                let end = rest.find('*').unwrap_or(rest.len());
                source.push_str(&regex::escape(&rest[..end]));
                rest = &rest[end..];
            }
        }
        source.push('$');

        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }

    /// Match against a full URL or a bare path; query and fragment are ignored
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(request_path(url))
    }

    /// Anchored regex source, shared with the browser bridge
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }
}

/// Strip scheme, authority, query and fragment from a URL
pub fn request_path(url: &str) -> &str {
    let path = match url.find("://") {
        Some(idx) => {
            let after = &url[idx + 3..];
            after.find('/').map(|p| &after[p..]).unwrap_or("/")
        }
        None => url,
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// A recorded network call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interception {
    pub alias: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub request_body: Value,
    #[serde(default)]
    pub response_body: Value,
}

/// In-process interception bookkeeping for drivers that observe calls directly
///
/// Calls are only captured for routes registered before they happen. Each
/// `next` consumes the oldest unconsumed call for its alias.
#[derive(Debug, Default)]
pub struct InterceptionLog {
    inner: Mutex<LogState>,
    arrived: Notify,
}

/// A call whose request has gone out but whose response is pending
#[derive(Debug, Clone)]
pub struct InFlight {
    method: String,
    url: String,
    aliases: Vec<String>,
}

impl InFlight {
    /// Aliases that will capture this call
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

#[derive(Debug, Default)]
struct LogState {
    routes: Vec<(RouteSpec, PathPattern)>,
    queues: HashMap<String, VecDeque<Interception>>,
}

impl InterceptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, route: &RouteSpec) -> EngineResult<()> {
        route.validate()?;
        let pattern = route.pattern()?;
        let mut state = self.inner.lock();
        state.routes.retain(|(r, _)| r.alias != route.alias);
        state.routes.push((route.clone(), pattern));
        state.queues.entry(route.alias.clone()).or_default();
        debug!("Registered interception {}", route);
        Ok(())
    }

    pub fn is_registered(&self, alias: &str) -> bool {
        self.inner.lock().queues.contains_key(alias)
    }

    /// Note a call as its request goes out
    ///
    /// Only routes registered at this point can capture the call, however
    /// late its response arrives.
    pub fn begin(&self, method: &str, url: &str) -> InFlight {
        let state = self.inner.lock();
        let aliases = state
            .routes
            .iter()
            .filter(|(r, p)| r.method.eq_ignore_ascii_case(method) && p.matches(url))
            .map(|(r, _)| r.alias.clone())
            .collect();
        InFlight {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            aliases,
        }
    }

    /// Queue a finished call under the aliases it matched when it began
    pub fn complete(
        &self,
        call: InFlight,
        status: u16,
        request_body: Value,
        response_body: Value,
    ) {
        if call.aliases.is_empty() {
            return;
        }
        let mut state = self.inner.lock();
        for alias in call.aliases {
            debug!("Intercepted {} {} -> {} as @{}", call.method, call.url, status, alias);
            state.queues.entry(alias.clone()).or_default().push_back(Interception {
                alias,
                method: call.method.clone(),
                url: call.url.clone(),
                status,
                request_body: request_body.clone(),
                response_body: response_body.clone(),
            });
        }
        drop(state);
        self.arrived.notify_waiters();
    }

    /// Record a call whose request and response happen together
    pub fn record(
        &self,
        method: &str,
        url: &str,
        status: u16,
        request_body: Value,
        response_body: Value,
    ) {
        let call = self.begin(method, url);
        self.complete(call, status, request_body, response_body);
    }

    /// Wait for the next call captured under `alias`
    pub async fn next(&self, alias: &str, timeout: Duration) -> EngineResult<Interception> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.lock();
                let queue = state
                    .queues
                    .get_mut(alias)
                    .ok_or_else(|| EngineError::UnknownAlias(alias.to_string()))?;
                if let Some(hit) = queue.pop_front() {
                    return Ok(hit);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(EngineError::InterceptionTimeout {
                    alias: alias.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }
}
