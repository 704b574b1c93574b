//! UI driver capability consumed by the scenario runner

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::form::Locator;
use crate::intercept::{Interception, RouteSpec};

/// Errors raised by the page outside of any command the runner issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundError {
    pub kind: BackgroundKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    /// Uncaught exception thrown by application script
    UncaughtException,
    /// A request the page issued that never completed
    NetworkFailure,
}

impl BackgroundError {
    pub fn uncaught(message: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::UncaughtException,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::NetworkFailure,
            message: message.into(),
        }
    }
}

/// One browser session
///
/// Every method completes only once the driver has confirmed its effect, so
/// the runner can issue steps strictly in sequence.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate to a path relative to the target's base URL
    async fn visit(&self, path: &str) -> EngineResult<()>;

    async fn type_text(&self, locator: &Locator, text: &str) -> EngineResult<()>;

    async fn select(&self, locator: &Locator, value: &str) -> EngineResult<()>;

    async fn check(&self, locator: &Locator) -> EngineResult<()>;

    async fn click(&self, locator: &Locator) -> EngineResult<()>;

    /// Whether the located element's text contains `text`; `false` if absent
    async fn contains_text(&self, locator: &Locator, text: &str) -> EngineResult<bool>;

    /// `false` if the element is absent
    async fn is_visible(&self, locator: &Locator) -> EngineResult<bool>;

    async fn exists(&self, locator: &Locator) -> EngineResult<bool>;

    /// Start capturing calls for `route`; returns once capture is active
    async fn register_interception(&self, route: &RouteSpec) -> EngineResult<()>;

    /// Next unconsumed call captured under `alias`
    async fn await_interception(&self, alias: &str, timeout: Duration)
        -> EngineResult<Interception>;

    /// Take every background error observed so far
    async fn drain_background_errors(&self) -> Vec<BackgroundError>;

    async fn close(&self) -> EngineResult<()> {
        Ok(())
    }
}

/// Opens one isolated driver session per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> EngineResult<Box<dyn UiDriver>>;
}

/// Element lookups on any driver
pub trait DriverExt {
    fn find(&self, locator: Locator) -> Element<'_, Self>;
}

impl<D: UiDriver + ?Sized> DriverExt for D {
    fn find(&self, locator: Locator) -> Element<'_, Self> {
        Element {
            driver: self,
            locator,
        }
    }
}

/// A located element; every call re-resolves the locator
pub struct Element<'a, D: ?Sized> {
    driver: &'a D,
    locator: Locator,
}

impl<'a, D: UiDriver + ?Sized> Element<'a, D> {
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub async fn type_text(&self, text: &str) -> EngineResult<()> {
        self.driver.type_text(&self.locator, text).await
    }

    pub async fn select(&self, value: &str) -> EngineResult<()> {
        self.driver.select(&self.locator, value).await
    }

    pub async fn check(&self) -> EngineResult<()> {
        self.driver.check(&self.locator).await
    }

    pub async fn click(&self) -> EngineResult<()> {
        self.driver.click(&self.locator).await
    }

    pub async fn contains_text(&self, text: &str) -> EngineResult<bool> {
        self.driver.contains_text(&self.locator, text).await
    }

    pub async fn is_visible(&self) -> EngineResult<bool> {
        self.driver.is_visible(&self.locator).await
    }

    pub async fn exists(&self) -> EngineResult<bool> {
        self.driver.exists(&self.locator).await
    }
}
