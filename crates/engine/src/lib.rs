//! Staycheck Scenario Engine
//!
//! Data-driven browser scenarios for forms of the hotel booking platform:
//! - Generates randomized fixtures from per-field generator specs
//! - Maps logical field names to on-screen locators
//! - Watches the network calls a submission triggers and validates them
//! - Runs success, omission and round-trip scenarios against any UI driver
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Scenario Engine (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Suite                                                      │
//! │    ├── cases_for(form) -> [ScenarioCase]                    │
//! │    ├── DriverFactory::open() -> Box<dyn UiDriver>           │
//! │    └── run(cases) -> SuiteReport                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── Fixture::generate(form, rng)                         │
//! │    ├── populate via FieldMapping                            │
//! │    ├── register routes, submit, await @alias                │
//! │    └── assert status, payload, indicators, listing          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FormSpec (YAML)                                            │
//! │    ├── fields: [{ name, generator, locator, input }]        │
//! │    ├── submit, submit_route, success, failure               │
//! │    └── listing { route, item, detail }                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod form;
pub mod intercept;
pub mod playwright;
pub mod policy;
pub mod probe;
pub mod runner;
pub mod suite;

mod words;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use driver::{DriverFactory, UiDriver};
pub use error::{EngineError, EngineResult, FailureCategory};
pub use fixture::{FieldValue, Fixture, GeneratorSpec};
pub use form::{FieldMapping, FormSpec, Locator};
pub use intercept::{InFlight, Interception, InterceptionLog, RouteSpec};
pub use runner::{ScenarioKind, ScenarioReport, ScenarioRunner};
pub use suite::{Suite, SuiteReport};
