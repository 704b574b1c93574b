//! Scenario runner: drives one form through the UI driver and checks the outcome
//!
//! A scenario moves through
//! `Init -> FieldsPopulated -> Submitted -> ResponseObserved -> Passed | Failed`.
//! The first failed check ends it; nothing is retried. UI expectations are
//! polled until they hold or the UI wait window closes, which is waiting for
//! the page to settle, not retrying a failed step.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assertions::{assert_payload, assert_status, find_listing_entry};
use crate::config::Timeouts;
use crate::credentials::CredentialStore;
use crate::driver::{BackgroundError, DriverExt, UiDriver};
use crate::error::{EngineError, EngineResult, FailureCategory};
use crate::fixture::{FieldValue, Fixture};
use crate::form::{FieldMapping, FormSpec, InputKind, ListingSpec, Locator};
use crate::intercept::Interception;
use crate::policy::ErrorFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Every field filled, submission accepted
    FullSuccess,
    /// One omittable field withheld, submission rejected
    Omission,
    /// Full success, then the created entity is found in the listing
    RoundTrip,
}

impl ScenarioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::FullSuccess => "full_success",
            ScenarioKind::Omission => "omission",
            ScenarioKind::RoundTrip => "round_trip",
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Init,
    FieldsPopulated,
    Submitted,
    ResponseObserved,
    Passed,
    Failed,
}

impl ScenarioState {
    fn can_advance_to(self, next: ScenarioState) -> bool {
        use ScenarioState::*;
        matches!(
            (self, next),
            (Init, FieldsPopulated)
                | (FieldsPopulated, Submitted)
                | (Submitted, ResponseObserved)
                | (ResponseObserved, Passed)
                | (Init | FieldsPopulated | Submitted | ResponseObserved, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioState::Passed | ScenarioState::Failed)
    }
}

/// Shared, read-only inputs for every scenario of a suite
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub credentials: CredentialStore,
    pub filter: ErrorFilter,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub category: FailureCategory,
    pub message: String,
}

impl From<&EngineError> for FailureReport {
    fn from(err: &EngineError) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub form: String,
    pub kind: ScenarioKind,
    pub seed: u64,
    pub outcome: Outcome,
    /// Last non-terminal state reached
    pub reached: ScenarioState,
    pub omitted_field: Option<String>,
    pub fixture: Option<Fixture>,
    pub failure: Option<FailureReport>,
    pub suppressed: Vec<BackgroundError>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// Report for a scenario that failed before its runner existed
    pub fn setup_failure(
        form: &str,
        kind: ScenarioKind,
        seed: u64,
        err: &EngineError,
        duration_ms: u64,
    ) -> Self {
        Self {
            name: scenario_name(form, kind),
            form: form.to_string(),
            kind,
            seed,
            outcome: Outcome::Failed,
            reached: ScenarioState::Init,
            omitted_field: None,
            fixture: None,
            failure: Some(FailureReport::from(err)),
            suppressed: Vec::new(),
            duration_ms,
        }
    }
}

pub fn scenario_name(form: &str, kind: ScenarioKind) -> String {
    format!("{}::{}", form, kind)
}

/// UI condition awaited by the runner
#[derive(Debug, Clone)]
enum Expect {
    Visible,
    Absent,
    ContainsText(String),
}

impl std::fmt::Display for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expect::Visible => f.write_str("visible"),
            Expect::Absent => f.write_str("absent"),
            Expect::ContainsText(t) => write!(f, "contains {:?}", t),
        }
    }
}

/// Drives one scenario against one driver session
pub struct ScenarioRunner<'a> {
    driver: &'a dyn UiDriver,
    form: &'a FormSpec,
    mapping: FieldMapping,
    context: &'a ScenarioContext,
    state: ScenarioState,
    reached: ScenarioState,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        driver: &'a dyn UiDriver,
        form: &'a FormSpec,
        context: &'a ScenarioContext,
    ) -> EngineResult<Self> {
        Ok(Self {
            driver,
            form,
            mapping: FieldMapping::from_form(form)?,
            context,
            state: ScenarioState::Init,
            reached: ScenarioState::Init,
        })
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    fn advance(&mut self, next: ScenarioState) -> EngineResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(EngineError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?}", next),
            });
        }
        debug!("{}: {:?} -> {:?}", self.form.name, self.state, next);
        if !next.is_terminal() {
            self.reached = next;
        }
        self.state = next;
        Ok(())
    }

    /// Move to the terminal state matching `result`
    ///
    /// A run that returns Ok without observing a response fails with the
    /// rejected transition.
    fn settle(&mut self, result: &mut EngineResult<()>) -> Outcome {
        if result.is_ok() {
            if let Err(err) = self.advance(ScenarioState::Passed) {
                warn!("{}: {}", self.form.name, err);
                *result = Err(err);
            }
        }
        if result.is_err() {
            if let Err(err) = self.advance(ScenarioState::Failed) {
                warn!("{}: {}", self.form.name, err);
            }
        }
        match self.state {
            ScenarioState::Passed => Outcome::Passed,
            _ => Outcome::Failed,
        }
    }

    /// Generate a fixture from `seed`, run `kind`, and report
    pub async fn execute(mut self, kind: ScenarioKind, seed: u64) -> ScenarioReport {
        let start = Instant::now();
        let name = scenario_name(&self.form.name, kind);
        info!("▶ {} (seed {})", name, seed);

        let mut fixture = None;
        let mut omitted_field = None;
        let mut result = self
            .run_kind(kind, seed, &mut fixture, &mut omitted_field)
            .await;

        let (suppressed, unexpected) = self
            .context
            .filter
            .partition(self.driver.drain_background_errors().await);
        for err in &suppressed {
            warn!("{}: suppressed {:?}: {}", name, err.kind, err.message);
        }
        if result.is_ok() && !unexpected.is_empty() {
            let messages: Vec<String> = unexpected
                .iter()
                .map(|e| format!("{:?}: {}", e.kind, e.message))
                .collect();
            result = Err(EngineError::Background(messages.join("; ")));
        }

        let outcome = self.settle(&mut result);

        ScenarioReport {
            name,
            form: self.form.name.clone(),
            kind,
            seed,
            outcome,
            reached: self.reached,
            omitted_field,
            fixture,
            failure: result.as_ref().err().map(FailureReport::from),
            suppressed,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run_kind(
        &mut self,
        kind: ScenarioKind,
        seed: u64,
        fixture: &mut Option<Fixture>,
        omitted_field: &mut Option<String>,
    ) -> EngineResult<()> {
        let mut rng = StdRng::seed_from_u64(seed);
        let fixture = fixture.insert(Fixture::generate(self.form, &mut rng)?);

        match kind {
            ScenarioKind::FullSuccess => self.full_success(fixture).await,
            ScenarioKind::RoundTrip => self.round_trip(fixture).await,
            ScenarioKind::Omission => {
                let field = omitted_field.insert(choose_omission(self.form, &mut rng)?);
                self.omission(fixture, field).await
            }
        }
    }

    /// Fill every field, submit, and expect acceptance
    pub async fn full_success(&mut self, fixture: &Fixture) -> EngineResult<()> {
        let payload = fixture.to_payload(self.form)?;

        self.prepare(fixture, None).await?;
        let submitted = self.submit().await?;

        assert_status(&submitted, self.form.success.status)?;
        assert_payload(&submitted.request_body, &payload, self.form.success.payload)?;

        for locator in self.indicators(fixture)? {
            self.expect(&locator, Expect::Visible).await?;
        }
        self.expect(&self.form.error_indicator, Expect::Absent).await?;

        Ok(())
    }

    /// Fill every field except `omitted`, submit, and expect rejection
    pub async fn omission(&mut self, fixture: &Fixture, omitted: &str) -> EngineResult<()> {
        self.form.field(omitted)?;
        info!("{}: omitting '{}'", self.form.name, omitted);

        self.prepare(fixture, Some(omitted)).await?;
        let submitted = self.submit().await?;

        assert_status(&submitted, self.form.failure.status)?;
        self.expect(&self.form.error_indicator, Expect::Visible).await?;
        for locator in self.indicators(fixture)? {
            self.expect(&locator, Expect::Absent).await?;
        }

        let form = self.form;
        if let Some(listing) = &form.listing {
            let refreshed = self.await_call(&listing.route.alias).await?;
            assert_status(&refreshed, listing.status)?;
        }

        Ok(())
    }

    /// Create through the form, then find the entity in the refreshed listing
    pub async fn round_trip(&mut self, fixture: &Fixture) -> EngineResult<()> {
        let form = self.form;
        let listing = form.listing.as_ref().ok_or_else(|| EngineError::InvalidForm {
            form: form.name.clone(),
            reason: "round trip needs a listing".to_string(),
        })?;

        self.full_success(fixture).await?;

        let refreshed = self.await_call(&listing.route.alias).await?;
        assert_status(&refreshed, listing.status)?;
        let payload = fixture.to_payload(form)?;
        find_listing_entry(&refreshed.response_body, listing.items_key.as_deref(), &payload)?;

        let newest = listing.item.clone().last();
        self.expect_values(&newest, fixture).await?;
        self.expect(&self.form.error_indicator, Expect::Absent).await?;

        self.open_detail(listing, &newest, fixture).await
    }

    async fn open_detail(
        &self,
        listing: &ListingSpec,
        newest: &Locator,
        fixture: &Fixture,
    ) -> EngineResult<()> {
        let Some(detail) = &listing.detail else {
            return Ok(());
        };

        self.driver.find(newest.clone()).click().await?;
        if detail.refetch {
            let refetched = self.await_call(&listing.route.alias).await?;
            assert_status(&refetched, listing.status)?;
        }
        self.expect_values(&detail.container, fixture).await
    }

    /// Log in if needed, open the form, and fill it
    async fn prepare(&mut self, fixture: &Fixture, skip: Option<&str>) -> EngineResult<()> {
        self.driver.visit(&self.form.path).await?;

        if let Some(auth) = &self.form.auth {
            let creds = self.context.credentials.get(&auth.role)?;
            debug!("{}: logging in as role '{}'", self.form.name, auth.role);
            self.driver.find(auth.username.clone()).type_text(&creds.username).await?;
            self.driver.find(auth.password.clone()).type_text(&creds.password).await?;
            self.driver.find(auth.submit.clone()).click().await?;
        }

        for field in &self.form.fields {
            if skip == Some(field.name.as_str()) {
                continue;
            }
            let locator = self.mapping.resolve(&field.name)?.clone();
            let value = fixture.get(&field.name)?;

            match (field.input, value) {
                (InputKind::Type, FieldValue::Text(text)) => {
                    // An empty string leaves the input untouched
                    if !text.is_empty() {
                        self.driver.find(locator).type_text(text).await?;
                    }
                }
                (InputKind::Select, FieldValue::Text(option)) => {
                    self.driver.find(locator).select(option).await?;
                }
                (InputKind::Check, FieldValue::Many(options)) => {
                    for option in options {
                        self.driver.find(locator.for_value(option)).check().await?;
                    }
                }
                (input, value) => {
                    return Err(EngineError::InvalidForm {
                        form: self.form.name.clone(),
                        reason: format!(
                            "field '{}' has {:?} input but generated {:?}",
                            field.name, input, value
                        ),
                    });
                }
            }
        }

        self.advance(ScenarioState::FieldsPopulated)
    }

    /// Register every route, click submit, and wait for the submit call
    async fn submit(&mut self) -> EngineResult<Interception> {
        for route in self.form.routes() {
            self.driver.register_interception(route).await?;
        }

        self.driver.find(self.form.submit.clone()).click().await?;
        self.advance(ScenarioState::Submitted)?;

        let call = self.await_call(&self.form.submit_route.alias).await?;
        self.advance(ScenarioState::ResponseObserved)?;
        Ok(call)
    }

    async fn await_call(&self, alias: &str) -> EngineResult<Interception> {
        let call = self
            .driver
            .await_interception(alias, self.context.timeouts.interception())
            .await?;
        debug!("@{} -> {} {} {}", alias, call.method, call.url, call.status);
        Ok(call)
    }

    fn indicators(&self, fixture: &Fixture) -> EngineResult<Vec<Locator>> {
        self.form
            .success
            .indicators
            .iter()
            .map(|ind| Ok(Locator::css(&ind.selector).with_text(fixture.render(&ind.text)?)))
            .collect()
    }

    /// Every fixture value must show up inside `container`
    async fn expect_values(&self, container: &Locator, fixture: &Fixture) -> EngineResult<()> {
        for field in &self.form.fields {
            for member in fixture.get(&field.name)?.members() {
                if member.is_empty() {
                    continue;
                }
                self.expect(container, Expect::ContainsText(member.to_string()))
                    .await?;
            }
        }
        Ok(())
    }

    /// Poll until `expect` holds for `locator` or the UI window closes
    async fn expect(&self, locator: &Locator, expect: Expect) -> EngineResult<()> {
        let window = self.context.timeouts.ui();
        let deadline = Instant::now() + window;

        loop {
            let holds = match &expect {
                Expect::Visible => self.driver.is_visible(locator).await?,
                Expect::Absent => !self.driver.exists(locator).await?,
                Expect::ContainsText(text) => self.driver.contains_text(locator, text).await?,
            };
            if holds {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EngineError::validation(
                    format!("{} is {}", locator, expect),
                    &expect,
                    format!("not {} after {} ms", expect, window.as_millis()),
                ));
            }
            tokio::time::sleep(self.context.timeouts.poll().min(remaining(deadline))).await;
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Pick the field an omission scenario withholds
pub fn choose_omission<R: rand::Rng + ?Sized>(form: &FormSpec, rng: &mut R) -> EngineResult<String> {
    form.omission_set()
        .choose(rng)
        .map(|f| f.to_string())
        .ok_or_else(|| EngineError::InvalidForm {
            form: form.name.clone(),
            reason: "no fields are eligible for omission".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::RouteSpec;
    use crate::policy::ErrorPolicy;

    #[test]
    fn test_transitions() {
        use ScenarioState::*;
        assert!(Init.can_advance_to(FieldsPopulated));
        assert!(ResponseObserved.can_advance_to(Passed));
        assert!(Submitted.can_advance_to(Failed));
        assert!(!Init.can_advance_to(Submitted));
        assert!(!Init.can_advance_to(Passed));
        assert!(!Passed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Init));
    }

    struct IdleDriver;

    #[async_trait::async_trait]
    impl UiDriver for IdleDriver {
        async fn visit(&self, _path: &str) -> EngineResult<()> {
            Ok(())
        }
        async fn type_text(&self, _locator: &Locator, _text: &str) -> EngineResult<()> {
            Ok(())
        }
        async fn select(&self, _locator: &Locator, _value: &str) -> EngineResult<()> {
            Ok(())
        }
        async fn check(&self, _locator: &Locator) -> EngineResult<()> {
            Ok(())
        }
        async fn click(&self, _locator: &Locator) -> EngineResult<()> {
            Ok(())
        }
        async fn contains_text(&self, _locator: &Locator, _text: &str) -> EngineResult<bool> {
            Ok(false)
        }
        async fn is_visible(&self, _locator: &Locator) -> EngineResult<bool> {
            Ok(false)
        }
        async fn exists(&self, _locator: &Locator) -> EngineResult<bool> {
            Ok(false)
        }
        async fn register_interception(&self, _route: &RouteSpec) -> EngineResult<()> {
            Ok(())
        }
        async fn await_interception(
            &self,
            alias: &str,
            _timeout: Duration,
        ) -> EngineResult<Interception> {
            Err(EngineError::UnknownAlias(alias.to_string()))
        }
        async fn drain_background_errors(&self) -> Vec<BackgroundError> {
            Vec::new()
        }
    }

    const NOTE: &str = r#"
name: note
fields:
  - name: body
    generator: { kind: text, min: 5, max: 10 }
    locator: '#body'
submit: '#send'
submit_route: { method: POST, path: /note, alias: postNote }
error_indicator: .alert-danger
"#;

    fn context() -> ScenarioContext {
        ScenarioContext {
            credentials: CredentialStore::new(),
            filter: ErrorFilter::new(&ErrorPolicy::default()).unwrap(),
            timeouts: Timeouts::default(),
        }
    }

    #[test]
    fn test_settle_from_response_observed() {
        crate::test_support::init_tracing();
        let form = FormSpec::from_yaml(NOTE).unwrap();
        let ctx = context();
        let mut runner = ScenarioRunner::new(&IdleDriver, &form, &ctx).unwrap();
        runner.advance(ScenarioState::FieldsPopulated).unwrap();
        runner.advance(ScenarioState::Submitted).unwrap();
        runner.advance(ScenarioState::ResponseObserved).unwrap();

        let mut result = Ok(());
        assert_eq!(runner.settle(&mut result), Outcome::Passed);
        assert!(result.is_ok());
        assert_eq!(runner.state(), ScenarioState::Passed);
    }

    #[test]
    fn test_settle_without_response_fails() {
        crate::test_support::init_tracing();
        let form = FormSpec::from_yaml(NOTE).unwrap();
        let ctx = context();
        let mut runner = ScenarioRunner::new(&IdleDriver, &form, &ctx).unwrap();
        runner.advance(ScenarioState::FieldsPopulated).unwrap();

        let mut result = Ok(());
        assert_eq!(runner.settle(&mut result), Outcome::Failed);
        assert!(matches!(
            result,
            Err(EngineError::InvalidStateTransition { .. })
        ));
        assert_eq!(runner.state(), ScenarioState::Failed);
        assert_eq!(runner.reached, ScenarioState::FieldsPopulated);
    }

    #[test]
    fn test_settle_twice_keeps_first_outcome() {
        crate::test_support::init_tracing();
        let form = FormSpec::from_yaml(NOTE).unwrap();
        let ctx = context();
        let mut runner = ScenarioRunner::new(&IdleDriver, &form, &ctx).unwrap();

        let mut failed = Err(EngineError::Driver("gone".to_string()));
        assert_eq!(runner.settle(&mut failed), Outcome::Failed);
        let mut late = Ok(());
        assert_eq!(runner.settle(&mut late), Outcome::Failed);
        assert!(late.is_err());
    }

    #[test]
    fn test_scenario_name() {
        assert_eq!(
            scenario_name("contact", ScenarioKind::Omission),
            "contact::omission"
        );
    }
}
