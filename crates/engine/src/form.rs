//! Declarative YAML form specifications and field mapping

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixture::GeneratorSpec;
use crate::intercept::RouteSpec;

/// Which element to use when a selector matches several
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    #[default]
    First,
    Last,
}

/// Opaque reference the UI driver resolves to an on-screen element
///
/// In YAML a locator is either a bare selector string or a mapping with
/// `selector`, `has_text` and `pick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocatorRepr")]
pub struct Locator {
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,
    pub pick: Pick,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Selector(String),
    Full {
        selector: String,
        #[serde(default)]
        has_text: Option<String>,
        #[serde(default)]
        pick: Pick,
    },
}

impl From<LocatorRepr> for Locator {
    fn from(repr: LocatorRepr) -> Self {
        match repr {
            LocatorRepr::Selector(selector) => Locator::css(selector),
            LocatorRepr::Full {
                selector,
                has_text,
                pick,
            } => Locator {
                selector,
                has_text,
                pick,
            },
        }
    }
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
            pick: Pick::First,
        }
    }

    /// Narrow to elements whose text contains `text`
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn last(mut self) -> Self {
        self.pick = Pick::Last;
        self
    }

    /// Render a `{value}` template, used by checkbox groups
    pub fn for_value(&self, value: &str) -> Self {
        Self {
            selector: self.selector.replace("{value}", value),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(text) = &self.has_text {
            write!(f, " (text: {:?})", text)?;
        }
        if self.pick == Pick::Last {
            write!(f, " [last]")?;
        }
        Ok(())
    }
}

/// How a field is populated through the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Keyboard entry
    #[default]
    Type,
    /// `<select>` option by value
    Select,
    /// One checkbox per selected value; the locator is a `{value}` template
    Check,
}

/// A single form field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Logical name, unique within the form
    pub name: String,

    /// Key in the outbound request body (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub generator: GeneratorSpec,

    pub locator: Locator,

    #[serde(default)]
    pub input: InputKind,

    /// Server-side validation rejects submissions without this field
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or(&self.name)
    }
}

/// Credentials-backed login performed before the form is used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Role name looked up in the credential store
    pub role: String,
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
}

/// How the captured request body is compared with the fixture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMatch {
    /// Body has exactly the fixture's keys
    #[default]
    Exact,
    /// Body contains the fixture's keys, extra keys allowed
    Include,
}

/// Text expected on screen, with `{field}` placeholders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub selector: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessSpec {
    #[serde(default = "default_success_status")]
    pub status: u16,

    #[serde(default)]
    pub payload: PayloadMatch,

    #[serde(default)]
    pub indicators: Vec<IndicatorSpec>,
}

impl Default for SuccessSpec {
    fn default() -> Self {
        Self {
            status: default_success_status(),
            payload: PayloadMatch::default(),
            indicators: Vec::new(),
        }
    }
}

fn default_success_status() -> u16 {
    201
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSpec {
    #[serde(default = "default_failure_status")]
    pub status: u16,
}

impl Default for FailureSpec {
    fn default() -> Self {
        Self {
            status: default_failure_status(),
        }
    }
}

fn default_failure_status() -> u16 {
    400
}

/// Listing refreshed after a create, used for the round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSpec {
    pub route: RouteSpec,

    #[serde(default = "default_listing_status")]
    pub status: u16,

    /// Key holding the entries in the response body; `None` for a bare array
    #[serde(default)]
    pub items_key: Option<String>,

    /// One rendered listing entry; the newest entry is the last match
    pub item: Locator,

    #[serde(default)]
    pub detail: Option<DetailSpec>,
}

fn default_listing_status() -> u16 {
    200
}

/// Detail view opened by clicking the newest listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSpec {
    pub container: Locator,

    /// Opening the detail view fetches the listing route again
    #[serde(default)]
    pub refetch: bool,
}

/// A complete form description parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSpec {
    /// Unique name for this form
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Page holding the form, relative to the base URL
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub auth: Option<AuthSpec>,

    /// Fields in population order
    pub fields: Vec<FieldSpec>,

    pub submit: Locator,

    pub submit_route: RouteSpec,

    #[serde(default)]
    pub success: SuccessSpec,

    #[serde(default)]
    pub failure: FailureSpec,

    pub error_indicator: Locator,

    /// Fields eligible for omission; defaults to the required fields
    #[serde(default)]
    pub omission: Option<Vec<String>>,

    #[serde(default)]
    pub listing: Option<ListingSpec>,
}

fn default_path() -> String {
    "/".to_string()
}

impl FormSpec {
    /// Parse and validate a form spec from YAML
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a form spec from a YAML file
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| EngineError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all form specs from a directory, ordered by path
    pub fn load_all(dir: &Path) -> EngineResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    pub fn field(&self, name: &str) -> EngineResult<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))
    }

    /// Fields an omission scenario may withhold
    pub fn omission_set(&self) -> Vec<&str> {
        match &self.omission {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => self
                .fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name.as_str())
                .collect(),
        }
    }

    /// Every route the form's scenarios intercept
    pub fn routes(&self) -> Vec<&RouteSpec> {
        let mut routes = vec![&self.submit_route];
        if let Some(listing) = &self.listing {
            routes.push(&listing.route);
        }
        routes
    }

    /// Check internal consistency
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(self.invalid("at least one field is required"));
        }

        FieldMapping::from_form(self)?;

        for field in &self.fields {
            field.generator.validate()?;
            let many = matches!(field.generator, GeneratorSpec::SubsetOf { .. });
            match field.input {
                InputKind::Check if !many => {
                    return Err(self.invalid(format!(
                        "field '{}' uses check input without a subset_of generator",
                        field.name
                    )));
                }
                InputKind::Check if !field.locator.selector.contains("{value}") => {
                    return Err(self.invalid(format!(
                        "field '{}' check locator needs a {{value}} placeholder",
                        field.name
                    )));
                }
                InputKind::Type | InputKind::Select if many => {
                    return Err(self.invalid(format!(
                        "field '{}' generates several values but is not a check input",
                        field.name
                    )));
                }
                _ => {}
            }
        }

        if let Some(names) = &self.omission {
            for name in names {
                self.field(name)?;
            }
        }

        let mut aliases = HashSet::new();
        for route in self.routes() {
            route.validate()?;
            if !aliases.insert(route.alias.as_str()) {
                return Err(self.invalid(format!("duplicate route alias @{}", route.alias)));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::InvalidForm {
            form: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Lookup from logical field name to locator
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    locators: HashMap<String, Locator>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_form(form: &FormSpec) -> EngineResult<Self> {
        let mut mapping = Self::new();
        for field in &form.fields {
            mapping.register(&field.name, field.locator.clone())?;
        }
        Ok(mapping)
    }

    pub fn register(&mut self, name: &str, locator: Locator) -> EngineResult<()> {
        if self.locators.contains_key(name) {
            return Err(EngineError::DuplicateField(name.to_string()));
        }
        self.locators.insert(name.to_string(), locator);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> EngineResult<&Locator> {
        self.locators
            .get(name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))
    }
}
