//! Randomized, constraint-driven fixture generation
//!
//! Every field of a form declares a [`GeneratorSpec`]. A [`Fixture`] is the
//! set of values generated for one scenario execution from that scenario's
//! own RNG, so two scenarios never share input data.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};
use crate::form::FormSpec;
use crate::words::{EMAIL_DOMAINS, FIRST_NAMES, LAST_NAMES, LOREM};

/// `{field}` placeholders in indicator templates
static PLACEHOLDER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}"));

/// Constraint descriptor for a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    /// Digit string with a length in `[min, max]`
    Numeric { min: i64, max: i64 },

    /// Lorem text truncated to a length in `[min, max]`
    Text { min: i64, max: i64 },

    /// Decimal integer in `[min, max]`, rendered as a string
    Integer { min: i64, max: i64 },

    /// "First Last"
    FullName,

    Email,

    /// One candidate picked uniformly
    OneOf { choices: Vec<String> },

    /// Random-size subset drawn without replacement
    SubsetOf { choices: Vec<String> },
}

/// A generated value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Many(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Many(_) => None,
        }
    }

    /// Individual values a UI must show for this field
    pub fn members(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Many(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Many(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl GeneratorSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GeneratorSpec::Numeric { .. } => "numeric",
            GeneratorSpec::Text { .. } => "text",
            GeneratorSpec::Integer { .. } => "integer",
            GeneratorSpec::FullName => "full_name",
            GeneratorSpec::Email => "email",
            GeneratorSpec::OneOf { .. } => "one_of",
            GeneratorSpec::SubsetOf { .. } => "subset_of",
        }
    }

    /// Check bounds without drawing anything
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            GeneratorSpec::Numeric { min, max } | GeneratorSpec::Text { min, max } => {
                if *min > *max || *max < 0 || *min < 0 {
                    return Err(self.invalid_range(*min, *max));
                }
                Ok(())
            }
            GeneratorSpec::Integer { min, max } => {
                if min > max {
                    return Err(self.invalid_range(*min, *max));
                }
                Ok(())
            }
            GeneratorSpec::OneOf { choices } if choices.is_empty() => Err(EngineError::SpecParse(
                "one_of generator needs at least one choice".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Draw one value
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<FieldValue> {
        self.validate()?;

        let value = match self {
            GeneratorSpec::Numeric { min, max } => {
                let len = rng.gen_range(*min..=*max) as usize;
                FieldValue::Text(numeric_string(len, rng))
            }
            GeneratorSpec::Text { min, max } => {
                let len = rng.gen_range(*min..=*max) as usize;
                FieldValue::Text(lorem_text(len, rng))
            }
            GeneratorSpec::Integer { min, max } => {
                FieldValue::Text(rng.gen_range(*min..=*max).to_string())
            }
            GeneratorSpec::FullName => {
                let (first, last) = person(rng);
                FieldValue::Text(format!("{} {}", first, last))
            }
            GeneratorSpec::Email => {
                let (first, last) = person(rng);
                let domain = EMAIL_DOMAINS.choose(rng).copied().unwrap_or("example.com");
                FieldValue::Text(format!(
                    "{}.{}{}@{}",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    rng.gen_range(1..100),
                    domain
                ))
            }
            GeneratorSpec::OneOf { choices } => {
                // validate() guarantees a non-empty candidate set
                let picked = choices.choose(rng).cloned().unwrap_or_default();
                FieldValue::Text(picked)
            }
            GeneratorSpec::SubsetOf { choices } => {
                let size = rng.gen_range(0..=choices.len());
                let picked = choices.choose_multiple(rng, size).cloned().collect();
                FieldValue::Many(picked)
            }
        };

        Ok(value)
    }

    fn invalid_range(&self, min: i64, max: i64) -> EngineError {
        EngineError::InvalidRange {
            kind: self.kind_name().to_string(),
            min,
            max,
        }
    }
}

fn numeric_string<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn lorem_text<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    let mut text = String::with_capacity(len + 16);

    while text.len() < len {
        let words = rng.gen_range(4..=12);
        for i in 0..words {
            let word = LOREM.choose(rng).copied().unwrap_or("lorem");
            if i == 0 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    text.extend(first.to_uppercase());
                    text.push_str(chars.as_str());
                }
            } else {
                text.push(' ');
                text.push_str(word);
            }
        }
        text.push_str(". ");
    }

    // The corpus is ASCII, so byte truncation is char-safe.
    text.truncate(len);
    if text.ends_with(' ') {
        text.pop();
        text.push('.');
    }
    text
}

fn person<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Jane");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
    (first, last)
}

/// Values generated for one scenario execution, keyed by field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    values: BTreeMap<String, FieldValue>,
}

impl Fixture {
    /// Generate a value for every field of `form`, in declaration order
    pub fn generate<R: Rng + ?Sized>(form: &FormSpec, rng: &mut R) -> EngineResult<Self> {
        let mut values = BTreeMap::new();
        for field in &form.fields {
            values.insert(field.name.clone(), field.generator.generate(rng)?);
        }
        Ok(Self { values })
    }

    /// Build a fixture from known values
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, field: &str) -> EngineResult<&FieldValue> {
        self.values
            .get(field)
            .ok_or_else(|| EngineError::UnknownField(field.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The request body the form should send, keyed by API key
    pub fn to_payload(&self, form: &FormSpec) -> EngineResult<Map<String, Value>> {
        let mut payload = Map::new();
        for field in &form.fields {
            payload.insert(field.api_key().to_string(), self.get(&field.name)?.to_json());
        }
        Ok(payload)
    }

    /// Substitute `{field}` placeholders with fixture values
    pub fn render(&self, template: &str) -> EngineResult<String> {
        let placeholder = PLACEHOLDER.as_ref().map_err(Clone::clone)?;
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in placeholder.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            out.push_str(&self.get(name.as_str())?.to_string());
            last = whole.end();
        }
        out.push_str(&template[last..]);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test_case(GeneratorSpec::Numeric { min: 5, max: 2 } ; "numeric min above max")]
    #[test_case(GeneratorSpec::Text { min: 0, max: -1 } ; "text negative max")]
    #[test_case(GeneratorSpec::Numeric { min: -3, max: 4 } ; "numeric negative min")]
    #[test_case(GeneratorSpec::Integer { min: 10, max: 1 } ; "integer min above max")]
    fn test_invalid_ranges_are_rejected(spec: GeneratorSpec) {
        let err = spec.generate(&mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }), "{err}");
    }

    #[test]
    fn test_empty_one_of_is_rejected() {
        let spec = GeneratorSpec::OneOf { choices: vec![] };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_numeric_fixed_length() {
        let spec = GeneratorSpec::Numeric { min: 11, max: 11 };
        let value = spec.generate(&mut rng()).unwrap();
        let text = value.as_text().unwrap();
        assert_eq!(text.len(), 11);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_text_never_ends_in_whitespace() {
        let mut rng = rng();
        for len in 1..200 {
            let spec = GeneratorSpec::Text { min: len, max: len };
            let value = spec.generate(&mut rng).unwrap();
            let text = value.as_text().unwrap();
            assert_eq!(text.len(), len as usize);
            assert!(!text.ends_with(char::is_whitespace), "{text:?}");
        }
    }

    #[test]
    fn test_zero_length_text() {
        let spec = GeneratorSpec::Text { min: 0, max: 0 };
        assert_eq!(spec.generate(&mut rng()).unwrap(), FieldValue::Text(String::new()));
    }

    #[test]
    fn test_email_shape() {
        let value = GeneratorSpec::Email.generate(&mut rng()).unwrap();
        let email = value.as_text().unwrap();
        let (local, domain) = email.split_once('@').unwrap();
        assert!(local.contains('.'));
        assert!(EMAIL_DOMAINS.contains(&domain));
    }

    #[test]
    fn test_same_seed_same_values() {
        let spec = GeneratorSpec::SubsetOf {
            choices: vec!["WiFi".into(), "TV".into(), "Safe".into()],
        };
        let a = spec.generate(&mut StdRng::seed_from_u64(99)).unwrap();
        let b = spec.generate(&mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_template() {
        let fixture = Fixture::from_values([
            ("fullName", FieldValue::Text("Jane Doe".into())),
            ("features", FieldValue::Many(vec!["TV".into(), "Safe".into()])),
        ]);
        assert_eq!(
            fixture.render("Thanks for getting in touch {fullName}!").unwrap(),
            "Thanks for getting in touch Jane Doe!"
        );
        assert_eq!(fixture.render("{features}").unwrap(), "TV, Safe");
        assert_eq!(fixture.render("no placeholders").unwrap(), "no placeholders");
    }

    #[test]
    fn test_render_reuses_one_pattern() {
        let fixture = Fixture::from_values([("subject", FieldValue::Text("Booking".into()))]);
        let before: *const Regex = PLACEHOLDER.as_ref().unwrap();
        for _ in 0..3 {
            assert_eq!(fixture.render("{subject} {subject}").unwrap(), "Booking Booking");
        }
        let after: *const Regex = PLACEHOLDER.as_ref().unwrap();
        assert_eq!(before, after);
        assert_eq!(fixture.render("{ subject }").unwrap(), "{ subject }");
    }

    #[test]
    fn test_render_unknown_placeholder() {
        let fixture = Fixture::from_values([("fullName", FieldValue::Text("Jane".into()))]);
        let err = fixture.render("Hi {nickname}").unwrap_err();
        assert!(matches!(err, EngineError::UnknownField(name) if name == "nickname"));
    }
}
