//! Role-keyed credentials provided by the environment
//!
//! `STAYCHECK_CREDENTIALS` holds a JSON object mapping role names to
//! `{"username": ..., "password": ...}`. Individual roles can be set or
//! overridden with `STAYCHECK_<ROLE>_USERNAME` and `STAYCHECK_<ROLE>_PASSWORD`.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

pub const CREDENTIALS_VAR: &str = "STAYCHECK_CREDENTIALS";
const ROLE_PREFIX: &str = "STAYCHECK_";

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    roles: HashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials from the process environment
    pub fn from_env() -> EngineResult<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build a store from `(name, value)` pairs shaped like environment variables
    pub fn from_vars<I>(vars: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let mut store = Self::new();

        if let Some((_, json)) = vars.iter().find(|(k, _)| k == CREDENTIALS_VAR) {
            let parsed: HashMap<String, Credentials> = serde_json::from_str(json)
                .map_err(|e| EngineError::Config(format!("{} is not valid: {}", CREDENTIALS_VAR, e)))?;
            for (role, creds) in parsed {
                store.insert(&role, creds);
            }
        }

        let mut partial: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
        for (key, value) in &vars {
            let Some(rest) = key.strip_prefix(ROLE_PREFIX) else {
                continue;
            };
            if let Some(role) = rest.strip_suffix("_USERNAME") {
                partial.entry(role.to_ascii_lowercase()).or_default().0 = Some(value.clone());
            } else if let Some(role) = rest.strip_suffix("_PASSWORD") {
                partial.entry(role.to_ascii_lowercase()).or_default().1 = Some(value.clone());
            }
        }

        for (role, (username, password)) in partial {
            let existing = store.roles.get(&role).cloned();
            let username = username.or_else(|| existing.as_ref().map(|c| c.username.clone()));
            let password = password.or_else(|| existing.as_ref().map(|c| c.password.clone()));
            match (username, password) {
                (Some(username), Some(password)) => {
                    store.insert(&role, Credentials { username, password });
                }
                _ => {
                    return Err(EngineError::Config(format!(
                        "role '{}' needs both {}{}_USERNAME and {}{}_PASSWORD",
                        role,
                        ROLE_PREFIX,
                        role.to_ascii_uppercase(),
                        ROLE_PREFIX,
                        role.to_ascii_uppercase()
                    )));
                }
            }
        }

        Ok(store)
    }

    pub fn insert(&mut self, role: &str, credentials: Credentials) {
        self.roles.insert(role.to_ascii_lowercase(), credentials);
    }

    pub fn get(&self, role: &str) -> EngineResult<&Credentials> {
        self.roles
            .get(&role.to_ascii_lowercase())
            .ok_or_else(|| EngineError::MissingCredentials(role.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_json_credentials() {
        let store = CredentialStore::from_vars(vars(&[(
            "STAYCHECK_CREDENTIALS",
            r#"{"admin": {"username": "admin", "password": "password"}}"#,
        )]))
        .unwrap();
        assert_eq!(store.get("admin").unwrap().password, "password");
        assert_eq!(store.get("ADMIN").unwrap().username, "admin");
    }

    #[test]
    fn test_per_role_override() {
        let store = CredentialStore::from_vars(vars(&[
            (
                "STAYCHECK_CREDENTIALS",
                r#"{"admin": {"username": "admin", "password": "old"}}"#,
            ),
            ("STAYCHECK_ADMIN_PASSWORD", "new"),
            ("STAYCHECK_CLERK_USERNAME", "clerk"),
            ("STAYCHECK_CLERK_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(store.get("admin").unwrap().password, "new");
        assert_eq!(store.get("admin").unwrap().username, "admin");
        assert_eq!(store.get("clerk").unwrap().username, "clerk");
    }

    #[test]
    fn test_half_configured_role_rejected() {
        let err = CredentialStore::from_vars(vars(&[("STAYCHECK_ADMIN_USERNAME", "admin")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_missing_role() {
        let store = CredentialStore::new();
        assert!(matches!(
            store.get("admin"),
            Err(EngineError::MissingCredentials(role)) if role == "admin"
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
