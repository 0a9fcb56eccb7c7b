//! Admin credentials
//!
//! One static username/password pair, read from the environment with literal
//! fallbacks. Comparison is plain equality on both fields, done in constant
//! time.

use serde::Deserialize;
use std::fmt;
use subtle::ConstantTimeEq;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "ceyloncare2025";

/// Environment variable overriding the admin username
pub const ADMIN_USERNAME_ENV: &str = "ADMIN_USERNAME";
/// Environment variable overriding the admin password
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";

/// The configured admin login
#[derive(Clone, Deserialize)]
pub struct AdminCredentials {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_username() -> String {
    DEFAULT_ADMIN_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Defaults, overridden by `ADMIN_USERNAME` / `ADMIN_PASSWORD` if set
    pub fn from_env() -> Self {
        let mut creds = Self::default();
        creds.apply_env_overrides();
        creds
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var(ADMIN_USERNAME_ENV) {
            if !username.is_empty() {
                self.username = username;
            }
        }
        if let Ok(password) = std::env::var(ADMIN_PASSWORD_ENV) {
            if !password.is_empty() {
                self.password = password;
            }
        }
    }

    /// Whether `username` and `password` both equal the configured values
    pub fn validate(&self, username: &str, password: &str) -> bool {
        let user_ok: bool = self.username.as_bytes().ct_eq(username.as_bytes()).into();
        let pass_ok: bool = self.password.as_bytes().ct_eq(password.as_bytes()).into();
        user_ok & pass_ok
    }

    /// Whether the built-in fallback password is still in use
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let creds = AdminCredentials::default();
        assert!(creds.validate("admin", "ceyloncare2025"));
        assert!(creds.uses_default_password());
    }

    #[test]
    fn test_validate_requires_both_fields() {
        let creds = AdminCredentials::new("ops", "s3cret");
        assert!(creds.validate("ops", "s3cret"));
        assert!(!creds.validate("ops", "wrong"));
        assert!(!creds.validate("admin", "s3cret"));
        assert!(!creds.validate("ops", "s3cret "));
        assert!(!creds.validate("", ""));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = AdminCredentials::new("ops", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ops"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_deserialize_partial() {
        let creds: AdminCredentials = toml::from_str("username = \"root\"").unwrap();
        assert_eq!(creds.username, "root");
        assert_eq!(creds.password, DEFAULT_ADMIN_PASSWORD);
    }
}
