//! Per-session settings and the credentials validated from them
//!
//! The `[session]` table is kept as a flat map of named string values so it
//! can be handed to a FIX engine's settings lookup as-is. Lookups ignore key
//! case: environment overrides arrive lowercased.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use types::SessionId;

/// Setting names understood by the bridge
pub mod keys {
    pub const BEGIN_STRING: &str = "begin_string";
    pub const SENDER_COMP_ID: &str = "sender_comp_id";
    pub const TARGET_COMP_ID: &str = "target_comp_id";
    pub const PASSWORD: &str = "password";
    pub const USERNAME: &str = "username";
    pub const CLIENT_ID: &str = "client_id";
    pub const SECURITY_REQUEST_TYPE: &str = "security_request_type";
}

/// SecurityRequestType (321) sent when none is configured: request by symbol
pub const DEFAULT_SECURITY_REQUEST_TYPE: &str = "4";

pub const DEFAULT_BEGIN_STRING: &str = "FIX.4.2";

const REDACTED: &str = "***";

/// Configuration problems detected before any session is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting '{key}'")]
    MissingSetting { key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingSetting { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Named string values for one session
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSettings {
    values: BTreeMap<String, String>,
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a value, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a value that must be present and non-blank
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::missing(key)),
        }
    }

    /// Optional value; blank counts as unset
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = (&String, &mut String)> {
        self.values.iter_mut()
    }

    pub(crate) fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for (name, value) in copy.values.iter_mut() {
            if name.eq_ignore_ascii_case(keys::PASSWORD) {
                *value = REDACTED.to_string();
            }
        }
        copy
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.redacted().values.iter()).finish()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SessionSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.set(key.as_ref(), value);
        }
        settings
    }
}

/// Credentials and identifiers validated once at startup
///
/// Callbacks that inject these into outbound messages rely on this type
/// existing, so they never have to handle a missing value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub password: String,
    pub username: Option<String>,
    pub client_id: Option<String>,
    pub security_request_type: String,
}

impl SessionCredentials {
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, ConfigError> {
        let begin_string = settings
            .optional(keys::BEGIN_STRING)
            .unwrap_or(DEFAULT_BEGIN_STRING);
        if !begin_string.starts_with("FIX.") {
            return Err(ConfigError::invalid(
                keys::BEGIN_STRING,
                format!("'{}' is not a FIX begin string", begin_string),
            ));
        }

        Ok(Self {
            begin_string: begin_string.to_string(),
            sender_comp_id: settings.require(keys::SENDER_COMP_ID)?.to_string(),
            target_comp_id: settings.require(keys::TARGET_COMP_ID)?.to_string(),
            password: settings.require(keys::PASSWORD)?.to_string(),
            username: settings.optional(keys::USERNAME).map(str::to_string),
            client_id: settings.optional(keys::CLIENT_ID).map(str::to_string),
            security_request_type: settings
                .optional(keys::SECURITY_REQUEST_TYPE)
                .unwrap_or(DEFAULT_SECURITY_REQUEST_TYPE)
                .to_string(),
        })
    }

    /// Session identity the engine is expected to report for these settings
    pub fn session_id(&self) -> SessionId {
        SessionId::new(
            self.begin_string.clone(),
            self.sender_comp_id.clone(),
            self.target_comp_id.clone(),
        )
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("begin_string", &self.begin_string)
            .field("sender_comp_id", &self.sender_comp_id)
            .field("target_comp_id", &self.target_comp_id)
            .field("password", &REDACTED)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("security_request_type", &self.security_request_type)
            .finish()
    }
}
