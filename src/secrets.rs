use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::fragment;
use crate::request::Record;
use crate::{ConfigError, DecodeError};

const SCREEN_NAME_KEY: &str = "screen_name";
const USER_ID_KEY: &str = "user_id";

pub trait SecretsProvider {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str);

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)>;

    fn get_token_option_pair<'a>(&'a self) -> (Option<&'a str>, Option<&'a str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or_else(|| (None, None))
    }
}

/// Consumer identity, access token pair and the account it belongs to.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    access_token: Option<String>,
    access_token_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
    pub screen_name: Option<String>,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub statuses_count: Option<i64>,
}

impl Credentials {
    /// Credentials for the xAuth exchange. They carry no token yet, so the
    /// only request they can sign is the access token exchange.
    pub fn with_password(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Credentials {
            consumer_key: required("consumer_key", consumer_key.into())?,
            consumer_secret: required("consumer_secret", consumer_secret.into())?,
            username: Some(required("username", username.into())?),
            password: Some(required("password", password.into())?),
            ..Default::default()
        })
    }

    pub fn with_token(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Credentials {
            consumer_key: required("consumer_key", consumer_key.into())?,
            consumer_secret: required("consumer_secret", consumer_secret.into())?,
            access_token: Some(required("access_token", access_token.into())?),
            access_token_secret: Some(required(
                "access_token_secret",
                access_token_secret.into(),
            )?),
            ..Default::default()
        })
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn access_token_secret(&self) -> Option<&str> {
        self.access_token_secret.as_deref()
    }

    /// xAuth username and password, present only for password-based credentials.
    pub(crate) fn password_pair(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u, p)),
            _ => None,
        }
    }

    /// Stores the outcome of an access token exchange.
    ///
    /// A `user_id` that is not an integer is skipped and the previous value is
    /// kept; the exchange itself still counts as successful.
    pub fn apply_access_token_result(&mut self, map: &HashMap<String, String>) {
        self.access_token = map.get(crate::OAUTH_TOKEN_KEY).cloned();
        self.access_token_secret = map.get(crate::OAUTH_TOKEN_SECRET_KEY).cloned();
        self.screen_name = map.get(SCREEN_NAME_KEY).cloned();
        if let Some(raw) = map.get(USER_ID_KEY) {
            match raw.parse::<i64>() {
                Ok(id) => self.user_id = Some(id),
                Err(_) => tracing::warn!(user_id = %raw, "ignoring non-numeric user_id"),
            }
        }
        // the password is only good for the exchange
        self.password = None;
    }

    /// Copies the account identity out of a verify-credentials record.
    pub fn apply_verified_identity(&mut self, record: &Record) -> Result<(), DecodeError> {
        let screen_name = record.get("screen_name").and_then(|v| v.as_str());
        let id = record.get("id").and_then(|v| v.as_i64());
        let (screen_name, id) = match (screen_name, id) {
            (Some(s), Some(i)) => (s, i),
            _ => {
                return Err(DecodeError::UnexpectedShape {
                    expected: "account record with screen_name and id",
                    fragment: fragment(&serde_json::Value::from(record.clone()).to_string()),
                })
            }
        };
        self.screen_name = Some(screen_name.to_string());
        self.user_id = Some(id);
        self.user_name = record
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        self.statuses_count = record.get("statuses_count").and_then(|v| v.as_i64());
        Ok(())
    }
}

fn required(field: &'static str, value: String) -> Result<String, ConfigError> {
    if value.is_empty() {
        Err(ConfigError::MissingField(field))
    } else {
        Ok(value)
    }
}

// secrets stay out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("has_access_token", &self.access_token.is_some())
            .field("screen_name", &self.screen_name)
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("statuses_count", &self.statuses_count)
            .finish()
    }
}

impl SecretsProvider for Credentials {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        match (&self.access_token, &self.access_token_secret) {
            (Some(t), Some(s)) => Some((t, s)),
            _ => None,
        }
    }
}

/// Credentials shared by every client of one account.
///
/// Requests sign with a [`snapshot`](SharedCredentials::snapshot); the token
/// exchange and identity verification each write under a single lock, so a
/// reader never sees a token from one exchange paired with the secret of
/// another.
#[derive(Debug, Clone)]
pub struct SharedCredentials {
    inner: Arc<RwLock<Credentials>>,
}

impl SharedCredentials {
    pub fn new(credentials: Credentials) -> Self {
        SharedCredentials {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner.read().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Credentials) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut *guard)
    }
}

impl From<Credentials> for SharedCredentials {
    fn from(credentials: Credentials) -> Self {
        SharedCredentials::new(credentials)
    }
}
