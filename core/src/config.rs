//! Client construction options.
//!
//! `ClientOptions` is validated once, when a manager is built. Nothing is
//! constructed from options that fail validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

const DEFAULT_USER_AGENT: &str = concat!("orgs-core/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Base address every endpoint template is rooted under.
    pub base_url: String,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Static bearer token. Acquiring or refreshing it is the caller's job.
    pub token: Option<String>,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read options from `ORGS_BASE_URL`, `ORGS_TOKEN` and `ORGS_MAX_RETRIES`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup("ORGS_BASE_URL")
            .ok_or_else(|| ApiError::argument("ORGS_BASE_URL is not set"))?;
        let mut options = Self::new(base_url);
        options.token = lookup("ORGS_TOKEN");
        if let Some(raw) = lookup("ORGS_MAX_RETRIES") {
            options.retry.max_attempts = raw.parse().map_err(|_| {
                ApiError::argument(format!("ORGS_MAX_RETRIES must be a number, got `{raw}`"))
            })?;
        }
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ApiError::argument("must provide a base URL for the API"));
        }
        Url::parse(base_url)
            .map_err(|e| ApiError::argument(format!("invalid base URL `{base_url}`: {e}")))?;
        Ok(())
    }

    pub(crate) fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Headers attached to every request, caller-supplied ones last so they
    /// can override the defaults.
    pub(crate) fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            (
                "user-agent".to_string(),
                self.user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            ),
        ];
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            headers.retain(|(existing, _)| *existing != name);
            headers.push((name, value.clone()));
        }
        headers
    }
}
