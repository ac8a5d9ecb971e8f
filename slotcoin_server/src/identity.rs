use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Opaque user identity issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("token rejected")]
    Rejected,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Verifies bearer tokens issued elsewhere.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, IdentityError>;
}

/// Fixed token table, for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, UserId>,
}

impl StaticIdentityProvider {
    pub fn new<T, U>(pairs: impl IntoIterator<Item = (T, U)>) -> Self
    where
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(t, u)| (t.into(), UserId(u.into())))
                .collect(),
        }
    }

    /// Parses `token=user,token=user`.
    pub fn parse(pairs: &str) -> anyhow::Result<Self> {
        let mut tokens = HashMap::new();
        for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (token, user) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected token=user, got {pair:?}"))?;
            let (token, user) = (token.trim(), user.trim());
            if token.is_empty() || user.is_empty() {
                anyhow::bail!("empty token or user in {pair:?}");
            }
            tokens.insert(token.to_string(), UserId::new(user));
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<UserId, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}

/// Asks a remote auth service who owns a token: `GET {base}/auth/v1/user`
/// with the token as bearer and the service key in `apikey`.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
}

impl HttpIdentityProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, token: &str) -> Result<UserId, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            let user: RemoteUser = resp
                .json()
                .await
                .map_err(|e| IdentityError::Unavailable(format!("bad user payload: {e}")))?;
            if user.id.is_empty() {
                return Err(IdentityError::Rejected);
            }
            return Ok(UserId(user.id));
        }
        match status.as_u16() {
            400 | 401 | 403 | 404 => Err(IdentityError::Rejected),
            code => {
                warn!(code, "identity provider returned unexpected status");
                Err(IdentityError::Unavailable(format!("status {code}")))
            }
        }
    }
}
