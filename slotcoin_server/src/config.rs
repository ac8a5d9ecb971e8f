use crate::coordinator::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use crate::identity::{HttpIdentityProvider, IdentityProvider, StaticIdentityProvider};
use anyhow::Context;
use slotcoin_core::GameConfig;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum IdentityConfig {
    Remote { url: String, api_key: String },
    Static(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub game: GameConfig,
    pub identity: IdentityConfig,
    pub call_timeout: Duration,
    pub max_attempts: u32,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let game = match lookup("SLOTCOIN_GAME_CONFIG") {
            Some(path) => GameConfig::from_path(&path)
                .with_context(|| format!("loading game config from {path}"))?,
            None => GameConfig::default(),
        };
        let identity = match lookup("IDENTITY_URL") {
            Some(url) => IdentityConfig::Remote {
                url,
                api_key: lookup("IDENTITY_API_KEY").unwrap_or_default(),
            },
            None => IdentityConfig::Static(lookup("STATIC_TOKENS").unwrap_or_default()),
        };
        let call_timeout = match lookup("CALL_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("CALL_TIMEOUT_MS is not a number: {ms}"))?,
            ),
            None => DEFAULT_CALL_TIMEOUT,
        };
        let max_attempts = match lookup("SPIN_MAX_ATTEMPTS") {
            Some(n) => n
                .parse()
                .with_context(|| format!("SPIN_MAX_ATTEMPTS is not a number: {n}"))?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        Ok(Self {
            bind: lookup("BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://slotcoin.db".to_string()),
            game,
            identity,
            call_timeout,
            max_attempts,
        })
    }

    pub fn identity_provider(&self) -> anyhow::Result<Arc<dyn IdentityProvider>> {
        Ok(match &self.identity {
            IdentityConfig::Remote { url, api_key } => Arc::new(
                HttpIdentityProvider::new(url.clone(), api_key.clone(), self.call_timeout)
                    .context("building identity client")?,
            ),
            IdentityConfig::Static(pairs) => {
                let provider = StaticIdentityProvider::parse(pairs).context("parsing STATIC_TOKENS")?;
                if provider.is_empty() {
                    tracing::warn!("no IDENTITY_URL or STATIC_TOKENS set, every token will be rejected");
                }
                Arc::new(provider)
            }
        })
    }
}
