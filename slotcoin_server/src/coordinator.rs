use crate::error::{ApiError, ApiResult};
use crate::identity::{IdentityError, IdentityProvider, UserId};
use crate::store::{Profile, ProfileStore, SettleOutcome, Settlement, StoreError};
use chrono::Utc;
use parking_lot::Mutex;
use slotcoin_core::{ConfigError, GameConfig, RandSource, SpinEngine, SpinOutcome, UniformSource};
use slotcoin_shared::{SpinLogEntry, SpinResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinReceipt {
    pub user: UserId,
    pub outcome: SpinOutcome,
    /// Balance after settlement.
    pub coins: i64,
    pub attempts: u32,
}

impl From<&SpinReceipt> for SpinResponse {
    fn from(receipt: &SpinReceipt) -> Self {
        SpinResponse {
            spin: receipt.outcome.symbols.map(|s| s.to_index()),
            win: receipt.outcome.win(),
            payout: receipt.outcome.payout(),
            coins: receipt.coins,
        }
    }
}

pub struct SpinCoordinator {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    engine: SpinEngine,
    source: Mutex<Box<dyn UniformSource>>,
    spin_cost: u32,
    starting_coins: i64,
    max_attempts: u32,
    call_timeout: Duration,
}

impl SpinCoordinator {
    pub fn new(
        game: &GameConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            identity,
            store,
            engine: SpinEngine::from_config(game)?,
            source: Mutex::new(Box::new(RandSource::from_entropy())),
            spin_cost: game.spin_cost,
            starting_coins: game.starting_coins,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_source(mut self, source: Box<dyn UniformSource>) -> Self {
        self.source = Mutex::new(source);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &SpinEngine {
        &self.engine
    }

    pub async fn authenticate(&self, token: Option<&str>) -> ApiResult<UserId> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ApiError::Unauthorized),
        };
        match self.bounded("identity provider", self.identity.verify(token)).await? {
            Ok(user) => Ok(user),
            Err(IdentityError::Rejected) => Err(ApiError::Forbidden),
            Err(IdentityError::Unavailable(reason)) => Err(ApiError::Unavailable(reason)),
        }
    }

    pub async fn load_profile(&self, user: &UserId) -> ApiResult<Profile> {
        self.bounded("profile store", self.store.get(user))
            .await?
            .map_err(unavailable)?
            .ok_or(ApiError::NotFound)
    }

    pub fn check_funds(&self, balance: i64) -> ApiResult<()> {
        if balance < i64::from(self.spin_cost) {
            return Err(ApiError::InsufficientFunds {
                balance,
                cost: self.spin_cost,
            });
        }
        Ok(())
    }

    /// Three reel draws and their resolution. The source lock covers only
    /// the draws.
    pub fn draw(&self) -> SpinOutcome {
        let mut source = self.source.lock();
        self.engine.spin_once(&mut *source)
    }

    /// Runs the store write in its own task so a dropped request cannot
    /// abandon it halfway. Once spawned the write is always awaited to the
    /// end: the caller is told what the store actually did.
    pub async fn settle(&self, settlement: Settlement) -> ApiResult<SettleOutcome> {
        let store = Arc::clone(&self.store);
        let user = settlement.user.clone();
        let mut task = tokio::spawn(async move { store.settle(&settlement).await });
        let joined = match tokio::time::timeout(self.call_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    user = %user,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "settlement slower than call timeout, waiting for it"
                );
                task.await
            }
        };
        match joined {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(ApiError::Persistence(e.to_string())),
            Err(join) => Err(ApiError::Persistence(format!("settlement task failed: {join}"))),
        }
    }

    pub async fn spin(&self, token: Option<&str>) -> ApiResult<SpinReceipt> {
        let user = self.authenticate(token).await?;
        self.spin_for(&user).await
    }

    /// Spin for an already authenticated user.
    pub async fn spin_for(&self, user: &UserId) -> ApiResult<SpinReceipt> {
        for attempt in 1..=self.max_attempts {
            let profile = self.load_profile(user).await?;
            self.check_funds(profile.coins)?;

            let outcome = self.draw();
            let new_coins =
                profile.coins - i64::from(self.spin_cost) + i64::from(outcome.payout());
            let settlement = Settlement {
                user: user.clone(),
                expected_coins: profile.coins,
                new_coins,
                symbols: outcome.symbols,
                cost: self.spin_cost,
                payout: outcome.payout(),
                at: Utc::now(),
            };

            match self.settle(settlement).await? {
                SettleOutcome::Applied => {
                    info!(
                        user = %user,
                        symbols = ?outcome.symbols,
                        payout = outcome.payout(),
                        coins = new_coins,
                        attempt,
                        "spin settled"
                    );
                    return Ok(SpinReceipt {
                        user: user.clone(),
                        outcome,
                        coins: new_coins,
                        attempts: attempt,
                    });
                }
                SettleOutcome::Conflict => {
                    warn!(user = %user, attempt, "balance changed before settlement, retrying");
                }
            }
        }
        Err(ApiError::Persistence(format!(
            "balance kept changing, gave up after {} attempts",
            self.max_attempts
        )))
    }

    pub async fn profile(&self, token: Option<&str>) -> ApiResult<Profile> {
        let user = self.authenticate(token).await?;
        self.load_profile(&user).await
    }

    /// Provisions the economic profile of an identity the provider already
    /// knows, with the configured starting balance.
    pub async fn create_profile(&self, token: Option<&str>, username: &str) -> ApiResult<Profile> {
        let user = self.authenticate(token).await?;
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::Invalid("username is required".into()));
        }
        let created = self
            .bounded(
                "profile store",
                self.store.create(&user, username, self.starting_coins),
            )
            .await?;
        match created {
            Ok(profile) => {
                info!(user = %user, coins = profile.coins, "profile created");
                Ok(profile)
            }
            Err(StoreError::AlreadyExists) => Err(ApiError::AlreadyExists),
            Err(e) => Err(ApiError::Persistence(e.to_string())),
        }
    }

    pub async fn history(&self, token: Option<&str>, limit: u32) -> ApiResult<Vec<SpinLogEntry>> {
        let user = self.authenticate(token).await?;
        self.bounded("profile store", self.store.history(&user, limit))
            .await?
            .map_err(unavailable)
    }

    async fn bounded<T>(&self, what: &str, call: impl Future<Output = T>) -> ApiResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                debug!(what, timeout_ms = self.call_timeout.as_millis() as u64, "call timed out");
                ApiError::Unavailable(format!("{what} timed out"))
            })
    }
}

fn unavailable(e: StoreError) -> ApiError {
    ApiError::Unavailable(e.to_string())
}
