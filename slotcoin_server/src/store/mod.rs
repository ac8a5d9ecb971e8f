mod memory;
mod sqlite;

pub use memory::MemoryProfileStore;
pub use sqlite::SqliteProfileStore;

use crate::identity::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotcoin_core::Symbol;
use slotcoin_shared::{ProfileResponse, SpinLogEntry};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub coins: i64,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        ProfileResponse {
            id: profile.id.0,
            username: profile.username,
            coins: profile.coins,
        }
    }
}

/// A balance swap plus the spin that produced it.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub user: UserId,
    pub expected_coins: i64,
    pub new_coins: i64,
    pub symbols: [Symbol; 3],
    pub cost: u32,
    pub payout: u32,
    pub at: DateTime<Utc>,
}

impl Settlement {
    pub(crate) fn log_entry(&self, id: i64) -> SpinLogEntry {
        SpinLogEntry {
            id,
            user_id: self.user.0.clone(),
            ts: self.at,
            symbols: self.symbols.map(Symbol::to_index),
            cost: i64::from(self.cost),
            payout: i64::from(self.payout),
            coins_before: self.expected_coins,
            coins_after: self.new_coins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Applied,
    /// The stored balance no longer equals `expected_coins`.
    Conflict,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile already exists")]
    AlreadyExists,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("spin record {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError>;

    async fn create(
        &self,
        user: &UserId,
        username: &str,
        coins: i64,
    ) -> Result<Profile, StoreError>;

    /// Atomically swaps the balance and records the spin, or does neither.
    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError>;

    /// Most recent spins first.
    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError>;
}
