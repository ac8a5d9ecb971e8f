use super::{Profile, ProfileStore, SettleOutcome, Settlement, StoreError};
use crate::identity::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotcoin_shared::SpinLogEntry;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    username: String,
    coins: i64,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: UserId(row.id),
            username: row.username,
            coins: row.coins,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    id: i64,
    user_id: String,
    ts: DateTime<Utc>,
    symbols_json: String,
    cost: i64,
    payout: i64,
    coins_before: i64,
    coins_after: i64,
}

impl SpinRow {
    fn into_entry(self) -> Result<SpinLogEntry, StoreError> {
        let symbols: [u8; 3] =
            serde_json::from_str(&self.symbols_json).map_err(|e| StoreError::Corrupt {
                id: self.id,
                reason: e.to_string(),
            })?;
        Ok(SpinLogEntry {
            id: self.id,
            user_id: self.user_id,
            ts: self.ts,
            symbols,
            cost: self.cost,
            payout: self.payout,
            coins_before: self.coins_before,
            coins_after: self.coins_after,
        })
    }
}

impl SqliteProfileStore {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Every recorded spin, oldest first.
    pub async fn all_spins(&self) -> Result<Vec<SpinLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, SpinRow>(
            "SELECT id, user_id, ts, symbols_json, cost, payout, coins_before, coins_after FROM spins ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpinRow::into_entry).collect()
    }

    /// Most recent spins across all users.
    pub async fn recent_spins(&self, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, SpinRow>(
            "SELECT id, user_id, ts, symbols_json, cost, payout, coins_before, coins_after FROM spins ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpinRow::into_entry).collect()
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, coins FROM profiles WHERE id = ?",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn create(
        &self,
        user: &UserId,
        username: &str,
        coins: i64,
    ) -> Result<Profile, StoreError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO profiles (id, username, coins, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.as_str())
        .bind(username)
        .bind(coins)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;
        match inserted {
            Ok(_) => Ok(Profile {
                id: user.clone(),
                username: username.to_string(),
                coins,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE profiles SET coins = ?, updated_at = ? WHERE id = ? AND coins = ?",
        )
        .bind(settlement.new_coins)
        .bind(settlement.at)
        .bind(settlement.user.as_str())
        .bind(settlement.expected_coins)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(user = %settlement.user, "balance moved since read");
            return Ok(SettleOutcome::Conflict);
        }

        let symbols_json = serde_json::json!(settlement.symbols).to_string();
        sqlx::query(
            "INSERT INTO spins (user_id, ts, symbols_json, cost, payout, coins_before, coins_after) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(settlement.user.as_str())
        .bind(settlement.at)
        .bind(symbols_json)
        .bind(i64::from(settlement.cost))
        .bind(i64::from(settlement.payout))
        .bind(settlement.expected_coins)
        .bind(settlement.new_coins)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(SettleOutcome::Applied)
    }

    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, SpinRow>(
            "SELECT id, user_id, ts, symbols_json, cost, payout, coins_before, coins_after FROM spins WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpinRow::into_entry).collect()
    }
}
