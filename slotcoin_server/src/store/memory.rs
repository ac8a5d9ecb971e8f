use super::{Profile, ProfileStore, SettleOutcome, Settlement, StoreError};
use crate::identity::UserId;
use async_trait::async_trait;
use parking_lot::Mutex;
use slotcoin_shared::SpinLogEntry;
use std::collections::HashMap;

#[derive(Default)]
struct State {
    profiles: HashMap<UserId, Profile>,
    spins: Vec<SpinLogEntry>,
}

/// In-process store. The lock is never held across an await.
#[derive(Default)]
pub struct MemoryProfileStore {
    state: Mutex<State>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coins(&self, user: &UserId) -> Option<i64> {
        self.state.lock().profiles.get(user).map(|p| p.coins)
    }

    pub fn spin_count(&self) -> usize {
        self.state.lock().spins.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.lock().profiles.get(user).cloned())
    }

    async fn create(
        &self,
        user: &UserId,
        username: &str,
        coins: i64,
    ) -> Result<Profile, StoreError> {
        let mut state = self.state.lock();
        if state.profiles.contains_key(user) {
            return Err(StoreError::AlreadyExists);
        }
        let profile = Profile {
            id: user.clone(),
            username: username.to_string(),
            coins,
        };
        state.profiles.insert(user.clone(), profile.clone());
        Ok(profile)
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError> {
        let mut state = self.state.lock();
        match state.profiles.get_mut(&settlement.user) {
            Some(profile) if profile.coins == settlement.expected_coins => {
                profile.coins = settlement.new_coins;
            }
            _ => return Ok(SettleOutcome::Conflict),
        }
        let id = state.spins.len() as i64 + 1;
        state.spins.push(settlement.log_entry(id));
        Ok(SettleOutcome::Applied)
    }

    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .spins
            .iter()
            .rev()
            .filter(|s| s.user_id == user.0)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use slotcoin_core::Symbol;

    fn settlement(user: &UserId, expected: i64, new: i64) -> Settlement {
        Settlement {
            user: user.clone(),
            expected_coins: expected,
            new_coins: new,
            symbols: [Symbol(1), Symbol(2), Symbol(3)],
            cost: 10,
            payout: 0,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn settle_is_compare_and_swap() {
        let store = MemoryProfileStore::new();
        let user = UserId::new("u1");
        store.create(&user, "u", 20).await.unwrap();

        assert_eq!(
            store.settle(&settlement(&user, 20, 10)).await.unwrap(),
            SettleOutcome::Applied
        );
        // second writer still believes the balance is 20
        assert_eq!(
            store.settle(&settlement(&user, 20, 10)).await.unwrap(),
            SettleOutcome::Conflict
        );
        assert_eq!(store.coins(&user), Some(10));
        assert_eq!(store.spin_count(), 1);
    }

    #[tokio::test]
    async fn settle_without_profile_conflicts() {
        let store = MemoryProfileStore::new();
        let ghost = UserId::new("ghost");
        assert_eq!(
            store.settle(&settlement(&ghost, 0, 0)).await.unwrap(),
            SettleOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let store = MemoryProfileStore::new();
        let user = UserId::new("u1");
        store.create(&user, "a", 100).await.unwrap();
        assert!(matches!(
            store.create(&user, "b", 100).await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_per_user() {
        let store = MemoryProfileStore::new();
        let a = UserId::new("a");
        let b = UserId::new("b");
        store.create(&a, "", 30).await.unwrap();
        store.create(&b, "", 30).await.unwrap();
        store.settle(&settlement(&a, 30, 20)).await.unwrap();
        store.settle(&settlement(&b, 30, 20)).await.unwrap();
        store.settle(&settlement(&a, 20, 10)).await.unwrap();

        let history = store.history(&a, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].coins_after, 10);
        assert_eq!(history[1].coins_after, 20);
        assert_eq!(store.history(&a, 1).await.unwrap().len(), 1);
    }
}
