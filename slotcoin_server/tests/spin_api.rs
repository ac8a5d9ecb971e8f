use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use slotcoin_core::{GameConfig, Paytable, ScriptedSource};
use slotcoin_server::{
    app, AppState, MemoryProfileStore, Profile, ProfileStore, SettleOutcome, Settlement,
    SpinCoordinator, StaticIdentityProvider, StoreError, UserId,
};
use slotcoin_shared::{SpinLogEntry, ERROR_KIND_HEADER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn alice() -> UserId {
    UserId::new("alice")
}

fn build(store: Arc<dyn ProfileStore>, game: GameConfig, draws: Vec<u64>) -> Router {
    let identity = Arc::new(StaticIdentityProvider::new([("tok-alice", "alice")]));
    let coordinator = SpinCoordinator::new(&game, identity, store)
        .unwrap()
        .with_source(Box::new(ScriptedSource::new(draws)))
        .with_call_timeout(Duration::from_millis(500));
    app(Arc::new(AppState { coordinator, game }))
}

async fn memory_with(coins: i64) -> Arc<MemoryProfileStore> {
    let store = Arc::new(MemoryProfileStore::new());
    store.create(&alice(), "alice", coins).await.unwrap();
    store
}

struct Reply {
    status: StatusCode,
    kind: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let kind = resp
        .headers()
        .get(ERROR_KIND_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Reply { status, kind, body }
}

async fn spin(router: &Router, auth: Option<&str>) -> Reply {
    send(router, "POST", "/spin", auth, None).await
}

#[tokio::test]
async fn spin_deducts_cost_and_pays_out() {
    let store = memory_with(15).await;
    let router = build(store.clone(), GameConfig::default(), vec![7, 7, 1]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"spin": [7, 7, 1], "win": true, "payout": 30, "coins": 35})
    );
    assert_eq!(store.coins(&alice()), Some(35));
}

#[tokio::test]
async fn losing_spin_only_deducts_cost() {
    let store = memory_with(15).await;
    let router = build(store.clone(), GameConfig::default(), vec![1, 2, 3]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(
        reply.json(),
        json!({"spin": [1, 2, 3], "win": false, "payout": 0, "coins": 5})
    );
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let store = memory_with(100).await;
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    for auth in [None, Some("Basic dXNlcjpwdw==")] {
        let reply = spin(&router, auth).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.text(), "Unauthorized");
        assert_eq!(reply.kind.as_deref(), Some("unauthorized"));
    }
    assert_eq!(store.coins(&alice()), Some(100));
}

#[tokio::test]
async fn invalid_token_is_forbidden_and_mutates_nothing() {
    let store = memory_with(100).await;
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    let reply = spin(&router, Some("Bearer forged")).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.text(), "Invalid token");
    assert_eq!(reply.kind.as_deref(), Some("forbidden"));
    assert_eq!(store.coins(&alice()), Some(100));
    assert_eq!(store.spin_count(), 0);
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let store = Arc::new(MemoryProfileStore::new());
    let router = build(store, GameConfig::default(), vec![0]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.text(), "Profile not found");
}

#[tokio::test]
async fn insufficient_funds_is_rejected_without_deduction() {
    let store = memory_with(5).await;
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({"error": "Not enough coins"}));
    assert_eq!(reply.kind.as_deref(), Some("insufficient_funds"));
    assert_eq!(store.coins(&alice()), Some(5));
}

/// Reports a balance of 100 but never lets a settlement apply.
struct AlwaysConflicts {
    settles: AtomicUsize,
}

#[async_trait]
impl ProfileStore for AlwaysConflicts {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(Some(Profile {
            id: user.clone(),
            username: String::new(),
            coins: 100,
        }))
    }

    async fn create(&self, _: &UserId, _: &str, _: i64) -> Result<Profile, StoreError> {
        Err(StoreError::AlreadyExists)
    }

    async fn settle(&self, _: &Settlement) -> Result<SettleOutcome, StoreError> {
        self.settles.fetch_add(1, Ordering::SeqCst);
        Ok(SettleOutcome::Conflict)
    }

    async fn history(&self, _: &UserId, _: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn persistent_conflict_gives_up_after_bounded_retries() {
    let store = Arc::new(AlwaysConflicts {
        settles: AtomicUsize::new(0),
    });
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "Could not update coins");
    assert_eq!(reply.kind.as_deref(), Some("persistence_error"));
    assert_eq!(store.settles.load(Ordering::SeqCst), 3);
}

/// Loses the first settlement race, then behaves like the wrapped store.
struct ConflictOnce {
    inner: Arc<MemoryProfileStore>,
    tripped: AtomicUsize,
    seen: parking_lot::Mutex<Vec<Settlement>>,
}

#[async_trait]
impl ProfileStore for ConflictOnce {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        self.inner.get(user).await
    }

    async fn create(&self, user: &UserId, name: &str, coins: i64) -> Result<Profile, StoreError> {
        self.inner.create(user, name, coins).await
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError> {
        self.seen.lock().push(settlement.clone());
        if self.tripped.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(SettleOutcome::Conflict);
        }
        self.inner.settle(settlement).await
    }

    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        self.inner.history(user, limit).await
    }
}

#[tokio::test]
async fn conflict_is_retried_with_a_fresh_draw() {
    let inner = memory_with(20).await;
    let store = Arc::new(ConflictOnce {
        inner: inner.clone(),
        tripped: AtomicUsize::new(0),
        seen: parking_lot::Mutex::new(Vec::new()),
    });
    let router = build(store.clone(), GameConfig::default(), vec![0, 0, 0, 1, 2, 3]);

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::OK);
    // the jackpot drawn on the lost attempt is not replayed
    assert_eq!(
        reply.json(),
        json!({"spin": [1, 2, 3], "win": false, "payout": 0, "coins": 10})
    );
    let seen = store.seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].payout, 1000);
    assert_eq!(seen[1].payout, 0);
    assert_eq!(inner.coins(&alice()), Some(10));
}

#[tokio::test]
async fn profile_provisioning_and_lookup() {
    let store = Arc::new(MemoryProfileStore::new());
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    let reply = send(&router, "GET", "/profile", Some("Bearer tok-alice"), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(
        &router,
        "POST",
        "/profile",
        Some("Bearer tok-alice"),
        Some(json!({"username": "ally"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"id": "alice", "username": "ally", "coins": 1000})
    );

    let reply = send(&router, "GET", "/profile", Some("Bearer tok-alice"), None).await;
    assert_eq!(reply.json()["coins"], 1000);

    let reply = send(
        &router,
        "POST",
        "/profile",
        Some("Bearer tok-alice"),
        Some(json!({"username": "again"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.json(), json!({"error": "Profile already exists"}));

    let reply = send(&router, "POST", "/profile", Some("Bearer forged"), Some(json!({"username": "x"}))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn starting_balance_comes_from_game_config() {
    let store = Arc::new(MemoryProfileStore::new());
    let game = GameConfig {
        starting_coins: 100,
        ..GameConfig::default()
    };
    let router = build(store, game, vec![0]);
    let reply = send(
        &router,
        "POST",
        "/profile",
        Some("Bearer tok-alice"),
        Some(json!({"username": "ally"})),
    )
    .await;
    assert_eq!(reply.json()["coins"], 100);
}

#[tokio::test]
async fn history_lists_settled_spins_newest_first() {
    let store = memory_with(50).await;
    let router = build(store, GameConfig::default(), vec![8, 1, 2, 3, 4, 5]);

    spin(&router, Some("Bearer tok-alice")).await;
    spin(&router, Some("Bearer tok-alice")).await;

    let reply = send(&router, "GET", "/spins?limit=10", Some("Bearer tok-alice"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let entries: Vec<SpinLogEntry> = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].symbols, [3, 4, 5]);
    assert_eq!(entries[0].coins_after, 32);
    assert_eq!(entries[1].symbols, [8, 1, 2]);
    assert_eq!(entries[1].payout, 2);
    assert_eq!(entries[1].coins_before, 50);

    let reply = send(&router, "GET", "/spins", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn paytable_is_public() {
    let router = build(Arc::new(MemoryProfileStore::new()), GameConfig::default(), vec![0]);
    let reply = send(&router, "GET", "/paytable", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["spin_cost"], 10);
    assert_eq!(body["symbols"].as_array().unwrap().len(), 9);
    assert_eq!(body["paytable"][9], json!({"pattern": [7, 7, "*"], "payout": 30}));
}

/// Holds the first two balance reads until both have happened, forcing
/// two spins to start from the same balance.
struct LockstepReads {
    inner: Arc<MemoryProfileStore>,
    reads: AtomicUsize,
    barrier: tokio::sync::Barrier,
}

#[async_trait]
impl ProfileStore for LockstepReads {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        let profile = self.inner.get(user).await;
        if self.reads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
        profile
    }

    async fn create(&self, user: &UserId, name: &str, coins: i64) -> Result<Profile, StoreError> {
        self.inner.create(user, name, coins).await
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError> {
        self.inner.settle(settlement).await
    }

    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        self.inner.history(user, limit).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_spins_cannot_spend_the_same_coins() {
    let inner = memory_with(10).await;
    let store = Arc::new(LockstepReads {
        inner: inner.clone(),
        reads: AtomicUsize::new(0),
        barrier: tokio::sync::Barrier::new(2),
    });
    let game = GameConfig {
        paytable: Paytable::empty(),
        ..GameConfig::default()
    };
    let router = build(store, game, vec![1, 2, 3]);

    let a = tokio::spawn({
        let router = router.clone();
        async move { spin(&router, Some("Bearer tok-alice")).await.status.as_u16() }
    });
    let b = tokio::spawn({
        let router = router.clone();
        async move { spin(&router, Some("Bearer tok-alice")).await.status.as_u16() }
    });
    let mut statuses = vec![a.await.unwrap(), b.await.unwrap()];
    statuses.sort();

    assert_eq!(statuses, vec![200, 400]);
    assert_eq!(inner.coins(&alice()), Some(0));
    assert_eq!(inner.spin_count(), 1);
}

struct SlowIdentity;

#[async_trait]
impl slotcoin_server::IdentityProvider for SlowIdentity {
    async fn verify(&self, _: &str) -> Result<UserId, slotcoin_server::IdentityError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(alice())
    }
}

#[tokio::test]
async fn identity_timeout_is_reported_not_hung() {
    let store = memory_with(100).await;
    let game = GameConfig::default();
    let coordinator = SpinCoordinator::new(&game, Arc::new(SlowIdentity), store.clone())
        .unwrap()
        .with_call_timeout(Duration::from_millis(50));
    let router = app(Arc::new(AppState { coordinator, game }));

    let reply = spin(&router, Some("Bearer tok-alice")).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.kind.as_deref(), Some("unavailable"));
    assert_eq!(store.coins(&alice()), Some(100));
}

/// Delays every settlement before applying it.
struct SlowSettle {
    inner: Arc<MemoryProfileStore>,
}

#[async_trait]
impl ProfileStore for SlowSettle {
    async fn get(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        self.inner.get(user).await
    }

    async fn create(&self, user: &UserId, name: &str, coins: i64) -> Result<Profile, StoreError> {
        self.inner.create(user, name, coins).await
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettleOutcome, StoreError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.inner.settle(settlement).await
    }

    async fn history(&self, user: &UserId, limit: u32) -> Result<Vec<SpinLogEntry>, StoreError> {
        self.inner.history(user, limit).await
    }
}

#[tokio::test]
async fn dropped_request_still_settles_completely() {
    let inner = memory_with(15).await;
    let store = Arc::new(SlowSettle {
        inner: inner.clone(),
    });
    let router = build(store, GameConfig::default(), vec![7, 7, 1]);

    let request = tokio::spawn({
        let router = router.clone();
        async move { spin(&router, Some("Bearer tok-alice")).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    request.abort();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(inner.coins(&alice()), Some(35));
    assert_eq!(inner.spin_count(), 1);
}

#[tokio::test]
async fn slow_settlement_reports_what_was_stored() {
    let inner = memory_with(15).await;
    let store = Arc::new(SlowSettle {
        inner: inner.clone(),
    });
    let identity = Arc::new(StaticIdentityProvider::new([("tok-alice", "alice")]));
    // settle takes 100ms, well past the call timeout
    let coordinator = SpinCoordinator::new(&GameConfig::default(), identity, store)
        .unwrap()
        .with_source(Box::new(ScriptedSource::new([7, 7, 1])))
        .with_call_timeout(Duration::from_millis(30));
    let router = app(Arc::new(AppState {
        coordinator,
        game: GameConfig::default(),
    }));

    let reply = spin(&router, Some("Bearer tok-alice")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["coins"], 35);
    assert_eq!(inner.coins(&alice()), Some(35));
    assert_eq!(inner.spin_count(), 1);
}

#[tokio::test]
async fn unreadable_requests_still_carry_error_kind() {
    let store = Arc::new(MemoryProfileStore::new());
    let router = build(store.clone(), GameConfig::default(), vec![0]);

    // no token and no body: authentication is reported first
    let reply = send(&router, "POST", "/profile", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.kind.as_deref(), Some("unauthorized"));

    let garbled = Request::builder()
        .method("POST")
        .uri("/profile")
        .header(header::AUTHORIZATION, "Bearer tok-alice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = router.clone().oneshot(garbled).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()[ERROR_KIND_HEADER], "invalid_request");
    assert_eq!(store.coins(&alice()), None);

    let reply = send(&router, "GET", "/spins?limit=lots", Some("Bearer tok-alice"), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.kind.as_deref(), Some("invalid_request"));
}
