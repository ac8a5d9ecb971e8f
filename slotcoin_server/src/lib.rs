pub mod config;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod routes;
pub mod store;

pub use crate::config::{IdentityConfig, ServerConfig};
pub use crate::coordinator::{SpinCoordinator, SpinReceipt};
pub use crate::error::{ApiError, ApiResult};
pub use crate::identity::{
    HttpIdentityProvider, IdentityError, IdentityProvider, StaticIdentityProvider, UserId,
};
pub use crate::routes::{app, AppState};
pub use crate::store::{
    MemoryProfileStore, Profile, ProfileStore, SettleOutcome, Settlement, SqliteProfileStore,
    StoreError,
};
