use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotcoin_core::{PaytableEntry, SymbolDef};

/// Header carrying the machine-readable kind of a failed request.
pub const ERROR_KIND_HEADER: &str = "x-error-kind";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinResponse {
    pub spin: [u8; 3],
    pub win: bool,
    pub payout: u32,
    /// Balance after settlement. Clients render this value, never a local guess.
    pub coins: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub coins: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaytableResponse {
    pub symbols: Vec<SymbolDef>,
    pub paytable: Vec<PaytableEntry>,
    pub spin_cost: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinLogEntry {
    pub id: i64,
    pub user_id: String,
    pub ts: DateTime<Utc>,
    pub symbols: [u8; 3],
    pub cost: i64,
    pub payout: i64,
    pub coins_before: i64,
    pub coins_after: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Failure categories visible to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    InsufficientFunds,
    PersistenceError,
    Unavailable,
    InvalidRequest,
    Conflict,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::PersistenceError => "persistence_error",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Conflict => "conflict",
        }
    }

    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientFunds | ErrorKind::InvalidRequest => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::PersistenceError => 500,
            ErrorKind::Unavailable => 503,
        }
    }
}
