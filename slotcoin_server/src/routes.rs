use crate::coordinator::SpinCoordinator;
use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use serde::Deserialize;
use slotcoin_core::GameConfig;
use slotcoin_shared::{
    CreateProfileRequest, PaytableResponse, ProfileResponse, SpinLogEntry, SpinResponse,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

pub struct AppState {
    pub coordinator: SpinCoordinator,
    pub game: GameConfig,
}

type BearerAuth = Option<TypedHeader<Authorization<Bearer>>>;

fn token(header: &BearerAuth) -> Option<&str> {
    header.as_ref().map(|TypedHeader(Authorization(bearer))| bearer.token())
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    auth: BearerAuth,
) -> ApiResult<Json<SpinResponse>> {
    let receipt = state.coordinator.spin(token(&auth)).await?;
    Ok(Json(SpinResponse::from(&receipt)))
}

async fn route_profile(
    State(state): State<Arc<AppState>>,
    auth: BearerAuth,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state.coordinator.profile(token(&auth)).await?;
    Ok(Json(profile.into()))
}

async fn route_create_profile(
    State(state): State<Arc<AppState>>,
    auth: BearerAuth,
    body: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileResponse>> {
    // an unreadable body counts as a missing username, reported after auth
    let username = match body {
        Ok(Json(req)) => req.username,
        Err(rejection) => {
            tracing::debug!(%rejection, "unreadable profile body");
            String::new()
        }
    };
    let profile = state
        .coordinator
        .create_profile(token(&auth), &username)
        .await?;
    Ok(Json(profile.into()))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

async fn route_history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
    auth: BearerAuth,
) -> ApiResult<Json<Vec<SpinLogEntry>>> {
    let Query(query) = query.map_err(|rejection| ApiError::Invalid(rejection.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.coordinator.history(token(&auth), limit).await?))
}

async fn route_paytable(State(state): State<Arc<AppState>>) -> Json<PaytableResponse> {
    Json(PaytableResponse {
        symbols: state.game.symbols.clone(),
        paytable: state.game.paytable.entries().to_vec(),
        spin_cost: state.game.spin_cost,
    })
}

async fn route_health() -> &'static str {
    "ok"
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(route_health))
        .route("/paytable", get(route_paytable))
        .route("/spin", post(route_spin))
        .route("/spins", get(route_history))
        .route("/profile", get(route_profile).post(route_create_profile))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
