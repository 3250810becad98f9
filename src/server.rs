//! HTTP surface.
//!
//! A thin axum layer over the engine: bearer-token authentication,
//! request/response shapes, and the error-to-status mapping. The
//! credentialled signup/signin front-end stays external; this server
//! only validates the tokens it mints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::engine::{EndGameParams, Engine, InitiateParams, UpdateParams};
use crate::error::EngineError;
use crate::game::{HistoricalMatch, Match, Side};
use crate::recipes::{Recipe, RecipeFilter};
use crate::store::{AuthUser, TokenValidator};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The match engine.
    pub engine: Arc<Engine>,
    /// Bearer-token validator.
    pub tokens: Arc<dyn TokenValidator>,
}

/// Build the API router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/initiate_game", post(initiate_handler))
        .route("/update", post(update_handler))
        .route("/end_game", post(end_game_handler))
        .route("/matches/{id}/resign", post(resign_handler))
        .route("/recipes", get(list_recipes_handler))
        .route("/recipes/{key}", get(get_recipe_handler))
        .route("/profile/active-matches", get(active_matches_handler))
        .route("/profile/historic-matches", get(historic_matches_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// API error: engine error kinds mapped onto status codes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Auth(_) => StatusCode::UNAUTHORIZED,
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}

/// Resolve the bearer token, or fail with 401.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::from(EngineError::auth("missing bearer token")))?;
    state
        .tokens
        .validate(token)
        .ok_or_else(|| ApiError::from(EngineError::auth("invalid bearer token")))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"service": "skirmish", "version": env!("CARGO_PKG_VERSION")}))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiateResponse {
    match_id: String,
    snapshot: Match,
}

async fn initiate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<InitiateParams>,
) -> Result<(StatusCode, Json<InitiateResponse>), ApiError> {
    let auth = authorize(&state, &headers)?;
    let snapshot = state.engine.initiate(&auth, params).await?;
    Ok((
        StatusCode::CREATED,
        Json(InitiateResponse {
            match_id: snapshot.id.clone(),
            snapshot,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    snapshot: Match,
}

async fn update_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<UpdateParams>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let auth = authorize(&state, &headers)?;
    let snapshot = state.engine.update(&auth, params).await?;
    Ok(Json(UpdateResponse { snapshot }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    historical_id: String,
    summary: HistoricalMatch,
}

impl From<HistoricalMatch> for SummaryResponse {
    fn from(summary: HistoricalMatch) -> Self {
        Self {
            historical_id: summary.match_key.clone(),
            summary,
        }
    }
}

async fn end_game_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<EndGameParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let auth = authorize(&state, &headers)?;
    let summary = state.engine.end_game(&auth, params).await?;
    Ok(Json(summary.into()))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct ResignBody {
    side: Option<Side>,
}

async fn resign_handler(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<ResignBody>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let auth = authorize(&state, &headers)?;
    let side = body.map(|Json(b)| b.side).unwrap_or_default();
    let summary = state.engine.resign(&auth, &match_id, side).await?;
    Ok(Json(summary.into()))
}

#[derive(Debug, Serialize)]
struct RecipesResponse {
    recipes: Vec<Recipe>,
}

async fn list_recipes_handler(
    State(state): State<AppState>,
    Query(filter): Query<RecipeFilter>,
) -> Json<RecipesResponse> {
    let recipes = state
        .engine
        .catalog()
        .list(&filter)
        .into_iter()
        .cloned()
        .collect();
    Json(RecipesResponse { recipes })
}

#[derive(Debug, Serialize)]
struct RecipeResponse {
    recipe: Recipe,
}

async fn get_recipe_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let recipe = state
        .engine
        .catalog()
        .get(&key)
        .cloned()
        .ok_or_else(|| ApiError::from(EngineError::not_found(format!("recipe not found: {key}"))))?;
    Ok(Json(RecipeResponse { recipe }))
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PageQuery {
    limit: Option<usize>,
    skip: Option<usize>,
}

impl PageQuery {
    fn resolve(self) -> (usize, usize) {
        (self.limit.unwrap_or(20).min(100), self.skip.unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
struct PageResponse<T> {
    total: u64,
    limit: usize,
    skip: usize,
    items: Vec<T>,
}

async fn active_matches_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Match>>, ApiError> {
    let auth = authorize(&state, &headers)?;
    let (limit, skip) = query.resolve();
    let page = state.engine.active_matches(&auth, limit, skip).await?;
    Ok(Json(PageResponse {
        total: page.total,
        limit,
        skip,
        items: page.items,
    }))
}

async fn historic_matches_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<HistoricalMatch>>, ApiError> {
    let auth = authorize(&state, &headers)?;
    let (limit, skip) = query.resolve();
    let page = state.engine.historic_matches(&auth, limit, skip).await?;
    Ok(Json(PageResponse {
        total: page.total,
        limit,
        skip,
        items: page.items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::game::{Action, MatchStatus, Outcome};
    use crate::grid::Cell;
    use crate::store::{
        MemoryMatchStore, MemoryPolicyStore, MemoryUserStore, StaticTokenValidator,
    };

    fn app_state() -> AppState {
        let mut tokens = StaticTokenValidator::new();
        tokens.insert(
            "tok-alice",
            AuthUser {
                user_id: Some("u-alice".to_string()),
                handle: "alice".to_string(),
            },
        );
        let engine = Engine::new(
            Arc::new(MemoryMatchStore::new()),
            Arc::new(MemoryPolicyStore::new()),
            Arc::new(MemoryUserStore::new()),
            EngineConfig {
                ai_seed: Some(11),
                ..EngineConfig::default()
            },
        );
        AppState {
            engine: Arc::new(engine),
            tokens: Arc::new(tokens),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    async fn initiate(state: &AppState, seed: &str) -> InitiateResponse {
        initiate_handler(
            State(state.clone()),
            bearer("tok-alice"),
            Json(InitiateParams {
                seed: Some(seed.to_string()),
                elo: Some(1200),
                ..InitiateParams::default()
            }),
        )
        .await
        .unwrap()
        .1
        .0
    }

    #[tokio::test]
    async fn test_initiate_returns_created_snapshot() {
        let state = app_state();
        let response = initiate(&state, "abc").await;
        assert_eq!(response.snapshot.seed_key, "S:abc|W:16|H:16|V:v1.1");
        assert_eq!(response.match_id, response.snapshot.id);
        assert_eq!(response.snapshot.version, 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let state = app_state();
        let err = initiate_handler(
            State(state),
            HeaderMap::new(),
            Json(InitiateParams::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let state = app_state();
        let err = initiate_handler(
            State(state),
            bearer("tok-mallory"),
            Json(InitiateParams::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_flow_and_conflict_statuses() {
        let state = app_state();
        let created = initiate(&state, "abc").await;

        // A skip consumes the player's turn and wakes the AI.
        let updated = update_handler(
            State(state.clone()),
            bearer("tok-alice"),
            Json(UpdateParams {
                match_id: created.match_id.clone(),
                actor: Side::Player,
                action: Action::SkipTurn,
                snapshot_version: Some(1),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(updated.snapshot.version, 2);
        assert_eq!(updated.snapshot.current_actor, Side::Player);

        // Replaying the stale version conflicts.
        let err = update_handler(
            State(state),
            bearer("tok-alice"),
            Json(UpdateParams {
                match_id: created.match_id,
                actor: Side::Player,
                action: Action::SkipTurn,
                snapshot_version: Some(1),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_action_is_bad_request() {
        let state = app_state();
        let created = initiate(&state, "abc").await;
        let own_pos = created.snapshot.entities.player.pos;
        let far = Cell::new(
            if own_pos.x >= 8 { own_pos.x - 4 } else { own_pos.x + 4 },
            own_pos.y,
        );

        let err = update_handler(
            State(state),
            bearer("tok-alice"),
            Json(UpdateParams {
                match_id: created.match_id,
                actor: Side::Player,
                action: Action::Move {
                    to: Some(far),
                    dx: None,
                    dy: None,
                },
                snapshot_version: Some(1),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_match_is_not_found() {
        let state = app_state();
        let err = update_handler(
            State(state),
            bearer("tok-alice"),
            Json(UpdateParams {
                match_id: "no-such-match".to_string(),
                actor: Side::Player,
                action: Action::SkipTurn,
                snapshot_version: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resign_returns_summary_and_clears_active() {
        let state = app_state();
        let created = initiate(&state, "abc").await;

        let resigned = resign_handler(
            State(state.clone()),
            Path(created.match_id.clone()),
            bearer("tok-alice"),
            None,
        )
        .await
        .unwrap()
        .0;
        assert_eq!(resigned.historical_id, created.match_id);
        assert_eq!(resigned.summary.outcome, Outcome::Resign);
        assert_eq!(resigned.summary.winner.side, Some(Side::Ai));

        let page = active_matches_handler(
            State(state),
            bearer("tok-alice"),
            Query(PageQuery {
                limit: None,
                skip: None,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_recipes_are_public() {
        let state = app_state();
        let listing = list_recipes_handler(
            State(state.clone()),
            Query(RecipeFilter::default()),
        )
        .await
        .0;
        assert!(listing.recipes.len() > 25);

        let one = get_recipe_handler(State(state.clone()), Path("weapon.straight.t5".to_string()))
            .await
            .unwrap()
            .0;
        assert_eq!(one.recipe.key, "weapon.straight.t5");

        let err = get_recipe_handler(State(state), Path("weapon.void.t0".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_profile_listings_paginate() {
        let state = app_state();
        for seed in ["a", "b", "c"] {
            initiate(&state, seed).await;
        }

        let page = active_matches_handler(
            State(state.clone()),
            bearer("tok-alice"),
            Query(PageQuery {
                limit: Some(2),
                skip: None,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.limit, 2);

        let ended = end_game_handler(
            State(state.clone()),
            bearer("tok-alice"),
            Json(EndGameParams {
                match_id: page.items[0].id.clone(),
                reason: None,
                winner: Some(Side::Player),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(ended.summary.outcome, Outcome::Administrative);

        let historic = historic_matches_handler(
            State(state),
            bearer("tok-alice"),
            Query(PageQuery {
                limit: None,
                skip: None,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(historic.total, 1);
        assert_eq!(historic.items[0].winner.side, Some(Side::Player));
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_json() {
        let state = app_state();
        let created = initiate(&state, "abc").await;
        let json = serde_json::to_value(&created.snapshot).unwrap();
        let back: Match = serde_json::from_value(json).unwrap();
        assert_eq!(back, created.snapshot);
        assert_eq!(back.status, MatchStatus::Active);
    }
}
