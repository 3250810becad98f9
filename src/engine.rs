//! Match lifecycle orchestrator.
//!
//! The top-level operations: initiate a match, apply one action (and
//! the AI's reply turn), resign, and administratively end. A request
//! mutates only a working copy of the loaded snapshot; the single CAS
//! persist at the end is the only observable write, so a cancelled or
//! rejected request leaves no partial state.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::ai::{AiPolicy, run_ai_turn};
use crate::error::{EngineError, EngineResult};
use crate::game::{
    Action, HistoricalMatch, Match, MatchStatus, Outcome, Side, resolve,
};
use crate::grid::GridSize;
use crate::recipes::RecipeCatalog;
use crate::rng::Mulberry32;
use crate::store::{AuthUser, MatchStore, Page, PolicyStore, UserStore};
use crate::worldgen::{DEFAULT_DIMENSION, DEFAULT_ELO, generate};

/// Rating delta applied to the human player on a terminal transition.
const ELO_DELTA: i32 = 10;

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Grid used when a request omits dimensions.
    pub default_grid: GridSize,
    /// Fixed seed for the AI exploration coin. `None` draws fresh
    /// entropy per turn; tests pin it for reproducible selection.
    pub ai_seed: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_grid: GridSize::new(DEFAULT_DIMENSION, DEFAULT_DIMENSION),
            ai_seed: None,
        }
    }
}

/// Request body for `initiate_game`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateParams {
    /// World seed; random when omitted.
    pub seed: Option<String>,
    /// Rating override; falls back to the user's stored rating.
    pub elo: Option<i32>,
    /// Grid width.
    pub width: Option<u16>,
    /// Grid height.
    pub height: Option<u16>,
    /// Who moves first (default: the player).
    pub first_actor: Option<Side>,
}

/// Request body for `update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    /// Target match.
    pub match_id: String,
    /// Acting side.
    pub actor: Side,
    /// The action to resolve.
    pub action: Action,
    /// Optimistic-concurrency guard; must equal the stored version
    /// when supplied.
    pub snapshot_version: Option<u64>,
}

/// Request body for `end_game`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameParams {
    /// Target match.
    pub match_id: String,
    /// Recorded terminal reason.
    pub reason: Option<String>,
    /// Declared winner, if any.
    pub winner: Option<Side>,
}

/// The match engine.
pub struct Engine {
    matches: Arc<dyn MatchStore>,
    policies: Arc<dyn PolicyStore>,
    users: Arc<dyn UserStore>,
    catalog: &'static RecipeCatalog,
    config: EngineConfig,
}

impl Engine {
    /// Wire up an engine over its stores.
    pub fn new(
        matches: Arc<dyn MatchStore>,
        policies: Arc<dyn PolicyStore>,
        users: Arc<dyn UserStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            matches,
            policies,
            users,
            catalog: RecipeCatalog::builtin(),
            config,
        }
    }

    /// The recipe catalog served over the API.
    #[must_use]
    pub const fn catalog(&self) -> &'static RecipeCatalog {
        self.catalog
    }

    /// Create and persist a fresh match.
    ///
    /// When the AI moves first its opening turn runs before the insert,
    /// so the returned snapshot is always waiting on the player.
    ///
    /// # Errors
    ///
    /// Validation errors for bad dimensions; storage errors from the insert.
    pub async fn initiate(&self, auth: &AuthUser, params: InitiateParams) -> EngineResult<Match> {
        let grid = GridSize::new(
            params.width.unwrap_or(self.config.default_grid.w),
            params.height.unwrap_or(self.config.default_grid.h),
        );
        let elo = match params.elo {
            Some(elo) => elo,
            None => self.stored_elo(auth).await,
        };
        let seed = params
            .seed
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let world = generate(&seed, grid, elo)?;
        let mut working = Match::from_world(
            Uuid::new_v4().to_string(),
            world,
            seed,
            grid,
            elo,
            params.first_actor.unwrap_or(Side::Player),
            auth.user_id.clone(),
            Some(auth.handle.clone()),
            Utc::now(),
        );

        if working.current_actor == Side::Ai {
            let policy = self.policy_for(&working).await;
            let mut rng = self.ai_rng();
            let outcome = run_ai_turn(&mut working, &policy, self.catalog, &mut rng)?;
            if outcome.ended {
                return self.finish(working, Outcome::Ko).await;
            }
            if outcome.consumed_turn {
                working.turn_index += 1;
                working.current_actor = Side::Player;
            }
        }

        self.matches.insert(working.clone()).await?;
        Ok(working)
    }

    /// Apply one action and, when the turn passes to the AI, its reply.
    ///
    /// # Errors
    ///
    /// Validation for illegal actions, conflict for stale versions /
    /// wrong turns / ended matches, not-found for unknown match ids.
    pub async fn update(&self, auth: &AuthUser, params: UpdateParams) -> EngineResult<Match> {
        let loaded = self.load_active(&params.match_id).await?;
        Self::ensure_participant(auth, &loaded)?;

        if let Some(expected) = params.snapshot_version
            && expected != loaded.version
        {
            return Err(EngineError::conflict(format!(
                "snapshot version mismatch: have {}, expected {expected}",
                loaded.version
            )));
        }
        if loaded.status != MatchStatus::Active {
            return Err(EngineError::conflict("match already ended"));
        }
        if params.action.consumes_turn() && loaded.current_actor != params.actor {
            return Err(EngineError::conflict(format!(
                "not {}'s turn",
                params.actor.name()
            )));
        }

        let mut working = loaded.clone();
        let resolution = resolve(&mut working, params.actor, &params.action, self.catalog)?;
        working.record_action(params.actor, params.action.kind());

        if resolution.ended {
            return self.finish(working, Outcome::Ko).await;
        }
        if resolution.consume_turn {
            working.turn_index += 1;
            working.current_actor = params.actor.opposite();
        }

        if working.current_actor == Side::Ai && working.status == MatchStatus::Active {
            let policy = self.policy_for(&working).await;
            let mut rng = self.ai_rng();
            let outcome = run_ai_turn(&mut working, &policy, self.catalog, &mut rng)?;
            if outcome.ended {
                return self.finish(working, Outcome::Ko).await;
            }
            if outcome.consumed_turn {
                working.turn_index += 1;
                working.current_actor = Side::Player;
            }
        }

        working.version += 1;
        working.updated_at = Utc::now();
        let swapped = self
            .matches
            .update_if_version(loaded.version, working.clone())
            .await?;
        if !swapped {
            return Err(EngineError::conflict("concurrent update; reload snapshot"));
        }
        Ok(working)
    }

    /// Resign a side out of an active match.
    ///
    /// Resigning an already-ended match is a no-op returning the
    /// existing summary.
    ///
    /// # Errors
    ///
    /// Not-found for unknown matches, forbidden for non-participants.
    pub async fn resign(
        &self,
        auth: &AuthUser,
        match_id: &str,
        side: Option<Side>,
    ) -> EngineResult<HistoricalMatch> {
        let side = side.unwrap_or(Side::Player);

        let Some(active) = self.matches.load(match_id).await? else {
            // Already archived: return the existing summary.
            return self
                .matches
                .get_historical(match_id)
                .await?
                .ok_or_else(|| EngineError::not_found(format!("match not found: {match_id}")));
        };
        Self::ensure_participant(auth, &active)?;

        if active.status == MatchStatus::Ended {
            // Orphan from a partial terminal pipeline: finish the
            // archival leg instead of resigning again.
            if let Some(existing) = self.matches.get_historical(match_id).await? {
                return Ok(existing);
            }
            let outcome = match active.reason.as_deref() {
                Some("resign") => Outcome::Resign,
                Some("ko") => Outcome::Ko,
                _ => Outcome::Administrative,
            };
            let historical = HistoricalMatch::from_match(&active, outcome, Utc::now());
            self.matches.archive(historical.clone(), match_id).await?;
            return Ok(historical);
        }

        let mut working = active;
        working.end(Some(side.opposite()), "resign");
        let ended = self.finish(working, Outcome::Resign).await?;
        self.matches
            .get_historical(&ended.id)
            .await?
            .ok_or_else(|| EngineError::storage("archived summary missing after resign"))
    }

    /// Administratively end a match and archive it.
    ///
    /// # Errors
    ///
    /// Not-found for unknown matches, forbidden for non-participants.
    pub async fn end_game(
        &self,
        auth: &AuthUser,
        params: EndGameParams,
    ) -> EngineResult<HistoricalMatch> {
        let Some(active) = self.matches.load(&params.match_id).await? else {
            return self
                .matches
                .get_historical(&params.match_id)
                .await?
                .ok_or_else(|| {
                    EngineError::not_found(format!("match not found: {}", params.match_id))
                });
        };
        Self::ensure_participant(auth, &active)?;

        let outcome = if params.winner.is_some() {
            Outcome::Administrative
        } else {
            Outcome::Draw
        };
        let mut working = active;
        working.end(params.winner, params.reason.as_deref().unwrap_or("ended"));
        let ended = self.finish(working, outcome).await?;
        self.matches
            .get_historical(&ended.id)
            .await?
            .ok_or_else(|| EngineError::storage("archived summary missing after end_game"))
    }

    /// Page through the caller's active matches.
    ///
    /// # Errors
    ///
    /// Storage errors only; guests get an empty page.
    pub async fn active_matches(
        &self,
        auth: &AuthUser,
        limit: usize,
        skip: usize,
    ) -> EngineResult<Page<Match>> {
        match &auth.user_id {
            Some(user_id) => self.matches.list_active(user_id, limit, skip).await,
            None => Ok(Page {
                total: 0,
                items: Vec::new(),
            }),
        }
    }

    /// Page through the caller's archived matches.
    ///
    /// # Errors
    ///
    /// Storage errors only; guests get an empty page.
    pub async fn historic_matches(
        &self,
        auth: &AuthUser,
        limit: usize,
        skip: usize,
    ) -> EngineResult<Page<HistoricalMatch>> {
        match &auth.user_id {
            Some(user_id) => self.matches.list_historical(user_id, limit, skip).await,
            None => Ok(Page {
                total: 0,
                items: Vec::new(),
            }),
        }
    }

    /// Load an active match, mapping an archived one to "already ended".
    async fn load_active(&self, match_id: &str) -> EngineResult<Match> {
        if let Some(m) = self.matches.load(match_id).await? {
            return Ok(m);
        }
        if self.matches.get_historical(match_id).await?.is_some() {
            return Err(EngineError::conflict("match already ended"));
        }
        Err(EngineError::not_found(format!(
            "match not found: {match_id}"
        )))
    }

    fn ensure_participant(auth: &AuthUser, m: &Match) -> EngineResult<()> {
        match &auth.user_id {
            Some(user_id) if m.has_participant(user_id) => Ok(()),
            // Guest tokens may only act on guest matches.
            None if m.entities.player.user_id.is_none() => Ok(()),
            _ => Err(EngineError::forbidden("not a participant of this match")),
        }
    }

    async fn stored_elo(&self, auth: &AuthUser) -> i32 {
        if let Some(user_id) = &auth.user_id {
            match self.users.get(user_id).await {
                Ok(Some(profile)) => return profile.elo,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "user lookup failed; using default rating"),
            }
        }
        DEFAULT_ELO
    }

    async fn policy_for(&self, m: &Match) -> AiPolicy {
        if let Some(user_id) = &m.entities.player.user_id {
            match self.policies.load(user_id).await {
                Ok(Some(policy)) => return policy,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "policy load failed; using global default"),
            }
        }
        AiPolicy::global_default()
    }

    fn ai_rng(&self) -> Mulberry32 {
        let seed = self.config.ai_seed.unwrap_or_else(rand::random::<u32>);
        Mulberry32::new(seed)
    }

    /// Terminal transition: stamp the snapshot, then run the pipeline
    /// (ELO, policy learning, archive + delete).
    async fn finish(&self, mut working: Match, outcome: Outcome) -> EngineResult<Match> {
        working.version += 1;
        working.updated_at = Utc::now();

        let historical = HistoricalMatch::from_match(&working, outcome, working.updated_at);

        // (a) Rating adjustment. Failures are swallowed: game state is
        // authoritative, the profile is eventually consistent.
        if let Some(user_id) = &working.entities.player.user_id {
            let delta = match working.winner {
                Some(Side::Player) => ELO_DELTA,
                Some(Side::Ai) => -ELO_DELTA,
                None => 0,
            };
            if delta != 0
                && let Err(e) = self.users.adjust_elo(user_id, delta).await
            {
                warn!(%user_id, error = %e, "rating adjustment failed");
            }
        }

        // (b) Per-player policy learning; skipped for anonymous players.
        if let Some(user_id) = &working.entities.player.user_id {
            let mut policy = match self.policies.load(user_id).await {
                Ok(Some(policy)) => policy,
                Ok(None) => AiPolicy::for_player(user_id),
                Err(e) => {
                    warn!(%user_id, error = %e, "policy load failed during learning");
                    AiPolicy::for_player(user_id)
                }
            };
            let ai_result = working.winner.map(|side| side == Side::Ai);
            let kinds: BTreeSet<&str> = working
                .action_history
                .iter()
                .filter(|record| record.actor == Side::Ai)
                .map(|record| record.action.as_str())
                .collect();
            policy.record_outcome(ai_result, kinds);
            if let Err(e) = self.policies.save(&policy).await {
                warn!(%user_id, error = %e, "policy save failed");
            }
        }

        // (c)+(d) Archive and delete, with one retry on transient failure.
        match self.matches.archive(historical.clone(), &working.id).await {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                warn!(match_id = %working.id, error = %e, "archive failed; retrying once");
                self.matches.archive(historical, &working.id).await?;
            }
            Err(e) => return Err(e),
        }

        Ok(working)
    }
}
