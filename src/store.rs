//! Storage collaborators.
//!
//! The engine talks to its stores through async traits so deployments
//! can swap backends. Every single-document write is atomic; the match
//! store additionally offers a compare-and-swap keyed on the snapshot
//! version, which is the only per-match serialization the engine needs.

mod memory;
mod policy_file;

pub use memory::{MemoryMatchStore, MemoryPolicyStore, MemoryUserStore, StaticTokenValidator};
pub use policy_file::FilePolicyStore;

use async_trait::async_trait;

use crate::ai::AiPolicy;
use crate::error::EngineResult;
use crate::game::{HistoricalMatch, Match};

/// Identity carried by a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Account id; `None` for guest tokens.
    pub user_id: Option<String>,
    /// Display handle.
    pub handle: String,
}

/// Stored user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Account id.
    pub user_id: String,
    /// Display handle.
    pub handle: String,
    /// Skill rating.
    pub elo: i32,
}

/// A page of listed documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Total matching documents, ignoring pagination.
    pub total: u64,
    /// The requested slice.
    pub items: Vec<T>,
}

/// Active matches plus the terminal archive.
///
/// `update_if_version` is the engine's optimistic CAS: it persists only
/// when the stored version still equals the version the caller loaded.
/// `archive` SHOULD insert the historical record and delete the active
/// one atomically when the backend supports transactions; a two-step
/// insert-then-delete fallback is acceptable (a leftover active record
/// is recognizably ended).
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert a fresh match.
    async fn insert(&self, m: Match) -> EngineResult<()>;

    /// Load a whole snapshot by id.
    async fn load(&self, id: &str) -> EngineResult<Option<Match>>;

    /// Persist `updated` only if the stored version equals
    /// `expected_version`. Returns whether the swap happened.
    async fn update_if_version(&self, expected_version: u64, updated: Match)
    -> EngineResult<bool>;

    /// Archive a terminal summary and delete the active record.
    async fn archive(&self, historical: HistoricalMatch, active_id: &str) -> EngineResult<()>;

    /// Fetch an archived summary by match key.
    async fn get_historical(&self, match_key: &str) -> EngineResult<Option<HistoricalMatch>>;

    /// Page through a user's active matches, newest first.
    async fn list_active(&self, user_id: &str, limit: usize, skip: usize)
    -> EngineResult<Page<Match>>;

    /// Page through a user's archived matches, newest first.
    async fn list_historical(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> EngineResult<Page<HistoricalMatch>>;
}

/// Per-player AI policy checkpoints.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load the policy for a player, if one has been saved.
    async fn load(&self, player_id: &str) -> EngineResult<Option<AiPolicy>>;

    /// Persist a policy (keyed by its `player_id`).
    async fn save(&self, policy: &AiPolicy) -> EngineResult<()>;
}

/// User profiles; the engine only reads ratings and `$inc`s them.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a profile.
    async fn get(&self, user_id: &str) -> EngineResult<Option<UserProfile>>;

    /// Atomically add `delta` to a user's rating.
    async fn adjust_elo(&self, user_id: &str, delta: i32) -> EngineResult<()>;
}

/// Bearer-token validation, provided by the credentialled front-end.
pub trait TokenValidator: Send + Sync {
    /// Resolve a bearer token to an identity, or `None` when invalid.
    fn validate(&self, token: &str) -> Option<AuthUser>;
}
