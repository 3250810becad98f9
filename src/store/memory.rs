//! In-memory store implementations.
//!
//! The default backends for a single-process deployment and for tests.
//! Each store keeps its documents behind one `RwLock`, so the archive
//! step (insert historical + delete active) is atomic here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ai::AiPolicy;
use crate::error::EngineResult;
use crate::game::{HistoricalMatch, Match};
use crate::store::{AuthUser, MatchStore, Page, PolicyStore, TokenValidator, UserProfile, UserStore};

#[derive(Default)]
struct MatchMaps {
    active: HashMap<String, Match>,
    historical: HashMap<String, HistoricalMatch>,
}

/// In-memory [`MatchStore`].
#[derive(Default)]
pub struct MemoryMatchStore {
    inner: Arc<RwLock<MatchMaps>>,
}

impl MemoryMatchStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active matches (test observability).
    pub async fn active_count(&self) -> usize {
        self.inner.read().await.active.len()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn insert(&self, m: Match) -> EngineResult<()> {
        self.inner.write().await.active.insert(m.id.clone(), m);
        Ok(())
    }

    async fn load(&self, id: &str) -> EngineResult<Option<Match>> {
        Ok(self.inner.read().await.active.get(id).cloned())
    }

    async fn update_if_version(
        &self,
        expected_version: u64,
        updated: Match,
    ) -> EngineResult<bool> {
        let mut maps = self.inner.write().await;
        match maps.active.get(&updated.id) {
            Some(stored) if stored.version == expected_version => {
                maps.active.insert(updated.id.clone(), updated);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive(&self, historical: HistoricalMatch, active_id: &str) -> EngineResult<()> {
        let mut maps = self.inner.write().await;
        maps.historical
            .insert(historical.match_key.clone(), historical);
        maps.active.remove(active_id);
        Ok(())
    }

    async fn get_historical(&self, match_key: &str) -> EngineResult<Option<HistoricalMatch>> {
        Ok(self.inner.read().await.historical.get(match_key).cloned())
    }

    async fn list_active(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> EngineResult<Page<Match>> {
        let maps = self.inner.read().await;
        let mut items: Vec<Match> = maps
            .active
            .values()
            .filter(|m| m.has_participant(user_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = items.len() as u64;
        let items = items.into_iter().skip(skip).take(limit).collect();
        Ok(Page { total, items })
    }

    async fn list_historical(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> EngineResult<Page<HistoricalMatch>> {
        let maps = self.inner.read().await;
        let mut items: Vec<HistoricalMatch> = maps
            .historical
            .values()
            .filter(|h| {
                h.players
                    .iter()
                    .any(|p| p.user_id.as_deref() == Some(user_id))
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.ended_at
                .cmp(&a.ended_at)
                .then(a.match_key.cmp(&b.match_key))
        });
        let total = items.len() as u64;
        let items = items.into_iter().skip(skip).take(limit).collect();
        Ok(Page { total, items })
    }
}

/// In-memory [`PolicyStore`].
#[derive(Default)]
pub struct MemoryPolicyStore {
    inner: Arc<RwLock<HashMap<String, AiPolicy>>>,
}

impl MemoryPolicyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn load(&self, player_id: &str) -> EngineResult<Option<AiPolicy>> {
        Ok(self.inner.read().await.get(player_id).cloned())
    }

    async fn save(&self, policy: &AiPolicy) -> EngineResult<()> {
        if let Some(player_id) = &policy.player_id {
            self.inner
                .write()
                .await
                .insert(player_id.clone(), policy.clone());
        }
        Ok(())
    }
}

/// In-memory [`UserStore`].
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile (test and dev setup).
    pub async fn put(&self, profile: UserProfile) {
        self.inner
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, user_id: &str) -> EngineResult<Option<UserProfile>> {
        Ok(self.inner.read().await.get(user_id).cloned())
    }

    async fn adjust_elo(&self, user_id: &str, delta: i32) -> EngineResult<()> {
        if let Some(profile) = self.inner.write().await.get_mut(user_id) {
            profile.elo += delta;
        }
        Ok(())
    }
}

/// Static bearer-token table for dev and tests.
///
/// Production deployments plug in the credentialled front-end's
/// validator instead.
#[derive(Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenValidator {
    /// Create an empty validator (rejects everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token.
    pub fn insert(&mut self, token: &str, user: AuthUser) {
        self.tokens.insert(token.to_string(), user);
    }

    /// Parse `token=user:handle;token2=user2:handle2` pairs, as accepted
    /// by the `SKIRMISH_TOKENS` environment variable.
    #[must_use]
    pub fn from_pairs(pairs: &str) -> Self {
        let mut validator = Self::new();
        for entry in pairs.split(';').filter(|e| !e.trim().is_empty()) {
            if let Some((token, identity)) = entry.split_once('=') {
                let (user_id, handle) = identity.split_once(':').unwrap_or((identity, identity));
                validator.insert(
                    token.trim(),
                    AuthUser {
                        user_id: Some(user_id.trim().to_string()),
                        handle: handle.trim().to_string(),
                    },
                );
            }
        }
        validator
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Option<AuthUser> {
        self.tokens.get(token).cloned()
    }
}
