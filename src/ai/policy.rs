//! Learned action weights, per player.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Adjustment applied to `w[0]` per action type after each match.
pub const LEARNING_RATE: f64 = 0.05;
/// Lower clamp for learned weights.
pub const WEIGHT_MIN: f64 = 0.1;
/// Upper clamp for learned weights.
pub const WEIGHT_MAX: f64 = 5.0;
/// Exploration rate of the embedded default policy.
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Weight vector for one action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionWeights {
    /// Per-feature weights. Positions beyond the feature vector length
    /// are ignored at scoring time.
    pub w: Vec<f64>,
}

/// Per-player adaptive policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPolicy {
    /// `"player"` or `"global"`.
    pub scope: String,
    /// Owning player for player-scoped policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Exploration probability.
    pub epsilon: f64,
    /// Weight vectors keyed by action type.
    pub actions: BTreeMap<String, ActionWeights>,
    /// Matches this policy has been through.
    pub games_played: u32,
    /// Matches the AI won with it.
    pub wins: u32,
}

fn default_actions() -> BTreeMap<String, ActionWeights> {
    let mut actions = BTreeMap::new();
    // approach, getCover, retreat, getPickup, isOnPath
    actions.insert(
        "MOVE".to_string(),
        ActionWeights {
            w: vec![1.0, 0.6, 0.8, 1.2, 1.5],
        },
    );
    // damage, dist/16, canKill, hasLOS
    actions.insert(
        "SHOOT".to_string(),
        ActionWeights {
            w: vec![1.0, -0.4, 40.0, 0.5],
        },
    );
    // underThreat, hasLOS, spare
    actions.insert(
        "CRAFT_WALL".to_string(),
        ActionWeights {
            w: vec![1.0, 0.5, 0.0],
        },
    );
    for kind in ["HEAL", "CRAFT_WEAPON", "INTERACT", "SKIP_TURN"] {
        actions.insert(kind.to_string(), ActionWeights { w: vec![1.0] });
    }
    actions
}

impl AiPolicy {
    /// The global fallback embedded in code.
    #[must_use]
    pub fn global_default() -> Self {
        Self {
            scope: "global".to_string(),
            player_id: None,
            epsilon: DEFAULT_EPSILON,
            actions: default_actions(),
            games_played: 0,
            wins: 0,
        }
    }

    /// A fresh player-scoped copy of the default.
    #[must_use]
    pub fn for_player(player_id: &str) -> Self {
        Self {
            scope: "player".to_string(),
            player_id: Some(player_id.to_string()),
            ..Self::global_default()
        }
    }

    /// Score a candidate: dot product of the action's weights with the
    /// feature vector, truncated to the shorter of the two.
    #[must_use]
    pub fn score(&self, action_kind: &str, features: &[f64]) -> f64 {
        let Some(weights) = self.actions.get(action_kind) else {
            return 0.0;
        };
        weights
            .w
            .iter()
            .zip(features)
            .map(|(w, f)| w * f)
            .sum()
    }

    /// Apply the terminal learning update.
    ///
    /// Bumps `w[0]` for every action type the AI took this match, up on
    /// a win and down on a loss, clamped to `[WEIGHT_MIN, WEIGHT_MAX]`.
    /// A draw (`ai_result == None`) counts the game but moves no weights.
    pub fn record_outcome<'a>(
        &mut self,
        ai_result: Option<bool>,
        kinds: impl IntoIterator<Item = &'a str>,
    ) {
        self.games_played += 1;
        let Some(ai_won) = ai_result else {
            return;
        };
        if ai_won {
            self.wins += 1;
        }
        let delta = if ai_won { LEARNING_RATE } else { -LEARNING_RATE };
        for kind in kinds {
            let weights = self
                .actions
                .entry(kind.to_string())
                .or_insert_with(|| ActionWeights { w: vec![1.0] });
            if let Some(w0) = weights.w.first_mut() {
                *w0 = (*w0 + delta).clamp(WEIGHT_MIN, WEIGHT_MAX);
            }
        }
    }
}
