//! Terminal match summaries for the archive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::state::{Match, Side};
use crate::grid::GridSize;

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A combatant was knocked out.
    #[serde(rename = "KO")]
    Ko,
    /// No winner.
    Draw,
    /// A side resigned.
    Resign,
    /// Ended administratively.
    Administrative,
}

/// Winner reference in a terminal summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRef {
    /// Winning side, if any.
    pub side: Option<Side>,
    /// Winning account, if not anonymous.
    pub user_id: Option<String>,
    /// Winner display handle.
    pub handle: Option<String>,
}

/// Per-participant slice of a terminal summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPlayer {
    /// Slot index.
    pub slot: u8,
    /// `"human"` or `"ai"`.
    pub role: String,
    /// Account id, if any.
    pub user_id: Option<String>,
    /// Display handle.
    pub handle: Option<String>,
    /// Count of actions taken, keyed by action type.
    pub actions_histogram: BTreeMap<String, u32>,
}

/// Immutable snapshot of a finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalMatch {
    /// The archived match's id.
    pub match_key: String,
    /// Generation seed.
    pub seed: String,
    /// Canonical seed key.
    pub seed_key: String,
    /// Grid dimensions.
    pub grid_size: GridSize,
    /// Rating the world was generated for.
    pub elo: i32,
    /// Participants with their action histograms.
    pub players: Vec<HistoricalPlayer>,
    /// Winner reference.
    pub winner: WinnerRef,
    /// Terminal classification.
    pub outcome: Outcome,
    /// When the match began.
    pub started_at: DateTime<Utc>,
    /// When the match ended.
    pub ended_at: DateTime<Utc>,
    /// Completed turns.
    pub duration_turns: u32,
}

impl HistoricalMatch {
    /// Build the terminal summary from an ended (or ending) match.
    #[must_use]
    pub fn from_match(m: &Match, outcome: Outcome, ended_at: DateTime<Utc>) -> Self {
        let mut histograms: [BTreeMap<String, u32>; 2] = [BTreeMap::new(), BTreeMap::new()];
        for record in &m.action_history {
            let idx = match record.actor {
                Side::Player => 0,
                Side::Ai => 1,
            };
            *histograms[idx].entry(record.action.clone()).or_insert(0) += 1;
        }
        let [player_hist, ai_hist] = histograms;

        let players = m
            .players
            .iter()
            .map(|slot| HistoricalPlayer {
                slot: slot.slot,
                role: slot.role.clone(),
                user_id: slot.user_id.clone(),
                handle: slot.handle.clone(),
                actions_histogram: if slot.slot == 0 {
                    player_hist.clone()
                } else {
                    ai_hist.clone()
                },
            })
            .collect();

        let winner = match m.winner {
            Some(side) => {
                let entity = m.entity(side);
                WinnerRef {
                    side: Some(side),
                    user_id: entity.user_id.clone(),
                    handle: entity.handle.clone(),
                }
            }
            None => WinnerRef {
                side: None,
                user_id: None,
                handle: None,
            },
        };

        Self {
            match_key: m.id.clone(),
            seed: m.seed.clone(),
            seed_key: m.seed_key.clone(),
            grid_size: m.grid_size,
            elo: m.elo,
            players,
            winner,
            outcome,
            started_at: m.created_at,
            ended_at,
            duration_turns: m.turn_index,
        }
    }

    /// Total actions recorded across all participants.
    #[must_use]
    pub fn total_actions(&self) -> u32 {
        self.players
            .iter()
            .flat_map(|p| p.actions_histogram.values())
            .sum()
    }
}
