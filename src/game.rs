//! Game layer.
//!
//! Implements the match rules on top of the grid:
//! - The authoritative per-game `Match` document
//! - Action resolvers (move, shoot, craft, heal, interact, skip)
//! - Line-of-sight and A* pathfinding
//! - Terminal summaries for the match archive

mod actions;
mod history;
mod los;
mod state;

pub use actions::{Action, Resolution, resolve, shot_is_valid};
pub use history::{HistoricalMatch, HistoricalPlayer, Outcome, WinnerRef};
pub use los::{find_path, optimal_path, wall_blocks_line};
pub use state::{
    ActionRecord, Entities, Entity, GenConstraints, Match, MatchStatus, PlayerSlot, ResourceKind,
    Resources, Side, Spawn, StatusEffects, Wall, WorldLoot,
};
