//! The authoritative per-game match document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, GridSize};
use crate::worldgen::WorldInit;

/// Hit point floor and ceiling for every entity.
pub const HP_MIN: i32 = 0;
/// Hit point ceiling.
pub const HP_MAX: i32 = 100;

/// One of the two combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The human player.
    Player,
    /// The AI opponent.
    Ai,
}

impl Side {
    /// The opposing side.
    #[must_use]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Ai => "ai",
        }
    }
}

/// Match lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Accepting actions.
    Active,
    /// Terminal; awaiting (or past) archival.
    Ended,
}

/// A harvestable resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Yields wood.
    Tree,
    /// Yields stone.
    Stone,
    /// Yields food.
    Hay,
}

impl ResourceKind {
    /// Inventory key credited when this resource is collected.
    #[must_use]
    pub const fn inventory_key(self) -> &'static str {
        match self {
            ResourceKind::Tree => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Hay => "food",
        }
    }
}

/// Resource cells by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Cells holding a tree.
    pub trees: Vec<Cell>,
    /// Cells holding a stone deposit.
    pub stones: Vec<Cell>,
    /// Cells holding hay.
    pub hay: Vec<Cell>,
}

impl Resources {
    /// The resource kind present at a cell, if any.
    #[must_use]
    pub fn kind_at(&self, cell: Cell) -> Option<ResourceKind> {
        if self.trees.contains(&cell) {
            Some(ResourceKind::Tree)
        } else if self.stones.contains(&cell) {
            Some(ResourceKind::Stone)
        } else if self.hay.contains(&cell) {
            Some(ResourceKind::Hay)
        } else {
            None
        }
    }

    /// Remove the resource of `kind` at `cell`. Returns whether one was there.
    pub fn remove(&mut self, kind: ResourceKind, cell: Cell) -> bool {
        let cells = match kind {
            ResourceKind::Tree => &mut self.trees,
            ResourceKind::Stone => &mut self.stones,
            ResourceKind::Hay => &mut self.hay,
        };
        if let Some(idx) = cells.iter().position(|&c| c == cell) {
            cells.remove(idx);
            true
        } else {
            false
        }
    }

    /// Whether any kind occupies the cell.
    #[must_use]
    pub fn occupies(&self, cell: Cell) -> bool {
        self.kind_at(cell).is_some()
    }
}

/// A dropped item awaiting pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLoot {
    /// Where it sits.
    pub pos: Cell,
    /// Recipe or item key (`weapon.*` / `heal.*`).
    pub key: String,
}

/// A placed wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    /// Where it stands.
    pub pos: Cell,
    /// Remaining hit points.
    pub hp: i32,
}

/// Documented zero-value status effects.
///
/// The schema carries these for forward compatibility; nothing in the
/// engine ever sets them. Only `move2` is read (MOVE range).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffects {
    /// Doubles MOVE range when set.
    #[serde(default)]
    pub move2: bool,
    /// Reserved.
    #[serde(default)]
    pub extra_action: bool,
    /// Reserved.
    #[serde(default)]
    pub range_bonus: i32,
}

/// A combatant: position, health, holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Current cell.
    pub pos: Cell,
    /// Hit points in `[0, 100]`.
    pub hp: i32,
    /// Item counts keyed by `wood | stone | food | heal.*`.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// Owned weapon recipe keys (set semantics).
    #[serde(default)]
    pub weapons: BTreeSet<String>,
    /// Documented zero-value effects.
    #[serde(default)]
    pub effects: StatusEffects,
    /// Owning account, if not anonymous.
    pub user_id: Option<String>,
    /// Display handle.
    pub handle: Option<String>,
}

impl Entity {
    /// Create a full-health entity at a spawn cell.
    #[must_use]
    pub fn spawn_at(pos: Cell, user_id: Option<String>, handle: Option<String>) -> Self {
        Self {
            pos,
            hp: HP_MAX,
            inventory: BTreeMap::new(),
            weapons: BTreeSet::new(),
            effects: StatusEffects::default(),
            user_id,
            handle,
        }
    }

    /// Item count for a key.
    #[must_use]
    pub fn item_count(&self, key: &str) -> u32 {
        self.inventory.get(key).copied().unwrap_or(0)
    }

    /// Add `n` of an item.
    pub fn add_item(&mut self, key: &str, n: u32) {
        *self.inventory.entry(key.to_string()).or_insert(0) += n;
    }

    /// Remove `n` of an item. Returns false (and changes nothing) when
    /// the count is insufficient.
    pub fn take_item(&mut self, key: &str, n: u32) -> bool {
        match self.inventory.get_mut(key) {
            Some(count) if *count >= n => {
                *count -= n;
                if *count == 0 {
                    self.inventory.remove(key);
                }
                true
            }
            _ => false,
        }
    }

    /// Apply a heal or damage delta, clamped to `[0, 100]`.
    pub fn adjust_hp(&mut self, delta: i32) {
        self.hp = (self.hp + delta).clamp(HP_MIN, HP_MAX);
    }

    /// MOVE range for this entity.
    #[must_use]
    pub const fn move_range(&self) -> u32 {
        if self.effects.move2 { 2 } else { 1 }
    }
}

/// Both combatants plus the walls they have raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    /// The human player's combatant.
    pub player: Entity,
    /// The AI combatant.
    pub ai: Entity,
    /// Standing walls.
    #[serde(default)]
    pub walls: Vec<Wall>,
}

/// Spawn cells chosen by world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawn {
    /// Player spawn cell.
    pub player: Cell,
    /// AI spawn cell.
    pub ai: Cell,
}

/// Honest record of which generation constraints were satisfiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenConstraints {
    /// Whether the |dx| >= 10 and distinct-row spawn rule held.
    pub column_separation_ok: bool,
}

/// Membership entry; every match has exactly two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    /// Slot index (0 = player, 1 = AI).
    pub slot: u8,
    /// `"human"` or `"ai"`.
    pub role: String,
    /// Account id, if not anonymous.
    pub user_id: Option<String>,
    /// Display handle.
    pub handle: Option<String>,
}

/// One audit entry per resolved action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Who acted.
    pub actor: Side,
    /// Action type name (`MOVE`, `SHOOT`, ...).
    pub action: String,
}

/// The authoritative per-game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Opaque unique id.
    pub id: String,
    /// Monotonic version for optimistic concurrency.
    pub version: u64,

    // Immutable world
    /// Generation seed string.
    pub seed: String,
    /// Canonical seed key (durable identity of generation inputs).
    pub seed_key: String,
    /// Placement rule version folded into the seed key.
    pub seeding_version: String,
    /// Grid dimensions.
    pub grid_size: GridSize,
    /// Skill rating the world was generated for.
    pub elo: i32,
    /// Which generation constraints held.
    pub constraints: GenConstraints,
    /// Spawn cells.
    pub spawn: Spawn,

    // Mutable world
    /// Remaining resource cells.
    pub resources: Resources,
    /// Unclaimed loot.
    pub loot: Vec<WorldLoot>,
    /// Combatants and walls.
    pub entities: Entities,

    // Turn bookkeeping
    /// Completed turn count.
    pub turn_index: u32,
    /// Whose turn it is.
    pub current_actor: Side,
    /// Lifecycle state.
    pub status: MatchStatus,
    /// Winning side once terminal.
    pub winner: Option<Side>,
    /// Terminal reason (`ko`, `resign`, ...).
    pub reason: Option<String>,

    // Audit
    /// Every resolved action in order.
    #[serde(default)]
    pub action_history: Vec<ActionRecord>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful update timestamp.
    pub updated_at: DateTime<Utc>,

    /// Membership (exactly two entries).
    pub players: Vec<PlayerSlot>,
}

impl Match {
    /// Assemble a fresh match from a generated world.
    #[must_use]
    pub fn from_world(
        id: String,
        world: WorldInit,
        seed: String,
        grid_size: GridSize,
        elo: i32,
        first_actor: Side,
        user_id: Option<String>,
        handle: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let players = vec![
            PlayerSlot {
                slot: 0,
                role: "human".to_string(),
                user_id: user_id.clone(),
                handle: handle.clone(),
            },
            PlayerSlot {
                slot: 1,
                role: "ai".to_string(),
                user_id: None,
                handle: Some("AI".to_string()),
            },
        ];

        Self {
            id,
            version: 1,
            seed,
            seed_key: world.seed_key,
            seeding_version: crate::rng::SEEDING_VERSION.to_string(),
            grid_size,
            elo,
            constraints: world.constraints,
            spawn: world.spawn,
            resources: world.resources,
            loot: world.loot,
            entities: Entities {
                player: Entity::spawn_at(world.spawn.player, user_id, handle),
                ai: Entity::spawn_at(world.spawn.ai, None, Some("AI".to_string())),
                walls: Vec::new(),
            },
            turn_index: 0,
            current_actor: first_actor,
            status: MatchStatus::Active,
            winner: None,
            reason: None,
            action_history: Vec::new(),
            created_at: now,
            updated_at: now,
            players,
        }
    }

    /// The combatant on a side.
    #[must_use]
    pub const fn entity(&self, side: Side) -> &Entity {
        match side {
            Side::Player => &self.entities.player,
            Side::Ai => &self.entities.ai,
        }
    }

    /// Mutable combatant on a side.
    pub const fn entity_mut(&mut self, side: Side) -> &mut Entity {
        match side {
            Side::Player => &mut self.entities.player,
            Side::Ai => &mut self.entities.ai,
        }
    }

    /// The wall standing at a cell, if any.
    #[must_use]
    pub fn wall_at(&self, cell: Cell) -> Option<&Wall> {
        self.entities.walls.iter().find(|wall| wall.pos == cell)
    }

    /// The loot index at a cell, if any.
    #[must_use]
    pub fn loot_at(&self, cell: Cell) -> Option<usize> {
        self.loot.iter().position(|drop| drop.pos == cell)
    }

    /// Occupancy query over entities and walls.
    ///
    /// Resources and loot never block: stepping onto them triggers
    /// pickup instead.
    #[must_use]
    pub fn cell_occupied(&self, cell: Cell, ignore_player: bool, ignore_ai: bool) -> bool {
        if !ignore_player && self.entities.player.pos == cell {
            return true;
        }
        if !ignore_ai && self.entities.ai.pos == cell {
            return true;
        }
        self.wall_at(cell).is_some()
    }

    /// Whether the authenticated user participates in this match.
    #[must_use]
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.players
            .iter()
            .any(|slot| slot.user_id.as_deref() == Some(user_id))
    }

    /// Mark the match terminal with a winner and reason.
    pub fn end(&mut self, winner: Option<Side>, reason: &str) {
        self.status = MatchStatus::Ended;
        self.winner = winner;
        self.reason = Some(reason.to_string());
    }

    /// Append an audit entry.
    pub fn record_action(&mut self, actor: Side, action: &str) {
        self.action_history.push(ActionRecord {
            actor,
            action: action.to_string(),
        });
    }
}
