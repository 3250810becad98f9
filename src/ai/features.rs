//! Candidate enumeration and feature extraction.
//!
//! Every candidate is pre-validated so resolution cannot fail, and the
//! feature encoding is a deterministic function of the snapshot.

use crate::game::{Action, Match, Side, optimal_path, shot_is_valid, wall_blocks_line};
use crate::grid::{Cell, manhattan, straight_line};
use crate::recipes::{HEAL_ITEM_KEYS, Recipe, RecipeCatalog};

/// Opponent distance at which the AI considers raising a wall.
const THREAT_DISTANCE: u32 = 6;
/// The AI heals below this HP.
const HEAL_THRESHOLD: i32 = 70;
/// The AI gathers until it holds this much wood plus stone.
const GATHER_TARGET: u32 = 3;
/// Wall recipe the AI builds under threat.
const AI_WALL_KEY: &str = "wall.wood";
/// Starter weapon the AI crafts when unarmed.
const AI_STARTER_WEAPON: &str = "weapon.straight.t1";

/// One scored option for the AI turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The action to resolve if picked.
    pub action: Action,
    /// Stable action type name (policy key).
    pub kind: &'static str,
    /// Feature vector; empty vectors score zero.
    pub features: Vec<f64>,
}

impl Candidate {
    fn plain(action: Action) -> Self {
        let kind = action.kind();
        Self {
            action,
            kind,
            features: Vec::new(),
        }
    }
}

/// Whether the opponent has a clear straight line to the AI.
fn has_straight_los(m: &Match, a: Cell, b: Cell) -> bool {
    straight_line(a, b) && !wall_blocks_line(&m.entities.walls, a, b)
}

/// The 1-step cell from `from` toward `to`, stepping along the axis
/// with the larger gap.
fn step_toward(from: Cell, to: Cell, m: &Match) -> Option<Cell> {
    let dx = i32::from(to.x) - i32::from(from.x);
    let dy = i32::from(to.y) - i32::from(from.y);
    if dx == 0 && dy == 0 {
        return None;
    }
    let step = if dx.abs() >= dy.abs() {
        (dx.signum(), 0)
    } else {
        (0, dy.signum())
    };
    from.offset(step.0, step.1, m.grid_size)
}

/// Enumerate and featurize the AI's options for the current snapshot.
///
/// Order is fixed (SHOOT, MOVE, HEAL, CRAFT_WALL, CRAFT_WEAPON,
/// INTERACT) so that argmax tie-breaks deterministically.
#[must_use]
pub fn enumerate_candidates(m: &Match, catalog: &RecipeCatalog) -> Vec<Candidate> {
    let ai = m.entity(Side::Ai);
    let opponent = m.entity(Side::Player);
    let ai_pos = ai.pos;
    let opp_pos = opponent.pos;
    let current_dist = manhattan(ai_pos, opp_pos);

    let path = optimal_path(m.grid_size, &m.entities.walls, ai_pos, opp_pos);
    let recommended_step = path.as_ref().and_then(|p| p.get(1).copied());

    let mut candidates = Vec::new();

    // SHOOT: one candidate per owned weapon with a valid trajectory.
    for weapon_key in &ai.weapons {
        let Some(weapon) = catalog.get(weapon_key).and_then(Recipe::weapon) else {
            continue;
        };
        if !shot_is_valid(m, Side::Ai, weapon, opp_pos) {
            continue;
        }
        let can_kill = weapon.damage >= opponent.hp;
        candidates.push(Candidate {
            action: Action::Shoot {
                weapon_key: weapon_key.clone(),
                target: opp_pos,
            },
            kind: "SHOOT",
            features: vec![
                f64::from(weapon.damage),
                f64::from(current_dist) / 16.0,
                if can_kill { 1.0 } else { 0.0 },
                if has_straight_los(m, ai_pos, opp_pos) { 1.0 } else { 0.0 },
            ],
        });
    }

    // MOVE: the four in-bounds, unoccupied neighbors.
    let retreat_threshold = if m.elo > 1500 { 70 } else { 60 };
    for to in m.grid_size.neighbors4(ai_pos) {
        if m.cell_occupied(to, false, false) {
            continue;
        }
        let new_dist = manhattan(to, opp_pos);
        let approach = f64::from(current_dist) - f64::from(new_dist);
        let get_cover = m
            .entities
            .walls
            .iter()
            .any(|wall| manhattan(wall.pos, to) == 1);
        let retreat = ai.hp <= retreat_threshold && new_dist > current_dist;
        let get_pickup = m.loot_at(to).is_some() || m.resources.occupies(to);
        let on_path = recommended_step == Some(to);
        candidates.push(Candidate {
            action: Action::Move {
                to: Some(to),
                dx: None,
                dy: None,
            },
            kind: "MOVE",
            features: vec![
                approach,
                if get_cover { 1.0 } else { 0.0 },
                if retreat { 1.0 } else { 0.0 },
                if get_pickup { 1.0 } else { 0.0 },
                if on_path { 1.0 } else { 0.0 },
            ],
        });
    }

    // HEAL: the strongest held heal item, only when hurt.
    if ai.hp <= HEAL_THRESHOLD
        && let Some(key) = HEAL_ITEM_KEYS
            .iter()
            .rev()
            .find(|key| ai.item_count(key) > 0)
    {
        candidates.push(Candidate::plain(Action::Heal {
            key: (*key).to_string(),
        }));
    }

    // CRAFT_WALL: raise cover when the opponent has a clear shot.
    let under_threat =
        has_straight_los(m, opp_pos, ai_pos) && current_dist <= THREAT_DISTANCE;
    if under_threat
        && let Some(wall_recipe) = catalog.get(AI_WALL_KEY)
        && can_afford(ai, wall_recipe)
        && let Some(pos) = step_toward(ai_pos, opp_pos, m)
        && !m.cell_occupied(pos, false, false)
    {
        candidates.push(Candidate {
            action: Action::CraftWall {
                key: AI_WALL_KEY.to_string(),
                pos,
            },
            kind: "CRAFT_WALL",
            features: vec![
                1.0,
                if has_straight_los(m, ai_pos, opp_pos) { 1.0 } else { 0.0 },
                0.0,
            ],
        });
    }

    // CRAFT_WEAPON: pick up a starter ranged weapon when unarmed.
    let has_ranged = ai.weapons.iter().any(|key| {
        catalog
            .get(key)
            .and_then(Recipe::weapon)
            .is_some_and(|w| w.weapon_class.is_ranged())
    });
    if !has_ranged
        && let Some(recipe) = catalog.get(AI_STARTER_WEAPON)
        && can_afford(ai, recipe)
    {
        candidates.push(Candidate::plain(Action::CraftWeapon {
            key: AI_STARTER_WEAPON.to_string(),
        }));
    }

    // INTERACT: gather from adjacent tiles while low on materials.
    if ai.item_count("wood") + ai.item_count("stone") < GATHER_TARGET {
        for pos in m.grid_size.neighbors4(ai_pos) {
            if let Some(kind) = m.resources.kind_at(pos) {
                candidates.push(Candidate::plain(Action::Interact { kind, pos }));
            }
        }
    }

    candidates
}

fn can_afford(entity: &crate::game::Entity, recipe: &Recipe) -> bool {
    entity.item_count("wood") >= recipe.costs.wood
        && entity.item_count("stone") >= recipe.costs.stone
        && entity.item_count("food") >= recipe.costs.food
}
