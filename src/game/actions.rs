//! Action resolution.
//!
//! One resolver per action kind. Each validates against the working
//! snapshot, then mutates it, and reports whether the action consumed
//! the actor's turn. Validation happens before any mutation, so a
//! rejected action leaves the snapshot untouched and the orchestrator
//! can simply discard the working copy on error.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::los::wall_blocks_line;
use crate::game::state::{HP_MIN, Match, ResourceKind, Side, Wall};
use crate::grid::{Cell, diagonal_line, manhattan, straight_line};
use crate::recipes::{Recipe, RecipeCatalog, RecipeKind, WeaponClass, heal_item_amount};

/// A player or AI action with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    /// Step to an adjacent cell (or two with `effects.move2`).
    #[serde(rename = "MOVE")]
    Move {
        /// Absolute target cell.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Cell>,
        /// Relative X step, used when `to` is absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dx: Option<i32>,
        /// Relative Y step, used when `to` is absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dy: Option<i32>,
    },
    /// Fire an owned weapon at a cell.
    #[serde(rename = "SHOOT", rename_all = "camelCase")]
    Shoot {
        /// Owned weapon recipe key.
        weapon_key: String,
        /// Target cell.
        target: Cell,
    },
    /// Craft a weapon (free action).
    #[serde(rename = "CRAFT_WEAPON")]
    CraftWeapon {
        /// Weapon recipe key.
        key: String,
    },
    /// Build a wall segment.
    #[serde(rename = "CRAFT_WALL")]
    CraftWall {
        /// Wall recipe key.
        key: String,
        /// Placement cell.
        pos: Cell,
    },
    /// Consume a heal item or craft-and-drink a healing recipe (free action).
    #[serde(rename = "HEAL")]
    Heal {
        /// `heal.*` item key or healing recipe key.
        key: String,
    },
    /// Harvest an adjacent resource.
    #[serde(rename = "INTERACT")]
    Interact {
        /// Resource kind expected at the cell.
        #[serde(rename = "type")]
        kind: ResourceKind,
        /// Resource cell (within Manhattan 1).
        pos: Cell,
    },
    /// Pass the turn.
    #[serde(rename = "SKIP_TURN")]
    SkipTurn,
}

impl Action {
    /// Stable action type name, used in audit history and policy keys.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Action::Move { .. } => "MOVE",
            Action::Shoot { .. } => "SHOOT",
            Action::CraftWeapon { .. } => "CRAFT_WEAPON",
            Action::CraftWall { .. } => "CRAFT_WALL",
            Action::Heal { .. } => "HEAL",
            Action::Interact { .. } => "INTERACT",
            Action::SkipTurn => "SKIP_TURN",
        }
    }

    /// Whether this action kind consumes the actor's turn.
    #[must_use]
    pub const fn consumes_turn(&self) -> bool {
        !matches!(self, Action::CraftWeapon { .. } | Action::Heal { .. })
    }
}

/// Outcome of one resolved action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Whether the turn was consumed.
    pub consume_turn: bool,
    /// Whether the action ended the match.
    pub ended: bool,
    /// Whether a shot connected.
    pub hit: bool,
    /// Damage dealt by a shot.
    pub damage: i32,
    /// HP restored by a heal.
    pub healed: i32,
    /// Resource kinds auto-picked while moving.
    pub picked_resources: Vec<ResourceKind>,
    /// Loot keys auto-picked while moving.
    pub picked_loot: Vec<String>,
}

/// Resolve one action against the working snapshot.
///
/// # Errors
///
/// Validation errors for malformed or illegal actions; the snapshot is
/// untouched in that case.
pub fn resolve(
    working: &mut Match,
    actor: Side,
    action: &Action,
    catalog: &RecipeCatalog,
) -> EngineResult<Resolution> {
    match action {
        Action::Move { to, dx, dy } => resolve_move(working, actor, *to, *dx, *dy),
        Action::Shoot { weapon_key, target } => {
            resolve_shoot(working, actor, weapon_key, *target, catalog)
        }
        Action::CraftWeapon { key } => resolve_craft_weapon(working, actor, key, catalog),
        Action::CraftWall { key, pos } => resolve_craft_wall(working, actor, key, *pos, catalog),
        Action::Heal { key } => resolve_heal(working, actor, key, catalog),
        Action::Interact { kind, pos } => resolve_interact(working, actor, *kind, *pos),
        Action::SkipTurn => Ok(Resolution {
            consume_turn: true,
            ..Resolution::default()
        }),
    }
}

fn resolve_move(
    working: &mut Match,
    actor: Side,
    to: Option<Cell>,
    dx: Option<i32>,
    dy: Option<i32>,
) -> EngineResult<Resolution> {
    let pos = working.entity(actor).pos;
    let target = match (to, dx, dy) {
        (Some(cell), _, _) => cell,
        (None, None, None) => {
            return Err(EngineError::validation("missing move target"));
        }
        (None, dx, dy) => pos
            .offset(dx.unwrap_or(0), dy.unwrap_or(0), working.grid_size)
            .ok_or_else(|| EngineError::validation("move target out of bounds"))?,
    };

    if !working.grid_size.contains(target) {
        return Err(EngineError::validation("move target out of bounds"));
    }
    let range = working.entity(actor).move_range();
    let dist = manhattan(pos, target);
    if dist > range {
        return Err(EngineError::validation(format!(
            "move too far: distance {dist} exceeds range {range}"
        )));
    }
    if working.cell_occupied(target, false, false) {
        return Err(EngineError::validation("target cell occupied"));
    }

    working.entity_mut(actor).pos = target;

    let mut resolution = Resolution {
        consume_turn: true,
        ..Resolution::default()
    };

    // Auto-pickup anything sitting on the destination.
    if let Some(kind) = working.resources.kind_at(target) {
        working.resources.remove(kind, target);
        working
            .entity_mut(actor)
            .add_item(kind.inventory_key(), 1);
        resolution.picked_resources.push(kind);
    }
    if let Some(idx) = working.loot_at(target) {
        let drop = working.loot.remove(idx);
        let entity = working.entity_mut(actor);
        if drop.key.starts_with("weapon.") {
            entity.weapons.insert(drop.key.clone());
        } else {
            entity.add_item(&drop.key, 1);
        }
        resolution.picked_loot.push(drop.key);
    }

    Ok(resolution)
}

fn resolve_shoot(
    working: &mut Match,
    actor: Side,
    weapon_key: &str,
    target: Cell,
    catalog: &RecipeCatalog,
) -> EngineResult<Resolution> {
    let shooter_pos = working.entity(actor).pos;
    if !working.entity(actor).weapons.contains(weapon_key) {
        return Err(EngineError::validation(format!(
            "weapon not equipped: {weapon_key}"
        )));
    }
    let recipe = catalog
        .get(weapon_key)
        .and_then(Recipe::weapon)
        .copied()
        .ok_or_else(|| EngineError::validation(format!("not a weapon recipe: {weapon_key}")))?;

    if !working.grid_size.contains(target) {
        return Err(EngineError::validation("shoot target out of bounds"));
    }

    let dist = manhattan(shooter_pos, target);
    if !shot_range_ok(&recipe, dist) {
        return Err(EngineError::validation(format!(
            "target out of range: distance {dist}"
        )));
    }
    if !shot_trajectory_ok(&recipe, &working.entities.walls, shooter_pos, target) {
        return Err(EngineError::validation("no valid trajectory to target"));
    }

    let mut resolution = Resolution {
        consume_turn: true,
        ..Resolution::default()
    };

    let opponent = actor.opposite();
    if working.entity(opponent).pos == target {
        working.entity_mut(opponent).adjust_hp(-recipe.damage);
        resolution.hit = true;
        resolution.damage = recipe.damage;
        if working.entity(opponent).hp <= HP_MIN {
            working.end(Some(actor), "ko");
            resolution.ended = true;
        }
    }

    Ok(resolution)
}

fn shot_range_ok(weapon: &crate::recipes::WeaponOutput, dist: u32) -> bool {
    match weapon.weapon_class {
        WeaponClass::Melee => dist == 1,
        WeaponClass::Arc => (2..=weapon.range).contains(&dist),
        _ => (1..=weapon.range).contains(&dist),
    }
}

fn shot_trajectory_ok(
    weapon: &crate::recipes::WeaponOutput,
    walls: &[Wall],
    from: Cell,
    target: Cell,
) -> bool {
    match weapon.weapon_class {
        WeaponClass::Straight => {
            straight_line(from, target)
                && (weapon.shoots_over_walls || !wall_blocks_line(walls, from, target))
        }
        WeaponClass::Diag => diagonal_line(from, target),
        WeaponClass::Arc | WeaponClass::Lob | WeaponClass::Melee => true,
    }
}

/// Whether a shot with the given weapon stats would pass validation.
///
/// Used by AI candidate enumeration so candidates never fail at
/// resolution time.
#[must_use]
pub fn shot_is_valid(
    working: &Match,
    actor: Side,
    weapon: &crate::recipes::WeaponOutput,
    target: Cell,
) -> bool {
    let from = working.entity(actor).pos;
    let dist = manhattan(from, target);
    working.grid_size.contains(target)
        && shot_range_ok(weapon, dist)
        && shot_trajectory_ok(weapon, &working.entities.walls, from, target)
}

/// Check affordability, then deduct. All-or-nothing.
fn pay_costs(working: &mut Match, actor: Side, recipe: &Recipe) -> EngineResult<()> {
    let entity = working.entity(actor);
    let costs = recipe.costs;
    if entity.item_count("wood") < costs.wood
        || entity.item_count("stone") < costs.stone
        || entity.item_count("food") < costs.food
    {
        return Err(EngineError::validation(format!(
            "insufficient resources for {}",
            recipe.key
        )));
    }
    let entity = working.entity_mut(actor);
    entity.take_item("wood", costs.wood);
    entity.take_item("stone", costs.stone);
    entity.take_item("food", costs.food);
    Ok(())
}

fn lookup_recipe<'a>(
    catalog: &'a RecipeCatalog,
    key: &str,
    kind: RecipeKind,
) -> EngineResult<&'a Recipe> {
    let recipe = catalog
        .get(key)
        .ok_or_else(|| EngineError::not_found(format!("recipe not found: {key}")))?;
    if recipe.kind != kind {
        return Err(EngineError::validation(format!(
            "recipe {key} is not a {kind:?} recipe"
        )));
    }
    Ok(recipe)
}

fn resolve_craft_weapon(
    working: &mut Match,
    actor: Side,
    key: &str,
    catalog: &RecipeCatalog,
) -> EngineResult<Resolution> {
    let recipe = lookup_recipe(catalog, key, RecipeKind::Weapon)?.clone();

    let owned = &working.entity(actor).weapons;
    if let Some(missing) = recipe.prerequisites.iter().find(|p| !owned.contains(*p)) {
        return Err(EngineError::validation(format!(
            "missing prerequisite {missing} for {key}"
        )));
    }

    pay_costs(working, actor, &recipe)?;
    // Set semantics: crafting an owned weapon is a successful no-op.
    working.entity_mut(actor).weapons.insert(recipe.key);

    Ok(Resolution::default())
}

fn resolve_craft_wall(
    working: &mut Match,
    actor: Side,
    key: &str,
    pos: Cell,
    catalog: &RecipeCatalog,
) -> EngineResult<Resolution> {
    let recipe = lookup_recipe(catalog, key, RecipeKind::Wall)?.clone();
    let wall = recipe
        .wall()
        .copied()
        .ok_or_else(|| EngineError::validation(format!("recipe {key} has no wall output")))?;

    if !working.grid_size.contains(pos) {
        return Err(EngineError::validation("wall position out of bounds"));
    }
    let dist = manhattan(working.entity(actor).pos, pos);
    if dist > wall.max_place_distance {
        return Err(EngineError::validation(format!(
            "wall too far: distance {dist} exceeds {}",
            wall.max_place_distance
        )));
    }
    if working.cell_occupied(pos, false, false) {
        return Err(EngineError::validation("wall position occupied"));
    }

    pay_costs(working, actor, &recipe)?;
    working.entities.walls.push(Wall { pos, hp: wall.hp });

    Ok(Resolution {
        consume_turn: true,
        ..Resolution::default()
    })
}

fn resolve_heal(
    working: &mut Match,
    actor: Side,
    key: &str,
    catalog: &RecipeCatalog,
) -> EngineResult<Resolution> {
    let before = working.entity(actor).hp;

    // Mode 1: a held heal.* item.
    if let Some(amount) = heal_item_amount(key)
        && working.entity(actor).item_count(key) > 0
    {
        let entity = working.entity_mut(actor);
        entity.take_item(key, 1);
        entity.adjust_hp(amount);
        return Ok(Resolution {
            healed: working.entity(actor).hp - before,
            ..Resolution::default()
        });
    }

    // Mode 2: craft-and-drink a healing recipe.
    let recipe = lookup_recipe(catalog, key, RecipeKind::Healing)?.clone();
    let amount = recipe
        .heal()
        .ok_or_else(|| EngineError::validation(format!("recipe {key} has no heal output")))?;
    pay_costs(working, actor, &recipe)?;
    working.entity_mut(actor).adjust_hp(amount);

    Ok(Resolution {
        healed: working.entity(actor).hp - before,
        ..Resolution::default()
    })
}

fn resolve_interact(
    working: &mut Match,
    actor: Side,
    kind: ResourceKind,
    pos: Cell,
) -> EngineResult<Resolution> {
    let dist = manhattan(working.entity(actor).pos, pos);
    if dist > 1 {
        return Err(EngineError::validation(format!(
            "interact target too far: distance {dist}"
        )));
    }
    if working.resources.kind_at(pos) != Some(kind) {
        return Err(EngineError::validation(format!(
            "no {kind:?} resource at target"
        )));
    }

    working.resources.remove(kind, pos);
    working.entity_mut(actor).add_item(kind.inventory_key(), 1);

    Ok(Resolution {
        consume_turn: true,
        ..Resolution::default()
    })
}
