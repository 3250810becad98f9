//! Deterministic world generation.
//!
//! From `(seed, grid, elo)` the generator lays out spawns, resources,
//! and loot. All randomness flows through three namespaced sub-streams
//! of the seed key (`"spawn"`, `"resources"`, `"loot"`), so identical
//! inputs reproduce identical worlds bit for bit. Iteration is
//! row-major everywhere to keep that contract airtight.

// Placement math uses intentional casts between cell counts and weights
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::error::{EngineError, EngineResult};
use crate::game::{GenConstraints, Resources, Spawn, WorldLoot};
use crate::grid::{Cell, GridSize, manhattan};
use crate::recipes::{WeaponClass, weapon_key};
use crate::rng::{Mulberry32, choice, seed_key, shuffle_in_place, substream, weighted_choice};

/// Loot slots placed per world.
pub const TOTAL_LOOT: usize = 4;
/// Hard cap on weapons among placed loot.
pub const MAX_WEAPONS: usize = 2;

/// Default skill rating when none is supplied.
pub const DEFAULT_ELO: i32 = 1200;
/// Default grid edge when none is supplied.
pub const DEFAULT_DIMENSION: u16 = 16;

/// Minimum column gap between the two spawns.
const SPAWN_COLUMN_GAP: u16 = 10;

/// Resource densities as fractions of the cell count.
const TREE_FRACTION: f64 = 0.18;
const STONE_FRACTION: f64 = 0.14;
const HAY_FRACTION: f64 = 0.08;

/// A freshly generated world, ready to seed a match.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldInit {
    /// Canonical seed key the placements were derived from.
    pub seed_key: String,
    /// Spawn cells.
    pub spawn: Spawn,
    /// Which constraints were satisfiable.
    pub constraints: GenConstraints,
    /// Resource placements.
    pub resources: Resources,
    /// Loot placements.
    pub loot: Vec<WorldLoot>,
}

/// Rarity bucket derived from the skill rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EloBucket {
    Low,
    Default,
    High,
}

impl EloBucket {
    fn from_elo(elo: i32) -> Self {
        if elo <= 800 {
            EloBucket::Low
        } else if elo >= 1800 {
            EloBucket::High
        } else {
            EloBucket::Default
        }
    }
}

/// Where loot placement gravitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LootTarget {
    PlayerBiased,
    AiBiased,
    Neutral,
}

/// Generate a world for the given inputs.
///
/// # Errors
///
/// Returns a validation error when either grid dimension is below 5.
pub fn generate(seed: &str, grid: GridSize, elo: i32) -> EngineResult<WorldInit> {
    if grid.w < GridSize::MIN_DIMENSION || grid.h < GridSize::MIN_DIMENSION {
        return Err(EngineError::validation(format!(
            "grid must be at least {min}x{min}, got {w}x{h}",
            min = GridSize::MIN_DIMENSION,
            w = grid.w,
            h = grid.h
        )));
    }

    let key = seed_key(seed, grid.w, grid.h);

    let mut spawn_rng = substream(&key, "spawn");
    let (spawn, constraints) = select_spawns(&mut spawn_rng, grid, elo);

    let mut resource_rng = substream(&key, "resources");
    let resources = place_resources(&mut resource_rng, grid, spawn);

    let mut loot_rng = substream(&key, "loot");
    let loot = place_loot(&mut loot_rng, grid, elo, spawn, &resources);

    Ok(WorldInit {
        seed_key: key,
        spawn,
        constraints,
        resources,
        loot,
    })
}

/// Centrality of a cell: distance to the nearest edge, summed per axis.
fn centrality(cell: Cell, grid: GridSize) -> u16 {
    cell.x.min(grid.w - 1 - cell.x) + cell.y.min(grid.h - 1 - cell.y)
}

/// Select both spawns from the `"spawn"` stream.
///
/// Lower-rated players are placed more centrally (more room to explore);
/// the AI lands at least [`SPAWN_COLUMN_GAP`] columns away on a
/// different row when the grid allows it.
fn select_spawns(rng: &mut Mulberry32, grid: GridSize, elo: i32) -> (Spawn, GenConstraints) {
    let mut candidates: Vec<Cell> = grid.interior_cells().collect();
    candidates.sort_by(|a, b| centrality(*b, grid).cmp(&centrality(*a, grid)));

    let top_percent = if elo <= 800 { 10 } else { 30 };
    let take = (candidates.len() * top_percent / 100).max(1);
    let player = *choice(rng, &candidates[..take]).expect("interior candidates are never empty");

    let separated: Vec<Cell> = candidates
        .iter()
        .copied()
        .filter(|c| c.x.abs_diff(player.x) >= SPAWN_COLUMN_GAP && c.y != player.y)
        .collect();

    let (ai, column_separation_ok) = if separated.is_empty() {
        let fallback: Vec<Cell> = candidates.iter().copied().filter(|&c| c != player).collect();
        (
            *choice(rng, &fallback).expect("interior has more than one cell"),
            false,
        )
    } else {
        (*choice(rng, &separated).expect("non-empty"), true)
    };

    (
        Spawn { player, ai },
        GenConstraints {
            column_separation_ok,
        },
    )
}

/// Greedy blue-noise placement for all three resource kinds, from the
/// `"resources"` stream.
fn place_resources(rng: &mut Mulberry32, grid: GridSize, spawn: Spawn) -> Resources {
    let wh = grid.cell_count() as f64;
    let plan: [(f64, u32); 3] = [
        (TREE_FRACTION, 1),
        (STONE_FRACTION, 2),
        (HAY_FRACTION, 1),
    ];

    let mut placed: Vec<Cell> = Vec::new();
    let mut per_kind: [Vec<Cell>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (kind_idx, &(fraction, min_sep)) in plan.iter().enumerate() {
        let target = ((wh * fraction).round() as usize).max(1);

        let mut cells: Vec<Cell> = grid.cells().collect();
        shuffle_in_place(rng, &mut cells);

        for cell in cells {
            if per_kind[kind_idx].len() >= target {
                break;
            }
            if cell == spawn.player || cell == spawn.ai || placed.contains(&cell) {
                continue;
            }
            if placed.iter().any(|&p| manhattan(p, cell) < min_sep) {
                continue;
            }
            placed.push(cell);
            per_kind[kind_idx].push(cell);
        }
    }

    let [trees, stones, hay] = per_kind;
    Resources { trees, stones, hay }
}

const TYPE_WEAPON: &str = "weapon";
const TYPE_HEALING: &str = "healing";

fn type_weights(bucket: EloBucket) -> [(&'static str, f64); 2] {
    match bucket {
        EloBucket::Low => [(TYPE_WEAPON, 0.6), (TYPE_HEALING, 0.4)],
        EloBucket::Default => [(TYPE_WEAPON, 0.7), (TYPE_HEALING, 0.3)],
        EloBucket::High => [(TYPE_WEAPON, 0.75), (TYPE_HEALING, 0.25)],
    }
}

fn class_weights(bucket: EloBucket) -> [(WeaponClass, f64); 5] {
    match bucket {
        EloBucket::Low => [
            (WeaponClass::Straight, 0.23),
            (WeaponClass::Diag, 0.18),
            (WeaponClass::Arc, 0.22),
            (WeaponClass::Lob, 0.27),
            (WeaponClass::Melee, 0.10),
        ],
        EloBucket::Default => [
            (WeaponClass::Straight, 0.28),
            (WeaponClass::Diag, 0.18),
            (WeaponClass::Arc, 0.22),
            (WeaponClass::Lob, 0.22),
            (WeaponClass::Melee, 0.10),
        ],
        EloBucket::High => [
            (WeaponClass::Straight, 0.33),
            (WeaponClass::Diag, 0.23),
            (WeaponClass::Arc, 0.19),
            (WeaponClass::Lob, 0.19),
            (WeaponClass::Melee, 0.06),
        ],
    }
}

fn grade_weights(bucket: EloBucket, elo: i32) -> Vec<(u8, f64)> {
    // A rating of exactly 1200 pins grade 1.
    if elo == DEFAULT_ELO {
        return vec![(1, 1.0)];
    }
    match bucket {
        EloBucket::Low => vec![(1, 0.40), (2, 0.45), (3, 0.15)],
        EloBucket::Default => vec![(1, 0.55), (2, 0.35), (3, 0.10)],
        EloBucket::High => vec![(1, 0.60), (2, 0.30), (3, 0.10)],
    }
}

const HEALING_WEIGHTS: [(&str, f64); 4] = [
    ("heal.small", 1.0),
    ("heal.medium", 1.0),
    ("heal.large", 1.0),
    ("heal.major", 0.6),
];

/// Draw one loot key from the nested rarity tables.
fn draw_loot_key(rng: &mut Mulberry32, elo: i32, weapons_placed: &mut usize) -> String {
    let bucket = EloBucket::from_elo(elo);
    let drawn_type = *weighted_choice(rng, &type_weights(bucket)).expect("non-empty");

    if drawn_type == TYPE_WEAPON {
        if *weapons_placed >= MAX_WEAPONS {
            // Cap reached: demote the pick to a small heal.
            return "heal.small".to_string();
        }
        let class = *weighted_choice(rng, &class_weights(bucket)).expect("non-empty");
        let grade = *weighted_choice(rng, &grade_weights(bucket, elo)).expect("non-empty");
        *weapons_placed += 1;
        weapon_key(class, grade)
    } else {
        (*weighted_choice(rng, &HEALING_WEIGHTS).expect("non-empty")).to_string()
    }
}

/// Place loot slots from the `"loot"` stream.
fn place_loot(
    rng: &mut Mulberry32,
    grid: GridSize,
    elo: i32,
    spawn: Spawn,
    resources: &Resources,
) -> Vec<WorldLoot> {
    let target_mode = match EloBucket::from_elo(elo) {
        EloBucket::Low => LootTarget::PlayerBiased,
        EloBucket::High => LootTarget::AiBiased,
        EloBucket::Default => LootTarget::Neutral,
    };
    let (target, ring_range) = match target_mode {
        LootTarget::PlayerBiased => (spawn.player, 2u16..=4),
        LootTarget::AiBiased => (spawn.ai, 2u16..=4),
        LootTarget::Neutral => (grid.center(), 4u16..=6),
    };

    let mut loot: Vec<WorldLoot> = Vec::with_capacity(TOTAL_LOOT + 1);
    let mut weapons_placed = 0usize;

    for _ in 0..TOTAL_LOOT {
        let pos = place_slot(rng, grid, target, ring_range.clone(), spawn, resources, &loot);
        let Some(pos) = pos else {
            // Grid too small for more loot.
            break;
        };
        let key = draw_loot_key(rng, elo, &mut weapons_placed);
        loot.push(WorldLoot { pos, key });
    }

    // Pity rule: every world offers at least one healing item.
    if !loot.iter().any(|drop| drop.key.starts_with("heal."))
        && let Some(pos) = any_free_cell(rng, grid, spawn, resources, &loot)
    {
        loot.push(WorldLoot {
            pos,
            key: "heal.small".to_string(),
        });
    }

    loot
}

/// Minimum spacing between loot cells during ring placement.
const LOOT_SPACING: u32 = 2;

fn slot_occupied(cell: Cell, spawn: Spawn, resources: &Resources, loot: &[WorldLoot]) -> bool {
    cell == spawn.player
        || cell == spawn.ai
        || resources.occupies(cell)
        || loot.iter().any(|drop| drop.pos == cell)
}

fn place_slot(
    rng: &mut Mulberry32,
    grid: GridSize,
    target: Cell,
    ring_range: std::ops::RangeInclusive<u16>,
    spawn: Spawn,
    resources: &Resources,
    loot: &[WorldLoot],
) -> Option<Cell> {
    for d in ring_range {
        let candidates: Vec<Cell> = grid
            .ring(target, d)
            .into_iter()
            .filter(|&c| !slot_occupied(c, spawn, resources, loot))
            .filter(|&c| loot.iter().all(|drop| manhattan(drop.pos, c) >= LOOT_SPACING))
            .collect();
        if let Some(&cell) = choice(rng, &candidates) {
            return Some(cell);
        }
    }
    any_free_cell(rng, grid, spawn, resources, loot)
}

fn any_free_cell(
    rng: &mut Mulberry32,
    grid: GridSize,
    spawn: Spawn,
    resources: &Resources,
    loot: &[WorldLoot],
) -> Option<Cell> {
    let free: Vec<Cell> = grid
        .cells()
        .filter(|&c| !slot_occupied(c, spawn, resources, loot))
        .collect();
    choice(rng, &free).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn world(seed: &str, w: u16, h: u16, elo: i32) -> WorldInit {
        generate(seed, GridSize::new(w, h), elo).unwrap()
    }

    #[test]
    fn test_generation_determinism() {
        let a = world("abc", 16, 16, 1200);
        let b = world("abc", 16, 16, 1200);
        assert_eq!(a, b);
        assert_eq!(a.seed_key, "S:abc|W:16|H:16|V:v1.1");
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = world("abc", 16, 16, 1200);
        let b = world("abd", 16, 16, 1200);
        assert_ne!(a.spawn, b.spawn);
    }

    #[test]
    fn test_spawn_constraints() {
        // On 24x24 every top-30% player spawn leaves room for a
        // 10-column gap, so the constraint must always hold.
        for seed in ["abc", "def", "x1", "tourney-42"] {
            let w = world(seed, 24, 24, 1500);
            assert!(w.constraints.column_separation_ok, "seed {seed}");
            assert!(
                w.spawn.player.x.abs_diff(w.spawn.ai.x) >= SPAWN_COLUMN_GAP,
                "seed {seed}"
            );
            assert_ne!(w.spawn.player.y, w.spawn.ai.y, "seed {seed}");
        }
    }

    #[test]
    fn test_spawn_constraint_recorded_honestly() {
        // The flag must agree with the geometry whichever way it went.
        for seed in ["abc", "def", "x1"] {
            let w = world(seed, 16, 16, 1200);
            let separated = w.spawn.player.x.abs_diff(w.spawn.ai.x) >= SPAWN_COLUMN_GAP
                && w.spawn.player.y != w.spawn.ai.y;
            assert_eq!(w.constraints.column_separation_ok, separated, "seed {seed}");
        }
    }

    #[test]
    fn test_spawn_fallback_on_tiny_grid() {
        // A 5x5 interior cannot satisfy a 10-column gap.
        let w = world("abc", 5, 5, 1200);
        assert!(!w.constraints.column_separation_ok);
        assert_ne!(w.spawn.player, w.spawn.ai);
    }

    #[test]
    fn test_low_elo_spawn_is_central() {
        let grid = GridSize::new(16, 16);
        for seed in ["a", "b", "c", "d", "e"] {
            let w = world(seed, 16, 16, 600);
            // Top 10% of interior candidates by centrality on 16x16 all
            // sit well inside the map.
            let c = centrality(w.spawn.player, grid);
            assert!(c >= 10, "seed {seed}: centrality {c}");
        }
    }

    #[test]
    fn test_no_cell_collisions() {
        for elo in [600, 1200, 1500, 2000] {
            let w = world("abc", 16, 16, elo);
            let mut seen: HashSet<Cell> = HashSet::new();
            assert!(seen.insert(w.spawn.player));
            assert!(seen.insert(w.spawn.ai));
            for cell in w
                .resources
                .trees
                .iter()
                .chain(&w.resources.stones)
                .chain(&w.resources.hay)
            {
                assert!(seen.insert(*cell), "resource collision at {cell:?}");
            }
            for drop in &w.loot {
                assert!(seen.insert(drop.pos), "loot collision at {:?}", drop.pos);
            }
        }
    }

    #[test]
    fn test_resource_totals() {
        let w = world("abc", 16, 16, 1200);
        // 256 cells: 46 trees, up to 36 stones (spacing may exhaust
        // candidates first), 20 hay.
        assert_eq!(w.resources.trees.len(), 46);
        assert!((1..=36).contains(&w.resources.stones.len()));
        assert_eq!(w.resources.hay.len(), 20);
    }

    #[test]
    fn test_stone_spacing() {
        let w = world("abc", 20, 20, 1200);
        // Stones were placed with min separation 2 against everything
        // already down; trees placed later may move closer, so check
        // stones against each other only for the invariant that held
        // at placement time.
        for (i, &a) in w.resources.stones.iter().enumerate() {
            for &b in &w.resources.stones[i + 1..] {
                assert!(manhattan(a, b) >= 2, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_loot_count_and_weapon_cap() {
        for seed in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            for elo in [600, 1000, 1200, 1500, 2000] {
                let w = world(seed, 16, 16, elo);
                assert!(w.loot.len() >= TOTAL_LOOT, "seed {seed} elo {elo}");
                let weapons = w
                    .loot
                    .iter()
                    .filter(|drop| drop.key.starts_with("weapon."))
                    .count();
                assert!(weapons <= MAX_WEAPONS, "seed {seed} elo {elo}: {weapons}");
                assert!(
                    w.loot.iter().any(|drop| drop.key.starts_with("heal.")),
                    "seed {seed} elo {elo}: no healing placed"
                );
            }
        }
    }

    #[test]
    fn test_elo_1200_forces_grade_one() {
        for seed in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
            let w = world(seed, 16, 16, 1200);
            for drop in &w.loot {
                if drop.key.starts_with("weapon.") {
                    assert!(drop.key.ends_with(".t1"), "seed {seed}: {}", drop.key);
                }
            }
        }
    }

    #[test]
    fn test_loot_keys_resolve_in_catalog() {
        use crate::recipes::{RecipeCatalog, heal_item_amount};
        let catalog = RecipeCatalog::builtin();
        for seed in ["a", "b", "c"] {
            for elo in [600, 1200, 2000] {
                let w = world(seed, 16, 16, elo);
                for drop in &w.loot {
                    let known = catalog.get(&drop.key).is_some()
                        || heal_item_amount(&drop.key).is_some();
                    assert!(known, "unresolvable loot key {}", drop.key);
                }
            }
        }
    }

    #[test]
    fn test_rejects_tiny_grid() {
        assert!(generate("abc", GridSize::new(4, 16), 1200).is_err());
        assert!(generate("abc", GridSize::new(16, 4), 1200).is_err());
    }
}
