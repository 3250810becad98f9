//! Read-only recipe catalog: weapons, walls, and healing.
//!
//! The catalog is static reference data. Crafting looks recipes up by
//! key; the listing endpoint filters by kind, weapon class, and grade.
//! Loot keys produced by world generation (`weapon.<class>.t<grade>`)
//! resolve against the same table.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// What a recipe produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    /// Equippable weapon.
    Weapon,
    /// Placeable wall segment.
    Wall,
    /// Consumable healing.
    Healing,
}

/// Weapon trajectory class; determines the LOS check during SHOOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponClass {
    /// Shared row/column; blocked by walls unless the weapon shoots over them.
    Straight,
    /// Common diagonal.
    Diag,
    /// Any cell at distance 2..=range, no line requirement.
    Arc,
    /// Any cell in range; ignores walls.
    Lob,
    /// Distance exactly 1.
    Melee,
}

impl WeaponClass {
    /// All classes, in catalog order.
    pub const ALL: [WeaponClass; 5] = [
        WeaponClass::Straight,
        WeaponClass::Diag,
        WeaponClass::Arc,
        WeaponClass::Lob,
        WeaponClass::Melee,
    ];

    /// Lowercase name used in recipe keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            WeaponClass::Straight => "straight",
            WeaponClass::Diag => "diag",
            WeaponClass::Arc => "arc",
            WeaponClass::Lob => "lob",
            WeaponClass::Melee => "melee",
        }
    }

    /// Whether the class attacks at range (everything but melee).
    #[must_use]
    pub const fn is_ranged(self) -> bool {
        !matches!(self, WeaponClass::Melee)
    }
}

/// Crafting costs, all-or-nothing at resolution time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costs {
    /// Wood units.
    #[serde(default)]
    pub wood: u32,
    /// Stone units.
    #[serde(default)]
    pub stone: u32,
    /// Food units.
    #[serde(default)]
    pub food: u32,
}

impl Costs {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(wood: u32, stone: u32, food: u32) -> Self {
        Self { wood, stone, food }
    }
}

/// Weapon stat block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponOutput {
    /// Trajectory class.
    pub weapon_class: WeaponClass,
    /// Grade 1..=5.
    pub grade: u8,
    /// Damage per hit.
    pub damage: i32,
    /// Maximum Manhattan range.
    pub range: u32,
    /// Whether walls on the trajectory are ignored.
    pub shoots_over_walls: bool,
}

/// Wall stat block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallOutput {
    /// Hit points of the placed wall.
    pub hp: i32,
    /// Maximum Manhattan distance from the builder.
    pub max_place_distance: u32,
}

/// Recipe output, one variant per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeOutput {
    /// A weapon stat block.
    Weapon(WeaponOutput),
    /// A wall stat block, nested under `wall`.
    Wall {
        /// The wall stats.
        wall: WallOutput,
    },
    /// A fixed heal amount.
    Healing {
        /// HP restored.
        heal: i32,
    },
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Unique key, e.g. `weapon.straight.t3` or `wall.wood`.
    pub key: String,
    /// Output kind.
    pub kind: RecipeKind,
    /// Disabled recipes are hidden from lookup and listings by default.
    pub enabled: bool,
    /// Stat block.
    pub output: RecipeOutput,
    /// Crafting costs.
    pub costs: Costs,
    /// Recipe keys that must already be owned before crafting.
    pub prerequisites: Vec<String>,
}

impl Recipe {
    /// Weapon stats, if this is a weapon recipe.
    #[must_use]
    pub const fn weapon(&self) -> Option<&WeaponOutput> {
        match &self.output {
            RecipeOutput::Weapon(w) => Some(w),
            _ => None,
        }
    }

    /// Wall stats, if this is a wall recipe.
    #[must_use]
    pub const fn wall(&self) -> Option<&WallOutput> {
        match &self.output {
            RecipeOutput::Wall { wall } => Some(wall),
            _ => None,
        }
    }

    /// Heal amount, if this is a healing recipe.
    #[must_use]
    pub const fn heal(&self) -> Option<i32> {
        match self.output {
            RecipeOutput::Healing { heal } => Some(heal),
            _ => None,
        }
    }
}

/// Filters accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFilter {
    /// Restrict to one kind.
    pub kind: Option<RecipeKind>,
    /// Restrict to one weapon class.
    pub weapon_class: Option<WeaponClass>,
    /// Minimum weapon grade.
    pub min_grade: Option<u8>,
    /// Maximum weapon grade.
    pub max_grade: Option<u8>,
    /// Override the enabled-only default.
    pub enabled: Option<bool>,
}

/// The recipe catalog: ordered entries plus a key index.
#[derive(Debug)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    by_key: HashMap<String, usize>,
}

/// Canonical key for a weapon recipe.
#[must_use]
pub fn weapon_key(class: WeaponClass, grade: u8) -> String {
    format!("weapon.{}.t{grade}", class.name())
}

/// Fixed restore amounts for the `heal.*` inventory items.
#[must_use]
pub fn heal_item_amount(key: &str) -> Option<i32> {
    match key {
        "heal.small" => Some(10),
        "heal.medium" => Some(20),
        "heal.large" => Some(30),
        "heal.major" => Some(50),
        _ => None,
    }
}

/// All `heal.*` item keys, cheapest first.
pub const HEAL_ITEM_KEYS: [&str; 4] = ["heal.small", "heal.medium", "heal.large", "heal.major"];

// Per-class stat tables indexed by grade - 1: (damage, range, wood, stone, food).
const STRAIGHT_STATS: [(i32, u32, u32, u32, u32); 5] = [
    (10, 4, 2, 1, 0),
    (20, 5, 5, 2, 0),
    (30, 6, 8, 3, 0),
    (40, 7, 11, 4, 0),
    (50, 8, 14, 5, 0),
];
const DIAG_STATS: [(i32, u32, u32, u32, u32); 5] = [
    (10, 4, 2, 1, 0),
    (18, 5, 5, 2, 0),
    (26, 6, 8, 3, 0),
    (34, 7, 11, 4, 0),
    (42, 8, 14, 5, 0),
];
const ARC_STATS: [(i32, u32, u32, u32, u32); 5] = [
    (8, 5, 2, 1, 0),
    (16, 6, 4, 3, 0),
    (24, 7, 6, 5, 0),
    (32, 8, 8, 7, 0),
    (40, 9, 10, 9, 0),
];
const LOB_STATS: [(i32, u32, u32, u32, u32); 5] = [
    (10, 6, 2, 1, 0),
    (16, 7, 4, 2, 1),
    (22, 8, 6, 3, 2),
    (28, 9, 8, 4, 3),
    (34, 10, 10, 5, 4),
];
const MELEE_STATS: [(i32, u32, u32, u32, u32); 5] = [
    (20, 1, 1, 2, 0),
    (34, 1, 2, 4, 0),
    (48, 1, 3, 6, 0),
    (62, 1, 4, 8, 0),
    (76, 1, 5, 10, 0),
];

fn class_stats(class: WeaponClass) -> &'static [(i32, u32, u32, u32, u32); 5] {
    match class {
        WeaponClass::Straight => &STRAIGHT_STATS,
        WeaponClass::Diag => &DIAG_STATS,
        WeaponClass::Arc => &ARC_STATS,
        WeaponClass::Lob => &LOB_STATS,
        WeaponClass::Melee => &MELEE_STATS,
    }
}

fn shoots_over_walls(class: WeaponClass, grade: u8) -> bool {
    match class {
        // Lobbed shots arc over cover by nature.
        WeaponClass::Lob => true,
        // Only the top-grade railgun punches through walls.
        WeaponClass::Straight => grade == 5,
        _ => false,
    }
}

fn build_catalog() -> RecipeCatalog {
    let mut recipes = Vec::new();

    for class in WeaponClass::ALL {
        let stats = class_stats(class);
        for grade in 1u8..=5 {
            let (damage, range, wood, stone, food) = stats[usize::from(grade) - 1];
            recipes.push(Recipe {
                key: weapon_key(class, grade),
                kind: RecipeKind::Weapon,
                enabled: true,
                output: RecipeOutput::Weapon(WeaponOutput {
                    weapon_class: class,
                    grade,
                    damage,
                    range,
                    shoots_over_walls: shoots_over_walls(class, grade),
                }),
                costs: Costs::new(wood, stone, food),
                prerequisites: Vec::new(),
            });
        }
    }

    recipes.push(Recipe {
        key: "wall.wood".to_string(),
        kind: RecipeKind::Wall,
        enabled: true,
        output: RecipeOutput::Wall {
            wall: WallOutput {
                hp: 30,
                max_place_distance: 2,
            },
        },
        costs: Costs::new(4, 0, 0),
        prerequisites: Vec::new(),
    });
    recipes.push(Recipe {
        key: "wall.stone".to_string(),
        kind: RecipeKind::Wall,
        enabled: true,
        output: RecipeOutput::Wall {
            wall: WallOutput {
                hp: 60,
                max_place_distance: 2,
            },
        },
        costs: Costs::new(0, 6, 0),
        prerequisites: Vec::new(),
    });

    recipes.push(Recipe {
        key: "healing.salve".to_string(),
        kind: RecipeKind::Healing,
        enabled: true,
        output: RecipeOutput::Healing { heal: 15 },
        costs: Costs::new(0, 0, 2),
        prerequisites: Vec::new(),
    });
    recipes.push(Recipe {
        key: "healing.tonic".to_string(),
        kind: RecipeKind::Healing,
        enabled: true,
        output: RecipeOutput::Healing { heal: 25 },
        costs: Costs::new(1, 0, 3),
        prerequisites: Vec::new(),
    });

    let by_key = recipes
        .iter()
        .enumerate()
        .map(|(idx, recipe)| (recipe.key.clone(), idx))
        .collect();

    RecipeCatalog { recipes, by_key }
}

impl RecipeCatalog {
    /// The built-in catalog, constructed once.
    #[must_use]
    pub fn builtin() -> &'static RecipeCatalog {
        static CATALOG: OnceLock<RecipeCatalog> = OnceLock::new();
        CATALOG.get_or_init(build_catalog)
    }

    /// Look up an enabled recipe by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Recipe> {
        self.by_key
            .get(key)
            .map(|&idx| &self.recipes[idx])
            .filter(|recipe| recipe.enabled)
    }

    /// Look up a recipe by key regardless of enablement.
    #[must_use]
    pub fn get_any(&self, key: &str) -> Option<&Recipe> {
        self.by_key.get(key).map(|&idx| &self.recipes[idx])
    }

    /// List recipes matching the filter, in catalog order.
    #[must_use]
    pub fn list(&self, filter: &RecipeFilter) -> Vec<&Recipe> {
        let enabled = filter.enabled.unwrap_or(true);
        self.recipes
            .iter()
            .filter(|recipe| recipe.enabled == enabled)
            .filter(|recipe| filter.kind.is_none_or(|k| recipe.kind == k))
            .filter(|recipe| match recipe.weapon() {
                Some(w) => {
                    filter.weapon_class.is_none_or(|c| w.weapon_class == c)
                        && filter.min_grade.is_none_or(|g| w.grade >= g)
                        && filter.max_grade.is_none_or(|g| w.grade <= g)
                }
                // Weapon-only filters exclude non-weapon recipes.
                None => {
                    filter.weapon_class.is_none()
                        && filter.min_grade.is_none()
                        && filter.max_grade.is_none()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_anchors() {
        let catalog = RecipeCatalog::builtin();

        let t5 = catalog.get("weapon.straight.t5").unwrap();
        let w = t5.weapon().unwrap();
        assert_eq!(w.range, 8);
        assert_eq!(w.damage, 50);
        assert!(w.shoots_over_walls);

        let t3 = catalog.get("weapon.straight.t3").unwrap();
        assert_eq!(t3.costs, Costs::new(8, 3, 0));

        let t1 = catalog.get("weapon.straight.t1").unwrap();
        assert_eq!(t1.costs, Costs::new(2, 1, 0));
        assert!(!t1.weapon().unwrap().shoots_over_walls);
    }

    #[test]
    fn test_catalog_covers_all_classes_and_grades() {
        let catalog = RecipeCatalog::builtin();
        for class in WeaponClass::ALL {
            for grade in 1u8..=5 {
                let recipe = catalog.get(&weapon_key(class, grade)).unwrap();
                let weapon = recipe.weapon().unwrap();
                assert_eq!(weapon.grade, grade);
                assert_eq!(weapon.weapon_class, class);
                assert!(weapon.damage > 0);
            }
        }
    }

    #[test]
    fn test_melee_always_range_one() {
        let catalog = RecipeCatalog::builtin();
        for grade in 1u8..=5 {
            let recipe = catalog.get(&weapon_key(WeaponClass::Melee, grade)).unwrap();
            assert_eq!(recipe.weapon().unwrap().range, 1);
        }
    }

    #[test]
    fn test_wall_and_healing_lookups() {
        let catalog = RecipeCatalog::builtin();
        let wall = catalog.get("wall.wood").unwrap().wall().unwrap();
        assert_eq!(wall.hp, 30);
        assert_eq!(wall.max_place_distance, 2);

        assert_eq!(catalog.get("healing.salve").unwrap().heal(), Some(15));
        assert!(catalog.get("weapon.nope.t9").is_none());
    }

    #[test]
    fn test_heal_item_amounts() {
        assert_eq!(heal_item_amount("heal.small"), Some(10));
        assert_eq!(heal_item_amount("heal.medium"), Some(20));
        assert_eq!(heal_item_amount("heal.large"), Some(30));
        assert_eq!(heal_item_amount("heal.major"), Some(50));
        assert_eq!(heal_item_amount("heal.mythic"), None);
        assert_eq!(heal_item_amount("wood"), None);
    }

    #[test]
    fn test_list_filters() {
        let catalog = RecipeCatalog::builtin();

        let weapons = catalog.list(&RecipeFilter {
            kind: Some(RecipeKind::Weapon),
            ..RecipeFilter::default()
        });
        assert_eq!(weapons.len(), 25);

        let straight_low = catalog.list(&RecipeFilter {
            weapon_class: Some(WeaponClass::Straight),
            max_grade: Some(2),
            ..RecipeFilter::default()
        });
        assert_eq!(straight_low.len(), 2);

        let healing = catalog.list(&RecipeFilter {
            kind: Some(RecipeKind::Healing),
            ..RecipeFilter::default()
        });
        assert_eq!(healing.len(), 2);
    }

    #[test]
    fn test_weapon_output_serializes_camel_case() {
        let catalog = RecipeCatalog::builtin();
        let json = serde_json::to_value(catalog.get("weapon.lob.t2").unwrap()).unwrap();
        assert_eq!(json["output"]["weaponClass"], "lob");
        assert_eq!(json["output"]["shootsOverWalls"], true);
        assert_eq!(json["kind"], "weapon");
    }
}
