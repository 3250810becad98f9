// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Skirmish: a turn-based, grid-based 1v1 tactical combat server.
//!
//! The engine is built around three subsystems:
//! - Deterministic world generation: a seeded procedural map builder that
//!   lays out spawns, resources, and loot under geometric and rarity
//!   constraints keyed off a skill rating.
//! - Action resolution: a turn-consuming/free-action model that validates
//!   and applies actions against a working snapshot, persisted with
//!   optimistic concurrency.
//! - AI opponent: a linear-scoring policy over hand-designed feature
//!   vectors with per-player adaptive weights, A* pathfinding, and
//!   epsilon-greedy exploration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         HTTP API (axum)             │
//! ├─────────────────────────────────────┤
//! │     Match Orchestrator (engine)     │
//! ├──────────────────┬──────────────────┤
//! │ Action Resolvers │    AI Policy     │
//! ├──────────────────┴──────────────────┤
//! │   World Generation / Grid / RNG     │
//! └─────────────────────────────────────┘
//! ```

pub mod ai;
pub mod engine;
pub mod error;
pub mod game;
pub mod grid;
pub mod recipes;
pub mod rng;
pub mod server;
pub mod store;
pub mod worldgen;

pub use error::{EngineError, EngineResult};

// Re-export key game types at crate root for convenience
pub use game::{Action, Match, MatchStatus, Side};
pub use grid::{Cell, GridSize};
pub use recipes::RecipeCatalog;
