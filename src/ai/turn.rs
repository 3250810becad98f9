//! AI turn loop: scoring, selection, and the multi-action cycle.

use crate::ai::features::{Candidate, enumerate_candidates};
use crate::ai::policy::AiPolicy;
use crate::error::EngineResult;
use crate::game::{Action, Match, Side, resolve};
use crate::recipes::RecipeCatalog;
use crate::rng::Mulberry32;

/// Hard cap on free actions before a turn-consuming action is forced.
///
/// Without it the loop could spin forever whenever scoring keeps
/// ranking a free action highest.
pub const MAX_FREE_ACTIONS: u32 = 2;

/// What happened during one AI turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiTurnOutcome {
    /// Action type names in resolution order.
    pub actions_taken: Vec<&'static str>,
    /// Whether the AI consumed its turn.
    pub consumed_turn: bool,
    /// Whether the match ended during the turn.
    pub ended: bool,
}

/// Pick a candidate index: argmax over policy scores, then an
/// epsilon-greedy swap to a uniform pick among the remaining
/// candidates. Exploration is skipped with a single candidate.
///
/// The exploration coin comes from the injected stream, so selection is
/// reproducible under a fixed seed.
#[must_use]
pub fn select_candidate(
    policy: &AiPolicy,
    candidates: &[Candidate],
    rng: &mut Mulberry32,
) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }

    let mut best = 0;
    let mut best_score = policy.score(candidates[0].kind, &candidates[0].features);
    for (idx, candidate) in candidates.iter().enumerate().skip(1) {
        let score = policy.score(candidate.kind, &candidate.features);
        if score > best_score {
            best = idx;
            best_score = score;
        }
    }

    if candidates.len() > 1 && rng.next_f64() < policy.epsilon {
        // Uniform among the non-argmax candidates.
        let mut idx = rng.next_usize(candidates.len() - 1);
        if idx >= best {
            idx += 1;
        }
        return Some(idx);
    }

    Some(best)
}

/// Run one full AI turn against the working snapshot.
///
/// Enumerate, score, select, resolve; free actions loop until the cap,
/// after which only turn-consuming candidates remain. An empty
/// candidate set skips the turn.
///
/// # Errors
///
/// Propagates resolution errors; candidates are pre-validated so this
/// indicates an engine bug rather than a bad request.
pub fn run_ai_turn(
    working: &mut Match,
    policy: &AiPolicy,
    catalog: &RecipeCatalog,
    rng: &mut Mulberry32,
) -> EngineResult<AiTurnOutcome> {
    let mut outcome = AiTurnOutcome::default();
    let mut free_taken = 0u32;

    loop {
        let mut candidates = enumerate_candidates(working, catalog);
        if free_taken >= MAX_FREE_ACTIONS {
            candidates.retain(|c| c.action.consumes_turn());
        }

        let action = match select_candidate(policy, &candidates, rng) {
            Some(idx) => candidates.swap_remove(idx).action,
            None => Action::SkipTurn,
        };

        let resolution = resolve(working, Side::Ai, &action, catalog)?;
        working.record_action(Side::Ai, action.kind());
        outcome.actions_taken.push(action.kind());

        if resolution.ended {
            outcome.ended = true;
            outcome.consumed_turn = resolution.consume_turn;
            break;
        }
        if resolution.consume_turn {
            outcome.consumed_turn = true;
            break;
        }
        free_taken += 1;
    }

    Ok(outcome)
}
