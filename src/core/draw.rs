//! Drawing Secret Santa pairings.
//!
//! Each attempt shuffles a fresh pool of receivers, then walks the givers in
//! roster order and hands each one the first receiver in the pool they are
//! allowed to give to. A giver with no valid receiver left sinks the whole
//! attempt and we reshuffle. There is no backtracking, so a satisfiable
//! roster can in principle lose every attempt; with small rosters and sparse
//! exclusions that does not happen in practice.
//!
//! Taking the *first* valid receiver rather than a uniformly chosen one means
//! the result is not uniform over all valid assignments. That bias is accepted.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::roster::Participant;

/// Attempts made before giving up, unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
/// Hard upper bound on the attempt budget, whatever the config says.
pub const MAX_ATTEMPTS_CEILING: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub giver: Participant,
    pub receiver: Participant,
}

/// No valid assignment was found within the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("couldn't generate valid pairings; try removing some exclusions")]
pub struct Infeasible;

/// Clamp a configured attempt budget into `1..=MAX_ATTEMPTS_CEILING`.
pub fn clamp_attempts(max_attempts: u32) -> u32 {
    max_attempts.clamp(1, MAX_ATTEMPTS_CEILING)
}

/// Draw pairings using the thread-local RNG.
pub fn draw(participants: &[Participant], max_attempts: u32) -> Result<Vec<Pairing>, Infeasible> {
    draw_with_rng(participants, max_attempts, &mut rand::rng())
}

/// Draw pairings with a caller-supplied RNG (seeded runs are reproducible).
///
/// The returned list has one entry per participant, in roster order of the
/// givers. Fewer than two participants is always infeasible.
pub fn draw_with_rng<R>(
    participants: &[Participant],
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<Pairing>, Infeasible>
where
    R: Rng + ?Sized,
{
    if participants.len() < 2 {
        tracing::debug!(participants = participants.len(), "not enough participants to draw");
        return Err(Infeasible);
    }

    let attempts = clamp_attempts(max_attempts);
    for attempt in 1..=attempts {
        if let Some(pairings) = try_assign(participants, rng) {
            tracing::info!(attempt, participants = participants.len(), "drew pairings");
            return Ok(pairings);
        }
        tracing::debug!(attempt, "dead end, reshuffling");
    }

    tracing::debug!(attempts, "attempt budget exhausted");
    Err(Infeasible)
}

/// One greedy pass over a freshly shuffled pool. `None` on a dead end.
fn try_assign<R>(participants: &[Participant], rng: &mut R) -> Option<Vec<Pairing>>
where
    R: Rng + ?Sized,
{
    let mut pool: Vec<&Participant> = participants.iter().collect();
    pool.shuffle(rng);

    let mut pairings = Vec::with_capacity(participants.len());
    for giver in participants {
        let index = pool.iter().position(|receiver| giver.can_give_to(receiver))?;
        let receiver = pool.remove(index);
        pairings.push(Pairing {
            giver: giver.clone(),
            receiver: receiver.clone(),
        });
    }
    Some(pairings)
}

/// Check that `pairings` is a complete, valid assignment for `participants`:
/// every id gives exactly once and receives exactly once, nobody draws
/// themselves, and no exclusion is violated.
pub fn validate(participants: &[Participant], pairings: &[Pairing]) -> Result<()> {
    if pairings.len() != participants.len() {
        bail!(
            "expected {} pairings, got {}",
            participants.len(),
            pairings.len()
        );
    }

    let roster: HashSet<&str> = participants.iter().map(|p| p.id.as_str()).collect();
    let mut givers = HashSet::new();
    let mut receivers = HashSet::new();

    for pairing in pairings {
        let (giver, receiver) = (&pairing.giver, &pairing.receiver);
        if !roster.contains(giver.id.as_str()) || !roster.contains(receiver.id.as_str()) {
            bail!("pairing {} -> {} is not on the roster", giver.id, receiver.id);
        }
        if !givers.insert(giver.id.as_str()) {
            bail!("{} gives more than once", giver.id);
        }
        if !receivers.insert(receiver.id.as_str()) {
            bail!("{} receives more than once", receiver.id);
        }
        if !giver.can_give_to(receiver) {
            bail!("{} may not give to {}", giver.id, receiver.id);
        }
    }

    Ok(())
}
