//! Partial-order-reduction selectors (§4.6): three algorithms that each pick
//! a sound subset of `enabled(S)` to expand from, plus seeding and the
//! goal/transition bias wrapper shared by all three.
//!
//! Grounded on `original_source/mdptools/set_methods/` (`algorithm1_*`,
//! `algorithm2_*`, `algorithm3_*`, `set_utils.py`'s `init_transition_set`
//! and `transition_bias`).

pub mod conflicting;
pub mod overman;
pub mod stubborn;

use crate::intern::Id;
use crate::state::{PartialState, State};
use crate::system::System;
use crate::transition::Transition;

/// Precomputes the system's *goal-actions* list (§4.6 "Seeding"): the
/// indices of transitions at least one of whose postset outcomes can reach
/// a goal state. This is a structural approximation of `set_utils.py`'s
/// `mdp.goal_actions` — since seeding is only a heuristic (soundness is
/// guaranteed by each algorithm's own contract regardless of which
/// transition is seeded from), we check outcome location sets against goal
/// location requirements rather than re-running reachability per candidate.
/// Computed once per system and reused across every selector call for it.
#[must_use]
pub fn goal_actions(system: &System, goal: &[PartialState]) -> Vec<usize> {
    system
        .transitions
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            t.post
                .outcomes()
                .iter()
                .any(|o| goal.iter().any(|g| g.locs.is_subset_of(&o.locs)))
        })
        .map(|(i, _)| i)
        .collect()
}

/// `init_transition_set`: the seeding rule shared by all three algorithms.
/// Consults the goal bias first — if `goal_actions` names any transition
/// enabled in `state`, seed with the first such — otherwise falls back to
/// the first enabled transition in system order. Returns `None` if nothing
/// is enabled.
#[must_use]
pub fn seed_transition(system: &System, state: &State, goal_actions: &[usize]) -> Option<usize> {
    let enabled = system.enabled_indices(state);
    if !goal_actions.is_empty() {
        if let Some(&seed) = goal_actions.iter().find(|i| enabled.contains(i)) {
            return Some(seed);
        }
    }
    enabled.into_iter().next()
}

/// A further constraint on a selector's seed transition, as `transition_bias`
/// applies in the original: either a specific transition index, or "whichever
/// enabled transition carries this stripped action label".
#[derive(Copy, Clone, Debug)]
pub enum Bias {
    Transition(usize),
    Action(Id),
}

fn resolve_bias(system: &System, state: &State, bias: Bias) -> Option<usize> {
    let enabled = system.enabled_indices(state);
    match bias {
        Bias::Transition(i) => enabled.into_iter().find(|&e| e == i),
        Bias::Action(action) => enabled.into_iter().find(|&e| system.transitions[e].action.stripped == action),
    }
}

/// `transition_bias(set_method, td)`: wraps a selector so that its seed is
/// forced to the transition `bias` names, when that transition is enabled —
/// otherwise the wrapped selector's own seeding rule applies.
pub fn with_bias<'a, F>(select: F, bias: Bias) -> impl Fn(&System, &State) -> Vec<Transition> + 'a
where
    F: Fn(&System, &State, Option<usize>) -> Vec<Transition> + 'a,
{
    move |system, state| {
        let forced = resolve_bias(system, state, bias);
        select(system, state, forced)
    }
}
