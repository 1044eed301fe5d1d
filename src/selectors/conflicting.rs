//! Algorithm 1: conflicting transitions [godefroid1996].
//!
//! Grounded on
//! `original_source/mdptools/set_methods/algorithm1_conflicting_transitions.py`.

use super::seed_transition;
use crate::state::State;
use crate::system::System;
use crate::transition::Transition;
use std::collections::HashSet;

/// Runs Algorithm 1 from the given seed transition index. Falls back to
/// the full `enabled(S)` the moment a disabled transition would be forced
/// into the set (§4.6's soundness escape hatch).
#[must_use]
pub fn select(system: &System, state: &State, seed: usize) -> Vec<Transition> {
    let mut in_set: HashSet<usize> = HashSet::new();
    let mut order = vec![seed];
    in_set.insert(seed);
    let mut cursor = 0;

    while cursor < order.len() {
        let t1 = &system.transitions[order[cursor]];
        cursor += 1;
        for (i, t2) in system.transitions.iter().enumerate() {
            if in_set.contains(&i) {
                continue;
            }
            if t1.in_conflict(t2) || (t1.is_parallel(t2) && t1.can_be_dependent(t2)) {
                if !t2.is_enabled(state) {
                    return system.enabled(state);
                }
                in_set.insert(i);
                order.push(i);
            }
        }
    }

    order.into_iter().map(|i| system.transitions[i].clone()).collect()
}

/// Builds a selector that seeds via [`seed_transition`] (consulting
/// `goal_actions` first) unless `forced_seed` overrides it — the shape
/// [`super::with_bias`] composes with.
pub fn selector(goal_actions: Vec<usize>) -> impl Fn(&System, &State, Option<usize>) -> Vec<Transition> {
    move |system, state, forced_seed| match forced_seed.or_else(|| seed_transition(system, state, &goal_actions)) {
        Some(seed) => select(system, state, seed),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::intern::Interner;
    use crate::process::Process;
    use crate::state::{Ctx, Locs};
    use crate::transition::{Action, Direction, Post};

    fn two_independent_processes() -> System {
        let interner = Interner::new();
        let a0 = interner.intern("a0");
        let a1 = interner.intern("a1");
        let b0 = interner.intern("b0");
        let b1 = interner.intern("b1");
        let act_a = interner.intern("act_a");
        let act_b = interner.intern("act_b");

        let ta = Transition {
            action: Action { stripped: act_a, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(a0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(a1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let tb = Transition {
            action: Action { stripped: act_b, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(b0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(b1), Update::empty()),
            active: Locs::single(interner.intern("q")),
        };

        let p = Process::new(&interner, "p", vec![ta], State::new(Locs::single(a0), Ctx::new()));
        let q = Process::new(&interner, "q", vec![tb], State::new(Locs::single(b0), Ctx::new()));
        System::compose(&interner, vec![p, q]).unwrap()
    }

    #[test]
    fn independent_transitions_are_not_pulled_in() {
        let system = two_independent_processes();
        let state = system.init.clone();
        let selected = select(&system, &state, 0);
        assert_eq!(selected.len(), 1);
    }
}
