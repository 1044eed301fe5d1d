//! Algorithm 2: Overman's algorithm [godefroid1996].
//!
//! Grounded on
//! `original_source/mdptools/set_methods/algorithm2_overmans_algorithm.py`.

use super::seed_transition;
use crate::intern::Id;
use crate::state::State;
use crate::system::System;
use crate::transition::Transition;
use std::collections::HashSet;

/// Runs Algorithm 2 from the given seed transition index: grows a set `P`
/// of process ids starting from `seed`'s active set, then returns every
/// system transition whose active set is contained in `P` and that is
/// enabled in `state`.
///
/// This algorithm's reduction size is not asserted in tests — only that it
/// preserves `Pmax`. It shares the same selector contract as the other two
/// (a subset of `enabled(S)`), but its own construction never forces in a
/// disabled transition (membership in `P` doesn't require enabledness), so
/// it needs no fallback escape hatch of its own.
#[must_use]
pub fn select(system: &System, state: &State, seed: usize) -> Vec<Transition> {
    let seed_transition = &system.transitions[seed];
    let mut in_set: HashSet<Id> = seed_transition.active.iter().collect();
    let mut order: Vec<Id> = seed_transition.active.iter().collect();
    let mut cursor = 0;

    while cursor < order.len() {
        let pi = order[cursor];
        cursor += 1;
        let Some(process) = system.processes.iter().find(|p| p.id == pi) else {
            continue;
        };
        let s_i = state.project(&process.labels);
        for t1 in &system.transitions {
            if !t1.pre.contains(s_i) {
                continue;
            }
            for other in &system.processes {
                let pj = other.id;
                if in_set.contains(&pj) {
                    continue;
                }
                let pulled_in = t1.active.contains(pj)
                    || system
                        .transitions
                        .iter()
                        .any(|t2| t1.is_parallel(t2) && t1.can_be_dependent(t2) && t2.active.contains(pj));
                if pulled_in {
                    in_set.insert(pj);
                    order.push(pj);
                }
            }
        }
    }

    system
        .transitions
        .iter()
        .filter(|t| t.active.iter().all(|p| in_set.contains(&p)) && t.is_enabled(state))
        .cloned()
        .collect()
}

/// Builds a selector that seeds via [`seed_transition`] (consulting
/// `goal_actions` first) unless `forced_seed` overrides it.
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
    fn independent_processes_stay_out_of_p() {
        let system = two_independent_processes();
        let state = system.init.clone();
        let selected = select(&system, &state, 0);
        assert_eq!(selected.len(), 1);
    }
}
