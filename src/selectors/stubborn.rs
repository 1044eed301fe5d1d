//! Algorithm 3: stubborn sets [godefroid1996].
//!
//! Grounded on
//! `original_source/mdptools/set_methods/algorithm3_stubborn_sets.py`
//! (`__choose_process`, `__choose_condition`, the two disabled-transition
//! growth rules a.i/a.ii, and the enabled-transition growth rule b).

use super::seed_transition;
use crate::command::{disjunct_uses, uses_dependent, Atom};
use crate::intern::Id;
use crate::state::State;
use crate::system::System;
use crate::transition::Transition;
use std::collections::HashSet;

/// Runs Algorithm 3 from the given seed transition index.
#[must_use]
pub fn select(system: &System, state: &State, seed: usize) -> Vec<Transition> {
    let mut ts: Vec<usize> = vec![seed];
    let mut in_set: HashSet<usize> = HashSet::from([seed]);
    let mut cursor = 0;

    while cursor < ts.len() {
        let i = ts[cursor];
        cursor += 1;
        let t1 = &system.transitions[i];

        if !t1.is_enabled(state) {
            if let Some((_pid, missing_label)) = choose_process(system, state, t1) {
                add(system, &mut ts, &mut in_set, |t2| {
                    t2.post.outcomes().iter().any(|o| o.locs.contains(missing_label))
                });
                continue;
            }
            if let Some(disjunct) = choose_false_disjunct(state, t1) {
                let cj_uses = disjunct_uses(&disjunct);
                add(system, &mut ts, &mut in_set, |t2| uses_dependent(&cj_uses, &t2.uses()));
            }
            // Neither rule applies: nothing more can be learned about `t1`
            // from this state, matching the original's silent no-op.
        } else {
            add(system, &mut ts, &mut in_set, |t2| t1.in_conflict(t2) || (t1.is_parallel(t2) && t1.can_be_dependent(t2)));
        }
    }

    ts.into_iter()
        .filter(|&i| system.transitions[i].is_enabled(state))
        .map(|i| system.transitions[i].clone())
        .collect()
}

/// Choose a process `Pj ∈ active(t)` such that `s(j) != pre(t) ∩ Pj`
/// (i.e. `t`'s required location for that process isn't where it
/// currently is), returning that process id and `t`'s required label.
fn choose_process(system: &System, state: &State, t: &Transition) -> Option<(Id, Id)> {
    for pid in t.active.iter() {
        let process = system.processes.iter().find(|p| p.id == pid)?;
        let s_i = state.project(&process.labels);
        if !t.pre.contains(s_i) {
            if let Some(required) = t.pre.iter().find(|&l| process.labels.contains(l)) {
                return Some((pid, required));
            }
        }
    }
    None
}

/// Choose a disjunct of `t`'s guard that evaluates to false in `state`.
fn choose_false_disjunct(state: &State, t: &Transition) -> Option<Vec<Atom>> {
    t.guard
        .disjuncts()
        .iter()
        .find(|disjunct| !disjunct.iter().any(|atom| atom.holds(state.ctx.get(atom.var))))
        .cloned()
}

fn add(system: &System, ts: &mut Vec<usize>, in_set: &mut HashSet<usize>, mut pred: impl FnMut(&Transition) -> bool) {
    for (i, t2) in system.transitions.iter().enumerate() {
        if in_set.contains(&i) {
            continue;
        }
        if pred(t2) {
            in_set.insert(i);
            ts.push(i);
        }
    }
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
    use crate::command::{parse_guard, parse_update, Guard, Update};
    use crate::intern::Interner;
    use crate::process::Process;
    use crate::state::{Ctx, Locs};
    use crate::transition::{Action, Direction, Post};

    #[test]
    fn disabled_seed_pulls_in_enabler() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let s2 = interner.intern("s2");
        let wait = interner.intern("wait");
        let x = interner.intern("x");
        let go = interner.intern("go");

        // t_wait requires s1, disabled while at s0; t_go moves s0 -> s1.
        let t_wait = Transition {
            action: Action { stripped: wait, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s1),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s2), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let t_go = Transition {
            action: Action { stripped: go, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let _ = x;
        let init = State::new(Locs::single(s0), Ctx::new());
        let p = Process::new(&interner, "p", vec![t_wait, t_go], init);
        let system = System::compose(&interner, vec![p]).unwrap();
        let state = system.init.clone();

        // seed on the disabled `t_wait` (index 0): rule a.i should pull in
        // `t_go`, whose post contains the missing label `s1`.
        let selected = select(&system, &state, 0);
        assert!(selected.iter().any(|t| t.action.stripped == go));
    }

    #[test]
    fn guard_disjunct_pulls_in_dependent_transition() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let q0 = interner.intern("q0");
        let x = interner.intern("x");
        let blocked = interner.intern("blocked");
        let setter = interner.intern("setter");

        let t_blocked = Transition {
            action: Action { stripped: blocked, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: parse_guard(&interner, "x=1").unwrap(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let t_setter = Transition {
            action: Action { stripped: setter, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(q0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(q0), parse_update(&interner, "x:=1").unwrap()),
            active: Locs::single(interner.intern("q")),
        };
        let p_init = State::new(Locs::single(s0), Ctx::from_pairs([(x, 0)]));
        let q_init = State::new(Locs::single(q0), Ctx::new());
        let p = Process::new(&interner, "p", vec![t_blocked], p_init);
        let q = Process::new(&interner, "q", vec![t_setter], q_init);
        let system = System::compose(&interner, vec![p, q]).unwrap();
        let state = system.init.clone();

        let selected = select(&system, &state, 0);
        assert!(selected.iter().any(|t| t.action.stripped == setter));
    }
}
