//! State-space exploration (§4.5): walking a composed system from its
//! initial state, optionally consulting a partial-order-reduction selector.
//!
//! Grounded on `original_source/mdptools/search.py` (`search`/`bfs`, LIFO vs
//! FIFO frontier, per-state visited-once map, `action ↦ [distribution]`
//! result shape) and the idiomatic-Rust walk shape of
//! `other_examples/15449eef_pouyapd-scan__scan_core-src-transition_system.rs.rs`'s
//! `TransitionSystem` trait.

use crate::state::State;
use crate::system::System;
use crate::transition::Transition;
use fnv::FnvHashMap;
use log::trace;
use std::collections::{HashSet, VecDeque};

/// Traversal order for the exploration frontier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    /// Last-in-first-out (depth-first); `depth` is always reported as 0.
    Lifo,
    /// First-in-first-out (breadth-first); `depth` is the BFS level of
    /// first discovery.
    Fifo,
}

/// A selector picks the subset of `enabled(S)` worth exploring from.
/// Consulted only when more than one transition is enabled; the
/// partial-order-reduction selectors in [`crate::selectors`] all implement
/// this signature.
pub type Selector<'a> = dyn Fn(&System, &State) -> Vec<Transition> + 'a;

/// One yielded step of exploration: the state, the `action ↦ distributions`
/// map computed from its selected enabled transitions, and its discovery
/// depth.
pub struct Visit {
    pub state: State,
    pub actions: Vec<(String, Vec<Vec<(State, f64)>>)>,
    pub depth: u32,
}

/// `explore(M, start, selector?, order)`: the general entry point. Each
/// reachable state is yielded exactly once.
pub fn explore(system: &System, start: State, selector: Option<&Selector<'_>>, order: Order) -> Vec<Visit> {
    let mut visited: HashSet<State> = HashSet::new();
    let mut results = Vec::new();
    let mut frontier: VecDeque<(State, u32)> = VecDeque::new();
    frontier.push_back((start.clone(), 0));
    visited.insert(start);

    while let Some((state, depth)) = match order {
        Order::Lifo => frontier.pop_back(),
        Order::Fifo => frontier.pop_front(),
    } {
        let candidates = system.enabled(&state);
        let selected = match (&candidates.len(), selector) {
            (1, _) | (0, _) => candidates,
            (_, Some(select)) => select(system, &state),
            (_, None) => candidates,
        };

        let next_depth = if order == Order::Fifo { depth + 1 } else { 0 };

        let mut actions: FnvHashMap<String, Vec<Vec<(State, f64)>>> = FnvHashMap::default();
        let mut action_order = Vec::new();
        for transition in &selected {
            let successors = transition.successors(&state);
            for (succ, _) in &successors {
                if visited.insert(succ.clone()) {
                    trace!("discovered new state at depth {next_depth}");
                    frontier.push_back((succ.clone(), next_depth));
                }
            }
            let action_text = interned_action_key(transition);
            if !actions.contains_key(&action_text) {
                action_order.push(action_text.clone());
            }
            actions.entry(action_text).or_default().push(successors);
        }

        let actions = action_order.into_iter().map(|key| (key.clone(), actions.remove(&key).unwrap())).collect();
        results.push(Visit { state, actions, depth });
    }
    results
}

/// The action label is already available as an `Id`-keyed `stripped` field;
/// exploration needs only a stable grouping key, so the raw id's decimal
/// string is used rather than resolving through an [`crate::intern::Interner`]
/// the walk doesn't otherwise need a reference to.
fn interned_action_key(transition: &Transition) -> String {
    format!("{}{:?}", transition.action.stripped, transition.action.direction)
}

/// Depth-first convenience wrapper over [`explore`].
pub fn explore_dfs(system: &System, selector: Option<&Selector<'_>>) -> Vec<Visit> {
    explore(system, system.init.clone(), selector, Order::Lifo)
}

/// Breadth-first convenience wrapper over [`explore`].
pub fn explore_bfs(system: &System, selector: Option<&Selector<'_>>) -> Vec<Visit> {
    explore(system, system.init.clone(), selector, Order::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::intern::Interner;
    use crate::process::Process;
    use crate::state::{Ctx, Locs};
    use crate::transition::{Action, Direction, Post};

    fn linear_system() -> System {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let s2 = interner.intern("s2");
        let a = interner.intern("a");
        let b = interner.intern("b");
        let t1 = Transition {
            action: Action { stripped: a, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let t2 = Transition {
            action: Action { stripped: b, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s1),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s2), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let init = State::new(Locs::single(s0), Ctx::new());
        let process = Process::new(&interner, "p", vec![t1, t2], init);
        System::compose(&interner, vec![process]).unwrap()
    }

    #[test]
    fn explores_every_reachable_state_exactly_once() {
        let system = linear_system();
        let visits = explore_dfs(&system, None);
        assert_eq!(visits.len(), 3);
    }

    #[test]
    fn deadlock_state_has_empty_action_map() {
        let system = linear_system();
        let visits = explore_dfs(&system, None);
        let terminal = visits.iter().find(|v| v.actions.is_empty()).expect("s2 has no outgoing transitions");
        assert_eq!(terminal.state.locs.len(), 1);
    }

    #[test]
    fn bfs_depth_increases_monotonically_along_frontier_order() {
        let system = linear_system();
        let visits = explore_bfs(&system, None);
        assert_eq!(visits[0].depth, 0);
        assert!(visits.iter().any(|v| v.depth == 1));
    }

    #[test]
    fn lifo_depth_is_always_zero() {
        let system = linear_system();
        let visits = explore_dfs(&system, None);
        assert_eq!(visits.len(), 3);
        assert!(visits.iter().all(|v| v.depth == 0));
    }
}
