//! Maximum-reachability probability solver (§4.7, C7).
//!
//! Grounded on `original_source/mdptools/utils/prob_max.py`'s
//! `equation_system`/`pr_max` (per-state Bellman equation, `can_reach_goal`
//! backward search, module-level `memo` dict keyed by MDP identity) and
//! `other_examples/2703f182_..._mdp_model.rs.rs`'s `value_iteration` for the
//! idiomatic Rust iteration shape — in place of the Python's `scipy.fsolve`,
//! which has no equivalent among the available dependencies, this solves the
//! same fixed point by straightforward value iteration.

use crate::search::Visit;
use crate::state::{PartialState, State};
use fnv::FnvHashMap;
use log::warn;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum value-iteration sweeps before giving up and logging a
/// non-convergence diagnostic (§4.7's failure mode: diagnostic, no
/// exception).
const MAX_ITERATIONS: usize = 100_000;

/// Convergence threshold: componentwise change below `10 * f64::EPSILON`.
const CONVERGENCE_EPS: f64 = f64::EPSILON * 10.0;

type GoalKey = Vec<(crate::state::Locs, Vec<(crate::intern::Id, i64)>)>;

fn goal_key(goal: &[PartialState]) -> GoalKey {
    goal.iter().map(|g| (g.locs.clone(), g.ctx_constraints.clone())).collect()
}

lazy_static::lazy_static! {
    static ref PROB_MEMO: Mutex<FnvHashMap<(usize, GoalKey), FnvHashMap<State, f64>>> =
        Mutex::new(FnvHashMap::default());
}

/// Clears the module-scoped probability memo. Per DESIGN NOTES'
/// "Memoization lifetime", callers that reuse the same system address
/// across distinct logical runs (e.g. an experiment driver that frees one
/// `System` and allocates another) must call this between runs to avoid a
/// stale identity-keyed hit.
pub fn clear_memo() {
    PROB_MEMO.lock().unwrap().clear();
}

/// `pr_max`: computes `P_max(◇ Goal)` for every state in the explored graph
/// `visits`, memoized on `(system_identity, goal_set)` as described in §5 —
/// `system` only provides a stable identity for the cache key, its contents
/// are not otherwise consulted (`visits` already carries everything the
/// solver needs).
#[must_use]
pub fn prob_max<T>(system: &T, visits: &[Visit], goal: &[PartialState]) -> FnvHashMap<State, f64> {
    let identity = system as *const T as usize;
    let key = (identity, goal_key(goal));
    if let Some(cached) = PROB_MEMO.lock().unwrap().get(&key) {
        return cached.clone();
    }
    let solved = solve(visits, goal);
    PROB_MEMO.lock().unwrap().insert(key, solved.clone());
    solved
}

/// The value-at-the-initial-state convenience the Python's `pr_max(mdp)`
/// (no explicit state) exposes; `visits[0]` is always the initial state
/// because [`crate::search::explore`] enqueues it first.
#[must_use]
pub fn prob_max_init<T>(system: &T, visits: &[Visit], goal: &[PartialState]) -> f64 {
    let solved = prob_max(system, visits, goal);
    visits.first().map(|v| solved.get(&v.state).copied().unwrap_or(0.0)).unwrap_or(0.0)
}

fn solve(visits: &[Visit], goal: &[PartialState]) -> FnvHashMap<State, f64> {
    let index: FnvHashMap<State, usize> = visits.iter().enumerate().map(|(i, v)| (v.state.clone(), i)).collect();
    let reach = can_reach_goal(visits, goal);

    let n = visits.len();
    let mut v = vec![0.0_f64; n];
    for (i, visit) in visits.iter().enumerate() {
        if visit.state.is_goal(goal) {
            v[i] = 1.0;
        }
    }

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let mut next = v.clone();
        let mut max_delta = 0.0_f64;
        for (i, visit) in visits.iter().enumerate() {
            if visit.state.is_goal(goal) || !reach[i] {
                continue;
            }
            let mut best = 0.0_f64;
            for (_action, dists) in &visit.actions {
                for dist in dists {
                    let sum: f64 = dist
                        .iter()
                        .filter(|(succ, p)| !(*succ == visit.state && *p == 1.0))
                        .map(|(succ, p)| p * v[index[succ]])
                        .sum();
                    if sum > best {
                        best = sum;
                    }
                }
            }
            next[i] = best;
            max_delta = max_delta.max((next[i] - v[i]).abs());
        }
        v = next;
        if max_delta < CONVERGENCE_EPS {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!("probability solver did not converge within {MAX_ITERATIONS} iterations");
    }

    visits
        .iter()
        .enumerate()
        .map(|(i, visit)| (visit.state.clone(), round8(v[i])))
        .collect()
}

/// Backward reachability: `can_reach_goal(s)` is true iff `s` is itself a
/// goal state or has a successor (through any selected action/distribution)
/// that can reach the goal. Computed as a reverse-BFS from goal states over
/// the already-explored successor graph, rather than Python's per-state
/// memoized recursive search — equivalent result, no recursion depth risk.
fn can_reach_goal(visits: &[Visit], goal: &[PartialState]) -> Vec<bool> {
    let index: FnvHashMap<State, usize> = visits.iter().enumerate().map(|(i, v)| (v.state.clone(), i)).collect();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); visits.len()];
    for (i, visit) in visits.iter().enumerate() {
        for (_action, dists) in &visit.actions {
            for dist in dists {
                for (succ, _) in dist {
                    if let Some(&j) = index.get(succ) {
                        predecessors[j].push(i);
                    }
                }
            }
        }
    }

    let mut reach = vec![false; visits.len()];
    let mut queue = VecDeque::new();
    for (i, visit) in visits.iter().enumerate() {
        if visit.state.is_goal(goal) {
            reach[i] = true;
            queue.push_back(i);
        }
    }
    while let Some(i) = queue.pop_front() {
        for &p in &predecessors[i] {
            if !reach[p] {
                reach[p] = true;
                queue.push_back(p);
            }
        }
    }
    reach
}

fn round8(x: f64) -> f64 {
    (x * 1e8).round() / 1e8
}
