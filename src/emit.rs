//! Model-checker text emission (§4.9, §6, C9): a pure mapping from an
//! explored system to the PRISM-format module text and its companion
//! reachability-properties file.
//!
//! Grounded on `original_source/mdptools/utils/prism.py`'s `to_prism`
//! (single flat `s` variable, `p_value:(s'=id')` update shape), generalized
//! to the multi-process/multi-variable format §6 fixes — the Python version
//! pre-dates composition and only ever emitted one location variable.
//! Identifier sanitization is grounded on `utils/format_str.py`'s
//! `to_identifier`.

use crate::command::{Assign, Rhs};
use crate::intern::{Id, Interner};
use crate::search::Visit;
use crate::state::PartialState;
use crate::system::System;
use fnv::FnvHashMap;
use lazy_static::lazy_static;
use regex::Regex;

/// `to_identifier(name)`: sanitizes `name` into a valid PRISM identifier by
/// replacing runs of non-word characters, or a leading run of digits, with
/// a single underscore.
#[must_use]
pub fn to_identifier(name: &str) -> String {
    lazy_static! {
        static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
        static ref LEADING_DIGITS: Regex = Regex::new(r"^[0-9]+").unwrap();
    }
    let replaced = NON_WORD.replace_all(name, "_");
    LEADING_DIGITS.replace(&replaced, "_").into_owned()
}

/// Per-process assignment of local PRISM location ids: index into
/// [`System::processes`] plus the contiguous `0..=max` id within that
/// process's (sorted, since [`crate::state::Locs`] is kept sorted) label
/// set.
struct LocIndex {
    /// `label -> (process_index, local_id)`.
    by_label: FnvHashMap<Id, (usize, u32)>,
    /// `process id -> process_index`, needed to line up an `Active` process
    /// id with the label indexing above when no concrete label is at hand.
    by_process: FnvHashMap<Id, usize>,
}

fn build_loc_index(system: &System) -> LocIndex {
    let mut by_label = FnvHashMap::default();
    let mut by_process = FnvHashMap::default();
    for (pi, process) in system.processes.iter().enumerate() {
        by_process.insert(process.id, pi);
        for (local_id, label) in process.labels.iter().enumerate() {
            by_label.insert(label, (pi, local_id as u32));
        }
    }
    LocIndex { by_label, by_process }
}

impl LocIndex {
    fn get(&self, label: Id) -> (usize, u32) {
        *self.by_label.get(&label).expect("location label belongs to some process")
    }

    fn process_index(&self, process_id: Id) -> usize {
        *self.by_process.get(&process_id).expect("active process id is a known process")
    }
}

/// Observed `[min..max]` bounds plus the initial value for every variable
/// that appears in any reachable state's store, derived from `visits` per
/// §6 ("observed bounds derived from exploration").
fn variable_bounds(system: &System, visits: &[Visit]) -> Vec<(Id, i64, i64, i64)> {
    let mut bounds: FnvHashMap<Id, (i64, i64)> = FnvHashMap::default();
    for visit in visits {
        for (var, value) in visit.state.ctx.iter() {
            bounds
                .entry(var)
                .and_modify(|(lo, hi)| {
                    *lo = (*lo).min(value);
                    *hi = (*hi).max(value);
                })
                .or_insert((value, value));
        }
    }
    let mut vars: Vec<Id> = bounds.keys().copied().collect();
    vars.sort_unstable();
    vars.into_iter()
        .map(|var| {
            let (lo, hi) = bounds[&var];
            let init = system.init.ctx.get(var);
            (var, lo, hi, init)
        })
        .collect()
}

/// `to_prism(system, visits, interner)`: emits the §6 PRISM-format module
/// text for the composed system, restricted to transitions observed to be
/// enabled somewhere in `visits` (so dead transitions from an unreachable
/// branch of the construction DSL never appear in the output).
#[must_use]
pub fn to_prism(system: &System, visits: &[Visit], interner: &Interner, name: &str) -> String {
    let loc_index = build_loc_index(system);
    let vars = variable_bounds(system, visits);

    let mut buffer = String::new();
    buffer.push_str("mdp\n\n");
    buffer.push_str(&format!("module {}\n", to_identifier(name)));

    for (pi, process) in system.processes.iter().enumerate() {
        let max_id = process.labels.len().saturating_sub(1);
        let (_, init_id) = loc_index.get(process.init.locs.iter().next().expect("process init has one location"));
        buffer.push_str(&format!("  p{pi} : [0..{max_id}] init {init_id};\n"));
        for (local_id, label) in process.labels.iter().enumerate() {
            buffer.push_str(&format!("  // {local_id} : {}\n", interner.resolve(label)));
        }
    }
    buffer.push('\n');

    for &(var, lo, hi, init) in &vars {
        buffer.push_str(&format!("  {} : [{lo}..{hi}] init {init};\n", interner.resolve(var)));
    }
    buffer.push('\n');

    let emitted = enabled_transition_indices(system, visits);
    for ti in emitted {
        let transition = &system.transitions[ti];
        let pre_conjunction = pre_conjunction_text(transition, &loc_index, interner);
        let action_text = transition.action.text(interner);
        let rhs = transition
            .post
            .outcomes()
            .iter()
            .map(|outcome| {
                let update_text = outcome_update_text(transition, outcome, &loc_index, interner);
                if (outcome.probability - 1.0).abs() <= f64::EPSILON * 10.0 && transition.post.outcomes().len() == 1 {
                    update_text
                } else {
                    format!("{}:{update_text}", format_weight(outcome.probability))
                }
            })
            .collect::<Vec<_>>()
            .join(" + ");
        buffer.push_str(&format!("  [{action_text}] {pre_conjunction} -> {rhs};\n"));
    }

    buffer.push_str("endmodule");
    buffer
}

fn enabled_transition_indices(system: &System, visits: &[Visit]) -> Vec<usize> {
    let mut seen: Vec<usize> = (0..system.transitions.len())
        .filter(|&i| visits.iter().any(|v| system.transitions[i].is_enabled(&v.state)))
        .collect();
    seen.sort_unstable();
    seen
}

fn pre_conjunction_text(transition: &crate::transition::Transition, loc_index: &LocIndex, interner: &Interner) -> String {
    let mut clauses: Vec<String> = transition
        .pre
        .iter()
        .map(|label| {
            let (pi, id) = loc_index.get(label);
            format!("p{pi}={id}")
        })
        .collect();
    if !transition.guard.is_empty() {
        clauses.push(transition.guard.text(interner));
    }
    clauses.join(" & ")
}

fn outcome_update_text(
    transition: &crate::transition::Transition,
    outcome: &crate::transition::Outcome,
    loc_index: &LocIndex,
    interner: &Interner,
) -> String {
    let mut clauses = Vec::new();
    for pid in transition.active.iter() {
        let pi = loc_index.process_index(pid);
        let old_label = transition.pre.iter().find(|&l| loc_index.get(l).0 == pi);
        let new_label = outcome.locs.iter().find(|&l| loc_index.get(l).0 == pi);
        if let (Some(old), Some(new)) = (old_label, new_label) {
            if old != new {
                let (_, new_id) = loc_index.get(new);
                clauses.push(format!("(p{pi}'={new_id})"));
            }
        }
    }
    for assign in outcome.update.assigns() {
        clauses.push(format_assign(assign, interner));
    }
    if clauses.is_empty() {
        "true".to_string()
    } else {
        clauses.join(" & ")
    }
}

fn format_assign(assign: &Assign, interner: &Interner) -> String {
    let target = interner.resolve(assign.target);
    match assign.rhs {
        Rhs::Literal(n) => format!("({target}'={n})"),
        Rhs::VarOffset { source, delta } => {
            let sign = if delta >= 0 { "+" } else { "-" };
            format!("({target}'={}{sign}{})", interner.resolve(source), delta.abs())
        }
    }
}

fn format_weight(p: f64) -> String {
    let rounded = (p * 1e8).round() / 1e8;
    let text = format!("{rounded}");
    text
}

/// `to_properties(goal, system, interner)`: one reachability formula per
/// goal disjunct, `Pmax=? [F (clause_1) | (clause_2) | ...]` with each
/// clause a `&`-joined list of `pX=id`/`var=value` constraints.
#[must_use]
pub fn to_properties(system: &System, goal: &[PartialState], interner: &Interner) -> String {
    let loc_index = build_loc_index(system);
    let clauses: Vec<String> = goal
        .iter()
        .map(|g| {
            let mut parts: Vec<String> = g
                .locs
                .iter()
                .map(|label| {
                    let (pi, id) = loc_index.get(label);
                    format!("p{pi}={id}")
                })
                .collect();
            parts.extend(
                g.ctx_constraints
                    .iter()
                    .map(|&(var, value)| format!("{}={value}", interner.resolve(var))),
            );
            format!("({})", parts.join(" & "))
        })
        .collect();
    format!("Pmax=? [F {}]", clauses.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::process::Process;
    use crate::search::explore_dfs;
    use crate::state::{Ctx, Locs, State};
    use crate::transition::{Action, Direction, Outcome, Post, Transition};

    #[test]
    fn to_identifier_replaces_non_word_and_leading_digits() {
        assert_eq!(to_identifier("my system"), "my_system");
        assert_eq!(to_identifier("2nd-try"), "_nd_try");
    }

    fn coin_system(interner: &Interner) -> System {
        let u = interner.intern("u");
        let h = interner.intern("h");
        let t = interner.intern("t");
        let flip = interner.intern("flip");
        let transition = Transition {
            action: Action { stripped: flip, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(u),
            guard: Guard::empty(),
            post: Post::new(vec![
                Outcome { locs: Locs::single(h), update: Update::empty(), probability: 0.5 },
                Outcome { locs: Locs::single(t), update: Update::empty(), probability: 0.5 },
            ]),
            active: Locs::single(interner.intern("coin")),
        };
        let init = State::new(Locs::single(u), Ctx::new());
        let p = Process::new(interner, "coin", vec![transition], init);
        System::compose(interner, vec![p]).unwrap()
    }

    #[test]
    fn to_prism_emits_mdp_header_and_endmodule() {
        let interner = Interner::new();
        let system = coin_system(&interner);
        let visits = explore_dfs(&system, None);
        let text = to_prism(&system, &visits, &interner, "coin");
        assert!(text.starts_with("mdp\n\nmodule coin\n"));
        assert!(text.trim_end().ends_with("endmodule"));
        assert!(text.contains("[flip]"));
        assert!(text.contains("0.5:"));
    }

    #[test]
    fn to_properties_formats_single_goal_clause() {
        let interner = Interner::new();
        let system = coin_system(&interner);
        let h = interner.intern("h");
        let goal = vec![PartialState { locs: Locs::single(h), ctx_constraints: vec![] }];
        let text = to_properties(&system, &goal, &interner);
        assert_eq!(text, "Pmax=? [F (p0=1)]");
    }
}
