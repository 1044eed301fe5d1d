//! A single guarded-command transition system (§3, §4.3): the unit
//! composition (C4) consumes.
//!
//! Grounded on `original_source/mdptools/mdp2.py`'s process bookkeeping
//! (`MarkovDecisionProcess2.__bind_transition`, `ensure_process`), which
//! assigns each process a name and an identity label set before
//! composition ever runs.

use crate::intern::{Id, Interner};
use crate::state::{Locs, State};
use crate::transition::Transition;
use fnv::FnvHashMap;

/// A process identity: every process gets one id, interned from its name,
/// used to tag [`Transition::active`] and as the key into
/// [`Process::labels`] membership checks (`project`, `is_parallel`).
pub type ProcessId = Id;

/// `P = (name, Labels_P, T_P, Init_P)`.
#[derive(Clone, Debug)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub labels: Locs,
    pub transitions: Vec<Transition>,
    pub init: State,
}

impl Process {
    #[must_use]
    pub fn new(interner: &Interner, name: &str, transitions: Vec<Transition>, init: State) -> Process {
        let labels = transitions.iter().fold(init.locs.clone(), |acc, t| {
            acc.union(&t.pre).union(&pre_and_post_locs(t))
        });
        Process {
            id: interner.intern(name),
            name: name.to_string(),
            labels,
            transitions,
            init,
        }
    }

    /// `rename(label_fn, action_fn)`: maps over every transition and
    /// `Init_P`, yielding a new process. `label_fn`/`action_fn` are applied
    /// to each distinct label/action id exactly once through a memoizing
    /// map, so renaming is a pure substitution, not a pass that might
    /// diverge between occurrences of the same label.
    pub fn rename(
        &self,
        interner: &Interner,
        mut label_fn: impl FnMut(&str) -> String,
        mut action_fn: impl FnMut(&str) -> String,
    ) -> Process {
        let mut label_map: FnvHashMap<Id, Id> = FnvHashMap::default();
        for label in self.labels.iter() {
            let renamed = label_fn(interner.resolve(label));
            label_map.insert(label, interner.intern(&renamed));
        }
        let mut action_map: FnvHashMap<Id, Id> = FnvHashMap::default();
        let transitions = self
            .transitions
            .iter()
            .map(|t| {
                let mut action = t.action.clone();
                action.stripped = *action_map
                    .entry(action.stripped)
                    .or_insert_with(|| interner.intern(&action_fn(interner.resolve(action.stripped))));
                crate::transition::Transition {
                    action,
                    pre: rename_locs(&t.pre, &label_map),
                    guard: t.guard.clone(),
                    post: rename_post(&t.post, &label_map),
                    active: t.active.clone(),
                }
            })
            .collect();
        Process {
            id: self.id,
            name: self.name.clone(),
            labels: rename_locs(&self.labels, &label_map),
            transitions,
            init: self.init.rename(&label_map),
        }
    }
}

fn rename_locs(locs: &Locs, map: &FnvHashMap<Id, Id>) -> Locs {
    Locs::from_iter(locs.iter().map(|l| *map.get(&l).unwrap_or(&l)))
}

fn rename_post(post: &crate::transition::Post, map: &FnvHashMap<Id, Id>) -> crate::transition::Post {
    let outcomes = post
        .outcomes()
        .iter()
        .map(|o| crate::transition::Outcome {
            locs: rename_locs(&o.locs, map),
            update: o.update.clone(),
            probability: o.probability,
        })
        .collect();
    crate::transition::Post::new(outcomes)
}

fn pre_and_post_locs(t: &Transition) -> Locs {
    t.post.outcomes().iter().fold(Locs::new(), |acc, o| acc.union(&o.locs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::state::Ctx;
    use crate::transition::{Action, Direction, Post};

    #[test]
    fn process_labels_cover_pre_and_post() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let a = interner.intern("a");
        let t = Transition {
            action: Action { stripped: a, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let init = State::new(Locs::single(s0), Ctx::new());
        let p = Process::new(&interner, "p", vec![t], init);
        assert!(p.labels.contains(s0));
        assert!(p.labels.contains(s1));
    }

    #[test]
    fn rename_substitutes_labels_and_actions_consistently() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let a = interner.intern("a");
        let t = Transition {
            action: Action { stripped: a, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let init = State::new(Locs::single(s0), Ctx::new());
        let p = Process::new(&interner, "p", vec![t], init);
        let renamed = p.rename(&interner, |l| format!("q_{l}"), |a| format!("{a}_2"));
        assert_eq!(renamed.init.locs.as_slice(), &[interner.intern("q_s0")]);
        assert_eq!(
            interner.resolve(renamed.transitions[0].action.stripped),
            "a_2"
        );
    }

    /// §8 "Renaming round-trip": `rename(f); rename(f⁻¹)` yields a process
    /// equal (up to re-interning) to the original — exercised here on both
    /// the label and action substitutions `rename` applies.
    #[test]
    fn rename_then_inverse_rename_restores_original_labels_and_actions() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let a = interner.intern("a");
        let t = Transition {
            action: Action { stripped: a, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(s0),
            guard: Guard::empty(),
            post: Post::deterministic(Locs::single(s1), Update::empty()),
            active: Locs::single(interner.intern("p")),
        };
        let init = State::new(Locs::single(s0), Ctx::new());
        let original = Process::new(&interner, "p", vec![t], init);

        let forward = |s: &str| format!("q_{s}");
        let backward = |s: &str| s.strip_prefix("q_").expect("rename prefixed every label").to_string();

        let renamed = original.rename(&interner, forward, |a: &str| a.to_string());
        let restored = renamed.rename(&interner, backward, |a: &str| a.to_string());

        assert_eq!(restored.init.locs, original.init.locs);
        assert_eq!(restored.labels, original.labels);
        assert_eq!(restored.transitions[0].pre, original.transitions[0].pre);
        assert_eq!(
            restored.transitions[0].action.stripped,
            original.transitions[0].action.stripped
        );
    }
}
