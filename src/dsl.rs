//! Process/transition construction DSL (§6): a friendly surface for
//! building processes without hand-assembling [`crate::transition::Post`]
//! distributions.
//!
//! Grounded on `original_source/mdptools/model/transition.py`'s
//! `transition()`/`structure_post()`/`post_state()` (the overloaded
//! "post omitted / single label / (label, update) / {label: probability}"
//! shapes) and `mdp2.py`'s `__bind_transition` (process-name → process-id
//! binding at construction). Per DESIGN NOTES' "Dynamic DSL → static
//! input", the Python's runtime-polymorphic tuples are replaced by the
//! single [`Post`] sum type below — no type erasure survives past this
//! module's constructors.

use crate::command::{parse_guard, parse_update};
use crate::intern::Interner;
use crate::process::Process;
use crate::state::{Ctx, Locs, State};
use crate::transition::{Action, Outcome, Post as PostDist, Transition};

/// A single transition's post-set, in one of three shapes: omitted (same
/// location, no update), a single deterministic replacement, or an explicit
/// probability distribution over replacements.
#[derive(Clone, Debug)]
pub enum Post {
    /// Post omitted: the transition is a self-loop location-wise.
    Same,
    /// A single deterministic replacement location, with an update.
    Det(&'static str, &'static str),
    /// An explicit distribution: `(location, update, probability)` triples,
    /// probabilities expected to sum to 1 (enforced by [`PostDist::new`]).
    Dist(Vec<(&'static str, &'static str, f64)>),
}

/// One transition as written by a caller: action label text, the single
/// required preset location, guard text (`""` for none), and a post-set.
#[derive(Clone, Debug)]
pub struct TransitionSpec {
    pub action: &'static str,
    pub pre: &'static str,
    pub guard: &'static str,
    pub post: Post,
}

#[must_use]
pub fn det(label: &'static str) -> Post {
    Post::Det(label, "")
}

#[must_use]
pub fn det_with_update(label: &'static str, update: &'static str) -> Post {
    Post::Det(label, update)
}

#[must_use]
pub fn same() -> Post {
    Post::Same
}

#[must_use]
pub fn dist(branches: Vec<(&'static str, &'static str, f64)>) -> Post {
    Post::Dist(branches)
}

/// Builds a [`Transition`] from a [`TransitionSpec`], tagging it with
/// `active` (the owning process's interned identity — composition grows
/// this set as processes are synchronized).
///
/// # Panics
/// Panics if `spec.guard`/the update text of any branch fails to parse —
/// the DSL is meant for program-authored construction, where a malformed
/// literal is a programming error caught immediately, not recoverable
/// input (matching `transition.py`'s behavior of raising straight out of
/// `guard()`/`update()` on bad syntax).
#[must_use]
pub fn transition(interner: &Interner, spec: &TransitionSpec, active: Locs) -> Transition {
    let pre_label = interner.intern(spec.pre);
    let guard = parse_guard(interner, spec.guard).expect("malformed guard literal in DSL transition spec");
    let post = structure_post(interner, spec.pre, &spec.post);
    Transition {
        action: Action::parse(interner, spec.action),
        pre: Locs::single(pre_label),
        guard,
        post,
        active,
    }
}

fn structure_post(interner: &Interner, pre: &'static str, post: &Post) -> PostDist {
    match post {
        Post::Same => {
            let loc = interner.intern(pre);
            PostDist::deterministic(Locs::single(loc), crate::command::Update::empty())
        }
        Post::Det(label, update_text) => {
            let loc = interner.intern(label);
            let update = parse_update(interner, update_text).expect("malformed update literal in DSL transition spec");
            PostDist::deterministic(Locs::single(loc), update)
        }
        Post::Dist(branches) => {
            let outcomes = branches
                .iter()
                .map(|&(label, update_text, probability)| {
                    let loc = interner.intern(label);
                    let update = parse_update(interner, update_text).expect("malformed update literal in DSL transition spec");
                    Outcome { locs: Locs::single(loc), update, probability }
                })
                .collect();
            PostDist::new(outcomes)
        }
    }
}

/// Builds a [`Process`] from a name, its transitions (in declaration
/// order), an initial location, and initial variable assignments.
#[must_use]
pub fn process(
    interner: &Interner,
    name: &'static str,
    specs: &[TransitionSpec],
    init_loc: &'static str,
    init_ctx: &[(&'static str, i64)],
) -> Process {
    let process_id = interner.intern(name);
    let active = Locs::single(process_id);
    let transitions = specs.iter().map(|spec| transition(interner, spec, active.clone())).collect();
    let ctx = Ctx::from_pairs(init_ctx.iter().map(|&(v, n)| (interner.intern(v), n)));
    let init = State::new(Locs::single(interner.intern(init_loc)), ctx);
    Process::new(interner, name, transitions, init)
}

/// Shorthand for a guard-free, update-free transition.
#[must_use]
pub fn t(action: &'static str, pre: &'static str, post: Post) -> TransitionSpec {
    TransitionSpec { action, pre, guard: "", post }
}

/// A guarded transition.
#[must_use]
pub fn guarded(action: &'static str, pre: &'static str, guard: &'static str, post: Post) -> TransitionSpec {
    TransitionSpec { action, pre, guard, post }
}
