//! Transitions (§3, §4.2): guarded, probabilistically-branching steps
//! between states, and the synchronization product composition builds on.
//!
//! Grounded on `original_source/mdptools/model/transition.py`'s `Transition`
//! (`is_enabled`, `get_successors`, `in_conflict`, `is_parallel`,
//! `can_be_dependent`, `__mul__` as the synchronization product) and
//! `mdp2.py::combine_transitions` for the driver/receiver product rule.

use crate::command::{self, Guard, Update, Uses};
use crate::error::CompositionError;
use crate::intern::{Id, Interner};
use crate::state::{Ctx, Locs, State};

/// Directionality of a synchronizing action label, per §3's `a`: a label
/// may be suffixed `!` (send/"driver") or `?` (receive), or carry neither
/// suffix for a symmetric rendezvous.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Send,
    Receive,
    Symmetric,
}

/// An action label: its stripped (direction-removed) identity plus
/// directionality, with `tau`-prefixed labels flagged as never
/// synchronizing (§4.4 step 3).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Action {
    pub stripped: Id,
    pub direction: Direction,
    pub is_tau: bool,
}

impl Action {
    /// Parses an action label of the shape `name`, `name!`, or `name?`.
    /// A `tau`-prefixed name (case-sensitive, matching the `tau*` rule of
    /// §4.4) is always [`Direction::Symmetric`] and never synchronizes.
    #[must_use]
    pub fn parse(interner: &Interner, text: &str) -> Action {
        let (base, direction) = match text.strip_suffix('!') {
            Some(base) => (base, Direction::Send),
            None => match text.strip_suffix('?') {
                Some(base) => (base, Direction::Receive),
                None => (text, Direction::Symmetric),
            },
        };
        Action {
            stripped: interner.intern(base),
            direction,
            is_tau: base.starts_with("tau"),
        }
    }

    pub fn text(&self, interner: &Interner) -> String {
        let suffix = match self.direction {
            Direction::Send => "!",
            Direction::Receive => "?",
            Direction::Symmetric => "",
        };
        format!("{}{}", interner.resolve(self.stripped), suffix)
    }
}

/// A single probabilistic outcome of a transition's `Post`: the
/// replacement location labels and the update applied, at weight `p`.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub locs: Locs,
    pub update: Update,
    pub probability: f64,
}

/// `Post`: a non-empty finite distribution over outcomes, with
/// probabilities summing to 1 within one ULP of floating tolerance (I2).
#[derive(Clone, Debug, PartialEq)]
pub struct Post(Vec<Outcome>);

const PROBABILITY_TOLERANCE: f64 = 1e-9;

impl Post {
    /// Builds a `Post` from its outcomes, asserting I2 (probabilities sum
    /// to 1). Panics on violation: a malformed distribution is a
    /// construction-time programming error, not a recoverable input fault
    /// (inputs come from the construction DSL, which always normalizes
    /// weights before calling this).
    #[must_use]
    pub fn new(outcomes: Vec<Outcome>) -> Post {
        assert!(!outcomes.is_empty(), "Post must have at least one outcome");
        let total: f64 = outcomes.iter().map(|o| o.probability).sum();
        assert!(
            (total - 1.0).abs() <= PROBABILITY_TOLERANCE,
            "Post probabilities must sum to 1, got {total}"
        );
        Post(outcomes)
    }

    /// A non-probabilistic (`|Post| = 1`, `p = 1`) transition's postset.
    #[must_use]
    pub fn deterministic(locs: Locs, update: Update) -> Post {
        Post(vec![Outcome { locs, update, probability: 1.0 }])
    }

    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.0
    }

    /// Distribution product (§4.2): Cartesian-product outcomes with
    /// multiplied weights; updates are merged, erroring if both sides
    /// assign the same variable with different right-hand sides.
    pub fn product(&self, other: &Post, action: &str, interner: &Interner) -> Result<Post, CompositionError> {
        let mut outcomes = Vec::with_capacity(self.0.len() * other.0.len());
        for a in &self.0 {
            for b in &other.0 {
                let update = a.update.merge(&b.update).map_err(|var| CompositionError {
                    action: action.to_string(),
                    variable: interner.resolve(var).to_string(),
                })?;
                outcomes.push(Outcome {
                    locs: a.locs.union(&b.locs),
                    update,
                    probability: a.probability * b.probability,
                });
            }
        }
        Ok(Post(outcomes))
    }
}

/// A guarded, probabilistically-branching step (§3's `T = (a, Pre, G, Post,
/// Active)`).
#[derive(Clone, Debug)]
pub struct Transition {
    pub action: Action,
    pub pre: Locs,
    pub guard: Guard,
    pub post: Post,
    pub active: Locs,
}

impl Transition {
    /// `is_enabled(T, S) ≡ Pre ⊆ Locs_S ∧ evaluate_guard(G, Ctx_S)`.
    #[must_use]
    pub fn is_enabled(&self, state: &State) -> bool {
        self.pre.is_subset_of(&state.locs) && command::evaluate_guard(&self.guard, |v| state.ctx.get(v))
    }

    /// `successors(T, S) -> { S' ↦ p }`. Returns an empty vector if `T` is
    /// not enabled in `S`.
    #[must_use]
    pub fn successors(&self, state: &State) -> Vec<(State, f64)> {
        if !self.is_enabled(state) {
            return Vec::new();
        }
        let base = state.locs.difference(&self.pre);
        self.post
            .outcomes()
            .iter()
            .map(|outcome| {
                let locs = base.union(&outcome.locs);
                let applied = command::apply_update(&outcome.update, |v| state.ctx.get(v));
                let ctx = state.ctx.apply(&applied);
                (State::new(locs, ctx), outcome.probability)
            })
            .collect()
    }

    /// `in_conflict(T1, T2) ≡ Pre_1 ∩ Pre_2 ≠ ∅`.
    #[must_use]
    pub fn in_conflict(&self, other: &Transition) -> bool {
        self.pre.iter().any(|l| other.pre.contains(l))
    }

    /// `is_parallel(T1, T2) ≡ Active_1 ∩ Active_2 = ∅`.
    #[must_use]
    pub fn is_parallel(&self, other: &Transition) -> bool {
        !self.active.iter().any(|p| other.active.contains(p))
    }

    /// Every variable referenced by this transition's guard or any outcome
    /// of its postset, with the read/write capabilities C1's `uses` would
    /// report for it.
    #[must_use]
    pub fn uses(&self) -> Uses {
        let mut uses = self.guard.uses();
        for outcome in self.post.outcomes() {
            for (var, caps) in outcome.update.uses() {
                uses.entry(var).or_default().read |= caps.read;
                uses.entry(var).or_default().write |= caps.write;
            }
        }
        uses
    }

    /// `can_be_dependent(T1, T2)`: true iff some variable used by `T1` and
    /// some variable used by `T2` are C1-dependent (shared, and written by
    /// at least one side).
    #[must_use]
    pub fn can_be_dependent(&self, other: &Transition) -> bool {
        command::uses_dependent(&self.uses(), &other.uses())
    }

    /// `product(T1, T2) -> T`: the synchronization product (§4.2).
    /// `action` is the (already-stripped) label the product transition
    /// carries.
    pub fn product(&self, other: &Transition, action: Action, interner: &Interner) -> Result<Transition, CompositionError> {
        let post = self.post.product(&other.post, &action.text(interner), interner)?;
        Ok(Transition {
            action,
            pre: self.pre.union(&other.pre),
            guard: self.guard.and(&other.guard),
            post,
            active: self.active.union(&other.active),
        })
    }
}
