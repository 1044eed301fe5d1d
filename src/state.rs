//! Global and process-local state (§3, §4.2): the location-label set and
//! variable store a `State` pairs, plus the set/store operations the search
//! and composition engines build on.
//!
//! Grounded on `original_source/mdptools/model/state.py`'s `State` (with its
//! `locations`/`context` fields and `add`/`subtract`/`rename`/`is_goal`
//! methods); the backing representation follows DESIGN NOTES' "sorted
//! small-array of interned label ids" guidance rather than the Python's
//! `frozenset`/`dict`, since the target language can make the common case
//! (few processes, a handful of variables) allocation-free.

use crate::intern::Id;
use tinyvec::TinyVec;

/// A set of interned location labels, exactly one per participating
/// process, kept sorted and deduplicated so that equality and hashing are
/// structural without a separate normalization pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Locs(TinyVec<[Id; 4]>);

impl Locs {
    #[must_use]
    pub fn new() -> Self {
        Locs(TinyVec::new())
    }

    #[must_use]
    pub fn single(label: Id) -> Self {
        let mut v = TinyVec::new();
        v.push(label);
        Locs(v)
    }

    #[must_use]
    pub fn from_iter(labels: impl IntoIterator<Item = Id>) -> Self {
        let mut v: TinyVec<[Id; 4]> = labels.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Locs(v)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Id] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: Id) -> bool {
        self.0.binary_search(&label).is_ok()
    }

    /// True iff every label of `self` is also in `other` (`self ⊆ other`).
    #[must_use]
    pub fn is_subset_of(&self, other: &Locs) -> bool {
        self.0.iter().all(|l| other.contains(*l))
    }

    /// Set union, deduplicated and re-sorted.
    #[must_use]
    pub fn union(&self, other: &Locs) -> Locs {
        let mut v: TinyVec<[Id; 4]> = self.0.iter().chain(other.0.iter()).copied().collect();
        v.sort_unstable();
        v.dedup();
        Locs(v)
    }

    /// Set difference `self \ other`.
    #[must_use]
    pub fn difference(&self, other: &Locs) -> Locs {
        let v: TinyVec<[Id; 4]> = self.0.iter().copied().filter(|l| !other.contains(*l)).collect();
        Locs(v)
    }

    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Id> for Locs {
    fn from_iter<T: IntoIterator<Item = Id>>(iter: T) -> Self {
        Locs::from_iter(iter)
    }
}

/// The variable store `Ctx`: an immutable, sorted association list from
/// variable id to integer value. Unset variables read as `0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ctx(TinyVec<[(Id, i64); 4]>);

impl Ctx {
    #[must_use]
    pub fn new() -> Self {
        Ctx(TinyVec::new())
    }

    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Id, i64)>) -> Self {
        let mut ctx = Ctx::new();
        for (var, value) in pairs {
            ctx = ctx.with(var, value);
        }
        ctx
    }

    #[must_use]
    pub fn get(&self, var: Id) -> i64 {
        self.0
            .binary_search_by_key(&var, |(v, _)| *v)
            .map(|i| self.0[i].1)
            .unwrap_or(0)
    }

    /// Returns a new store with `var` set to `value`, all other entries
    /// preserved.
    #[must_use]
    pub fn with(&self, var: Id, value: i64) -> Ctx {
        let mut entries = self.0.clone();
        match entries.binary_search_by_key(&var, |(v, _)| *v) {
            Ok(i) => entries[i].1 = value,
            Err(i) => entries.insert(i, (var, value)),
        }
        Ctx(entries)
    }

    /// Applies a batch of `(var, value)` updates, as produced by
    /// [`crate::command::apply_update`].
    #[must_use]
    pub fn apply(&self, updates: &[(Id, i64)]) -> Ctx {
        let mut ctx = self.clone();
        for &(var, value) in updates {
            ctx = ctx.with(var, value);
        }
        ctx
    }

    /// Right-biased merge: entries from `other` win on conflict.
    #[must_use]
    pub fn merge_right_biased(&self, other: &Ctx) -> Ctx {
        let mut ctx = self.clone();
        for &(var, value) in other.0.iter() {
            ctx = ctx.with(var, value);
        }
        ctx
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, i64)> + '_ {
        self.0.iter().copied()
    }
}

/// A partial state used to specify a goal (§4.2's `is_goal`): required
/// location labels and required variable values. Satisfied by a [`State`]
/// `S` iff `locs ⊆ Locs_S` and every `(var, value)` constraint holds in
/// `Ctx_S`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartialState {
    pub locs: Locs,
    pub ctx_constraints: Vec<(Id, i64)>,
}

impl PartialState {
    #[must_use]
    pub fn satisfied_by(&self, state: &State) -> bool {
        self.locs.is_subset_of(&state.locs)
            && self.ctx_constraints.iter().all(|&(var, value)| state.ctx.get(var) == value)
    }
}

/// A global (or, before composition, process-local) state: a set of
/// location labels plus a variable store. Structural equality and hashing
/// on both fields, per §3.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct State {
    pub locs: Locs,
    pub ctx: Ctx,
}

impl State {
    #[must_use]
    pub fn new(locs: Locs, ctx: Ctx) -> Self {
        State { locs, ctx }
    }

    /// `is_goal(S, Goal)`: true iff `S` satisfies at least one disjunct of
    /// the goal specification.
    #[must_use]
    pub fn is_goal(&self, goal: &[PartialState]) -> bool {
        goal.iter().any(|g| g.satisfied_by(self))
    }

    /// `rename(map)`: substitutes location labels through `map`, leaving
    /// the store untouched. Labels not present in `map` are kept as-is.
    #[must_use]
    pub fn rename(&self, map: &fnv::FnvHashMap<Id, Id>) -> State {
        let locs = Locs::from_iter(self.locs.iter().map(|l| *map.get(&l).unwrap_or(&l)));
        State { locs, ctx: self.ctx.clone() }
    }

    /// `project(p)`: returns the single label of `self` belonging to the
    /// process whose label set is `process_labels`.
    ///
    /// Panics if zero or more than one label of `self` belongs to
    /// `process_labels` — an internal invariant violation (every state has
    /// exactly one location per process, per I4).
    #[must_use]
    pub fn project(&self, process_labels: &Locs) -> Id {
        let mut matches = self.locs.iter().filter(|l| process_labels.contains(*l));
        let found = matches.next().expect("state has no location for this process");
        debug_assert!(matches.next().is_none(), "state has more than one location for this process");
        found
    }

    /// `add(S1, S2)`: union of location sets, right-biased store merge.
    /// Used to assemble a composed system's initial state from its
    /// processes'.
    #[must_use]
    pub fn add(&self, other: &State) -> State {
        State {
            locs: self.locs.union(&other.locs),
            ctx: self.ctx.merge_right_biased(&other.ctx),
        }
    }

    /// `subtract(S, S')`: set-difference on location sets; store untouched.
    /// Used to remove a transition's preset before unioning in its
    /// postset when computing successors.
    #[must_use]
    pub fn subtract(&self, other: &State) -> State {
        State {
            locs: self.locs.difference(&other.locs),
            ctx: self.ctx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<Id> {
        (0..n).collect()
    }

    #[test]
    fn locs_union_is_sorted_and_deduped() {
        let a = Locs::from_iter([2, 0, 1]);
        let b = Locs::from_iter([1, 3]);
        let u = a.union(&b);
        assert_eq!(u.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn locs_subset_and_difference() {
        let a = Locs::from_iter([0, 1, 2]);
        let b = Locs::from_iter([1]);
        assert!(b.is_subset_of(&a));
        assert!(!a.is_subset_of(&b));
        assert_eq!(a.difference(&b).as_slice(), &[0, 2]);
    }

    #[test]
    fn ctx_unset_variable_reads_zero() {
        let ctx = Ctx::new();
        assert_eq!(ctx.get(7), 0);
    }

    #[test]
    fn ctx_with_preserves_other_entries() {
        let ctx = Ctx::new().with(1, 10).with(2, 20);
        let ctx2 = ctx.with(1, 99);
        assert_eq!(ctx2.get(1), 99);
        assert_eq!(ctx2.get(2), 20);
    }

    #[test]
    fn ctx_merge_right_biased() {
        let a = Ctx::from_pairs([(1, 1), (2, 2)]);
        let b = Ctx::from_pairs([(2, 20), (3, 30)]);
        let merged = a.merge_right_biased(&b);
        assert_eq!(merged.get(1), 1);
        assert_eq!(merged.get(2), 20);
        assert_eq!(merged.get(3), 30);
    }

    #[test]
    fn state_add_unions_locs_and_merges_ctx() {
        let ids = ids(4);
        let s1 = State::new(Locs::single(ids[0]), Ctx::from_pairs([(ids[2], 1)]));
        let s2 = State::new(Locs::single(ids[1]), Ctx::from_pairs([(ids[2], 2)]));
        let combined = s1.add(&s2);
        assert_eq!(combined.locs.len(), 2);
        assert_eq!(combined.ctx.get(ids[2]), 2);
    }

    #[test]
    fn state_subtract_only_touches_locs() {
        let ids = ids(4);
        let s = State::new(Locs::from_iter([ids[0], ids[1]]), Ctx::from_pairs([(ids[2], 5)]));
        let pre = State::new(Locs::single(ids[0]), Ctx::new());
        let result = s.subtract(&pre);
        assert_eq!(result.locs.as_slice(), &[ids[1]]);
        assert_eq!(result.ctx.get(ids[2]), 5);
    }

    #[test]
    fn is_goal_matches_any_disjunct() {
        let ids = ids(4);
        let state = State::new(Locs::single(ids[0]), Ctx::from_pairs([(ids[2], 3)]));
        let goal = vec![PartialState {
            locs: Locs::single(ids[0]),
            ctx_constraints: vec![(ids[2], 3)],
        }];
        assert!(state.is_goal(&goal));

        let unmet_goal = vec![PartialState {
            locs: Locs::single(ids[0]),
            ctx_constraints: vec![(ids[2], 4)],
        }];
        assert!(!state.is_goal(&unmet_goal));
    }

    #[test]
    fn rename_substitutes_labels_leaves_ctx() {
        let ids = ids(4);
        let state = State::new(Locs::single(ids[0]), Ctx::from_pairs([(ids[2], 1)]));
        let mut map = fnv::FnvHashMap::default();
        map.insert(ids[0], ids[1]);
        let renamed = state.rename(&map);
        assert_eq!(renamed.locs.as_slice(), &[ids[1]]);
        assert_eq!(renamed.ctx.get(ids[2]), 1);
    }

    #[test]
    fn project_finds_the_process_label() {
        let ids = ids(4);
        let state = State::new(Locs::from_iter([ids[0], ids[1]]), Ctx::new());
        let process_labels = Locs::single(ids[1]);
        assert_eq!(state.project(&process_labels), ids[1]);
    }
}
