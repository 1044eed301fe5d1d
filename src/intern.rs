//! Interning of location labels and variable identifiers.
//!
//! Both labels (`s0`, `wait_1`, ...) and variable names (`x`, `y`, ...) are
//! opaque identifier strings in the source DSL. Hashing and comparing them
//! as strings on every state/transition operation would be wasteful once a
//! state space grows into the thousands; instead we intern each distinct
//! name once per [`Interner`] and carry small `u32` ids everywhere else.
//!
//! Each distinct name is boxed and leaked once via [`Box::leak`], the same
//! safe escape hatch [`crate::demos`] already reaches for when it needs a
//! `&'static str` from a runtime-computed name; the `&'static str`-shaped
//! slices returned by [`Interner::resolve`] stay valid for the process's
//! lifetime without a second owned copy per lookup.

use fnv::FnvHashMap;
use std::cell::RefCell;

/// An interned identifier: a dense index into the owning [`Interner`]'s
/// name table, assigned in first-seen order starting at 0.
pub type Id = u32;

/// Interns strings into small ids so lookups return plain string slices
/// rather than ref-counted handles.
pub struct Interner {
    ids: RefCell<FnvHashMap<&'static str, Id>>,
    names: RefCell<Vec<&'static str>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Interner {
            ids: RefCell::new(FnvHashMap::default()),
            names: RefCell::new(Vec::new()),
        }
    }

    /// Returns the id for `name`, interning it if this is the first time
    /// it's been seen.
    pub fn intern(&self, name: &str) -> Id {
        if let Some(&id) = self.ids.borrow().get(name) {
            return id;
        }
        let interned: &'static str = Box::leak(name.to_string().into_boxed_str());
        let mut names = self.names.borrow_mut();
        let id = names.len() as Id;
        names.push(interned);
        self.ids.borrow_mut().insert(interned, id);
        id
    }

    /// Resolves a previously interned id back to its name.
    ///
    /// Panics if `id` was never returned by [`Interner::intern`] on this
    /// interner — an internal invariant violation, not a recoverable error.
    #[must_use]
    pub fn resolve(&self, id: Id) -> &str {
        self.names.borrow()[id as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        let i = Interner::new();
        let a = i.intern("s0");
        let b = i.intern("s0");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_distinct_ids() {
        let i = Interner::new();
        let a = i.intern("s0");
        let b = i.intern("s1");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let i = Interner::new();
        let id = i.intern("wait_1");
        assert_eq!(i.resolve(id), "wait_1");
    }
}
