//! The command language (§4.1): guards and updates over an integer variable
//! store.
//!
//! Guards and updates are kept as plain data — expression trees, not
//! closures — per DESIGN NOTES' "Guards/updates as data, not code": this is
//! what makes `Guard`/`Update` cheaply hashable, comparable, and mergeable,
//! and what makes [`uses`] a plain introspection over a tree rather than a
//! call into an opaque function. Evaluation is a small interpreter over that
//! tree (`evaluate_guard`, `apply_update`).
//!
//! Grounded on `original_source/mdptools/model/commands.py`'s
//! regex-based compiler (`_compile_guard`, `_compile_update`) and its
//! `Op.can_be_dependent`; `uses`/`dependent` here are widened to record
//! *every* variable an operation mentions, not only its left-hand
//! (assignment target / comparison subject) variable the way the Python's
//! `Op.left` did.

use crate::error::ParseError;
use crate::intern::{Id, Interner};
use fnv::FnvHashMap;
use regex::Regex;
use std::cmp::Ordering;

/// A comparison operator appearing in a guard atom.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Cmp {
    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }

    fn text(self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "!=",
            Cmp::Lt => "<",
            Cmp::Gt => ">",
            Cmp::Le => "<=",
            Cmp::Ge => ">=",
        }
    }
}

/// A single atomic comparison `var ⊙ literal`, the unit of a guard disjunct.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Atom {
    pub var: Id,
    pub cmp: Cmp,
    pub literal: i64,
}

impl Atom {
    /// Evaluates this atom against a single variable value. Used by the
    /// stubborn-sets selector (§4.6.3 rule a.ii) to find a disjunct of a
    /// disabled transition's guard that is false in the current state.
    #[must_use]
    pub fn holds(&self, value: i64) -> bool {
        self.cmp.apply(value, self.literal)
    }
}

/// The read-uses of every variable mentioned by a single guard disjunct,
/// the unit stubborn-sets rule a.ii checks `can_be_dependent` against.
#[must_use]
pub fn disjunct_uses(disjunct: &[Atom]) -> Uses {
    let mut uses = Uses::default();
    for atom in disjunct {
        uses.entry(atom.var).or_default().read = true;
    }
    uses
}

/// The right-hand side of a simple assignment: either a literal, or a read
/// of another variable offset by a literal (`v := v' + n` / `v := v' - n`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Rhs {
    Literal(i64),
    VarOffset { source: Id, delta: i64 },
}

/// A single assignment `target := rhs`, the unit of an [`Update`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Assign {
    pub target: Id,
    pub rhs: Rhs,
}

/// Read/write capability set a variable is used with by some command.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Caps {
    pub read: bool,
    pub write: bool,
}

impl Caps {
    #[must_use]
    pub fn read_only() -> Self {
        Caps { read: true, write: false }
    }

    #[must_use]
    pub fn write_only() -> Self {
        Caps { read: false, write: true }
    }

    #[must_use]
    pub fn union(self, other: Caps) -> Self {
        Caps {
            read: self.read || other.read,
            write: self.write || other.write,
        }
    }
}

/// Per-variable read/write capabilities used by a command (C1's `uses`).
pub type Uses = FnvHashMap<Id, Caps>;

/// `dependent(op_a, op_b)`: true iff both reference the same variable and at
/// least one writes it (the fundamental interference predicate POR
/// consults). Operates on two single-variable capability sets already known
/// to describe the *same* variable.
#[must_use]
pub fn dependent(a: Caps, b: Caps) -> bool {
    a.write || b.write
}

/// True iff any variable used by `a` and any variable used by `b` are
/// [`dependent`] — i.e. `a` and `b` share a variable and at least one of
/// them writes it.
#[must_use]
pub fn uses_dependent(a: &Uses, b: &Uses) -> bool {
    a.iter()
        .any(|(var, caps_a)| b.get(var).is_some_and(|caps_b| dependent(*caps_a, *caps_b)))
}

/// A guard: a boolean expression in conjunctive-normal-form over atomic
/// comparisons. The empty guard (`disjuncts.is_empty()`) denotes *true*.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Guard {
    disjuncts: Vec<Vec<Atom>>,
}

impl Guard {
    #[must_use]
    pub fn empty() -> Self {
        Guard { disjuncts: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }

    #[must_use]
    pub fn disjuncts(&self) -> &[Vec<Atom>] {
        &self.disjuncts
    }

    /// Conjunction of two guards: the union of their conjunctive clauses.
    #[must_use]
    pub fn and(&self, other: &Guard) -> Guard {
        let mut disjuncts = self.disjuncts.clone();
        disjuncts.extend(other.disjuncts.iter().cloned());
        Guard { disjuncts }
    }

    #[must_use]
    pub fn uses(&self) -> Uses {
        let mut uses = Uses::default();
        for disjunct in &self.disjuncts {
            for atom in disjunct {
                uses.entry(atom.var).or_default().read = true;
            }
        }
        uses
    }

    pub fn text(&self, interner: &Interner) -> String {
        self.disjuncts
            .iter()
            .map(|disjunct| {
                disjunct
                    .iter()
                    .map(|atom| format!("{}{}{}", interner.resolve(atom.var), atom.cmp.text(), atom.literal))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

/// `evaluate_guard(G, Ctx) -> bool`: unset variables read as 0; conjunction
/// of disjunctions, total (never fails).
#[must_use]
pub fn evaluate_guard(guard: &Guard, read: impl Fn(Id) -> i64) -> bool {
    guard
        .disjuncts
        .iter()
        .all(|disjunct| disjunct.iter().any(|atom| atom.cmp.apply(read(atom.var), atom.literal)))
}

/// An update: a set of simple assignments. The empty update leaves the
/// store unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Update {
    assigns: Vec<Assign>,
}

impl Update {
    #[must_use]
    pub fn empty() -> Self {
        Update { assigns: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigns.is_empty()
    }

    #[must_use]
    pub fn assigns(&self) -> &[Assign] {
        &self.assigns
    }

    /// Merges two updates (used when synchronizing transitions). Returns
    /// `Err` if both updates assign the same target with differing
    /// right-hand sides — an ambiguous merge, detected at composition time.
    pub fn merge(&self, other: &Update) -> Result<Update, Id> {
        let mut assigns = self.assigns.clone();
        for assign in &other.assigns {
            if let Some(existing) = assigns.iter().find(|a| a.target == assign.target) {
                if existing.rhs != assign.rhs {
                    return Err(assign.target);
                }
            } else {
                assigns.push(assign.clone());
            }
        }
        Ok(Update { assigns })
    }

    #[must_use]
    pub fn uses(&self) -> Uses {
        let mut uses = Uses::default();
        for assign in &self.assigns {
            uses.entry(assign.target).or_default().write = true;
            if let Rhs::VarOffset { source, .. } = assign.rhs {
                uses.entry(source).or_default().read = true;
            }
        }
        uses
    }

    pub fn text(&self, interner: &Interner) -> String {
        self.assigns
            .iter()
            .map(|assign| match assign.rhs {
                Rhs::Literal(n) => format!("{}:={}", interner.resolve(assign.target), n),
                Rhs::VarOffset { source, delta } => {
                    let sign = if delta >= 0 { "+" } else { "-" };
                    format!(
                        "{}:={}{}{}",
                        interner.resolve(assign.target),
                        interner.resolve(source),
                        sign,
                        delta.abs()
                    )
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `apply_update(U, Ctx) -> Ctx'`: returns the store updates produced by `U`
/// against the given reader; targets not touched by `U` are left untouched
/// by the caller (this returns only the *changed* entries).
#[must_use]
pub fn apply_update(update: &Update, read: impl Fn(Id) -> i64) -> Vec<(Id, i64)> {
    update
        .assigns
        .iter()
        .map(|assign| {
            let value = match assign.rhs {
                Rhs::Literal(n) => n,
                Rhs::VarOffset { source, delta } => read(source) + delta,
            };
            (assign.target, value)
        })
        .collect()
}

fn comparison_re() -> &'static Regex {
    lazy_static::lazy_static! {
        static ref RE: Regex =
            Regex::new(r"^\s*([A-Za-z_]\w*)\s*(!=|>=|<=|=|>|<)\s*(\d+)\s*$").unwrap();
    }
    &RE
}

fn assignment_re() -> &'static Regex {
    lazy_static::lazy_static! {
        static ref RE: Regex = Regex::new(
            r"^\s*([A-Za-z_]\w*)\s*:=\s*(?:([A-Za-z_]\w*)\s*([+-])\s*)?(\d+)\s*$"
        )
        .unwrap();
    }
    &RE
}

fn parse_cmp(text: &str) -> Cmp {
    match text {
        "=" => Cmp::Eq,
        "!=" => Cmp::Ne,
        "<" => Cmp::Lt,
        ">" => Cmp::Gt,
        "<=" => Cmp::Le,
        ">=" => Cmp::Ge,
        _ => unreachable!("regex only captures known comparators"),
    }
}

/// `parse_guard(text) -> G | error`: conjunctions joined by `&`, each
/// disjunction joined by `|`, atoms `var op literal`. Parentheses are
/// flattened (stripped).
pub fn parse_guard(interner: &Interner, text: &str) -> Result<Guard, ParseError> {
    let flattened: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
    let trimmed = flattened.trim();
    if trimmed.is_empty() {
        return Ok(Guard::empty());
    }
    let mut disjuncts = Vec::new();
    for conj in trimmed.split('&') {
        let mut atoms = Vec::new();
        for part in conj.split('|') {
            let part = part.trim();
            let caps = comparison_re().captures(part).ok_or_else(|| ParseError {
                text: text.to_string(),
                span: (0, text.len()),
                message: format!("malformed guard atom `{part}`"),
            })?;
            let var = interner.intern(&caps[1]);
            let cmp = parse_cmp(&caps[2]);
            let literal: i64 = caps[3].parse().expect("regex restricts to digits");
            atoms.push(Atom { var, cmp, literal });
        }
        disjuncts.push(atoms);
    }
    Ok(Guard { disjuncts })
}

/// `parse_update(text) -> U | error`: comma-separated assignments.
pub fn parse_update(interner: &Interner, text: &str) -> Result<Update, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Update::empty());
    }
    let mut assigns = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        let caps = assignment_re().captures(part).ok_or_else(|| ParseError {
            text: text.to_string(),
            span: (0, text.len()),
            message: format!("malformed assignment `{part}`"),
        })?;
        let target = interner.intern(&caps[1]);
        let literal: i64 = caps[4].parse().expect("regex restricts to digits");
        let rhs = match (caps.get(2), caps.get(3)) {
            (Some(src), Some(op)) => {
                let source = interner.intern(src.as_str());
                let delta = if op.as_str() == "-" { -literal } else { literal };
                Rhs::VarOffset { source, delta }
            }
            _ => Rhs::Literal(literal),
        };
        assigns.push(Assign { target, rhs });
    }
    Ok(Update { assigns })
}

/// True iff `s` looks like a guard atom (used to partition DSL tuples that
/// mix location labels with inline guard text).
#[must_use]
pub fn looks_like_guard(s: &str) -> bool {
    comparison_re().is_match(s.trim())
}

/// True iff `s` looks like an update assignment (same role as
/// [`looks_like_guard`] for the update side, distinguished by `:=`).
#[must_use]
pub fn looks_like_update(s: &str) -> bool {
    s.contains(":=") && assignment_re().is_match(s.trim().split(',').next().unwrap_or("").trim())
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.var, self.cmp as u8, self.literal).cmp(&(other.var, other.cmp as u8, other.literal))
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(Id, i64)]) -> impl Fn(Id) -> i64 + '_ {
        move |id| pairs.iter().find(|(v, _)| *v == id).map(|(_, n)| *n).unwrap_or(0)
    }

    #[test]
    fn parses_and_evaluates_conjunction_of_disjunctions() {
        let interner = Interner::new();
        let guard = parse_guard(&interner, "x<=5 & y!=0").unwrap();
        let x = interner.intern("x");
        let y = interner.intern("y");
        assert!(evaluate_guard(&guard, ctx(&[(x, 3), (y, 1)])));
        assert!(!evaluate_guard(&guard, ctx(&[(x, 3), (y, 0)])));
        assert!(!evaluate_guard(&guard, ctx(&[(x, 6), (y, 1)])));
    }

    #[test]
    fn disjunction_within_conjunct() {
        let interner = Interner::new();
        let guard = parse_guard(&interner, "x=1 | x=2").unwrap();
        let x = interner.intern("x");
        assert!(evaluate_guard(&guard, ctx(&[(x, 2)])));
        assert!(!evaluate_guard(&guard, ctx(&[(x, 3)])));
    }

    #[test]
    fn empty_guard_is_true() {
        let interner = Interner::new();
        let guard = parse_guard(&interner, "").unwrap();
        assert!(evaluate_guard(&guard, |_| 0));
    }

    #[test]
    fn unset_variable_reads_as_zero() {
        let interner = Interner::new();
        let guard = parse_guard(&interner, "x=0").unwrap();
        assert!(evaluate_guard(&guard, |_| 0));
    }

    #[test]
    fn parses_update_with_literal_and_offset() {
        let interner = Interner::new();
        let update = parse_update(&interner, "x:=0, y:=x+1").unwrap();
        let x = interner.intern("x");
        let y = interner.intern("y");
        let applied = apply_update(&update, ctx(&[(x, 7)]));
        assert!(applied.contains(&(x, 0)));
        assert!(applied.contains(&(y, 8)));
    }

    #[test]
    fn parse_guard_rejects_garbage() {
        use assert_matches::assert_matches;
        let interner = Interner::new();
        assert_matches!(parse_guard(&interner, "x<="), Err(ParseError { .. }));
    }

    #[test]
    fn parse_update_rejects_garbage() {
        use assert_matches::assert_matches;
        let interner = Interner::new();
        assert_matches!(parse_update(&interner, "x=1"), Err(ParseError { .. }));
    }

    #[test]
    fn dependent_requires_shared_var_and_a_write() {
        let interner = Interner::new();
        let g = parse_guard(&interner, "x=1").unwrap();
        let u = parse_update(&interner, "x:=2").unwrap();
        assert!(uses_dependent(&g.uses(), &u.uses()));

        let u2 = parse_update(&interner, "y:=2").unwrap();
        assert!(!uses_dependent(&g.uses(), &u2.uses()));
    }

    #[test]
    fn update_merge_detects_conflict() {
        let interner = Interner::new();
        let u1 = parse_update(&interner, "x:=1").unwrap();
        let u2 = parse_update(&interner, "x:=2").unwrap();
        assert!(u1.merge(&u2).is_err());

        let u3 = parse_update(&interner, "x:=1").unwrap();
        assert!(u1.merge(&u3).is_ok());
    }
}
