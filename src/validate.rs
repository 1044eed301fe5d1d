//! Well-formedness validation (§4.8, C8): deadlock and distribution-sum
//! checks over an explored state graph.
//!
//! Grounded on `original_source/mdptools/validate.py`'s `validate`
//! (`MDP_REQ_EN_S_NONEMPTY`/`MDP_REQ_SUM_TO_ONE`, paired numeric code plus
//! human-readable detail, collected rather than raised by default).

use crate::intern::Interner;
use crate::search::Visit;
use crate::system::System;

/// `R1`: `forall s in S : en(s) != {}` (no deadlock states).
pub const R1_EN_S_NONEMPTY: u32 = 0;
/// `R2`: `forall s in S, a in en(s) : sum_(s' in S) P(s, a, s') = 1`.
pub const R2_SUM_TO_ONE: u32 = 1;

const SUM_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// A single validation finding: a stable rule code plus a human-readable
/// detail describing the offending state/transition.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub rule: u32,
    pub detail: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[R{}] {}", self.rule + 1, self.detail)
    }
}

/// Runs R1 and R2 over an already-explored graph. Unlike the Python, this
/// never raises: callers opt into treating the result as fatal, per §7's
/// "validation errors are collected... callers may opt-in to raising".
#[must_use]
pub fn validate(visits: &[Visit], interner: &Interner) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    issues.extend(validate_enabled_nonempty(visits, interner));
    issues.extend(validate_sum_to_one(visits, interner));
    issues
}

fn validate_enabled_nonempty(visits: &[Visit], interner: &Interner) -> Vec<ValidationIssue> {
    visits
        .iter()
        .filter(|v| v.actions.is_empty())
        .map(|v| ValidationIssue {
            rule: R1_EN_S_NONEMPTY,
            detail: format!("en({}) -> {{}}", describe_state(v, interner)),
        })
        .collect()
}

fn validate_sum_to_one(visits: &[Visit], interner: &Interner) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for visit in visits {
        for (action, dists) in &visit.actions {
            for dist in dists {
                let sum: f64 = dist.iter().map(|(_, p)| p).sum();
                if (sum - 1.0).abs() >= SUM_TOLERANCE {
                    issues.push(ValidationIssue {
                        rule: R2_SUM_TO_ONE,
                        detail: format!(
                            "Dist({}, {}) -> sum = {sum}",
                            describe_state(visit, interner),
                            action
                        ),
                    });
                }
            }
        }
    }
    issues
}

fn describe_state(visit: &Visit, interner: &Interner) -> String {
    visit
        .state
        .locs
        .iter()
        .map(|l| interner.resolve(l).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Convenience: validates a system from scratch via its full DFS exploration.
/// `validate` itself takes `visits` directly so callers that already
/// explored (or explored under a POR selector) don't pay for a second walk.
#[must_use]
pub fn validate_system(system: &System, interner: &Interner) -> Vec<ValidationIssue> {
    let visits = crate::search::explore_dfs(system, None);
    validate(&visits, interner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::process::Process;
    use crate::state::{Ctx, Locs};
    use crate::transition::{Action, Direction, Outcome, Post, Transition};

    #[test]
    fn deadlock_state_reports_r1() {
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
        let init = crate::state::State::new(Locs::single(s0), Ctx::new());
        let p = Process::new(&interner, "p", vec![t], init);
        let system = System::compose(&interner, vec![p]).unwrap();

        let issues = validate_system(&system, &interner);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, R1_EN_S_NONEMPTY);
    }

    #[test]
    fn sum_mismatch_reports_r2_only() {
        let interner = Interner::new();
        let s0 = interner.intern("s0");
        let s1 = interner.intern("s1");
        let a = interner.intern("a");

        // A hand-built Post bypassing Post::new's own assertion, to exercise
        // the R2 check on a deliberately malformed distribution the way
        // E5 describes: weights 1.0 and 0.5 instead of summing to 1.
        let visit = Visit {
            state: crate::state::State::new(Locs::single(s0), Ctx::new()),
            actions: vec![(
                "a".to_string(),
                vec![vec![
                    (crate::state::State::new(Locs::single(s0), Ctx::new()), 1.0),
                    (crate::state::State::new(Locs::single(s1), Ctx::new()), 0.5),
                ]],
            )],
            depth: 0,
        };
        let _ = a;
        let issues = validate(&[visit], &interner);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, R2_SUM_TO_ONE);
    }
}
