//! Built-in example systems for the CLI driver (§6's "experiment name").
//!
//! The Python driver resolves an experiment name to a module under
//! `./experiments` via `importlib.import_module`; without a dynamic module
//! loader this registry plays the same role with a fixed set of generators
//! grounded directly on `original_source/experiments/coins.py` and
//! `sensor_system.py`.

use crate::dsl::{det, dist, process, t};
use crate::intern::Interner;
use crate::state::{Locs, PartialState};
use crate::system::System;

// [`crate::dsl`]'s builder signatures take `&'static str` labels, fine for
// hand-written literals but not for the per-`n` names a scaled demo needs to
// synthesize at runtime; `Box::leak` buys a `'static` slice for the one-shot
// lifetime of a CLI invocation without re-threading an owned-string variant
// through the whole DSL just for this module.

/// `coins.py`: `n` independently biased coins, each synchronized with a
/// shared "hand" process that counts down from `n` to `0` one flip at a
/// time. Goal: the hand reaches `count_0`.
pub mod coins {
    use super::*;

    #[must_use]
    pub fn generate_system(interner: &Interner, n: usize) -> System {
        let n = n.max(1);
        let mut processes = Vec::with_capacity(n + 1);

        let count_labels: Vec<String> = (0..=n).map(|c| format!("count_{c}")).collect();
        let hand_specs: Vec<_> = (1..=n)
            .map(|i| {
                let action: &'static str = Box::leak(format!("flip_{i}").into_boxed_str());
                let pre: &'static str = Box::leak(count_labels[i].clone().into_boxed_str());
                let post_label: &'static str = Box::leak(count_labels[i - 1].clone().into_boxed_str());
                t(action, pre, det(post_label))
            })
            .collect();
        let init_count: &'static str = Box::leak(count_labels[n].clone().into_boxed_str());
        processes.push(process(interner, "H", &hand_specs, init_count, &[]));

        for i in 1..=n {
            let action: &'static str = Box::leak(format!("flip_{i}").into_boxed_str());
            let unknown: &'static str = Box::leak(format!("unknown_{i}").into_boxed_str());
            let heads: &'static str = Box::leak(format!("heads_{i}").into_boxed_str());
            let tails: &'static str = Box::leak(format!("tails_{i}").into_boxed_str());
            let p = bias(i);
            let specs = vec![t(action, unknown, dist(vec![(heads, "", p), (tails, "", 1.0 - p)]))];
            let name: &'static str = Box::leak(format!("C{i}").into_boxed_str());
            processes.push(process(interner, name, &specs, unknown, &[]));
        }

        System::compose(interner, processes).expect("coins demo composes without conflicting updates")
    }

    #[must_use]
    pub fn generate_goal(interner: &Interner, _system: &System, _n: usize) -> Vec<PartialState> {
        vec![PartialState { locs: Locs::single(interner.intern("count_0")), ctx_constraints: vec![] }]
    }

    /// A fixed, deterministic stand-in for `random_register`'s per-coin bias
    /// (the original draws from `U(0.1, 0.9)` once per run; a CLI demo needs
    /// reproducible output across invocations, so the bias is a function of
    /// the coin index instead).
    fn bias(i: usize) -> f64 {
        let step = (i % 8) as f64;
        (0.1 + step * 0.1).min(0.9)
    }
}

/// `sensor_system.py`: `n` sensors that each may detect a fault and warn a
/// shared device, which shuts down cleanly or fails outright. Goal: the
/// device reaches `failed`.
pub mod sensors {
    use super::*;

    #[must_use]
    pub fn generate_system(interner: &Interner, n: usize) -> System {
        let n = n.max(1);
        let mut processes = Vec::with_capacity(n + 1);

        let mut device_specs = Vec::new();
        for i in 1..=n {
            let warn: &'static str = Box::leak(format!("warn_{i}").into_boxed_str());
            let shutdown: &'static str = Box::leak(format!("shutdown_{i}").into_boxed_str());
            device_specs.push(t(warn, "running", det("stopping")));
            device_specs.push(t(shutdown, "running", dist(vec![("off", "", 0.9), ("failed", "", 0.1)])));
            device_specs.push(t(shutdown, "stopping", det("off")));
        }
        device_specs.push(t("tau", "off", det("off")));
        device_specs.push(t("tau", "failed", det("failed")));
        processes.push(process(interner, "D", &device_specs, "running", &[]));

        for i in 1..=n {
            let detect: &'static str = Box::leak(format!("detect_{i}").into_boxed_str());
            let warn: &'static str = Box::leak(format!("warn_{i}").into_boxed_str());
            let shutdown: &'static str = Box::leak(format!("shutdown_{i}").into_boxed_str());
            let active: &'static str = Box::leak(format!("active_{i}").into_boxed_str());
            let prepare: &'static str = Box::leak(format!("prepare_{i}").into_boxed_str());
            let detected: &'static str = Box::leak(format!("detected_{i}").into_boxed_str());
            let inactive: &'static str = Box::leak(format!("inactive_{i}").into_boxed_str());
            let specs = vec![
                t(detect, active, dist(vec![(prepare, "", 0.8), (detected, "", 0.2)])),
                t(warn, prepare, det(detected)),
                t(shutdown, detected, det(inactive)),
                t("tau", inactive, det(inactive)),
            ];
            let name: &'static str = Box::leak(format!("S{i}").into_boxed_str());
            processes.push(process(interner, name, &specs, active, &[]));
        }

        System::compose(interner, processes).expect("sensors demo composes without conflicting updates")
    }

    #[must_use]
    pub fn generate_goal(interner: &Interner, _system: &System, _n: usize) -> Vec<PartialState> {
        vec![PartialState { locs: Locs::single(interner.intern("failed")), ctx_constraints: vec![] }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::explore_dfs;

    #[test]
    fn coins_demo_reaches_count_zero() {
        let interner = Interner::new();
        let system = coins::generate_system(&interner, 2);
        let visits = explore_dfs(&system, None);
        let count_0 = interner.intern("count_0");
        assert!(visits.iter().any(|v| v.state.locs.contains(count_0)));
    }

    #[test]
    fn sensors_demo_reaches_failed() {
        let interner = Interner::new();
        let system = sensors::generate_system(&interner, 1);
        let visits = explore_dfs(&system, None);
        let failed = interner.intern("failed");
        assert!(visits.iter().any(|v| v.state.locs.contains(failed)));
    }
}
