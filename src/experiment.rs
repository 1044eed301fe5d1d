//! Experiment driver (§6, supplemented): a small thread pool plus a
//! scale-range runner for comparing an unreduced system against its POR
//! reductions across growing process counts.
//!
//! The pool itself (`Job`/`Executor`/`Promise`) is grounded on
//! `database.rs`'s identically-shaped metamath database loader thread pool
//! (max-heap job queue ordered by caller-supplied size estimate, condvar-
//! guarded worker threads, `catch_unwind`-wrapped completion), trimmed of
//! its database-specific naming. The runner shape — `scale_from..=scale_to`
//! sweep, `original`/`reduced`/`with_goal` test cases, gen-time and
//! Pmax-time columns, incremental CSV rows — is grounded on
//! `original_source/run_experiment.py`'s `main`/`test_cases`/`run_experiment`
//! and `examples/experiment_1.py`'s `test_system`.

use crate::intern::Interner;
use crate::search::{explore_dfs, Visit};
use crate::selectors;
use crate::state::PartialState;
use crate::system::System;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Instant;

struct Job(usize, Box<dyn FnMut() + Send>);

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Job {}
impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// A fixed-size worker pool that runs submitted closures in order of
/// decreasing size estimate, so the largest scale point in a sweep starts
/// first rather than waiting behind a queue of small ones.
pub struct Executor {
    concurrency: usize,
    queue: Arc<Mutex<BinaryHeap<Job>>>,
    work_cv: Arc<Condvar>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").field("concurrency", &self.concurrency).finish()
    }
}

fn queue_work(queue: &Arc<Mutex<BinaryHeap<Job>>>, cv: &Arc<Condvar>, estimate: usize, job: Box<dyn FnMut() + Send>) {
    queue.lock().unwrap().push(Job(estimate, job));
    cv.notify_one();
}

impl Executor {
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        let queue: Arc<Mutex<BinaryHeap<Job>>> = Arc::new(Mutex::new(BinaryHeap::new()));
        let work_cv = Arc::new(Condvar::new());
        for _ in 0..concurrency.max(1) {
            let queue = Arc::clone(&queue);
            let cv = Arc::clone(&work_cv);
            thread::spawn(move || loop {
                let mut guard = queue.lock().unwrap();
                loop {
                    if let Some(Job(_, mut job)) = guard.pop() {
                        drop(guard);
                        job();
                        break;
                    }
                    guard = cv.wait(guard).unwrap();
                }
            });
        }
        Executor { concurrency: concurrency.max(1), queue, work_cv }
    }

    /// Submits `task`, weighted by `estimate` (higher runs sooner), and
    /// returns a [`Promise`] for its result. A panic inside `task` is
    /// caught and re-raised from [`Promise::wait`] on the calling thread
    /// rather than silently killing a worker.
    pub fn exec<TASK, RV>(&self, estimate: usize, mut task: TASK) -> Promise<RV>
    where
        TASK: FnMut() -> RV + Send + 'static,
        RV: Send + 'static,
    {
        let cell: Arc<(Mutex<Option<std::thread::Result<RV>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let cell_job = Arc::clone(&cell);
        let job = Box::new(move || {
            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| task()));
            let (lock, cv) = &*cell_job;
            *lock.lock().unwrap() = Some(result);
            cv.notify_all();
        });
        queue_work(&self.queue, &self.work_cv, estimate, job);
        Promise(Box::new(move || {
            let (lock, cv) = &*cell;
            let mut guard = lock.lock().unwrap();
            while guard.is_none() {
                guard = cv.wait(guard).unwrap();
            }
            match guard.take().unwrap() {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            }
        }))
    }
}

/// A deferred result, resolved by blocking on [`Promise::wait`].
pub struct Promise<T>(Box<dyn FnMut() -> T + Send>);

impl<T: Send + 'static> Promise<T> {
    #[must_use]
    pub fn wait(mut self) -> T {
        (self.0)()
    }

    #[must_use]
    pub fn new(value: T) -> Self
    where
        T: Clone,
    {
        Promise(Box::new(move || value.clone()))
    }

    pub fn map<FN, RV>(self, mut f: FN) -> Promise<RV>
    where
        FN: FnMut(T) -> RV + Send + 'static,
        RV: Send + 'static,
    {
        let mut inner = self.0;
        Promise(Box::new(move || f(inner())))
    }

    #[must_use]
    pub fn join(promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
        let mut promises = promises;
        Promise(Box::new(move || promises.drain(..).map(Promise::wait).collect()))
    }
}

/// One row of a scale-range sweep: which test case, at which scale, with
/// what exploration/solve cost.
#[derive(Clone, Debug)]
pub struct ExperimentRow {
    pub test_case: String,
    pub scale: usize,
    pub states: usize,
    pub gen_time_ms: u128,
    pub pr_max: Option<f64>,
    pub pr_time_ms: Option<u128>,
}

impl ExperimentRow {
    #[must_use]
    pub fn csv_header() -> &'static str {
        "test_case,scale,states,gen_time_ms,pr_max,pr_time_ms"
    }

    #[must_use]
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.test_case,
            self.scale,
            self.states,
            self.gen_time_ms,
            self.pr_max.map_or_else(String::new, |p| p.to_string()),
            self.pr_time_ms.map_or_else(String::new, |t| t.to_string()),
        )
    }
}

/// A `scale_from..=scale_to` sweep stepped by `step`, mirroring
/// `run_experiment.py`'s `range(scale_from, scale_to + 1, step)`.
#[derive(Clone, Copy, Debug)]
pub struct ScaleRange {
    pub from: usize,
    pub to: usize,
    pub step: usize,
}

impl ScaleRange {
    #[must_use]
    pub fn values(self) -> Vec<usize> {
        let step = self.step.max(1);
        let mut out = Vec::new();
        let mut n = self.from;
        while n <= self.to {
            out.push(n);
            n += step;
        }
        out
    }
}

/// Explores `system` (under the unreduced selector, i.e. `en(S)` in full)
/// and times the exploration, producing one [`ExperimentRow`] with
/// `pr_max`/`pr_time_ms` left unset; callers that also want a reachability
/// figure should call [`solve_row`] afterward.
#[must_use]
pub fn explore_row(test_case: &str, scale: usize, system: &System) -> (ExperimentRow, Vec<Visit>) {
    let start = Instant::now();
    let visits = explore_dfs(system, None);
    let gen_time_ms = start.elapsed().as_millis();
    let row = ExperimentRow {
        test_case: test_case.to_string(),
        scale,
        states: visits.len(),
        gen_time_ms,
        pr_max: None,
        pr_time_ms: None,
    };
    (row, visits)
}

/// Explores `system` under a stubborn-set selector seeded from `goal`'s
/// actions, mirroring `test_cases`' `reduced`/`with_goal` variants.
#[must_use]
pub fn explore_reduced_row(
    test_case: &str,
    scale: usize,
    system: &System,
    goal: Option<&[PartialState]>,
) -> (ExperimentRow, Vec<Visit>) {
    let seed = goal.map(|g| selectors::goal_actions(system, g)).unwrap_or_default();
    let stubborn = crate::selectors::stubborn::selector(seed);
    let selector = move |system: &System, state: &crate::state::State| stubborn(system, state, None);
    let start = Instant::now();
    let visits = explore_dfs(system, Some(&selector));
    let gen_time_ms = start.elapsed().as_millis();
    let row = ExperimentRow {
        test_case: test_case.to_string(),
        scale,
        states: visits.len(),
        gen_time_ms,
        pr_max: None,
        pr_time_ms: None,
    };
    (row, visits)
}

/// Fills in `pr_max`/`pr_time_ms` on `row` by solving `P_max(F Goal)` over
/// the already-explored `visits`, timed separately from exploration per
/// `time_execution`'s split of `gen_time`/`pr_time` in the original driver.
#[must_use]
pub fn solve_row(mut row: ExperimentRow, system: &System, visits: &[Visit], goal: &[PartialState]) -> ExperimentRow {
    let start = Instant::now();
    let pr = crate::solver::prob_max_init(system, visits, goal);
    row.pr_time_ms = Some(start.elapsed().as_millis());
    row.pr_max = Some(pr);
    row
}

/// Runs the `original`/`reduced`/`with_goal` test cases for one scale point
/// `n`, mirroring `run_experiment.py::test_cases`. `generate_system` and
/// `generate_goal` are re-invoked per scale point since each builds its own
/// [`Interner`]-backed [`System`] (a fresh arena per point, same as the
/// Python's `generate_system(n)` building a fresh MDP).
pub fn run_scale_point<FS, FG>(
    executor: &Executor,
    n: usize,
    generate_system: FS,
    generate_goal: FG,
    only_goal: bool,
    check_pr: bool,
) -> Vec<Promise<ExperimentRow>>
where
    FS: Fn(&Interner, usize) -> System + Send + Sync + 'static,
    FG: Fn(&Interner, &System, usize) -> Vec<PartialState> + Send + Sync + 'static,
{
    let generate_system = Arc::new(generate_system);
    let generate_goal = Arc::new(generate_goal);
    let mut promises = Vec::new();

    if !only_goal {
        let gs = Arc::clone(&generate_system);
        promises.push(executor.exec(n, move || {
            let interner = Interner::new();
            let system = gs(&interner, n);
            let (row, _) = explore_row("original", n, &system);
            row
        }));

        let gs = Arc::clone(&generate_system);
        promises.push(executor.exec(n, move || {
            let interner = Interner::new();
            let system = gs(&interner, n);
            let (row, _) = explore_reduced_row("reduced", n, &system, None);
            row
        }));
    }

    let gs = Arc::clone(&generate_system);
    let gg = Arc::clone(&generate_goal);
    promises.push(executor.exec(n, move || {
        let interner = Interner::new();
        let system = gs(&interner, n);
        let goal = gg(&interner, &system, n);
        let (row, visits) = explore_reduced_row("with_goal", n, &system, Some(&goal));
        if check_pr {
            solve_row(row, &system, &visits, &goal)
        } else {
            row
        }
    }));

    promises
}

/// Runs the full sweep described by `scale`, submitting every scale point's
/// test cases to `executor` up front (mirroring `run_experiment.py`'s `main`
/// submitting all `(n, test_case)` pairs to a single `ThreadPoolExecutor`
/// before collecting any result) and returns every row in submission order.
pub fn run_sweep<FS, FG>(
    executor: &Executor,
    scale: ScaleRange,
    generate_system: FS,
    generate_goal: FG,
    only_goal: bool,
    check_pr: bool,
) -> Vec<ExperimentRow>
where
    FS: Fn(&Interner, usize) -> System + Send + Sync + 'static,
    FG: Fn(&Interner, &System, usize) -> Vec<PartialState> + Send + Sync + 'static,
{
    let generate_system = Arc::new(generate_system);
    let generate_goal = Arc::new(generate_goal);
    let mut promises = Vec::new();
    for n in scale.values() {
        let gs = Arc::clone(&generate_system);
        let gg = Arc::clone(&generate_goal);
        promises.extend(run_scale_point(
            executor,
            n,
            move |interner, n| gs(interner, n),
            move |interner, system, n| gg(interner, system, n),
            only_goal,
            check_pr,
        ));
    }
    promises.into_iter().map(Promise::wait).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{det, process, t};
    use crate::state::Locs;

    fn coin_system(interner: &Interner, _n: usize) -> System {
        let specs = vec![t("flip", "u", det("h"))];
        let p = process(interner, "coin", &specs, "u", &[]);
        System::compose(interner, vec![p]).unwrap()
    }

    fn coin_goal(interner: &Interner, _system: &System, _n: usize) -> Vec<PartialState> {
        vec![PartialState { locs: Locs::single(interner.intern("h")), ctx_constraints: vec![] }]
    }

    #[test]
    fn executor_runs_submitted_job_and_resolves_promise() {
        let executor = Executor::new(2);
        let promise = executor.exec(1, || 2 + 2);
        assert_eq!(promise.wait(), 4);
    }

    #[test]
    fn scale_range_steps_inclusive_of_to() {
        let range = ScaleRange { from: 1, to: 5, step: 2 };
        assert_eq!(range.values(), vec![1, 3, 5]);
    }

    #[test]
    fn run_sweep_produces_a_row_per_scale_and_case() {
        let executor = Executor::new(2);
        let rows = run_sweep(&executor, ScaleRange { from: 1, to: 1, step: 1 }, coin_system, coin_goal, false, true);
        assert_eq!(rows.len(), 3);
        let with_goal = rows.iter().find(|r| r.test_case == "with_goal").unwrap();
        assert!(with_goal.pr_max.is_some());
    }

    #[test]
    fn csv_row_formats_empty_optionals_as_blank() {
        let row = ExperimentRow {
            test_case: "original".to_string(),
            scale: 3,
            states: 10,
            gen_time_ms: 5,
            pr_max: None,
            pr_time_ms: None,
        };
        assert_eq!(row.to_csv_row(), "original,3,10,5,,");
    }
}
