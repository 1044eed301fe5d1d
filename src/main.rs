//! CLI experiment driver (§6, out of core scope): resolves an experiment
//! name to a built-in [`mdptools::demos`] generator, sweeps a scale range,
//! runs the classic and goal-biased-reduced exploration variants at each
//! scale point, and writes a CSV row plus a PRISM model/properties file
//! pair per scale point.
//!
//! Grounded on `original_source/run_experiment.py`'s `main` (argument shape:
//! experiment name, `scale_from`/`scale_to`/`step`, `workers`, output path),
//! taking its arguments through `clap`'s pinned 2.33 builder API (predating
//! the derive macro) and installing `simple_logger` the same way.

use clap::{App, Arg};
use log::{error, info, Level};
use mdptools::demos::{coins, sensors};
use mdptools::experiment::{explore_reduced_row, explore_row, solve_row, Executor, ExperimentRow, Promise, ScaleRange};
use mdptools::intern::Interner;
use mdptools::state::PartialState;
use mdptools::system::System;
use mdptools::{emit, validate};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// One of the built-in demo families §6's "experiment name" resolves to, in
/// place of the Python driver's `importlib.import_module("experiments." + name)`.
fn resolve_experiment(
    name: &str,
) -> Option<(
    fn(&Interner, usize) -> System,
    fn(&Interner, &System, usize) -> Vec<PartialState>,
)> {
    match name {
        "coins" => Some((coins::generate_system, coins::generate_goal)),
        "sensors" => Some((sensors::generate_system, sensors::generate_goal)),
        _ => None,
    }
}

fn main() -> ExitCode {
    let matches = App::new("mdptools")
        .version("0.1.0")
        .about("Build, compose, reduce, and analyze probabilistic concurrent systems modeled as MDPs")
        .arg(
            Arg::with_name("experiment")
                .help("built-in experiment to run (coins, sensors)")
                .required(true)
                .index(1),
        )
        .arg(Arg::with_name("from").long("from").takes_value(true).default_value("1").help("first scale value"))
        .arg(Arg::with_name("to").long("to").takes_value(true).help("last scale value (default: --from)"))
        .arg(Arg::with_name("step").long("step").takes_value(true).default_value("1").help("scale step"))
        .arg(Arg::with_name("workers").long("workers").takes_value(true).default_value("4").help("worker thread count"))
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .default_value("results.csv")
                .help("output CSV path"),
        )
        .arg(
            Arg::with_name("out-dir")
                .long("out-dir")
                .takes_value(true)
                .default_value(".")
                .help("directory to write PRISM model/properties files into"),
        )
        .arg(Arg::with_name("quiet").long("quiet").short("q").help("suppress info-level logging"))
        .get_matches();

    if !matches.is_present("quiet") {
        simple_logger::init_with_level(Level::Info).expect("logger installs exactly once");
    }

    let experiment_name = matches.value_of("experiment").expect("required arg");
    let Some((generate_system, generate_goal)) = resolve_experiment(experiment_name) else {
        error!("unknown experiment {experiment_name:?}; expected one of: coins, sensors");
        return ExitCode::FAILURE;
    };

    let from: usize = match matches.value_of("from").unwrap().parse() {
        Ok(v) => v,
        Err(_) => {
            error!("--from must be a non-negative integer");
            return ExitCode::FAILURE;
        }
    };
    let to: usize = match matches.value_of("to").map(str::parse) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            error!("--to must be a non-negative integer");
            return ExitCode::FAILURE;
        }
        None => from,
    };
    let step: usize = match matches.value_of("step").unwrap().parse() {
        Ok(v) => v,
        Err(_) => {
            error!("--step must be a non-negative integer");
            return ExitCode::FAILURE;
        }
    };
    let workers: usize = match matches.value_of("workers").unwrap().parse() {
        Ok(v) => v,
        Err(_) => {
            error!("--workers must be a non-negative integer");
            return ExitCode::FAILURE;
        }
    };
    let out_dir = Path::new(matches.value_of("out-dir").unwrap());
    if let Err(e) = fs::create_dir_all(out_dir) {
        error!("failed to create --out-dir {out_dir:?}: {e}");
        return ExitCode::FAILURE;
    }

    let scale = ScaleRange { from, to, step };
    let executor = Executor::new(workers);
    let mut promises: Vec<Promise<std::io::Result<ExperimentRow>>> = Vec::new();

    for n in scale.values() {
        let out_dir = out_dir.to_path_buf();
        let name = experiment_name.to_string();
        promises.push(executor.exec(n, move || {
            run_scale_point(&name, n, generate_system, generate_goal, &out_dir)
        }));
    }

    let mut rows: Vec<ExperimentRow> = Vec::new();
    for result in promises.into_iter().map(Promise::wait) {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                error!("failed to write PRISM model/properties files: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let output_path = matches.value_of("output").unwrap();
    let mut csv = String::from(ExperimentRow::csv_header());
    csv.push('\n');
    for row in &rows {
        csv.push_str(&row.to_csv_row());
        csv.push('\n');
    }
    if let Err(e) = fs::write(output_path, csv) {
        error!("failed to write CSV to {output_path:?}: {e}");
        return ExitCode::FAILURE;
    }

    info!("wrote {} row(s) to {output_path}", rows.len());
    ExitCode::SUCCESS
}

/// Runs the `classic`/`reduced` pair for one scale point, validates the
/// classic exploration, writes its PRISM model/properties files, and
/// returns the `reduced` row (states reached under the goal-biased stubborn
/// selector), mirroring `run_experiment.py::test_cases`' per-`n` work unit.
fn run_scale_point(
    experiment_name: &str,
    n: usize,
    generate_system: fn(&Interner, usize) -> System,
    generate_goal: fn(&Interner, &System, usize) -> Vec<PartialState>,
    out_dir: &Path,
) -> std::io::Result<ExperimentRow> {
    let interner = Interner::new();
    let system = generate_system(&interner, n);
    let goal = generate_goal(&interner, &system, n);

    let (_, classic_visits) = explore_row(experiment_name, n, &system);
    for issue in validate::validate(&classic_visits, &interner) {
        error!("{experiment_name}[{n}]: {issue}");
    }

    let name = format!("{experiment_name}_{n}");
    let prism_text = emit::to_prism(&system, &classic_visits, &interner, &name);
    let properties_text = emit::to_properties(&system, &goal, &interner);
    fs::write(out_dir.join(format!("{name}.prism")), prism_text)?;
    fs::write(out_dir.join(format!("{name}.props")), properties_text)?;

    let (row, reduced_visits) = explore_reduced_row(experiment_name, n, &system, Some(&goal));
    let row = solve_row(row, &system, &reduced_visits, &goal);

    info!(
        "{experiment_name}[{n}]: classic={} states, reduced={} states, Pmax={}",
        classic_visits.len(),
        reduced_visits.len(),
        row.pr_max.unwrap_or_default(),
    );

    Ok(row)
}
