//! MILP scheduler CLI.
//!
//! Solves JSON problem documents, compares objectives on them, or runs the
//! bundled demo instances. Results are printed as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use u_schedule_milp::config::SolveOptions;
use u_schedule_milp::demo_data::{self, GeneratorConfig};
use u_schedule_milp::models::{ObjectiveSpec, SchedulingProblem};
use u_schedule_milp::normalize::{NormalizeMode, RawProblem};
use u_schedule_milp::scheduler::{ComparisonRun, FailurePolicy, ScheduleKpi};
use u_schedule_milp::worker::{SolveEvent, SolveRequest, SolveWorker};

#[derive(Parser)]
#[command(name = "u-schedule-milp")]
#[command(about = "MILP scheduling for tasks sharing machines and staff")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem document with one objective.
    Solve {
        /// Problem document (JSON)
        input: PathBuf,
        /// Reject records that need a fallback instead of defaulting them
        #[arg(long)]
        strict: bool,
        /// Output file for results (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        solve: SolveArgs,
    },

    /// Solve a problem document once per objective.
    Compare {
        /// Problem document (JSON)
        input: PathBuf,
        /// Objectives (comma-separated selectors)
        #[arg(long, default_value = "makespan,weighted_completion,multi_criteria")]
        objectives: String,
        /// Stop at the first run that produces no schedule
        #[arg(long)]
        abort_on_failure: bool,
        /// Reject records that need a fallback instead of defaulting them
        #[arg(long)]
        strict: bool,
        /// Output file for results (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        solve: SolveArgs,
    },

    /// Solve the imaging-department sample or a random instance.
    Demo {
        /// Generate a random instance instead of the imaging sample
        #[arg(long)]
        random: bool,
        /// Number of random tasks
        #[arg(long, default_value = "8")]
        tasks: usize,
        /// Number of random machines
        #[arg(long, default_value = "3")]
        machines: usize,
        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Compare these objectives (comma-separated) instead of one solve
        #[arg(long)]
        compare: Option<String>,
        /// Output file for results (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        solve: SolveArgs,
    },
}

/// Flags shared by every subcommand that solves.
#[derive(Args)]
struct SolveArgs {
    /// Options file (JSON); flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Objective selector: makespan, weighted_completion, multi_criteria,
    /// lex_makespan or weighted_sum:A:B
    #[arg(long)]
    objective: Option<String>,
    /// Engine time budget in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Let tasks move to their eligible machines
    #[arg(long)]
    reassign: bool,
    /// Lateness penalty; a positive value makes deadlines soft
    #[arg(long)]
    lateness_penalty: Option<f64>,
    /// Staff capacity slot width
    #[arg(long)]
    slot_width: Option<f64>,
}

impl SolveArgs {
    fn options(&self) -> Result<SolveOptions> {
        let mut options = match &self.config {
            Some(path) => SolveOptions::from_json_file(path)
                .with_context(|| format!("reading options from {}", path.display()))?,
            None => SolveOptions::default(),
        };
        if let Some(objective) = &self.objective {
            options = options.with_objective(ObjectiveSpec::parse(objective));
        }
        if let Some(secs) = self.time_limit {
            options = options.with_time_limit_secs(secs);
        }
        if self.reassign {
            options = options.with_reassignment(true);
        }
        if let Some(penalty) = self.lateness_penalty {
            options = options.with_lateness_penalty(penalty);
        }
        if let Some(width) = self.slot_width {
            options = options.with_slot_width(width);
        }
        Ok(options)
    }
}

#[derive(Serialize)]
struct SolveReport<'a> {
    outcome: &'a u_schedule_milp::scheduler::SolveOutcome,
    kpi: Option<ScheduleKpi>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("u_schedule_milp=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("u_schedule_milp=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let worker = SolveWorker::with_default_engine()?;

    match cli.command {
        Commands::Solve {
            input,
            strict,
            output,
            solve,
        } => {
            let problem = load_problem(&input, strict)?;
            run_single(&worker, problem, solve.options()?, output.as_deref())
        }

        Commands::Compare {
            input,
            objectives,
            abort_on_failure,
            strict,
            output,
            solve,
        } => {
            let problem = load_problem(&input, strict)?;
            let policy = if abort_on_failure {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            };
            run_compare(&worker, problem, &objectives, solve.options()?, policy, output.as_deref())
        }

        Commands::Demo {
            random,
            tasks,
            machines,
            seed,
            compare,
            output,
            solve,
        } => {
            let problem = if random {
                demo_data::generate(&GeneratorConfig {
                    tasks,
                    machines,
                    seed,
                    ..GeneratorConfig::default()
                })
            } else {
                demo_data::imaging_department()
            };
            info!(tasks = problem.tasks.len(), random, "Demo instance ready");

            let options = solve.options()?;
            match compare {
                Some(objectives) => run_compare(
                    &worker,
                    problem,
                    &objectives,
                    options,
                    FailurePolicy::Continue,
                    output.as_deref(),
                ),
                None => run_single(&worker, problem, options, output.as_deref()),
            }
        }
    }
}

fn load_problem(path: &Path, strict: bool) -> Result<SchedulingProblem> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading problem from {}", path.display()))?;
    let raw = RawProblem::from_json_str(&text)?;
    let mode = if strict {
        NormalizeMode::Strict
    } else {
        NormalizeMode::Lenient
    };
    let (problem, fallbacks) = raw.normalize(mode)?;
    if !fallbacks.is_empty() {
        warn!(count = fallbacks.len(), "Some task fields were defaulted");
    }
    info!(
        tasks = problem.tasks.len(),
        maintenance = problem.maintenance.len(),
        "Problem loaded"
    );
    Ok(problem)
}

fn run_single(
    worker: &SolveWorker,
    problem: SchedulingProblem,
    options: SolveOptions,
    output: Option<&Path>,
) -> Result<()> {
    let tasks = problem.tasks.clone();
    let events = worker.submit(SolveRequest::Single { problem, options })?;
    match events.recv().context("solve worker hung up")? {
        SolveEvent::Finished(outcome) => {
            info!(status = %outcome.status, objective = ?outcome.objective_value, "Solve finished");
            let kpi = outcome
                .is_solved()
                .then(|| ScheduleKpi::calculate(&outcome.schedule, &tasks));
            write_json(
                &SolveReport {
                    outcome: &outcome,
                    kpi,
                },
                output,
            )
        }
        SolveEvent::Failed(msg) => bail!("solve failed: {msg}"),
        SolveEvent::Compared(_) => bail!("unexpected comparison result for a single solve"),
    }
}

fn run_compare(
    worker: &SolveWorker,
    problem: SchedulingProblem,
    objectives: &str,
    options: SolveOptions,
    policy: FailurePolicy,
    output: Option<&Path>,
) -> Result<()> {
    let runs: Vec<ComparisonRun> = objectives
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ComparisonRun::new(ObjectiveSpec::parse(s)))
        .collect();
    if runs.is_empty() {
        bail!("no objectives to compare");
    }

    let events = worker.submit(SolveRequest::Compare {
        problem,
        runs,
        options,
        policy,
    })?;
    match events.recv().context("solve worker hung up")? {
        SolveEvent::Compared(comparison) => {
            for row in comparison.rows() {
                info!(label = row.label, status = %row.status, objective = ?row.objective_value, "Run");
            }
            write_json(&comparison.rows(), output)
        }
        SolveEvent::Failed(msg) => bail!("comparison failed: {msg}"),
        SolveEvent::Finished(_) => bail!("unexpected single result for a comparison"),
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing results to {}", path.display()))?;
            info!(path = %path.display(), "Results written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
