//! Background solve worker.
//!
//! A dedicated thread owns a [`MilpScheduler`] and runs one request at a
//! time. Callers get a receiver per request and are never blocked by a
//! running solve. A second submission while a solve is in flight is
//! rejected with [`SchedulerError::WorkerBusy`]. Panics inside a solve are
//! caught at the worker boundary and reported as [`SolveEvent::Failed`];
//! comparison batches catch them per run instead.
//!
//! There is no cancellation; a solve runs until the engine returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::SolveOptions;
use crate::error::{panic_message, SchedulerError};
use crate::milp::{GoodLpEngine, MilpEngine};
use crate::models::SchedulingProblem;
use crate::scheduler::{Comparison, ComparisonRun, FailurePolicy, MilpScheduler, SolveOutcome};

/// Work for the solve thread.
#[derive(Debug, Clone)]
pub enum SolveRequest {
    /// One solve.
    Single {
        /// Problem to solve.
        problem: SchedulingProblem,
        /// Solve options.
        options: SolveOptions,
    },
    /// A comparison batch, run sequentially.
    Compare {
        /// Problem shared by every run.
        problem: SchedulingProblem,
        /// Runs in report order.
        runs: Vec<ComparisonRun>,
        /// Options for runs without their own.
        options: SolveOptions,
        /// Behavior after a failed run.
        policy: FailurePolicy,
    },
}

/// Completion notification for one request.
#[derive(Debug)]
pub enum SolveEvent {
    /// A single solve finished (possibly without a schedule).
    Finished(SolveOutcome),
    /// A comparison batch finished.
    Compared(Comparison),
    /// The request failed before producing an outcome.
    Failed(String),
}

struct Job {
    request: SolveRequest,
    reply: Sender<SolveEvent>,
    guard: BusyGuard,
}

/// Releases the busy flag even on panic or early return.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a background solve thread.
///
/// Dropping the handle closes the queue and joins the thread, waiting for
/// an in-flight solve to finish.
pub struct SolveWorker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    busy: Arc<AtomicBool>,
}

impl SolveWorker {
    /// Spawns a worker on `engine`.
    pub fn spawn<E>(engine: E) -> Result<Self, SchedulerError>
    where
        E: MilpEngine + Send + 'static,
    {
        let (tx, rx) = channel::<Job>();
        let scheduler = MilpScheduler::with_engine(engine);
        let handle = thread::Builder::new()
            .name("milp-solve-worker".into())
            .spawn(move || worker_loop(scheduler, rx))?;

        info!("Solve worker started");
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawns a worker on the bundled `good_lp` engine.
    pub fn with_default_engine() -> Result<Self, SchedulerError> {
        Self::spawn(GoodLpEngine::new())
    }

    /// Non-blocking check for an in-flight request.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Queues `request` and returns the receiver its event arrives on.
    pub fn submit(&self, request: SolveRequest) -> Result<Receiver<SolveEvent>, SchedulerError> {
        let guard = BusyGuard::try_acquire(&self.busy).ok_or(SchedulerError::WorkerBusy)?;
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| SchedulerError::WorkerUnavailable("worker has shut down".into()))?;

        let (reply, events) = channel();
        tx.send(Job {
            request,
            reply,
            guard,
        })
        .map_err(|_| SchedulerError::WorkerUnavailable("worker thread exited".into()))?;
        Ok(events)
    }
}

impl Drop for SolveWorker {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Solve worker thread panicked");
            }
        }
    }
}

fn worker_loop<E: MilpEngine>(scheduler: MilpScheduler<E>, rx: Receiver<Job>) {
    while let Ok(Job {
        request,
        reply,
        guard,
    }) = rx.recv()
    {
        let event = match catch_unwind(AssertUnwindSafe(|| run_request(&scheduler, request))) {
            Ok(event) => event,
            Err(payload) => {
                let err = SchedulerError::Panicked(panic_message(payload.as_ref()));
                error!(error = %err, "Solve aborted");
                SolveEvent::Failed(err.to_string())
            }
        };

        // Free the slot before the caller can observe the result.
        drop(guard);
        if reply.send(event).is_err() {
            debug!("Result receiver dropped before delivery");
        }
    }
    debug!("Solve worker stopped");
}

fn run_request<E: MilpEngine>(scheduler: &MilpScheduler<E>, request: SolveRequest) -> SolveEvent {
    match request {
        SolveRequest::Single { problem, options } => match scheduler.solve(&problem, &options) {
            Ok(outcome) => SolveEvent::Finished(outcome),
            Err(err) => {
                error!(error = %err, "Solve rejected");
                SolveEvent::Failed(err.to_string())
            }
        },
        SolveRequest::Compare {
            problem,
            runs,
            options,
            policy,
        } => SolveEvent::Compared(scheduler.compare(&problem, &runs, &options, policy)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverLimits;
    use crate::milp::engine::testing::ScriptedEngine;
    use crate::milp::{EngineSolution, EngineStatus, MilpProblem};
    use crate::models::{ObjectiveSpec, Task};
    use good_lp::Variable;
    use std::sync::Mutex;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(60);

    struct PanickingEngine;

    impl MilpEngine for PanickingEngine {
        fn name(&self) -> &str {
            "panicking"
        }

        fn optimize(&self, _: MilpProblem, _: &SolverLimits, _: &[Variable]) -> EngineSolution {
            panic!("engine exploded");
        }
    }

    /// Blocks each solve until the gate is opened or dropped.
    struct GatedEngine {
        gate: Mutex<Receiver<()>>,
    }

    impl MilpEngine for GatedEngine {
        fn name(&self) -> &str {
            "gated"
        }

        fn optimize(&self, _: MilpProblem, _: &SolverLimits, watch: &[Variable]) -> EngineSolution {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            EngineSolution {
                status: EngineStatus::Optimal,
                values: vec![0.0; watch.len()],
            }
        }
    }

    fn single(problem: SchedulingProblem) -> SolveRequest {
        SolveRequest::Single {
            problem,
            options: SolveOptions::default(),
        }
    }

    fn two_tasks() -> SchedulingProblem {
        SchedulingProblem::new(vec![Task::new("T1", 20.0, "M1"), Task::new("T2", 10.0, "M1")])
    }

    #[test]
    fn test_single_solve_delivered() {
        let worker = SolveWorker::with_default_engine().unwrap();
        let events = worker.submit(single(two_tasks())).unwrap();
        match events.recv_timeout(WAIT).unwrap() {
            SolveEvent::Finished(outcome) => {
                assert!(outcome.is_solved());
                assert!((outcome.objective_value.unwrap() - 40.0).abs() < 1e-4);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_rejected_input_reported() {
        let worker = SolveWorker::spawn(ScriptedEngine::new(EngineStatus::Optimal)).unwrap();
        let duplicate =
            SchedulingProblem::new(vec![Task::new("T1", 1.0, "M1"), Task::new("T1", 1.0, "M1")]);
        let events = worker.submit(single(duplicate)).unwrap();
        match events.recv_timeout(WAIT).unwrap() {
            SolveEvent::Failed(msg) => assert!(msg.contains("Duplicate task ID")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_compare_request() {
        let worker = SolveWorker::spawn(ScriptedEngine::new(EngineStatus::Optimal)).unwrap();
        let events = worker
            .submit(SolveRequest::Compare {
                problem: two_tasks(),
                runs: vec![
                    ComparisonRun::new(ObjectiveSpec::Makespan),
                    ComparisonRun::new(ObjectiveSpec::WeightedCompletion),
                ],
                options: SolveOptions::default(),
                policy: FailurePolicy::Continue,
            })
            .unwrap();
        match events.recv_timeout(WAIT).unwrap() {
            SolveEvent::Compared(comparison) => assert_eq!(comparison.len(), 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_panic_caught_and_worker_survives() {
        let worker = SolveWorker::spawn(PanickingEngine).unwrap();
        for _ in 0..2 {
            let events = worker.submit(single(two_tasks())).unwrap();
            match events.recv_timeout(WAIT).unwrap() {
                SolveEvent::Failed(msg) => assert!(msg.contains("engine exploded")),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_busy_while_in_flight() {
        let (open, gate) = channel();
        let worker = SolveWorker::spawn(GatedEngine {
            gate: Mutex::new(gate),
        })
        .unwrap();

        let first = worker.submit(single(two_tasks())).unwrap();
        assert!(worker.is_busy());
        assert!(matches!(
            worker.submit(single(two_tasks())),
            Err(SchedulerError::WorkerBusy)
        ));

        open.send(()).unwrap();
        assert!(matches!(first.recv_timeout(WAIT).unwrap(), SolveEvent::Finished(_)));
        assert!(!worker.is_busy());

        drop(open);
        let second = worker.submit(single(two_tasks())).unwrap();
        assert!(matches!(second.recv_timeout(WAIT).unwrap(), SolveEvent::Finished(_)));
    }

    #[test]
    fn test_empty_problem_completes() {
        let worker = SolveWorker::spawn(ScriptedEngine::new(EngineStatus::Infeasible)).unwrap();
        let events = worker.submit(single(SchedulingProblem::default())).unwrap();
        match events.recv_timeout(WAIT).unwrap() {
            SolveEvent::Finished(outcome) => {
                assert!(outcome.schedule.is_empty());
                assert!(outcome.objective_value.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
