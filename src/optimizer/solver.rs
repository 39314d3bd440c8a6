use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::IntegerProgram;

/// Pluggable 0/1 integer program backend
pub trait IlpSolver: Send + Sync {
    /// Solver name for logs and responses
    fn name(&self) -> &'static str;

    fn solve(&self, program: &IntegerProgram, limits: &SolveLimits) -> SolveOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    /// Time limit elapsed or the solve was cancelled
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// One value per program variable, present only when optimal
    pub assignment: Option<Vec<bool>>,
    pub objective: Option<f64>,
    pub nodes_explored: u64,
    pub message: Option<String>,
}

impl SolveOutcome {
    pub fn optimal(assignment: Vec<bool>, objective: f64, nodes_explored: u64) -> Self {
        Self {
            status: SolveStatus::Optimal,
            assignment: Some(assignment),
            objective: Some(objective),
            nodes_explored,
            message: None,
        }
    }

    pub fn infeasible(nodes_explored: u64, message: impl Into<String>) -> Self {
        Self::failed(SolveStatus::Infeasible, nodes_explored, message)
    }

    pub fn timeout(nodes_explored: u64) -> Self {
        Self::failed(SolveStatus::Timeout, nodes_explored, "time limit reached")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::failed(SolveStatus::Error, 0, message)
    }

    fn failed(status: SolveStatus, nodes_explored: u64, message: impl Into<String>) -> Self {
        Self {
            status,
            assignment: None,
            objective: None,
            nodes_explored,
            message: Some(message.into()),
        }
    }
}

/// Shared flag a caller raises to abort a running solve
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolveLimits {
    pub time_limit: Option<Duration>,
    pub cancel: Option<CancellationFlag>,
}

impl SolveLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit: Some(time_limit),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Start the clock for one solve
    pub fn start(&self) -> Deadline<'_> {
        Deadline {
            started: Instant::now(),
            limits: self,
        }
    }
}

/// Running clock of one solve
#[derive(Debug)]
pub struct Deadline<'a> {
    started: Instant,
    limits: &'a SolveLimits,
}

impl Deadline<'_> {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expired(&self) -> bool {
        if self
            .limits
            .cancel
            .as_ref()
            .is_some_and(CancellationFlag::is_cancelled)
        {
            return true;
        }
        self.limits
            .time_limit
            .is_some_and(|limit| self.started.elapsed() >= limit)
    }
}
