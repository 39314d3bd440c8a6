//! Home appliance scheduling against a time-of-use tariff.
//!
//! [`optimizer::SchedulingEngine`] turns a [`domain::ScheduleProblem`] into a 0/1
//! integer program, solves it with a pluggable [`optimizer::IlpSolver`] and reports
//! each appliance's cheapest feasible hours next to its naive baseline cost.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod optimizer;
pub mod telemetry;
