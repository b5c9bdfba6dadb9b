//! Balanced-Weights Emulation Harness
//!
//! Differential grid testing of a native `balancedWeights` implementation
//! against a reference formula contract.
//!
//! # Modules
//!
//! - [`sample`] - Evenly spaced integer sample ranges
//! - [`grid`] - Five-dimensional Cartesian product of test cases
//! - [`formula`] - Formula and deployment capabilities
//! - [`invoker`] - Failure-absorbing evaluation and result canonicalization
//! - [`harness`] - Fail-fast comparison loop and run report
//! - [`contract`] - JSON-RPC binding to a deployed formula contract
//! - [`config`] - YAML configuration
//! - [`logging`] - Tracing subscriber setup

pub mod config;
pub mod contract;
pub mod error;
pub mod formula;
pub mod grid;
pub mod harness;
pub mod invoker;
pub mod logging;
pub mod sample;

// Convenient re-exports at crate root
pub use config::{ContractConfig, EmulationConfig, GridConfig, RangeConfig};
pub use contract::{ContractDeployment, ContractFormula};
pub use error::{HarnessError, InvocationFailure};
pub use formula::{FormulaDeployment, NamedFormula, Ready, WeightsFormula};
pub use grid::{Grid, GridIter, TestCase};
pub use harness::{Divergence, Harness, RunReport, Verdict, emulate};
pub use invoker::{FAILURE_SENTINEL, FailureMatch, TestResult, invoke};
pub use sample::{SampleRange, uniform_distribution};
