//! Invoker
//!
//! Runs one formula on one [`TestCase`] and turns whatever happens into a
//! [`TestResult`]. Nothing escapes: error returns and panics alike become
//! [`TestResult::Failure`], which prints as the `-1` sentinel.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::Once;

use num_bigint::BigInt;
use serde::Deserialize;

use crate::error::InvocationFailure;
use crate::formula::WeightsFormula;
use crate::grid::TestCase;

/// Printed in place of a result when the evaluation failed.
pub const FAILURE_SENTINEL: &str = "-1";

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// Comma-joined decimal weights, e.g. `"500000,500000"`.
    Success(String),
    Failure(InvocationFailure),
}

impl TestResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Failure(_))
    }

    /// Printed form: the weights, or the sentinel.
    pub fn canonical(&self) -> &str {
        match self {
            TestResult::Success(text) => text,
            TestResult::Failure(_) => FAILURE_SENTINEL,
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// How two failed evaluations compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMatch {
    /// Failures compare by sentinel, so two failures are a match.
    /// A failure never equals a success, even one that prints as `-1`.
    #[default]
    Sentinel,
    /// A failure never matches anything, including another failure.
    Strict,
}

impl FailureMatch {
    pub fn matches(self, a: &TestResult, b: &TestResult) -> bool {
        match (a, b) {
            (TestResult::Success(x), TestResult::Success(y)) => x == y,
            (TestResult::Failure(_), TestResult::Failure(_)) => self == FailureMatch::Sentinel,
            _ => false,
        }
    }
}

/// Canonical text for a weight sequence: plain decimal, comma-joined.
pub fn serialize_weights(weights: &[BigInt]) -> String {
    weights
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

thread_local! {
    static EVALUATING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Wrap the process panic hook so panics raised inside [`invoke`] print
/// nothing; the sentinel in the progress line is their only trace.
/// Panics anywhere else still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !EVALUATING.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Clears the evaluating flag even if the formula unwinds.
struct EvaluatingGuard;

impl EvaluatingGuard {
    fn enter() -> Self {
        EVALUATING.with(|flag| flag.set(true));
        EvaluatingGuard
    }
}

impl Drop for EvaluatingGuard {
    fn drop(&mut self) {
        EVALUATING.with(|flag| flag.set(false));
    }
}

/// Evaluate `formula` on `case`, absorbing every failure.
pub fn invoke<F: WeightsFormula + ?Sized>(formula: &F, case: &TestCase) -> TestResult {
    install_quiet_hook();
    let outcome = {
        let _guard = EvaluatingGuard::enter();
        catch_unwind(AssertUnwindSafe(|| formula.balanced_weights(case)))
    };
    match outcome {
        Ok(Ok(weights)) => TestResult::Success(serialize_weights(&weights)),
        Ok(Err(failure)) => TestResult::Failure(failure),
        Err(payload) => TestResult::Failure(InvocationFailure::Panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
