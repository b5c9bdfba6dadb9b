//! Differential Grid Harness
//!
//! Walks every [`TestCase`] of a [`Grid`], evaluates the candidate and the
//! reference formula with identical arguments and stops at the first
//! disagreement.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Ranges  │───▶│   Grid   │───▶│ invoke × 2   │───▶│ Compare  │──▶ HALT on mismatch
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! Console output is one progress line per case:
//!
//! ```text
//! Test 1 out of 100000: candidate = 312500,687500, reference = 312500,687500
//! ```
//!
//! followed, on divergence, by an `Emulation Error:` header and the five
//! labeled arguments of the failing case.

use std::io::Write;

use tracing::{error, info, warn};

use crate::error::HarnessError;
use crate::formula::{FormulaDeployment, WeightsFormula};
use crate::grid::{Grid, TestCase};
use crate::invoker::{FailureMatch, TestResult, invoke};

/// The first case on which the two formulas disagreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub case: TestCase,
    pub candidate: TestResult,
    pub reference: TestResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every case matched.
    Equivalent,
    /// Halted early.
    Diverged(Box<Divergence>),
}

/// Summary of one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub total: usize,
    pub executed: usize,
    /// Cases where both sides failed (counted as matches under [`FailureMatch::Sentinel`]).
    pub both_failed: usize,
    pub verdict: Verdict,
}

impl RunReport {
    pub fn is_equivalent(&self) -> bool {
        matches!(self.verdict, Verdict::Equivalent)
    }

    pub fn divergence(&self) -> Option<&Divergence> {
        match &self.verdict {
            Verdict::Diverged(d) => Some(d),
            Verdict::Equivalent => None,
        }
    }
}

/// Candidate and reference formulas bound for one run.
pub struct Harness<C, R> {
    candidate: C,
    reference: R,
    policy: FailureMatch,
}

impl<C: WeightsFormula, R: WeightsFormula> Harness<C, R> {
    pub fn new(candidate: C, reference: R) -> Self {
        Self {
            candidate,
            reference,
            policy: FailureMatch::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailureMatch) -> Self {
        self.policy = policy;
        self
    }

    /// Walk `grid`, writing progress to `out`, until exhausted or diverged.
    ///
    /// # Errors
    /// * `Io` - writing to `out` failed
    pub fn run<W: Write>(&self, grid: &Grid, out: &mut W) -> Result<RunReport, HarnessError> {
        let total = grid.total();
        info!(
            total,
            candidate = self.candidate.name(),
            reference = self.reference.name(),
            policy = ?self.policy,
            "Starting emulation run"
        );

        let mut executed = 0;
        let mut both_failed = 0;

        for case in grid.iter() {
            let candidate = invoke(&self.candidate, &case);
            let reference = invoke(&self.reference, &case);
            executed += 1;

            writeln!(
                out,
                "Test {} out of {}: {} = {}, {} = {}",
                case.index,
                total,
                self.candidate.name(),
                candidate,
                self.reference.name(),
                reference
            )?;

            if candidate.is_failure() && reference.is_failure() {
                both_failed += 1;
            }

            if !self.policy.matches(&candidate, &reference) {
                writeln!(out, "Emulation Error:")?;
                write!(out, "{}", case)?;
                out.flush()?;

                error!(
                    index = case.index,
                    total,
                    candidate = %candidate,
                    reference = %reference,
                    "Emulation diverged"
                );
                log_failure_detail(self.candidate.name(), &candidate);
                log_failure_detail(self.reference.name(), &reference);

                return Ok(RunReport {
                    total,
                    executed,
                    both_failed,
                    verdict: Verdict::Diverged(Box::new(Divergence {
                        case,
                        candidate,
                        reference,
                    })),
                });
            }
        }

        out.flush()?;
        if both_failed > 0 {
            warn!(
                both_failed,
                "Cases where both formulas failed were not numerically compared"
            );
        }
        info!(total, executed, "Emulation finished: all cases match");

        Ok(RunReport {
            total,
            executed,
            both_failed,
            verdict: Verdict::Equivalent,
        })
    }
}

fn log_failure_detail(side: &str, result: &TestResult) {
    if let TestResult::Failure(failure) = result {
        warn!(side, %failure, "Evaluation failed");
    }
}

/// Initialise both sides once, then run the grid.
///
/// Setup happens after the grid is built and before any case is evaluated;
/// a setup error aborts the run with nothing written to `out`.
pub fn emulate<C, R, W>(
    grid: &Grid,
    candidate: C,
    reference: R,
    policy: FailureMatch,
    out: &mut W,
) -> Result<RunReport, HarnessError>
where
    C: FormulaDeployment,
    R: FormulaDeployment,
    W: Write,
{
    let candidate = candidate.init()?;
    let reference = reference.init()?;
    Harness::new(candidate, reference)
        .with_policy(policy)
        .run(grid, out)
}
