//! Formula capabilities
//!
//! Both sides of the comparison implement [`WeightsFormula`]. A side that
//! needs one-time preparation (binding to a deployed contract, sending its
//! `init()` transaction) is described by a [`FormulaDeployment`] whose
//! `init` produces the handle used for the rest of the run.

use num_bigint::BigInt;

use crate::error::{HarnessError, InvocationFailure};
use crate::grid::TestCase;

/// A `balancedWeights(staked1, balance1, balance2, rate1, rate2)` implementation.
pub trait WeightsFormula {
    /// Short label used in progress lines.
    fn name(&self) -> &str;

    /// Evaluate the formula for one grid point.
    fn balanced_weights(&self, case: &TestCase) -> Result<Vec<BigInt>, InvocationFailure>;
}

impl<F: WeightsFormula + ?Sized> WeightsFormula for &F {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn balanced_weights(&self, case: &TestCase) -> Result<Vec<BigInt>, InvocationFailure> {
        (**self).balanced_weights(case)
    }
}

impl<F: WeightsFormula + ?Sized> WeightsFormula for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn balanced_weights(&self, case: &TestCase) -> Result<Vec<BigInt>, InvocationFailure> {
        (**self).balanced_weights(case)
    }
}

/// One-time setup step yielding a reusable formula handle.
///
/// Called exactly once before the grid is walked; an error aborts the run.
pub trait FormulaDeployment {
    type Handle: WeightsFormula;

    fn init(self) -> Result<Self::Handle, HarnessError>;
}

/// Adapts a closure into a named [`WeightsFormula`].
///
/// ```rust,ignore
/// let native = NamedFormula::new("native", |case: &TestCase| {
///     port::balanced_weights(&case.staked1, &case.balance1, &case.balance2, &case.rate1, &case.rate2)
/// });
/// ```
pub struct NamedFormula<F> {
    name: String,
    func: F,
}

impl<F> NamedFormula<F>
where
    F: Fn(&TestCase) -> Result<Vec<BigInt>, InvocationFailure>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> WeightsFormula for NamedFormula<F>
where
    F: Fn(&TestCase) -> Result<Vec<BigInt>, InvocationFailure>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn balanced_weights(&self, case: &TestCase) -> Result<Vec<BigInt>, InvocationFailure> {
        (self.func)(case)
    }
}

/// A formula that is ready as soon as it is constructed.
///
/// Lets an in-process implementation stand where a deployment is expected.
pub struct Ready<F>(pub F);

impl<F: WeightsFormula> FormulaDeployment for Ready<F> {
    type Handle = F;

    fn init(self) -> Result<F, HarnessError> {
        Ok(self.0)
    }
}
