//! Five-dimensional test grid.
//!
//! [`Grid::iter`] walks the full Cartesian product of the five sample ranges
//! in nested-loop order (last dimension fastest). The iterator borrows the
//! grid, so the enumeration can be repeated and always numbers cases the same
//! way.

use std::fmt;

use num_bigint::BigInt;

use crate::error::HarnessError;
use crate::sample::SampleRange;

/// Number of formula arguments.
pub const DIMENSIONS: usize = 5;

/// Argument labels, in call order, padded for the divergence dump.
pub const ARGUMENT_LABELS: [&str; DIMENSIONS] =
    ["staked1 ", "balance1", "balance2", "rate1   ", "rate2   "];

/// One grid point: the five formula arguments plus its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestCase {
    pub index: usize,
    pub staked1: BigInt,
    pub balance1: BigInt,
    pub balance2: BigInt,
    pub rate1: BigInt,
    pub rate2: BigInt,
}

impl TestCase {
    /// Arguments in call order.
    pub fn arguments(&self) -> [&BigInt; DIMENSIONS] {
        [
            &self.staked1,
            &self.balance1,
            &self.balance2,
            &self.rate1,
            &self.rate2,
        ]
    }
}

impl fmt::Display for TestCase {
    /// Labeled dump, one argument per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in ARGUMENT_LABELS.iter().zip(self.arguments()) {
            writeln!(f, "{} = {}", label, value)?;
        }
        Ok(())
    }
}

/// The five sample ranges, in argument order.
#[derive(Debug, Clone)]
pub struct Grid {
    staked1: SampleRange,
    balance1: SampleRange,
    balance2: SampleRange,
    rate1: SampleRange,
    rate2: SampleRange,
    total: usize,
}

impl Grid {
    /// # Errors
    /// * `InvalidArgument` - the number of cases does not fit in `usize`
    pub fn new(
        staked1: SampleRange,
        balance1: SampleRange,
        balance2: SampleRange,
        rate1: SampleRange,
        rate2: SampleRange,
    ) -> Result<Self, HarnessError> {
        let lengths = [
            staked1.len(),
            balance1.len(),
            balance2.len(),
            rate1.len(),
            rate2.len(),
        ];
        let total = lengths
            .iter()
            .try_fold(1usize, |acc, len| acc.checked_mul(*len))
            .ok_or_else(|| {
                HarnessError::InvalidArgument(format!(
                    "grid of {:?} samples has more cases than fit in usize",
                    lengths
                ))
            })?;

        Ok(Self {
            staked1,
            balance1,
            balance2,
            rate1,
            rate2,
            total,
        })
    }

    fn ranges(&self) -> [&SampleRange; DIMENSIONS] {
        [
            &self.staked1,
            &self.balance1,
            &self.balance2,
            &self.rate1,
            &self.rate2,
        ]
    }

    /// Total number of test cases (product of the range lengths).
    pub fn total(&self) -> usize {
        self.total
    }

    /// Enumerate every test case, last dimension fastest.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            ranges: self.ranges(),
            next: 0,
            total: self.total,
        }
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = TestCase;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy Cartesian product over a [`Grid`].
///
/// Position `n` is decoded as a mixed-radix number whose least significant
/// digit indexes the last range.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    ranges: [&'a SampleRange; DIMENSIONS],
    next: usize,
    total: usize,
}

impl GridIter<'_> {
    fn case_at(&self, position: usize) -> TestCase {
        let mut digits = [0usize; DIMENSIONS];
        let mut rest = position;
        for (dim, range) in self.ranges.iter().enumerate().rev() {
            digits[dim] = rest % range.len();
            rest /= range.len();
        }

        let pick = |dim: usize| self.ranges[dim].values()[digits[dim]].clone();
        TestCase {
            index: position + 1,
            staked1: pick(0),
            balance1: pick(1),
            balance2: pick(2),
            rate1: pick(3),
            rate2: pick(4),
        }
    }
}

impl Iterator for GridIter<'_> {
    type Item = TestCase;

    fn next(&mut self) -> Option<TestCase> {
        if self.next >= self.total {
            return None;
        }
        let case = self.case_at(self.next);
        self.next += 1;
        Some(case)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}
