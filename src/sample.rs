//! Sample Range Generator
//!
//! Evenly spaced integer samples over a closed interval. Token amounts in the
//! emulated formula reach 10^24 and beyond, so interpolation is done on
//! [`BigInt`] and never goes through floating point.
//!
//! ```text
//! value[i] = minimum + round((maximum - minimum) * i / (count - 1))
//! ```

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;

use crate::error::HarnessError;

/// Ordered, immutable set of sample values for one grid dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRange {
    values: Vec<BigInt>,
}

impl SampleRange {
    /// Wrap explicit values, e.g. a hand-picked edge-case list.
    pub fn from_values(values: Vec<BigInt>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[BigInt] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BigInt> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a SampleRange {
    type Item = &'a BigInt;
    type IntoIter = std::slice::Iter<'a, BigInt>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Generate `count` evenly spaced values over `[minimum, maximum]`.
///
/// Both endpoints are included; `count == 1` yields `[minimum]`.
/// Rounding is half-up, which keeps the sequence non-decreasing.
///
/// # Errors
/// * `InvalidArgument` - `count` is zero or `minimum > maximum`
pub fn uniform_distribution(
    minimum: &BigInt,
    maximum: &BigInt,
    count: usize,
) -> Result<SampleRange, HarnessError> {
    if count < 1 {
        return Err(HarnessError::InvalidArgument(format!(
            "sample count must be at least 1, got {}",
            count
        )));
    }
    if minimum > maximum {
        return Err(HarnessError::InvalidArgument(format!(
            "minimum {} exceeds maximum {}",
            minimum, maximum
        )));
    }

    if count == 1 {
        return Ok(SampleRange::from_values(vec![minimum.clone()]));
    }

    let span = maximum - minimum;
    let steps = BigInt::from(count - 1);
    let values = (0..count)
        .map(|i| minimum + round_div(&span * BigInt::from(i), &steps))
        .collect();

    Ok(SampleRange::from_values(values))
}

/// `round(numerator / denominator)` for a non-negative numerator, halves up.
fn round_div(numerator: BigInt, denominator: &BigInt) -> BigInt {
    debug_assert!(!denominator.is_zero());
    let two = BigInt::from(2);
    (numerator * &two + denominator).div_floor(&(denominator * two))
}
