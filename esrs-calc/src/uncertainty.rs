//! Uncertainty propagation
//!
//! Root-sum-of-squares combination assuming independent inputs (IPCC
//! Approach 1). This is the convention used for GHG inventories; it has not
//! been reconciled against a reference GHG Protocol workbook, so treat the
//! output as indicative.

use crate::error::{CalcError, CalcResult};

fn check(percent: f64) -> CalcResult<f64> {
    if percent.is_finite() && percent >= 0.0 {
        Ok(percent)
    } else {
        Err(CalcError::InvalidUncertainty(percent))
    }
}

/// Relative uncertainty (%) of a product of independent inputs
///
/// For `E = A × F` with relative uncertainties `uA`, `uF`:
/// `uE = sqrt(uA² + uF²)`.
pub fn combine_product(percents: &[f64]) -> CalcResult<f64> {
    let mut sum_sq = 0.0;
    for p in percents {
        let p = check(*p)?;
        sum_sq += p * p;
    }
    Ok(sum_sq.sqrt())
}

/// Relative uncertainty (%) of a sum of independent quantities
///
/// Each item is `(value, relative uncertainty %)`. Returns 0 when the total
/// is zero.
pub fn combine_sum(items: &[(f64, f64)]) -> CalcResult<f64> {
    let mut total = 0.0;
    let mut sum_sq = 0.0;
    for (value, percent) in items {
        let percent = check(*percent)?;
        let absolute = value * percent;
        sum_sq += absolute * absolute;
        total += value;
    }
    if total == 0.0 {
        return Ok(0.0);
    }
    Ok(sum_sq.sqrt() / total.abs())
}
