//! Polynomial basis used by the jump-distance models.
//!
//! A degree-`d` model is linear in its parameters over the basis
//! `{1, x, x², …, xᵈ}`. The intercept column comes first so that the solved
//! parameter vector reads `[intercept, c1, …, cd]`.

/// Fill a design row `[1, x, x², …, xᵈ]` for degree `out.len() - 1`.
///
/// Powers are built by repeated multiplication, so the same `x` always yields
/// the same row bits regardless of degree.
pub fn fill_power_row(x: f64, out: &mut [f64]) {
    let mut acc = 1.0;
    for slot in out.iter_mut() {
        *slot = acc;
        acc *= x;
    }
}

/// Evaluate `intercept + Σ coeffs[i-1] · xⁱ` for `i = 1..=coeffs.len()`.
///
/// Terms are summed from the lowest power up, then the intercept is added.
pub fn eval_power_series(x: f64, intercept: f64, coeffs: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut power = 1.0;
    for &c in coeffs {
        power *= x;
        sum += c * power;
    }
    sum + intercept
}
