//! Floating point helpers, thin wrappers around the approx crate.

use approx::AbsDiffEq;

/// Default absolute accuracy for float comparisons.
pub const ACC: f64 = 10e-11;

/// Compares if two floats are close via `approx::abs_diff_eq` using a maximum absolute difference
/// (epsilon) of `acc`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, acc: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a == b;
    }
    a.abs_diff_eq(&b, acc)
}

/// `numerator / denominator`, or `0.0` when the denominator is zero. Used wherever a ratio of
/// epidemic counts is undefined because nobody was infected.
#[must_use]
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
