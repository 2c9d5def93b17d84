// 💱 Monetary Primitives - Coercion and rounding discipline
// All amounts are f64 in a single working currency per operation;
// callers convert currencies before handing values to the engines.

use serde::{Deserialize, Serialize};

// ============================================================================
// ROUNDING METHOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMethod {
    /// Round half to even, with an epsilon guard so that only values whose
    /// binary representation actually sits on the midpoint are treated as
    /// ties. 2.005 stores as slightly less than the midpoint, so it rounds
    /// to 2.00 at precision 2.
    BankersRounding,

    /// Legacy mode kept for deployments that still rely on it: snaps the
    /// scaled value to 8 decimals, applies half-to-even only at precision 0
    /// and plain half-up everywhere else. 2.005 rounds to 2.01 here.
    BankersRoundingLegacy,

    /// Commercial rounding: round half away from zero.
    CommercialRounding,
}

impl Default for RoundingMethod {
    fn default() -> Self {
        RoundingMethod::BankersRounding
    }
}

// ============================================================================
// COERCION
// ============================================================================

/// Coerce an optional amount to a number. Missing and NaN normalize to 0.
pub fn flt_opt(value: Option<f64>) -> f64 {
    flt(value.unwrap_or(0.0))
}

/// Normalize a raw amount. NaN is treated as 0 (permissive coercion:
/// malformed monetary input never raises, see the error handling policy).
pub fn flt(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Coerce a user-entered string to a number. Grouping commas are stripped;
/// empty and unparseable input normalizes to 0.
pub fn flt_str(value: &str) -> f64 {
    let cleaned: String = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Coerce and round in one step. Negative zero normalizes to 0 so that
/// fully-consumed allocations compare clean against zero.
pub fn flt_round(value: f64, precision: i32, method: RoundingMethod) -> f64 {
    let rounded = round_amount(flt(value), precision, method);
    if rounded.abs() == 0.0 {
        return 0.0;
    }
    rounded
}

// ============================================================================
// ROUNDING
// ============================================================================

/// Round a monetary amount to `precision` decimal places with the given
/// method. Precision 2 is the conventional monetary precision.
pub fn round_amount(value: f64, precision: i32, method: RoundingMethod) -> f64 {
    match method {
        RoundingMethod::BankersRounding => round_bankers(value, precision),
        RoundingMethod::BankersRoundingLegacy => round_bankers_legacy(value, precision),
        RoundingMethod::CommercialRounding => round_commercial(value, precision),
    }
}

/// Half-up rounding of the raw float, i.e. floor(x + 0.5). Used as the
/// non-tie fallback inside the rounding modes.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_bankers(value: f64, precision: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let is_negative = value < 0.0;

    let multiplier = 10f64.powi(precision);
    let num = value.abs() * multiplier;

    let floor_num = num.floor();
    let decimal_part = num - floor_num;

    // A fractional part only counts as a tie when it is within one ulp of
    // exactly 0.5 at this magnitude. Everything else rounds normally, which
    // is how 2.005 (stored below the midpoint) lands on 2.00.
    let epsilon = 2f64.powf(num.log2() - 52.0);

    let rounded = if (decimal_part - 0.5).abs() < epsilon {
        if floor_num % 2.0 == 0.0 {
            floor_num
        } else {
            floor_num + 1.0
        }
    } else {
        round_half_up(num)
    };

    let result = rounded / multiplier;
    if is_negative {
        -result
    } else {
        result
    }
}

fn round_bankers_legacy(value: f64, precision: i32) -> f64 {
    let is_negative = value < 0.0;

    let multiplier = 10f64.powi(precision);
    let scaled = if precision != 0 {
        value.abs() * multiplier
    } else {
        value.abs()
    };

    // Snap to 8 decimals first to absorb scaling noise.
    let n = round_half_up(scaled * 1e8) / 1e8;
    let i = n.floor();
    let f = n - i;

    // Ties-to-even only at precision 0; otherwise plain half-up.
    let mut rounded = if precision == 0 && f == 0.5 {
        if i % 2.0 == 0.0 {
            i
        } else {
            i + 1.0
        }
    } else {
        round_half_up(n)
    };

    if precision != 0 {
        rounded /= multiplier;
    }
    if is_negative {
        -rounded
    } else {
        rounded
    }
}

fn round_commercial(value: f64, precision: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let is_negative = value < 0.0;

    let multiplier = 10f64.powi(precision);
    let num = value * multiplier;

    // Nudge the scaled value past the midpoint in the direction of the
    // sign, so exact halves round away from zero.
    let mut epsilon = 2f64.powf(num.abs().log2() - 52.0);
    if is_negative {
        epsilon = -epsilon;
    }

    round_half_up(num + epsilon) / multiplier
}

// ============================================================================
// TESTS
// ============================================================================
