//! Growth schedule generation
//!
//! At investment creation a fixed-length sequence of per-day signed
//! returns is drawn once and never regenerated (except by the explicit
//! backfill migration). The sequence sums exactly to the plan's expected
//! total return at 8-decimal precision, with bounded downside per day.

use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Default daily-return volatility factor
pub const DEFAULT_VOLATILITY: f64 = 0.5;

const SCALE: u32 = 8;

/// Generate a daily-return schedule using the process-wide RNG.
///
/// `annual_rate` is a percentage (8 means 8% per annum). The result has
/// `maturity_days` entries summing exactly to
/// `principal * annual_rate/100 * maturity_days/365` (rounded to 8 dp).
pub fn generate(
    principal: Decimal,
    annual_rate: Decimal,
    maturity_days: u32,
    volatility: f64,
) -> Vec<Decimal> {
    generate_with(
        &mut rand::thread_rng(),
        principal,
        annual_rate,
        maturity_days,
        volatility,
    )
}

/// Generate with an explicit RNG (seedable in tests).
///
/// Each day's raw return is `avg + z * maxVariance/4` with `z` a
/// Box-Muller standard normal and `maxVariance = avg * volatility * 2`.
/// Days below `-avg * 0.2` are clamped up to that floor, bounding the
/// downside while still allowing negative days. A final rescale pins the
/// sum to the exact expected return.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    principal: Decimal,
    annual_rate: Decimal,
    maturity_days: u32,
    volatility: f64,
) -> Vec<Decimal> {
    if maturity_days == 0 {
        return Vec::new();
    }
    let days = maturity_days as usize;

    let total = expected_total_return(principal, annual_rate, maturity_days);
    let total_f = total.to_f64().unwrap_or(0.0);
    let avg = total_f / days as f64;
    let floor = -avg * 0.2;
    let max_variance = avg * volatility * 2.0;

    let mut raw: Vec<f64> = (0..days)
        .map(|_| {
            let z = standard_normal(rng);
            (avg + z * max_variance / 4.0).max(floor)
        })
        .collect();

    // Rescale so the sum matches the expected total; the clamp can nudge
    // a few rescaled entries, the Decimal residue fix below absorbs that
    let sum: f64 = raw.iter().sum();
    if sum.abs() > f64::EPSILON {
        let factor = total_f / sum;
        for value in raw.iter_mut() {
            *value = (*value * factor).max(floor);
        }
    }

    let mut schedule: Vec<Decimal> = raw
        .iter()
        .map(|value| {
            Decimal::from_f64(*value)
                .unwrap_or(Decimal::ZERO)
                .round_dp(SCALE)
        })
        .collect();

    // Pin the exact-sum invariant: push the rounding residue into the
    // largest entry, which has the most headroom above the floor
    let sum_dec: Decimal = schedule.iter().sum();
    let residue = total - sum_dec;
    if !residue.is_zero() {
        if let Some(idx) = index_of_max(&schedule) {
            schedule[idx] += residue;
        }
    }

    schedule
}

/// Exact expected return: `principal * rate/100 * days/365`, at 8 dp.
pub fn expected_total_return(principal: Decimal, annual_rate: Decimal, maturity_days: u32) -> Decimal {
    let numerator = principal * annual_rate * Decimal::from(maturity_days);
    (numerator / (Decimal::from(100u32) * Decimal::from(365u32))).round_dp(SCALE)
}

/// Standard-normal deviate via the Box-Muller transform
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - gen() maps [0,1) to (0,1], keeping ln() finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn index_of_max(schedule: &[Decimal]) -> Option<usize> {
    schedule
        .iter()
        .enumerate()
        .max_by_key(|(_, value)| **value)
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_schedule_length_matches_maturity_days() {
        let schedule = generate(dec!(1000), dec!(8), 30, DEFAULT_VOLATILITY);
        assert_eq!(schedule.len(), 30);
    }

    #[test]
    fn test_sum_is_exact_expected_return() {
        let mut rng = StdRng::seed_from_u64(7);
        for days in [1u32, 7, 30, 90, 365] {
            let schedule =
                generate_with(&mut rng, dec!(1000), dec!(8), days, DEFAULT_VOLATILITY);
            let sum: Decimal = schedule.iter().sum();
            let expected = expected_total_return(dec!(1000), dec!(8), days);
            assert_eq!(sum, expected, "days={}", days);
        }
    }

    #[test]
    fn test_example_scenario_1000_at_8_percent_over_365() {
        let mut rng = StdRng::seed_from_u64(42);
        let schedule = generate_with(&mut rng, dec!(1000), dec!(8), 365, DEFAULT_VOLATILITY);

        let sum: Decimal = schedule.iter().sum();
        assert_eq!(sum, dec!(80));

        let final_value = dec!(1000) + sum;
        assert_eq!(final_value, dec!(1080));
    }

    #[test]
    fn test_downside_floor_respected() {
        let tolerance = Decimal::from_str("0.0000001").unwrap();
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let schedule = generate_with(&mut rng, dec!(5000), dec!(12), 180, DEFAULT_VOLATILITY);

            let total = expected_total_return(dec!(5000), dec!(12), 180);
            let avg = total / Decimal::from(180u32);
            let floor = -avg * dec!(0.2);

            for (i, day) in schedule.iter().enumerate() {
                assert!(
                    *day >= floor - tolerance,
                    "seed={} day={} value={} floor={}",
                    seed,
                    i,
                    day,
                    floor
                );
            }
        }
    }

    #[test]
    fn test_schedules_vary_between_draws() {
        let a = generate(dec!(1000), dec!(8), 60, DEFAULT_VOLATILITY);
        let b = generate(dec!(1000), dec!(8), 60, DEFAULT_VOLATILITY);
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_days_yields_empty_schedule() {
        let schedule = generate(dec!(1000), dec!(8), 0, DEFAULT_VOLATILITY);
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_zero_volatility_is_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        let schedule = generate_with(&mut rng, dec!(365), dec!(100), 365, 0.0);

        // expected total = 365, avg = 1 per day
        let expected = dec!(1);
        for day in &schedule {
            let diff = (*day - expected).abs();
            assert!(diff <= dec!(0.0000001), "day={}", day);
        }
    }
}
