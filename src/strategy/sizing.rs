//! Trade sizing
//!
//! Picks a direction and a target amount for each cycle. The target is a
//! uniformly random percentage of the aggregate ledger balance on the side
//! being spent.

use rand::prelude::*;
use rand::rngs::StdRng;

use super::types::Direction;
use crate::ledger::Totals;

/// Sized trade for a single cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub direction: Direction,
    pub percentage: f64,
    pub target_amount: f64,
}

/// Random sizing policy
///
/// Direction and percentage are drawn independently each cycle; nothing is
/// carried over from the previous cycle.
pub struct SizingPolicy {
    rng: StdRng,
}

impl SizingPolicy {
    /// Create a new policy with optional seed
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Create policy from entropy (random seed)
    pub fn from_entropy() -> Self {
        Self::new(None)
    }

    /// Uniform coin flip between BUY and SELL
    pub fn choose_direction(&mut self) -> Direction {
        if self.rng.gen_bool(0.5) {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }

    /// Uniform percentage in `[min, max)`
    ///
    /// Bounds are not validated: `min > max` yields a value in `(max, min]`,
    /// and `min == max` always yields `min`.
    pub fn choose_percentage(&mut self, min: f64, max: f64) -> f64 {
        min + self.rng.gen::<f64>() * (max - min)
    }

    /// Draw direction and percentage, then size against the ledger totals
    pub fn plan(&mut self, totals: &Totals, min_percent: f64, max_percent: f64) -> TradePlan {
        let direction = self.choose_direction();
        let percentage = self.choose_percentage(min_percent, max_percent);
        TradePlan {
            direction,
            percentage,
            target_amount: target_amount(direction, totals, percentage),
        }
    }
}

/// Percentage of the SOL total for BUY, of the token total for SELL
pub fn target_amount(direction: Direction, totals: &Totals, percentage: f64) -> f64 {
    match direction {
        Direction::Buy => totals.total_sol * percentage / 100.0,
        Direction::Sell => totals.total_token * percentage / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals() -> Totals {
        Totals {
            total_sol: 20.0,
            total_token: 1_000_000.0,
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut p1 = SizingPolicy::new(Some(12345));
        let mut p2 = SizingPolicy::new(Some(12345));

        for _ in 0..20 {
            assert_eq!(p1.plan(&totals(), 5.0, 15.0), p2.plan(&totals(), 5.0, 15.0));
        }
    }

    #[test]
    fn test_percentage_range() {
        let mut policy = SizingPolicy::new(Some(42));

        for _ in 0..1000 {
            let pct = policy.choose_percentage(5.0, 15.0);
            assert!(pct >= 5.0);
            assert!(pct < 15.0);
        }
    }

    #[test]
    fn test_reversed_bounds_interpolate() {
        let mut policy = SizingPolicy::new(Some(42));

        for _ in 0..1000 {
            let pct = policy.choose_percentage(15.0, 5.0);
            assert!(pct > 5.0);
            assert!(pct <= 15.0);
        }
    }

    #[test]
    fn test_equal_bounds() {
        let mut policy = SizingPolicy::new(Some(7));
        assert_eq!(policy.choose_percentage(10.0, 10.0), 10.0);
    }

    #[test]
    fn test_direction_is_roughly_fair() {
        let mut policy = SizingPolicy::new(Some(42));

        let iterations = 2000;
        let buys = (0..iterations)
            .filter(|_| policy.choose_direction() == Direction::Buy)
            .count();

        let buy_rate = buys as f64 / iterations as f64;
        assert!(buy_rate > 0.45);
        assert!(buy_rate < 0.55);
    }

    #[test]
    fn test_target_amount_by_direction() {
        assert_eq!(target_amount(Direction::Buy, &totals(), 10.0), 2.0);
        assert_eq!(target_amount(Direction::Sell, &totals(), 10.0), 100_000.0);
    }

    #[test]
    fn test_zero_totals_give_zero_target() {
        let mut policy = SizingPolicy::new(Some(1));
        let plan = policy.plan(&Totals::default(), 5.0, 15.0);
        assert_eq!(plan.target_amount, 0.0);
    }

    #[test]
    fn test_plan_matches_formula() {
        let mut policy = SizingPolicy::new(Some(99));
        let plan = policy.plan(&totals(), 1.0, 50.0);
        assert_eq!(
            plan.target_amount,
            target_amount(plan.direction, &totals(), plan.percentage)
        );
    }

    #[test]
    fn test_same_seed_same_plan() {
        let first = SizingPolicy::new(Some(42)).plan(&totals(), 5.0, 15.0);
        let second = SizingPolicy::new(Some(42)).plan(&totals(), 5.0, 15.0);

        assert_eq!(first, second);
    }
}
