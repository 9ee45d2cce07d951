//! # Loyalty Rates
//!
//! How many points a purchase earns and what points are worth when
//! redeemed. The balance itself lives in the database; see the loyalty
//! ledger in `tally-engine`.
//!
//! ## Earning
//! ```text
//! total $42.50, 1 point per $1, customer spent $1,200 lifetime
//!      │
//!      ▼
//! base = floor(4250 / 100) × 1 = 42
//!      │
//!      ▼
//! tier ≥ $1,000 → 1.5× → floor(42 × 15000 / 10000) = 63 points
//! ```
//!
//! Points are earned on the sale total, after every discount.

use crate::config::LoyaltyConfig;
use crate::money::Money;
use crate::types::Customer;

/// Facts about the purchase a policy may look at besides the total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseContext {
    pub line_count: usize,
    pub unit_count: i64,
    pub subtotal: Money,
}

/// Pluggable earn rate.
///
/// Implementations must return a non-negative point count.
pub trait PointsPolicy: Send + Sync {
    fn points_for_purchase(&self, total: Money, customer: &Customer, context: &PurchaseContext)
        -> i64;
}

/// Never awards points.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoints;

impl PointsPolicy for NoPoints {
    fn points_for_purchase(&self, _: Money, _: &Customer, _: &PurchaseContext) -> i64 {
        0
    }
}

/// Points per currency unit, scaled by the customer's spend tier.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    config: LoyaltyConfig,
}

impl RatePolicy {
    pub fn new(config: LoyaltyConfig) -> Self {
        let mut config = config;
        // Highest threshold first so the first match is the best tier.
        config
            .tiers
            .sort_by(|a, b| b.min_total_spent_cents.cmp(&a.min_total_spent_cents));
        RatePolicy { config }
    }

    fn multiplier_bps(&self, customer: &Customer) -> u32 {
        self.config
            .tiers
            .iter()
            .find(|t| customer.total_spent_cents >= t.min_total_spent_cents)
            .map(|t| t.multiplier_bps)
            .unwrap_or(10_000)
    }
}

impl PointsPolicy for RatePolicy {
    fn points_for_purchase(
        &self,
        total: Money,
        customer: &Customer,
        _context: &PurchaseContext,
    ) -> i64 {
        if !self.config.enabled || !total.is_positive() || self.config.unit_cents <= 0 {
            return 0;
        }

        let base = (total.cents() / self.config.unit_cents) as i128 * self.config.points_per_unit as i128;
        let scaled = base * self.multiplier_bps(customer) as i128 / 10_000;
        scaled.clamp(0, i64::MAX as i128) as i64
    }
}

/// Fixed conversion between points and money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionRate {
    cents_per_point: i64,
}

impl RedemptionRate {
    pub fn new(cents_per_point: i64) -> Self {
        RedemptionRate {
            cents_per_point: cents_per_point.max(1),
        }
    }

    pub fn from_config(config: &LoyaltyConfig) -> Self {
        RedemptionRate::new(config.redemption_cents_per_point)
    }

    /// Points needed to cover `amount`, rounded up so the customer never
    /// receives more value than they paid for.
    pub fn points_for_value(&self, amount: Money) -> i64 {
        let cents = amount.cents().max(0);
        cents / self.cents_per_point + i64::from(cents % self.cents_per_point != 0)
    }

    pub fn value_of_points(&self, points: i64) -> Money {
        Money::from_cents(points.max(0).saturating_mul(self.cents_per_point))
    }
}
