//! Market pricing: move each good's price toward a pressure- and
//! event-driven target.
//!
//! For every good on every market:
//!
//! ```text
//! pressure = demand / supply
//! modifier = product of active event multipliers covering the system
//! target   = base_price * pressure * modifier
//! price'   = clamp(price + (target - price) * reversion_rate,
//!                  base_price * min_factor, base_price * max_factor)
//! ```
//!
//! The price is rounded to two decimal places. Supply and demand then relax
//! toward 1.0 by `relaxation_rate`, so shocks fade unless something keeps
//! pushing them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use stellar_types::{ActiveEvent, EventKind, Good, GoodMarket, SystemId, WorldState};

use super::{Stage, StageError, StageReport};
use crate::config::MarketConfig;

/// Recomputes every market's prices.
#[derive(Debug, Clone)]
pub struct MarketPricing {
    /// Pricing parameters.
    config: MarketConfig,
}

impl MarketPricing {
    /// Create the stage with the given parameters.
    pub const fn new(config: MarketConfig) -> Self {
        Self { config }
    }

    /// Price multiplier an event applies to `good`.
    fn event_multiplier(kind: EventKind, good: Good) -> Decimal {
        match kind {
            EventKind::Shortage { good: scarce } if scarce == good => Decimal::new(15, 1),
            EventKind::Surplus { good: abundant } if abundant == good => Decimal::new(7, 1),
            EventKind::Embargo => Decimal::new(125, 2),
            EventKind::Boom => Decimal::new(11, 1),
            EventKind::Shortage { .. } | EventKind::Surplus { .. } | EventKind::PirateRaid => {
                Decimal::ONE
            }
        }
    }

    /// Combined multiplier of every event in `events` for `good`.
    fn modifier<'a>(
        mut events: impl Iterator<Item = &'a ActiveEvent>,
        good: Good,
    ) -> Result<Decimal, StageError> {
        events.try_fold(Decimal::ONE, |acc, event| {
            acc.checked_mul(Self::event_multiplier(event.kind, good))
                .ok_or_else(|| StageError::overflow("event modifier"))
        })
    }

    /// Move `value` toward 1.0 by `rate`.
    fn relax(value: Decimal, rate: Decimal) -> Result<Decimal, StageError> {
        Decimal::ONE
            .checked_sub(value)
            .and_then(|gap| gap.checked_mul(rate))
            .and_then(|step| value.checked_add(step))
            .ok_or_else(|| StageError::overflow("supply/demand relaxation"))
    }

    /// Compute the next state of a single good.
    fn price_good(&self, market: &GoodMarket, modifier: Decimal) -> Result<GoodMarket, StageError> {
        let pressure = market
            .demand
            .checked_div(market.supply)
            .ok_or_else(|| StageError::overflow("demand/supply pressure"))?;
        let target = market
            .base_price
            .checked_mul(pressure)
            .and_then(|p| p.checked_mul(modifier))
            .ok_or_else(|| StageError::overflow("target price"))?;
        let moved = target
            .checked_sub(market.current_price)
            .and_then(|gap| gap.checked_mul(self.config.reversion_rate))
            .and_then(|step| market.current_price.checked_add(step))
            .ok_or_else(|| StageError::overflow("price reversion"))?;
        let floor = market
            .base_price
            .checked_mul(self.config.min_price_factor)
            .ok_or_else(|| StageError::overflow("price floor"))?;
        let ceiling = market
            .base_price
            .checked_mul(self.config.max_price_factor)
            .ok_or_else(|| StageError::overflow("price ceiling"))?;

        Ok(GoodMarket {
            base_price: market.base_price,
            current_price: moved.max(floor).min(ceiling).round_dp(2),
            supply: Self::relax(market.supply, self.config.relaxation_rate)?,
            demand: Self::relax(market.demand, self.config.relaxation_rate)?,
        })
    }
}

impl Stage for MarketPricing {
    type Slice = BTreeMap<SystemId, BTreeMap<Good, GoodMarket>>;

    fn name(&self) -> &'static str {
        "market_pricing"
    }

    fn run(&self, world: &WorldState, _tick: u64) -> Result<Self::Slice, StageError> {
        let mut slice = BTreeMap::new();
        for (system_id, market) in &world.markets {
            let mut goods = BTreeMap::new();
            for (good, state) in &market.goods {
                let modifier = Self::modifier(world.events_affecting(*system_id), *good)?;
                goods.insert(*good, self.price_good(state, modifier)?);
            }
            slice.insert(*system_id, goods);
        }
        Ok(slice)
    }

    fn commit(&self, world: &mut WorldState, slice: Self::Slice) -> StageReport {
        let mut prices_updated: u32 = 0;
        for (system_id, goods) in slice {
            if let Some(market) = world.markets.get_mut(&system_id) {
                prices_updated =
                    prices_updated.saturating_add(u32::try_from(goods.len()).unwrap_or(u32::MAX));
                market.goods = goods;
            }
        }
        StageReport {
            prices_updated,
            ..StageReport::default()
        }
    }
}
