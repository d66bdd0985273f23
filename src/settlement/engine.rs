use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::UnitScale;
use super::SettlementError;
use crate::models::{Side, Stake};

/// How a settlement distributed the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Nothing staked, nothing paid.
    Empty,
    /// Pool split across winners in proportion to their stake.
    Proportional,
    /// Nobody backed the winning side; the fallback recipient takes the pool.
    Fallback,
}

/// Result of settling one market. `payouts` is the delta to credit to the
/// rewards ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub winning_side: Side,
    pub total_pool: Decimal,
    pub winner_pool: Decimal,
    pub distribution: Distribution,
    pub payouts: BTreeMap<String, Decimal>,
}

impl Settlement {
    pub fn total_paid(&self) -> Decimal {
        self.payouts.values().copied().sum()
    }
}

/// Pure proportional-payout calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementEngine {
    scale: UnitScale,
}

impl SettlementEngine {
    pub fn new(scale: UnitScale) -> Self {
        Self { scale }
    }

    /// Compute payouts for one market.
    ///
    /// Every winner gets `total_pool * stake / winner_pool`, computed on
    /// integer minor units. Floors are paid first; the leftover units go one
    /// at a time to the largest remainders (ties: ascending staker id), so the
    /// payouts always add up to `total_pool` exactly. Multiple stakes from the
    /// same staker are summed before dividing.
    pub fn settle(
        &self,
        stakes: &[Stake],
        winning_side: Side,
        fallback_recipient: &str,
    ) -> Result<Settlement, SettlementError> {
        let mut total_units: u128 = 0;
        let mut winners: BTreeMap<&str, u128> = BTreeMap::new();

        for stake in stakes {
            let units = self.scale.to_minor_units(stake.amount).map_err(|reason| {
                SettlementError::InvalidStake {
                    staker: stake.staker.clone(),
                    reason,
                }
            })?;
            total_units = total_units
                .checked_add(units)
                .ok_or(SettlementError::PoolOverflow)?;

            if stake.side == winning_side {
                let entry = winners.entry(stake.staker.as_str()).or_insert(0);
                *entry += units;
            }
        }

        // winners is a subset of the checked total
        let winner_units: u128 = winners.values().sum();

        let (distribution, unit_payouts) = if total_units == 0 {
            (Distribution::Empty, BTreeMap::new())
        } else if winner_units == 0 {
            let mut payouts = BTreeMap::new();
            payouts.insert(fallback_recipient.to_string(), total_units);
            (Distribution::Fallback, payouts)
        } else {
            (
                Distribution::Proportional,
                allocate_largest_remainder(total_units, winner_units, &winners)?,
            )
        };

        let mut payouts = BTreeMap::new();
        for (staker, units) in unit_payouts {
            payouts.insert(staker, self.decimal(units)?);
        }

        Ok(Settlement {
            winning_side,
            total_pool: self.decimal(total_units)?,
            winner_pool: self.decimal(winner_units)?,
            distribution,
            payouts,
        })
    }

    fn decimal(&self, units: u128) -> Result<Decimal, SettlementError> {
        self.scale
            .from_minor_units(units)
            .map_err(|_| SettlementError::PoolOverflow)
    }
}

fn allocate_largest_remainder(
    total_units: u128,
    winner_units: u128,
    winners: &BTreeMap<&str, u128>,
) -> Result<BTreeMap<String, u128>, SettlementError> {
    // total * units / winner_pool, split as (q * winner_pool + r) * units so
    // nothing wider than u128 is ever formed.
    let quotient = total_units / winner_units;
    let rest = total_units % winner_units;

    // (staker, floor share, remainder of the division)
    let mut shares: Vec<(&str, u128, u128)> = Vec::with_capacity(winners.len());
    let mut allocated: u128 = 0;

    for (&staker, &units) in winners {
        let (extra, remainder) = mul_div_rem(rest, units, winner_units);
        // units <= winner_units, so quotient * units <= total_units
        let floor = quotient * units + extra;
        allocated = allocated
            .checked_add(floor)
            .ok_or(SettlementError::PoolOverflow)?;
        shares.push((staker, floor, remainder));
    }

    // Always fewer than the number of winners.
    let leftover = usize::try_from(total_units - allocated).unwrap_or(usize::MAX);

    // Stable sort: equal remainders keep the ascending staker order of the map.
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].2.cmp(&shares[a].2));
    for &idx in order.iter().take(leftover) {
        shares[idx].1 += 1;
    }

    Ok(shares
        .into_iter()
        .filter(|(_, units, _)| *units > 0)
        .map(|(staker, units, _)| (staker.to_string(), units))
        .collect())
}

/// `(a * b / d, a * b % d)` for `a < d`, without a 256-bit intermediate.
/// Shift-and-add over the bits of `b`, keeping the running remainder below `d`.
fn mul_div_rem(a: u128, b: u128, d: u128) -> (u128, u128) {
    debug_assert!(a < d);
    let mut quotient: u128 = 0;
    let mut remainder: u128 = 0;

    for bit in (0..u128::BITS).rev() {
        quotient <<= 1;
        remainder = add_mod(remainder, remainder, d, &mut quotient);
        if (b >> bit) & 1 == 1 {
            remainder = add_mod(remainder, a, d, &mut quotient);
        }
    }
    (quotient, remainder)
}

/// `x + y` reduced below `d` (both inputs already are), carrying into `quotient`.
fn add_mod(x: u128, y: u128, d: u128, quotient: &mut u128) -> u128 {
    if x >= d - y {
        *quotient += 1;
        x - (d - y)
    } else {
        x + y
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::amount::{AmountError, MAX_UNIT_SCALE};

    fn stake(staker: &str, side: Side, amount: Decimal) -> Stake {
        Stake::new(staker, side, amount)
    }

    fn engine() -> SettlementEngine {
        SettlementEngine::default()
    }

    #[test]
    fn test_proportional_payout() {
        let stakes = vec![
            stake("A", Side::Yes, Decimal::from(100)),
            stake("B", Side::Yes, Decimal::from(300)),
            stake("C", Side::No, Decimal::from(200)),
        ];
        let result = engine().settle(&stakes, Side::Yes, "creator").unwrap();

        assert_eq!(result.distribution, Distribution::Proportional);
        assert_eq!(result.total_pool, Decimal::from(600));
        assert_eq!(result.winner_pool, Decimal::from(400));
        assert_eq!(result.payouts["A"], Decimal::from(150));
        assert_eq!(result.payouts["B"], Decimal::from(450));
        assert!(!result.payouts.contains_key("C"));
        assert!(!result.payouts.contains_key("creator"));
        assert_eq!(result.total_paid(), Decimal::from(600));
    }

    #[test]
    fn test_no_winners_goes_to_fallback() {
        let stakes = vec![stake("A", Side::No, Decimal::from(500))];
        let result = engine().settle(&stakes, Side::Yes, "creator").unwrap();

        assert_eq!(result.distribution, Distribution::Fallback);
        assert_eq!(result.payouts.len(), 1);
        assert_eq!(result.payouts["creator"], Decimal::from(500));
        assert_eq!(result.winner_pool, Decimal::ZERO);
    }

    #[test]
    fn test_empty_stakes() {
        let result = engine().settle(&[], Side::Yes, "creator").unwrap();
        assert_eq!(result.distribution, Distribution::Empty);
        assert!(result.payouts.is_empty());
        assert_eq!(result.total_pool, Decimal::ZERO);
    }

    #[test]
    fn test_zero_pool_pays_nobody() {
        let stakes = vec![stake("A", Side::No, Decimal::ZERO)];
        let result = engine().settle(&stakes, Side::Yes, "creator").unwrap();
        assert_eq!(result.distribution, Distribution::Empty);
        assert!(result.payouts.is_empty());
    }

    #[test]
    fn test_largest_remainder_conserves_pool() {
        // 10 split three ways: 3.3333334 + 3.3333333 + 3.3333333
        let stakes = vec![
            stake("carol", Side::Yes, Decimal::ONE),
            stake("alice", Side::Yes, Decimal::ONE),
            stake("bob", Side::Yes, Decimal::ONE),
            stake("dave", Side::No, Decimal::from(7)),
        ];
        let result = engine().settle(&stakes, Side::Yes, "creator").unwrap();

        assert_eq!(result.payouts["alice"], Decimal::new(33_333_334, 7));
        assert_eq!(result.payouts["bob"], Decimal::new(33_333_333, 7));
        assert_eq!(result.payouts["carol"], Decimal::new(33_333_333, 7));
        assert_eq!(result.total_paid(), Decimal::from(10));
    }

    #[test]
    fn test_leftover_goes_to_largest_remainder() {
        // pool 1 minor unit short of even: yes stakes 1 and 2, no stake 0.0000001
        let unit = Decimal::new(1, 7);
        let stakes = vec![
            stake("small", Side::Yes, Decimal::ONE),
            stake("large", Side::Yes, Decimal::from(2)),
            stake("loser", Side::No, unit),
        ];
        let result = engine().settle(&stakes, Side::Yes, "creator").unwrap();

        // total 30000001 units: small exact 10000000.33, large 20000000.67
        assert_eq!(result.payouts["small"], Decimal::ONE);
        assert_eq!(result.payouts["large"], Decimal::from(2) + unit);
        assert_eq!(result.total_paid(), result.total_pool);
    }

    #[test]
    fn test_repeat_stakes_are_aggregated() {
        let stakes = vec![
            stake("A", Side::No, Decimal::from(100)),
            stake("A", Side::No, Decimal::from(100)),
            stake("B", Side::No, Decimal::from(200)),
            stake("C", Side::Yes, Decimal::from(400)),
        ];
        let result = engine().settle(&stakes, Side::No, "creator").unwrap();
        assert_eq!(result.payouts["A"], Decimal::from(400));
        assert_eq!(result.payouts["B"], Decimal::from(400));
        assert_eq!(result.payouts.len(), 2);
    }

    #[test]
    fn test_negative_stake_rejected() {
        let stakes = vec![
            stake("A", Side::Yes, Decimal::from(100)),
            stake("B", Side::No, Decimal::from(-1)),
        ];
        let err = engine().settle(&stakes, Side::Yes, "creator").unwrap_err();
        match err {
            SettlementError::InvalidStake { staker, reason } => {
                assert_eq!(staker, "B");
                assert_eq!(reason, AmountError::Negative);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sub_unit_stake_rejected() {
        let stakes = vec![stake("A", Side::Yes, Decimal::new(1, 9))];
        let err = engine().settle(&stakes, Side::Yes, "creator").unwrap_err();
        assert!(matches!(
            err,
            SettlementError::InvalidStake {
                reason: AmountError::TooPrecise { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_settle_is_deterministic() {
        let stakes = vec![
            stake("x", Side::Yes, Decimal::new(12_345, 2)),
            stake("y", Side::Yes, Decimal::new(67_891, 3)),
            stake("z", Side::No, Decimal::new(5_555, 1)),
        ];
        let first = engine().settle(&stakes, Side::Yes, "creator").unwrap();
        let second = engine().settle(&stakes, Side::Yes, "creator").unwrap();
        assert_eq!(first, second);
    }

    /// Conservation and loser exclusion over a fixed set of generated
    /// markets. Amounts carry `amount_dp` decimal places.
    fn check_generated_pools(scale: UnitScale, amount_dp: u32) {
        // Small LCG so the case set is fixed across runs.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            seed >> 33
        };
        let engine = SettlementEngine::new(scale);

        for _ in 0..200 {
            let count = (next() % 12) as usize + 1;
            let stakes: Vec<Stake> = (0..count)
                .map(|i| {
                    let side = Side::from(next() % 2 == 0);
                    let amount = Decimal::new((next() % 5_000_000_000) as i64, amount_dp);
                    stake(&format!("s{}", i % 5), side, amount)
                })
                .collect();
            let winning_side = Side::from(next() % 2 == 0);

            let result = engine.settle(&stakes, winning_side, "creator").unwrap();
            let total: Decimal = stakes.iter().map(|s| s.amount).sum();
            assert_eq!(result.total_pool, total);

            match result.distribution {
                Distribution::Empty => assert!(result.payouts.is_empty()),
                Distribution::Fallback | Distribution::Proportional => {
                    assert_eq!(result.total_paid(), total);
                }
            }

            if result.distribution == Distribution::Proportional {
                for staker in result.payouts.keys() {
                    assert!(stakes
                        .iter()
                        .any(|s| &s.staker == staker && s.side == winning_side));
                }
            }
        }
    }

    #[test]
    fn test_conservation_over_generated_pools() {
        check_generated_pools(UnitScale::default(), 7);
    }

    #[test]
    fn test_conservation_at_whole_units() {
        check_generated_pools(UnitScale::new(0).unwrap(), 0);
    }

    #[test]
    fn test_conservation_at_max_scale() {
        check_generated_pools(UnitScale::new(MAX_UNIT_SCALE).unwrap(), 7);
    }

    #[test]
    fn test_reference_example_at_max_scale() {
        let engine = SettlementEngine::new(UnitScale::new(MAX_UNIT_SCALE).unwrap());
        let stakes = vec![
            stake("A", Side::Yes, Decimal::from(100)),
            stake("B", Side::Yes, Decimal::from(300)),
            stake("C", Side::No, Decimal::from(200)),
        ];
        let result = engine.settle(&stakes, Side::Yes, "creator").unwrap();

        assert_eq!(result.payouts["A"], Decimal::from(150));
        assert_eq!(result.payouts["B"], Decimal::from(450));
        assert_eq!(result.payouts.len(), 2);
    }

    #[test]
    fn test_three_way_split_at_max_scale() {
        let engine = SettlementEngine::new(UnitScale::new(MAX_UNIT_SCALE).unwrap());
        let stakes = vec![
            stake("carol", Side::Yes, Decimal::ONE),
            stake("alice", Side::Yes, Decimal::ONE),
            stake("bob", Side::Yes, Decimal::ONE),
            stake("dave", Side::No, Decimal::from(7)),
        ];
        let result = engine.settle(&stakes, Side::Yes, "creator").unwrap();

        assert_eq!(result.payouts["alice"], Decimal::new(3_333_333_333_333_333_334, 18));
        assert_eq!(result.payouts["bob"], Decimal::new(3_333_333_333_333_333_333, 18));
        assert_eq!(result.payouts["carol"], Decimal::new(3_333_333_333_333_333_333, 18));
        assert_eq!(result.total_paid(), Decimal::from(10));
    }

    #[test]
    fn test_large_pools_settle_exactly() {
        // products of these unit counts are far beyond u128
        let big = |n: i128| Decimal::from_i128_with_scale(n * 10i128.pow(27), 0);

        let whole = SettlementEngine::new(UnitScale::new(0).unwrap());
        let stakes = vec![
            stake("A", Side::Yes, big(30)),
            stake("B", Side::Yes, big(10)),
            stake("C", Side::No, big(30)),
        ];
        let result = whole.settle(&stakes, Side::Yes, "creator").unwrap();
        assert_eq!(result.payouts["A"], Decimal::from_i128_with_scale(525 * 10i128.pow(26), 0));
        assert_eq!(result.payouts["B"], Decimal::from_i128_with_scale(175 * 10i128.pow(26), 0));
        assert_eq!(result.total_paid(), big(70));

        let fine = SettlementEngine::new(UnitScale::new(MAX_UNIT_SCALE).unwrap());
        let stakes = vec![
            stake("A", Side::Yes, Decimal::from(10_000_000_000i64)),
            stake("B", Side::Yes, Decimal::from(30_000_000_000i64)),
            stake("C", Side::No, Decimal::from(20_000_000_000i64)),
        ];
        let result = fine.settle(&stakes, Side::Yes, "creator").unwrap();
        assert_eq!(result.payouts["A"], Decimal::from(15_000_000_000i64));
        assert_eq!(result.payouts["B"], Decimal::from(45_000_000_000i64));
    }

    #[test]
    fn test_pool_beyond_decimal_range_overflows() {
        // each stake is representable, the 10^29 total is not
        let half = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        let engine = SettlementEngine::new(UnitScale::new(0).unwrap());
        let stakes = vec![stake("A", Side::Yes, half), stake("B", Side::No, half)];

        let err = engine.settle(&stakes, Side::Yes, "creator").unwrap_err();
        assert!(matches!(err, SettlementError::PoolOverflow));
    }

    #[test]
    fn test_mul_div_rem_matches_native() {
        for (a, b, d) in [(0u128, 5u128, 7u128), (3, 4, 5), (6, 1_000_003, 7), (99, 12_345, 100)] {
            assert_eq!(mul_div_rem(a, b, d), (a * b / d, a * b % d));
        }
        // (2^127 - 1) * 2 / 2^127 = 1 rem 2^127 - 2
        let d = 1u128 << 127;
        assert_eq!(mul_div_rem(d - 1, 2, d), (1, d - 2));
        assert_eq!(mul_div_rem(d - 1, u128::MAX, d), (u128::MAX - 2, 1));
    }
}
