// src/features.rs
use crate::models::{AmountEvent, WalletRecord};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
/// Inactivity reported for a wallet that never borrowed or repaid
pub const STALE_DAYS: f64 = 365.0;
/// Repayment ratio when nothing was borrowed
pub const FULLY_REPAID: f64 = 1.0;
/// Loan-to-value proxy when there is no borrow or repay volume
pub const NEUTRAL_LTV: f64 = 0.5;
/// Borrow/supply ratio when nothing is supplied
pub const UNCOLLATERALIZED: f64 = 1.0;

/// Per-wallet behavioral features, derived once and dropped after scoring
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub total_borrowed: Decimal,
    pub total_repaid: Decimal,
    pub liquidation_count: u32,
    pub days_inactive: f64,
    pub unique_asset_count: u32,
    pub total_supply: Decimal,
    pub total_borrow: Decimal,
    pub borrow_supply_ratio: f64,
    pub repayment_ratio: f64,
    pub loan_to_value_proxy: f64,
    /// False when the wallet has no record or no borrow/repay/liquidation events
    pub has_history: bool,
}

impl FeatureVector {
    pub fn no_history() -> Self {
        Self {
            total_borrowed: Decimal::ZERO,
            total_repaid: Decimal::ZERO,
            liquidation_count: 0,
            days_inactive: STALE_DAYS,
            unique_asset_count: 0,
            total_supply: Decimal::ZERO,
            total_borrow: Decimal::ZERO,
            borrow_supply_ratio: UNCOLLATERALIZED,
            repayment_ratio: FULLY_REPAID,
            loan_to_value_proxy: NEUTRAL_LTV,
            has_history: false,
        }
    }
}

/// `num / den` as f64, or `None` when the denominator is not positive
fn ratio(num: Decimal, den: Decimal) -> Option<f64> {
    if den <= Decimal::ZERO {
        return None;
    }
    num.checked_div(den).and_then(|r| r.to_f64())
}

/// Saturates at `Decimal::MAX` instead of panicking
fn saturating_total<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, a| acc.checked_add(a).unwrap_or(Decimal::MAX))
}

fn sum_amounts(events: &[AmountEvent]) -> Decimal {
    saturating_total(events.iter().map(|e| e.amount))
}

/// Derive features for one wallet. Pure in `record` and `now`.
pub fn derive(record: Option<&WalletRecord>, now: DateTime<Utc>) -> FeatureVector {
    let Some(record) = record else {
        return FeatureVector::no_history();
    };

    let total_borrowed = sum_amounts(&record.borrow_events);
    let total_repaid = sum_amounts(&record.repay_events);
    let liquidation_count = record.liquidation_events.len() as u32;

    // events arrive unordered, scan for the latest
    let latest_ts = record
        .borrow_events
        .iter()
        .chain(record.repay_events.iter())
        .map(|e| e.timestamp)
        .max();

    let days_inactive = match latest_ts {
        Some(ts) => (now.timestamp().saturating_sub(ts) as f64 / SECONDS_PER_DAY).max(0.0),
        None => STALE_DAYS,
    };

    let total_supply = saturating_total(record.token_balances.iter().map(|b| b.supplied_amount));
    let total_borrow = saturating_total(record.token_balances.iter().map(|b| b.borrowed_amount));

    let unique_asset_count = record
        .token_balances
        .iter()
        .filter(|b| !b.supplied_amount.is_zero() || !b.borrowed_amount.is_zero())
        .map(|b| b.symbol.as_str())
        .collect::<HashSet<_>>()
        .len() as u32;

    let has_history = !(record.borrow_events.is_empty()
        && record.repay_events.is_empty()
        && record.liquidation_events.is_empty());

    FeatureVector {
        total_borrowed,
        total_repaid,
        liquidation_count,
        days_inactive,
        unique_asset_count,
        total_supply,
        total_borrow,
        borrow_supply_ratio: ratio(total_borrow, total_supply).unwrap_or(UNCOLLATERALIZED),
        repayment_ratio: ratio(total_repaid, total_borrowed).unwrap_or(FULLY_REPAID),
        loan_to_value_proxy: ratio(total_borrowed, saturating_total([total_borrowed, total_repaid]))
            .unwrap_or(NEUTRAL_LTV),
        has_history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LiquidationEvent, TokenBalance, WalletId};
    use chrono::TimeZone;
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn event(amount: i64, timestamp: i64) -> AmountEvent {
        AmountEvent {
            amount: Decimal::from(amount),
            timestamp,
        }
    }

    #[test]
    fn test_missing_record_is_no_history() {
        let fv = derive(None, now());
        assert_eq!(fv, FeatureVector::no_history());
        assert_eq!(fv.days_inactive, 365.0);
        assert!(!fv.has_history);
    }

    #[test]
    fn test_empty_record_matches_no_history() {
        let record = WalletRecord::empty(WalletId::new("0x01"));
        let fv = derive(Some(&record), now());
        assert_eq!(fv, FeatureVector::no_history());
    }

    #[test]
    fn test_sums_and_ratios() {
        let ts = now().timestamp();
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.borrow_events = vec![event(60, ts), event(40, ts)];
        record.repay_events = vec![event(50, ts)];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.total_borrowed, Decimal::from(100));
        assert_eq!(fv.total_repaid, Decimal::from(50));
        assert_eq!(fv.repayment_ratio, 0.5);
        assert!((fv.loan_to_value_proxy - 100.0 / 150.0).abs() < 1e-12);
        assert!(fv.has_history);
    }

    #[test]
    fn test_latest_event_found_in_unordered_input() {
        let ts = now().timestamp();
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.borrow_events = vec![event(1, ts - 10 * 86_400), event(1, ts - 30 * 86_400)];
        record.repay_events = vec![event(1, ts - 2 * 86_400), event(1, ts - 40 * 86_400)];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.days_inactive, 2.0);
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.borrow_events = vec![event(5, now().timestamp() + 86_400)];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.days_inactive, 0.0);
    }

    #[test]
    fn test_extreme_timestamp_saturates() {
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.borrow_events = vec![event(5, i64::MIN)];
        record.repay_events = vec![event(5, i64::MIN + 1)];

        let fv = derive(Some(&record), now());
        assert!(fv.days_inactive > STALE_DAYS);
        assert!(fv.days_inactive.is_finite());
    }

    #[test]
    fn test_overflowing_amounts_saturate() {
        let huge = Decimal::from_str("50000000000000000000000000000").unwrap();
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        let huge_event = AmountEvent {
            amount: huge,
            timestamp: now().timestamp(),
        };
        record.borrow_events = vec![huge_event.clone(), huge_event.clone()];
        record.repay_events = vec![huge_event];
        record.token_balances = vec![
            TokenBalance {
                symbol: "cDAI".into(),
                supplied_amount: huge,
                borrowed_amount: huge,
            },
            TokenBalance {
                symbol: "cETH".into(),
                supplied_amount: huge,
                borrowed_amount: huge,
            },
        ];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.total_borrowed, Decimal::MAX);
        assert_eq!(fv.total_supply, Decimal::MAX);
        assert!((0.0..=1.0).contains(&fv.loan_to_value_proxy));
        assert!(fv.repayment_ratio <= 1.0);
    }

    #[test]
    fn test_liquidations_without_borrow_activity() {
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.liquidation_events = vec![LiquidationEvent {
            amount_repaid: Decimal::from(3),
            seized_collateral: Decimal::from(4),
            timestamp: now().timestamp(),
        }];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.liquidation_count, 1);
        // liquidations do not count as borrow/repay activity
        assert_eq!(fv.days_inactive, STALE_DAYS);
        assert_eq!(fv.repayment_ratio, FULLY_REPAID);
        assert_eq!(fv.loan_to_value_proxy, NEUTRAL_LTV);
        assert!(fv.has_history);
    }

    #[test]
    fn test_token_balance_aggregates() {
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.token_balances = vec![
            TokenBalance {
                symbol: "cDAI".into(),
                supplied_amount: Decimal::from(8),
                borrowed_amount: Decimal::from(2),
            },
            TokenBalance {
                symbol: "cETH".into(),
                supplied_amount: Decimal::from(2),
                borrowed_amount: Decimal::ZERO,
            },
            TokenBalance {
                symbol: "cUSDC".into(),
                supplied_amount: Decimal::ZERO,
                borrowed_amount: Decimal::ZERO,
            },
        ];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.total_supply, Decimal::from(10));
        assert_eq!(fv.total_borrow, Decimal::from(2));
        assert_eq!(fv.unique_asset_count, 2);
        assert!((fv.borrow_supply_ratio - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_supply_uses_sentinel() {
        let mut record = WalletRecord::empty(WalletId::new("0x01"));
        record.token_balances = vec![TokenBalance {
            symbol: "cDAI".into(),
            supplied_amount: Decimal::ZERO,
            borrowed_amount: Decimal::from(7),
        }];

        let fv = derive(Some(&record), now());
        assert_eq!(fv.borrow_supply_ratio, UNCOLLATERALIZED);
    }
}
