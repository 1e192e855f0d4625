// src/parser.rs
use crate::models::{AmountEvent, LiquidationEvent, TokenBalance, WalletId, WalletRecord};
use crate::source::FetchError;
use crate::subgraph::{RawAccount, RawAmountEvent, Scalar};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a non-negative decimal amount
fn parse_amount(field: &str, value: &Scalar) -> Result<Decimal, FetchError> {
    let text = value.as_text();
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| FetchError::Decode(format!("{} is not a decimal: {:?}", field, text)))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(FetchError::Decode(format!("{} is negative: {}", field, amount)));
    }
    Ok(amount)
}

/// Parse a unix timestamp in seconds; pre-epoch values are rejected
fn parse_timestamp(value: &Scalar) -> Result<i64, FetchError> {
    let text = value.as_text();
    let ts = text
        .parse::<i64>()
        .map_err(|_| FetchError::Decode(format!("blockTimestamp is not an integer: {:?}", text)))?;

    if ts < 0 {
        return Err(FetchError::Decode(format!("blockTimestamp is negative: {}", ts)));
    }
    Ok(ts)
}

/// Sum of amounts, failing instead of overflowing `Decimal`
fn checked_total<I>(field: &str, amounts: I) -> Result<Decimal, FetchError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a))
        .ok_or_else(|| FetchError::Decode(format!("{} total overflows", field)))
}

fn decode_amount_event(field: &str, raw: &RawAmountEvent) -> Result<AmountEvent, FetchError> {
    Ok(AmountEvent {
        amount: parse_amount(field, &raw.amount)?,
        timestamp: parse_timestamp(&raw.block_timestamp)?,
    })
}

/// Decode a subgraph account into a `WalletRecord`
pub fn decode_account(wallet: &WalletId, raw: &RawAccount) -> Result<WalletRecord, FetchError> {
    let borrow_events = raw
        .borrow_events
        .iter()
        .map(|e| decode_amount_event("borrow amount", e))
        .collect::<Result<Vec<_>, _>>()?;

    let repay_events = raw
        .repay_events
        .iter()
        .map(|e| decode_amount_event("repay amount", e))
        .collect::<Result<Vec<_>, _>>()?;

    let liquidation_events = raw
        .liquidation_events
        .iter()
        .map(|e| -> Result<LiquidationEvent, FetchError> {
            Ok(LiquidationEvent {
                amount_repaid: parse_amount("amountRepaid", &e.amount_repaid)?,
                seized_collateral: parse_amount("seizedCollateral", &e.seized_collateral)?,
                timestamp: parse_timestamp(&e.block_timestamp)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let token_balances = raw
        .tokens
        .iter()
        .map(|t| -> Result<TokenBalance, FetchError> {
            Ok(TokenBalance {
                symbol: t.symbol.clone(),
                supplied_amount: parse_amount("supplyBalanceUnderlying", &t.supply_balance_underlying)?,
                borrowed_amount: parse_amount("borrowBalanceUnderlying", &t.borrow_balance_underlying)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // totals must stay representable once features are derived
    let borrowed = checked_total("borrow amount", borrow_events.iter().map(|e| e.amount))?;
    let repaid = checked_total("repay amount", repay_events.iter().map(|e| e.amount))?;
    checked_total("borrow and repay", [borrowed, repaid])?;
    checked_total("supplyBalanceUnderlying", token_balances.iter().map(|b| b.supplied_amount))?;
    checked_total("borrowBalanceUnderlying", token_balances.iter().map(|b| b.borrowed_amount))?;

    Ok(WalletRecord {
        wallet_id: wallet.clone(),
        borrow_events,
        repay_events,
        liquidation_events,
        token_balances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subgraph::decode_account_response;

    const BODY: &str = r#"{"data":{"account":{
        "id":"0x00000000000000000000000000000000000000aa",
        "tokens":[
            {"symbol":"cETH","supplyBalanceUnderlying":"2.0","borrowBalanceUnderlying":"0"},
            {"symbol":"cDAI","supplyBalanceUnderlying":"0","borrowBalanceUnderlying":"150.75"}
        ],
        "borrowEvents":[
            {"amount":"100","blockTimestamp":1650000000},
            {"amount":"50.75","blockTimestamp":1640000000}
        ],
        "repayEvents":[{"amount":"0.0000001","blockTimestamp":"1655000000"}],
        "liquidationEvents":[
            {"amountRepaid":"10","seizedCollateral":"0.5","blockTimestamp":1656000000}
        ]
    }}}"#;

    fn raw() -> RawAccount {
        decode_account_response(BODY).unwrap().unwrap()
    }

    #[test]
    fn test_decode_account() {
        let wallet = WalletId::new("0x00000000000000000000000000000000000000AA");
        let record = decode_account(&wallet, &raw()).unwrap();

        assert_eq!(record.wallet_id, wallet);
        assert_eq!(record.borrow_events.len(), 2);
        assert_eq!(record.borrow_events[1].amount, Decimal::from_str("50.75").unwrap());
        assert_eq!(record.borrow_events[1].timestamp, 1_640_000_000);
        assert_eq!(record.repay_events[0].amount, Decimal::from_str("0.0000001").unwrap());
        assert_eq!(record.repay_events[0].timestamp, 1_655_000_000);
        assert_eq!(record.liquidation_events[0].seized_collateral, Decimal::from_str("0.5").unwrap());
        assert_eq!(record.token_balances[1].symbol, "cDAI");
        assert_eq!(record.token_balances[1].borrowed_amount, Decimal::from_str("150.75").unwrap());
    }

    #[test]
    fn test_scientific_notation_amount() {
        let amount = parse_amount("amount", &Scalar::Text("1e-7".into())).unwrap();
        assert_eq!(amount, Decimal::from_str("0.0000001").unwrap());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = parse_amount("borrow amount", &Scalar::Text("-4".into())).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut account = raw();
        account.borrow_events[0].block_timestamp = Scalar::Text("yesterday".into());
        let err = decode_account(&WalletId::new("0xaa"), &account).unwrap_err();
        assert!(err.to_string().contains("blockTimestamp"));
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let err = parse_timestamp(&Scalar::Text("-9223372036854775808".into())).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));

        let mut account = raw();
        account.repay_events[0].block_timestamp = Scalar::Text("-1".into());
        let err = decode_account(&WalletId::new("0xaa"), &account).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_overflowing_borrow_total_rejected() {
        let mut account = raw();
        for event in account.borrow_events.iter_mut() {
            event.amount = Scalar::Text("50000000000000000000000000000".into());
        }
        let err = decode_account(&WalletId::new("0xaa"), &account).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(err.to_string().contains("borrow amount total overflows"));
    }

    #[test]
    fn test_overflowing_borrow_plus_repay_rejected() {
        let mut account = raw();
        account.borrow_events.truncate(1);
        account.borrow_events[0].amount = Scalar::Text("50000000000000000000000000000".into());
        account.repay_events[0].amount = Scalar::Text("50000000000000000000000000000".into());
        let err = decode_account(&WalletId::new("0xaa"), &account).unwrap_err();
        assert!(err.to_string().contains("borrow and repay"));
    }
}
