// src/subgraph.rs
use crate::models::WalletId;
use crate::source::FetchError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Compound v2 subgraph on The Graph hosted service
pub const DEFAULT_GRAPH_API: &str =
    "https://api.thegraph.com/subgraphs/name/graphprotocol/compound-v2";

#[derive(Debug, Deserialize)]
pub struct GraphResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountData {
    pub account: Option<RawAccount>,
}

/// Subgraph numbers come back as JSON strings (BigDecimal/BigInt) or plain numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawToken {
    pub symbol: String,
    #[serde(rename = "supplyBalanceUnderlying")]
    pub supply_balance_underlying: Scalar,
    #[serde(rename = "borrowBalanceUnderlying")]
    pub borrow_balance_underlying: Scalar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAmountEvent {
    pub amount: Scalar,
    #[serde(rename = "blockTimestamp")]
    pub block_timestamp: Scalar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLiquidationEvent {
    #[serde(rename = "amountRepaid")]
    pub amount_repaid: Scalar,
    #[serde(rename = "seizedCollateral")]
    pub seized_collateral: Scalar,
    #[serde(rename = "blockTimestamp")]
    pub block_timestamp: Scalar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAccount {
    #[allow(dead_code)]
    pub id: String,
    #[serde(default)]
    pub tokens: Vec<RawToken>,
    #[serde(rename = "borrowEvents", default)]
    pub borrow_events: Vec<RawAmountEvent>,
    #[serde(rename = "repayEvents", default)]
    pub repay_events: Vec<RawAmountEvent>,
    #[serde(rename = "liquidationEvents", default)]
    pub liquidation_events: Vec<RawLiquidationEvent>,
}

/// GraphQL query for one account's balances and lending events
pub fn account_query(wallet: &WalletId, page_size: u32) -> String {
    format!(
        r#"{{
  account(id: "{wallet}") {{
    id
    tokens {{
      symbol
      supplyBalanceUnderlying
      borrowBalanceUnderlying
    }}
    borrowEvents(first: {n}) {{
      amount
      blockTimestamp
    }}
    repayEvents(first: {n}) {{
      amount
      blockTimestamp
    }}
    liquidationEvents(first: {n}) {{
      amountRepaid
      seizedCollateral
      blockTimestamp
    }}
  }}
}}"#,
        wallet = wallet.as_str(),
        n = page_size
    )
}

/// Decode a raw response body. `Ok(None)` means the subgraph has never seen the account.
pub fn decode_account_response(body: &str) -> Result<Option<RawAccount>, FetchError> {
    let parsed: GraphResponse<AccountData> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if !parsed.errors.is_empty() {
        let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(FetchError::GraphQl(messages.join("; ")));
    }

    Ok(parsed.data.and_then(|d| d.account))
}

/// POST the account query and return the raw account, if any
pub async fn fetch_account(
    client: &Client,
    api_url: &str,
    wallet: &WalletId,
    page_size: u32,
) -> Result<Option<RawAccount>, FetchError> {
    let payload = json!({ "query": account_query(wallet, page_size) });

    info!("📡 Querying subgraph for {}", wallet);

    let resp = client.post(api_url).json(&payload).send().await?;
    if resp.status() != StatusCode::OK {
        return Err(FetchError::Status(resp.status().as_u16()));
    }

    let text = resp.text().await?;
    debug!("📩 Raw account response: {} bytes", text.len());

    decode_account_response(&text)
}
