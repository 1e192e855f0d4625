use reqwest::Client;
use serde_json::json;
use wallet_risk_scorer::models::WalletId;
use wallet_risk_scorer::subgraph::{account_query, DEFAULT_GRAPH_API};

/// Print the raw subgraph answer for one wallet:
/// `probe_wallet <address> [subgraph-url]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(address) = args.next() else {
        anyhow::bail!("usage: probe_wallet <address> [subgraph-url]");
    };
    let api_url = args.next().unwrap_or_else(|| DEFAULT_GRAPH_API.to_string());

    let wallet = WalletId::new(&address);
    println!("Querying {} for {}", api_url, wallet);

    let resp = Client::new()
        .post(&api_url)
        .json(&json!({ "query": account_query(&wallet, 5) }))
        .send()
        .await?;

    println!("HTTP {}", resp.status());
    let body: serde_json::Value = resp.json().await?;

    match body.pointer("/data/account") {
        Some(serde_json::Value::Null) => println!("Account not indexed (no lending history)"),
        Some(account) => println!("Account = {:#}", account),
        None => println!("Response = {:#}", body),
    }

    Ok(())
}
