use crate::scorer::ScoringMode;
use crate::source::SourceKind;
use crate::subgraph::DEFAULT_GRAPH_API;
use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use std::{env, path::PathBuf, time::Duration};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub graph_api_url: String,
    pub wallets_csv: PathBuf,
    pub output_csv: PathBuf,
    pub scoring_mode: ScoringMode,
    pub source_kind: SourceKind,
    pub fetch_delay: Duration,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub synthetic_seed: Option<u64>,
    pub port: u16,
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // ✅ Load from .env file

    let cfg = Config::from_lookup(|key| env::var(key).ok())?;

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

impl Config {
    /// Build the config from any key lookup (process env in `load`, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        // ✅ Subgraph endpoint (alias support)
        let graph_api_url = lookup("GRAPH_API_URL")
            .or_else(|| lookup("SUBGRAPH_URL"))
            .unwrap_or_else(|| DEFAULT_GRAPH_API.to_string());

        // ✅ Input / output tables
        let wallets_csv = lookup("WALLETS_CSV").unwrap_or_else(|| "wallets.csv".to_string());
        let output_csv =
            lookup("OUTPUT_CSV").unwrap_or_else(|| "wallet_risk_scores.csv".to_string());

        // ✅ Scoring mode and data source (unknown values are rejected)
        let scoring_mode = match lookup("SCORING_MODE") {
            Some(raw) => raw.parse::<ScoringMode>().wrap_err("invalid SCORING_MODE")?,
            None => ScoringMode::default(),
        };
        let source_kind = match lookup("DATA_SOURCE") {
            Some(raw) => raw.parse::<SourceKind>().wrap_err("invalid DATA_SOURCE")?,
            None => SourceKind::default(),
        };

        // ✅ Numbers fall back to defaults when malformed
        let fetch_delay_ms: u64 = parse_or(&lookup, "FETCH_DELAY_MS", 100);
        let timeout_secs: u64 = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 15);
        let page_size: u32 = parse_or(&lookup, "EVENT_PAGE_SIZE", 100);
        let port: u16 = parse_or(&lookup, "PORT", 8080);

        let synthetic_seed = lookup("SYNTHETIC_SEED").and_then(|s| s.trim().parse().ok());

        Ok(Config {
            graph_api_url,
            wallets_csv: PathBuf::from(wallets_csv),
            output_csv: PathBuf::from(output_csv),
            scoring_mode,
            source_kind,
            fetch_delay: Duration::from_millis(fetch_delay_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            page_size,
            synthetic_seed,
            port,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
