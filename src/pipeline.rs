use crate::config::Config;
use crate::features::{self, FeatureVector};
use crate::models::{ScoreCell, ScoreRow, WalletId};
use crate::scorer::{self, ScoringMode};
use crate::source::DataSource;
use crate::table;
use chrono::{DateTime, Utc};
use eyre::Result;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub wallets: usize,
    pub scored: usize,
    pub failed: usize,
}

impl RunSummary {
    fn from_rows(rows: &[ScoreRow]) -> Self {
        let failed = rows.iter().filter(|r| r.score == ScoreCell::Error).count();
        Self {
            wallets: rows.len(),
            scored: rows.len() - failed,
            failed,
        }
    }
}

/// Fetch one wallet and derive its features. `None` means the fetch failed.
async fn fetch_features(
    source: &dyn DataSource,
    wallet: &WalletId,
    now: DateTime<Utc>,
) -> Option<FeatureVector> {
    info!("Fetching data for {}", wallet);
    if !wallet.is_evm_address() {
        warn!("{} is not an EVM address, querying it anyway", wallet);
    }

    match source.fetch(wallet).await {
        Ok(None) => {
            info!("No lending history for {}", wallet);
            Some(features::derive(None, now))
        }
        Ok(Some(record)) => Some(features::derive(Some(&record), now)),
        Err(e) => {
            warn!("Error processing {}: {} (status {:?})", wallet, e, e.status());
            None
        }
    }
}

/// Score wallets one at a time, in input order.
///
/// Failed fetches become `Error` rows. In batch mode they are left out of the
/// normalization, so every other wallet is scored against the successful ones only.
pub async fn score_wallets(
    source: &dyn DataSource,
    wallets: &[WalletId],
    mode: ScoringMode,
    now: DateTime<Utc>,
) -> Vec<ScoreRow> {
    let mut fetched = Vec::with_capacity(wallets.len());
    for wallet in wallets {
        fetched.push(fetch_features(source, wallet, now).await);
    }

    let cells: Vec<ScoreCell> = match mode {
        ScoringMode::Absolute => fetched
            .iter()
            .map(|fv| match fv {
                Some(fv) => ScoreCell::Value(scorer::score(fv)),
                None => ScoreCell::Error,
            })
            .collect(),
        ScoringMode::Batch => {
            // full batch is needed before any normalized score exists
            let batch: Vec<FeatureVector> = fetched.iter().flatten().cloned().collect();
            let mut scores = scorer::score_batch(&batch).into_iter();
            fetched
                .iter()
                .map(|fv| match fv {
                    Some(_) => scores.next().map_or(ScoreCell::Error, ScoreCell::Value),
                    None => ScoreCell::Error,
                })
                .collect()
        }
    };

    wallets
        .iter()
        .cloned()
        .zip(cells)
        .map(|(wallet_id, score)| ScoreRow { wallet_id, score })
        .collect()
}

/// Read the wallet list, score it and write the results table
pub async fn run(cfg: &Config, source: &dyn DataSource) -> Result<RunSummary> {
    let wallets = table::read_wallets(&cfg.wallets_csv, cfg.scoring_mode)?;
    info!(
        "Scoring {} wallets from {} ({} mode)",
        wallets.len(),
        cfg.wallets_csv.display(),
        cfg.scoring_mode
    );

    let now = Utc::now();
    let rows = score_wallets(source, &wallets, cfg.scoring_mode, now).await;

    table::write_scores(&cfg.output_csv, cfg.scoring_mode, &rows)?;

    let summary = RunSummary::from_rows(&rows);
    info!(
        "📁 Scores saved to {} ({} scored, {} failed)",
        cfg.output_csv.display(),
        summary.scored,
        summary.failed
    );
    Ok(summary)
}
