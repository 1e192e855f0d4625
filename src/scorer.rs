// src/scorer.rs
//! Risk scoring over derived wallet features.
//!
//! Every score produced here uses one polarity: `1000` is the safest wallet and
//! `0` the riskiest. Absolute mode deducts weighted penalties from a perfect
//! score and depends only on the wallet itself. Batch mode normalizes risk
//! factors against the other wallets in the same batch, so a wallet's score
//! there is only meaningful relative to its peers.
//!
//! Batch weights are kept in whole points (400, 300, 200, 100 out of 1000)
//! rather than tenths, so a wallet at the top of the first three factors has a
//! risk of exactly 900 points. Summing `0.4 + 0.3 + 0.2` in `f64` and flooring
//! would report 899.

use crate::features::FeatureVector;
use eyre::{eyre, Report};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const MAX_SCORE: u16 = 1000;
pub const MIN_SCORE: u16 = 0;
/// Score for a wallet with no lending history at all
pub const NO_HISTORY_SCORE: u16 = MIN_SCORE;

// absolute mode
pub const LTV_WEIGHT: f64 = 400.0;
pub const REPAYMENT_WEIGHT: f64 = 300.0;
pub const LIQUIDATION_PENALTY: i64 = 50;
pub const INACTIVITY_WEIGHT: f64 = 250.0;
pub const INACTIVITY_WINDOW_DAYS: f64 = 365.0;

// batch mode, points out of MAX_SCORE, summing to it
pub const BORROW_RATIO_POINTS: f64 = 400.0;
pub const LIQUIDATION_POINTS: f64 = 300.0;
pub const RECENCY_POINTS: f64 = 200.0;
pub const ASSET_DIVERSITY_POINTS: f64 = 100.0;
pub const RECENCY_WINDOW_DAYS: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Absolute,
    Batch,
}

impl FromStr for ScoringMode {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(ScoringMode::Absolute),
            "batch" => Ok(ScoringMode::Batch),
            other => Err(eyre!("unknown scoring mode '{}' (expected absolute or batch)", other)),
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Absolute => f.write_str("absolute"),
            ScoringMode::Batch => f.write_str("batch"),
        }
    }
}

/// Floor to whole points. The epsilon absorbs representation error in
/// products such as `400.0 * 0.29 == 115.99999999999999`.
fn floor_points(x: f64) -> i64 {
    (x + 1e-9).floor() as i64
}

/// Score one wallet on its own history.
pub fn score(fv: &FeatureVector) -> u16 {
    if !fv.has_history {
        return NO_HISTORY_SCORE;
    }

    let ltv = fv.loan_to_value_proxy.clamp(0.0, 1.0);
    let unrepaid = (1.0 - fv.repayment_ratio).max(0.0);
    let inactivity = fv.days_inactive.clamp(0.0, INACTIVITY_WINDOW_DAYS) / INACTIVITY_WINDOW_DAYS;

    let mut score = MAX_SCORE as i64;
    score -= floor_points(ltv * LTV_WEIGHT);
    score -= floor_points(unrepaid * REPAYMENT_WEIGHT);
    score -= fv.liquidation_count as i64 * LIQUIDATION_PENALTY;
    score -= floor_points(inactivity * INACTIVITY_WEIGHT);

    score.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u16
}

/// Batch-relative risk factors of one wallet, each in `[0, 1]` (1 = riskiest)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFactors {
    pub borrow_ratio: f64,
    pub liquidations: f64,
    pub recency: f64,
    pub unique_assets: f64,
}

impl NormalizedFactors {
    /// Weighted risk in points, `0.0..=1000.0`
    pub fn risk_points(&self) -> f64 {
        BORROW_RATIO_POINTS * self.borrow_ratio
            + LIQUIDATION_POINTS * self.liquidations
            + RECENCY_POINTS * self.recency
            + ASSET_DIVERSITY_POINTS * self.unique_assets
    }

    /// Weighted risk in `[0, 1]`
    pub fn raw_risk(&self) -> f64 {
        self.risk_points() / MAX_SCORE as f64
    }
}

pub fn normalize_batch(batch: &[FeatureVector]) -> Vec<NormalizedFactors> {
    let max_liquidations = batch.iter().map(|f| f.liquidation_count).max().unwrap_or(0);
    let max_assets = batch.iter().map(|f| f.unique_asset_count).max().unwrap_or(0);

    batch
        .iter()
        .map(|f| NormalizedFactors {
            borrow_ratio: f.borrow_supply_ratio.clamp(0.0, 1.0),
            liquidations: if max_liquidations == 0 {
                0.0
            } else {
                f.liquidation_count as f64 / max_liquidations as f64
            },
            recency: (f.days_inactive / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0),
            // nobody holds anything: every wallet counts as undiversified
            unique_assets: if max_assets == 0 {
                1.0
            } else {
                1.0 - f.unique_asset_count as f64 / max_assets as f64
            },
        })
        .collect()
}

/// Score a whole batch; output order follows input order.
pub fn score_batch(batch: &[FeatureVector]) -> Vec<u16> {
    normalize_batch(batch)
        .iter()
        .map(|n| {
            let risk = floor_points(n.risk_points())
                .clamp(MIN_SCORE as i64, MAX_SCORE as i64);
            MAX_SCORE - risk as u16
        })
        .collect()
}
