// src/table.rs
use crate::models::{ScoreRow, WalletId};
use crate::scorer::ScoringMode;
use eyre::{eyre, Result, WrapErr};
use std::{
    ffi::OsString,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// Column holding wallet ids in batch-mode input
pub const BATCH_WALLET_COLUMN: &str = "wallet_id";

/// Output header for each scoring mode
pub fn header(mode: ScoringMode) -> [&'static str; 2] {
    match mode {
        ScoringMode::Absolute => ["Wallet Address", "Risk Score"],
        ScoringMode::Batch => ["wallet_id", "score"],
    }
}

/// Read the wallet list: first column in absolute mode, `wallet_id` in batch mode.
pub fn read_wallets(path: &Path, mode: ScoringMode) -> Result<Vec<WalletId>> {
    let file = File::open(path).wrap_err_with(|| format!("cannot open wallet list {}", path.display()))?;
    read_wallets_from(file, mode).wrap_err_with(|| format!("cannot read wallet list {}", path.display()))
}

pub fn read_wallets_from<R: Read>(reader: R, mode: ScoringMode) -> Result<Vec<WalletId>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let column = match mode {
        ScoringMode::Absolute => 0,
        ScoringMode::Batch => rdr
            .headers()?
            .iter()
            .position(|h| h == BATCH_WALLET_COLUMN)
            .ok_or_else(|| eyre!("missing '{}' column", BATCH_WALLET_COLUMN))?,
    };

    let mut wallets = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match record.get(column) {
            Some(raw) if !raw.is_empty() => wallets.push(WalletId::new(raw)),
            _ => continue, // blank row
        }
    }
    Ok(wallets)
}

pub fn write_scores_to<W: Write>(writer: W, mode: ScoringMode, rows: &[ScoreRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(mode))?;
    for row in rows {
        let score = row.score.to_string();
        wtr.write_record([row.wallet_id.as_str(), score.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the results table in one step: a sibling temp file renamed over `path`.
pub fn write_scores(path: &Path, mode: ScoringMode, rows: &[ScoreRow]) -> Result<()> {
    let tmp = temp_path(path);
    let file = File::create(&tmp).wrap_err_with(|| format!("cannot create {}", tmp.display()))?;
    write_scores_to(file, mode, rows).wrap_err_with(|| format!("cannot write {}", tmp.display()))?;
    fs::rename(&tmp, path).wrap_err_with(|| format!("cannot move results to {}", path.display()))?;
    Ok(())
}
