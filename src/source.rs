// src/source.rs
use crate::config::Config;
use crate::models::{WalletId, WalletRecord};
use crate::synthetic::SyntheticSource;
use crate::{parser, subgraph};
use eyre::{eyre, Report, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::Client;
use std::{
    fmt,
    str::FromStr,
    sync::{Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::info;

/// Per-wallet fetch failure. Never fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("subgraph returned HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("subgraph error: {0}")]
    GraphQl(String),
    #[error("malformed account data: {0}")]
    Decode(String),
}

impl FetchError {
    /// HTTP status behind the failure, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Where wallet histories come from.
///
/// `Ok(None)` means the wallet is unknown to the source, which is not an error.
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch<'a>(
        &'a self,
        wallet: &'a WalletId,
    ) -> BoxFuture<'a, Result<Option<WalletRecord>, FetchError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Live,
    Synthetic,
}

impl FromStr for SourceKind {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SourceKind::Live),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(eyre!("unknown data source '{}' (expected live or synthetic)", other)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Live => f.write_str("live"),
            SourceKind::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Compound v2 subgraph over HTTP
pub struct LiveSource {
    client: Client,
    api_url: String,
    page_size: u32,
}

impl LiveSource {
    pub fn new(api_url: &str, timeout: Duration, page_size: u32) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            page_size,
        })
    }

    async fn fetch_record(&self, wallet: &WalletId) -> Result<Option<WalletRecord>, FetchError> {
        let raw = subgraph::fetch_account(&self.client, &self.api_url, wallet, self.page_size).await?;
        raw.map(|account| parser::decode_account(wallet, &account))
            .transpose()
    }
}

impl DataSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    fn fetch<'a>(
        &'a self,
        wallet: &'a WalletId,
    ) -> BoxFuture<'a, Result<Option<WalletRecord>, FetchError>> {
        self.fetch_record(wallet).boxed()
    }
}

/// Spaces consecutive fetches of the wrapped source at least `delay` apart
pub struct Throttled<S> {
    inner: S,
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl<S: DataSource> Throttled<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next slot and return how long to wait for it
    fn reserve(&self) -> Duration {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let start = match *next {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next = Some(start + self.delay);
        start - now
    }
}

impl<S: DataSource> DataSource for Throttled<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn fetch<'a>(
        &'a self,
        wallet: &'a WalletId,
    ) -> BoxFuture<'a, Result<Option<WalletRecord>, FetchError>> {
        async move {
            let wait = self.reserve();
            if !wait.is_zero() {
                sleep(wait).await;
            }
            self.inner.fetch(wallet).await
        }
        .boxed()
    }
}

/// Build the configured source, throttled by `cfg.fetch_delay`
pub fn from_config(cfg: &Config) -> Result<Box<dyn DataSource>> {
    let source: Box<dyn DataSource> = match cfg.source_kind {
        SourceKind::Live => Box::new(Throttled::new(
            LiveSource::new(&cfg.graph_api_url, cfg.request_timeout, cfg.page_size)?,
            cfg.fetch_delay,
        )),
        SourceKind::Synthetic => Box::new(Throttled::new(
            SyntheticSource::new(cfg.synthetic_seed),
            cfg.fetch_delay,
        )),
    };

    info!(
        "Data source: {} (fetch delay {} ms)",
        source.name(),
        cfg.fetch_delay.as_millis()
    );
    Ok(source)
}
