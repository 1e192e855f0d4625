use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wallet_risk_scorer::{api, config, pipeline, source};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs to stdout, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Wallet risk scorer starting...");

    // Load configuration
    let cfg = config::load()?;
    info!("Loaded config:");
    info!("  Data source: {}", cfg.source_kind);
    info!("  Scoring mode: {}", cfg.scoring_mode);
    info!("  Subgraph URL: {}", cfg.graph_api_url);
    info!("  Wallets: {}", cfg.wallets_csv.display());
    info!("  Output: {}", cfg.output_csv.display());

    let source = source::from_config(&cfg)?;

    match std::env::args().nth(1).as_deref() {
        None | Some("score") => {
            let summary = pipeline::run(&cfg, source.as_ref()).await?;
            if summary.failed > 0 {
                warn!("{} of {} wallets could not be fetched", summary.failed, summary.wallets);
            }
        }
        Some("serve") => {
            tokio::select! {
                res = api::serve(&cfg, source) => res?,
                _ = signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping...");
                }
            }
        }
        Some(other) => eyre::bail!("unknown command '{}' (expected score or serve)", other),
    }

    info!("Wallet risk scorer stopped.");
    Ok(())
}
