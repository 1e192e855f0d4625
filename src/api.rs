use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::models::{ScoreCell, ScoreRow, WalletId};
use crate::pipeline;
use crate::scorer::ScoringMode;
use crate::source::DataSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn DataSource>,
}

#[derive(Deserialize)]
pub struct ScoreQuery {
    pub wallet: String,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub wallets: Vec<String>,
    pub mode: Option<ScoringMode>, // defaults to absolute
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Wallet risk scorer API running" }))
        .route("/score", get(score_one))
        .route("/scores", post(score_many))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(cfg: &Config, source: Box<dyn DataSource>) -> eyre::Result<()> {
    let app = router(AppState {
        source: Arc::from(source),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Absolute score for one wallet; 502 when the data source failed
pub async fn score_one(
    State(state): State<AppState>,
    Query(q): Query<ScoreQuery>,
) -> (StatusCode, Json<ScoreRow>) {
    let wallet = WalletId::new(&q.wallet);
    if wallet.as_str().is_empty() {
        let row = ScoreRow {
            wallet_id: wallet,
            score: ScoreCell::Error,
        };
        return (StatusCode::BAD_REQUEST, Json(row));
    }

    let rows = pipeline::score_wallets(
        state.source.as_ref(),
        std::slice::from_ref(&wallet),
        ScoringMode::Absolute,
        Utc::now(),
    )
    .await;

    let row = rows.into_iter().next().unwrap_or(ScoreRow {
        wallet_id: wallet,
        score: ScoreCell::Error,
    });
    let status = match row.score {
        ScoreCell::Value(_) => StatusCode::OK,
        ScoreCell::Error => StatusCode::BAD_GATEWAY,
    };
    (status, Json(row))
}

/// Score a list of wallets in request order; blank entries get `Error` rows
pub async fn score_many(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Json<Vec<ScoreRow>> {
    let wallets: Vec<WalletId> = req.wallets.iter().map(|w| WalletId::new(w)).collect();
    let valid: Vec<WalletId> = wallets
        .iter()
        .filter(|w| !w.as_str().is_empty())
        .cloned()
        .collect();

    let mut scored = pipeline::score_wallets(
        state.source.as_ref(),
        &valid,
        req.mode.unwrap_or_default(),
        Utc::now(),
    )
    .await
    .into_iter();

    let rows = wallets
        .into_iter()
        .map(|wallet_id| {
            let blank = ScoreRow {
                wallet_id,
                score: ScoreCell::Error,
            };
            if blank.wallet_id.as_str().is_empty() {
                blank
            } else {
                scored.next().unwrap_or(blank)
            }
        })
        .collect();
    Json(rows)
}
