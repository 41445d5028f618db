mod error;
mod pages;
mod routes;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use offer_core::{config::Config, AppCore};
use routes::AppState;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Web front-end for per-customer offer predictions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding train.csv and test.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Forest artifact (.json or .json.gz)
    #[arg(long)]
    model: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(p) => Config::from_file(p)?,
            None => Config::default(),
        };
        if let Some(b) = self.bind {
            cfg.bind = b;
        }
        if let Some(d) = self.data_dir {
            cfg.data_dir = d;
        }
        if let Some(m) = self.model {
            cfg.model_path = m;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // metrics
    let prom = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;

    let cfg = Args::parse().into_config()?;
    let bind = cfg.bind.clone();
    let core = Arc::new(AppCore::load(cfg).context("load serving state")?);

    let app = routes::router(AppState { core, prom });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    tracing::info!("offer-server listening on http://{bind}");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
