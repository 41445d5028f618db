use crate::{
    config::Config,
    inference::{run_model, InferenceError, Outcome},
    locator::DataLocator,
    model::{ForestModel, ProbaModel},
    schema::ensure_feature_schema,
    util::now_us,
};

use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Everything a request needs: the data locator and the model, loaded once
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppCore {
    pub cfg: Config,
    pub locator: DataLocator,
    pub model: Arc<dyn ProbaModel>,
}

impl AppCore {
    /// Loads the model artifact named in `cfg` and checks it against the
    /// serving feature schema.
    pub fn load(cfg: Config) -> anyhow::Result<Self> {
        let model = ForestModel::load(&cfg.model_path)?;
        Self::with_model(cfg, Arc::new(model))
    }

    pub fn with_model(cfg: Config, model: Arc<dyn ProbaModel>) -> anyhow::Result<Self> {
        ensure_feature_schema(model.feature_names())
            .context("model artifact does not match the serving feature schema")?;
        let locator = DataLocator::new(cfg.data_dir.clone());
        Ok(Self {
            cfg,
            locator,
            model,
        })
    }

    /// One customer lookup, instrumented.
    pub fn lookup(&self, customer_id: &str) -> Result<Outcome, InferenceError> {
        let t0 = Instant::now();
        let trace_id = Uuid::new_v4();

        let res = run_model(self.model.as_ref(), &self.locator, customer_id);
        let e2e_us = now_us(t0);
        metrics::histogram!("e2e_us").record(e2e_us as f64);

        match &res {
            Ok(Outcome::NoData) => {
                metrics::counter!("lookup_total", "outcome" => "no_data").increment(1);
                tracing::info!(%trace_id, customer_id, e2e_us, "no data for customer");
            }
            Ok(Outcome::Found(p)) => {
                metrics::counter!("lookup_total", "outcome" => "found").increment(1);
                metrics::histogram!("stage_locate_us").record(p.locate_us as f64);
                metrics::histogram!("stage_predict_us").record(p.predict_us as f64);
                tracing::info!(
                    %trace_id,
                    customer_id,
                    samples = p.n_samples(),
                    locate_us = p.locate_us,
                    predict_us = p.predict_us,
                    e2e_us,
                    "lookup"
                );
            }
            Err(e) => {
                metrics::counter!("lookup_total", "outcome" => "error").increment(1);
                tracing::error!(%trace_id, customer_id, error = ?e, "lookup failed");
            }
        }
        res
    }
}
