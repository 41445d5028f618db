use crate::{error::AppError, pages};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Form, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use offer_core::{AppCore, Outcome};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<AppCore>,
    pub prom: PrometheusHandle,
}

#[derive(Debug, Deserialize)]
pub struct LookupForm {
    pub customer_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home).post(lookup))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> Html<&'static str> {
    Html(pages::index())
}

async fn lookup(
    State(st): State<AppState>,
    Form(form): Form<LookupForm>,
) -> Result<Html<String>, AppError> {
    let LookupForm { customer_id } = form;

    // CSV reads and tree walks block; keep them off the async workers.
    let core = Arc::clone(&st.core);
    let id = customer_id.clone();
    let outcome = tokio::task::spawn_blocking(move || core.lookup(&id)).await??;

    let page = match outcome {
        Outcome::NoData => pages::no_data(&customer_id),
        Outcome::Found(p) => pages::results(&[p.table]),
    };
    Ok(Html(page))
}

async fn metrics(State(st): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, st.prom.render())
}
