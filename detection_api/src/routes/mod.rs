mod detect;
mod error;
mod health;
mod labels;
mod metrics;

use crate::{model_service::ModelService, server::SharedState, state::ModelHandle};
use axum::{
    routing::{get, post},
    Router,
};
use error::ApiError;
use std::sync::Arc;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(health::healthcheck))
        .route("/detect", post(detect::detect))
        .route("/detect/{label}", post(detect::detect_label))
        .route("/annotate", post(detect::annotate))
        .route("/labels", get(labels::labels))
        .route("/metrics", get(metrics::metrics_handler))
}

/// Fails with 503 and the stored load error when no model is loaded.
fn require_model(state: &SharedState) -> Result<Arc<dyn ModelService>, ApiError> {
    match state.service_state.model() {
        ModelHandle::Ready(model) => Ok(model.clone()),
        ModelHandle::Unavailable { error } => Err(ApiError::ModelUnavailable(error.clone())),
    }
}
