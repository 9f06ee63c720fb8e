use crate::server::SharedState;
use axum::{extract::State, response::Json};
use serde::Serialize;

const RUNNING_MESSAGE: &str = "Object Detection API is running!";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    message: &'static str,
    model_ready: bool,
    model_path: String,
    model_error: Option<String>,
}

pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let readiness = state.service_state.readiness();

    Json(HealthResponse {
        message: RUNNING_MESSAGE,
        model_ready: readiness.ready,
        model_path: readiness.path,
        model_error: readiness.error,
    })
}
