use crate::{
    routes::{error::ApiError, require_model},
    server::SharedState,
};
use axum::{extract::State, response::Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    labels: Vec<String>,
}

pub async fn labels(State(state): State<SharedState>) -> Result<Json<LabelsResponse>, ApiError> {
    let model = require_model(&state)?;

    Ok(Json(LabelsResponse {
        labels: model.labels().to_vec(),
    }))
}
