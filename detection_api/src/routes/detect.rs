use crate::{
    codec::{self, ObjectRecord},
    detection::DetectionResult,
    routes::{error::ApiError, require_model},
    server::SharedState,
};
use axum::{
    body::{Body, Bytes},
    extract::{
        multipart::{Multipart, MultipartRejection},
        Path, State,
    },
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Instant;
use tracing::instrument;

const UPLOAD_FIELD: &str = "file";

const DETECT_ROUTE: &str = "/detect";
const DETECT_LABEL_ROUTE: &str = "/detect/{label}";
const ANNOTATE_ROUTE: &str = "/annotate";

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    image: String,
    objects: Vec<ObjectRecord>,
    count: usize,
}

struct Annotated {
    jpeg: Vec<u8>,
    result: DetectionResult,
}

#[instrument(skip(state, multipart))]
pub async fn detect(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let annotated = process_upload(&state, multipart, None, DETECT_ROUTE).await?;
    Ok(Json(to_response(annotated)))
}

#[instrument(skip(state, multipart))]
pub async fn detect_label(
    State(state): State<SharedState>,
    Path(label): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let annotated = process_upload(&state, multipart, Some(label), DETECT_LABEL_ROUTE).await?;
    Ok(Json(to_response(annotated)))
}

/// Binary variant of `/detect`: the annotated JPEG without the JSON envelope.
#[instrument(skip(state, multipart))]
pub async fn annotate(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let annotated = process_upload(&state, multipart, None, ANNOTATE_ROUTE).await?;

    Ok((
        [(header::CONTENT_TYPE, "image/jpeg")],
        Body::from(annotated.jpeg),
    )
        .into_response())
}

fn to_response(annotated: Annotated) -> DetectResponse {
    let objects = codec::to_records(annotated.result.objects());
    DetectResponse {
        image: codec::encode_base64(&annotated.jpeg),
        count: objects.len(),
        objects,
    }
}

async fn process_upload(
    state: &SharedState,
    multipart: Result<Multipart, MultipartRejection>,
    label_filter: Option<String>,
    route: &'static str,
) -> Result<Annotated, ApiError> {
    state.metrics.record_request(route);

    // checked before the body is read, so uploads are never decoded without a model
    let model = require_model(state)?;
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart).await?;

    tracing::debug!("Received upload of {} bytes", upload.len());

    let annotator = state.annotator.clone();
    let started = Instant::now();

    let annotated = tokio::task::spawn_blocking(move || -> Result<Annotated, ApiError> {
        let image = codec::decode_upload(&upload)?;

        let mut result = model.detect(&image)?;
        if let Some(filter) = &label_filter {
            result = result.filter_label(filter);
        }

        let rendered = annotator.render(&image, result.objects());
        let jpeg = codec::encode_jpeg(&rendered)?;

        Ok(Annotated { jpeg, result })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))??;

    state
        .metrics
        .record_inference_duration(started.elapsed().as_secs_f64() * 1000.0, route);
    state
        .metrics
        .record_detections(annotated.result.count(), route);

    tracing::info!("Returning {} detections", annotated.result.count());

    Ok(annotated)
}

/// Reads the `file` field, or failing that the first field carrying a filename.
async fn read_upload(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) || field.file_name().is_some() {
            return Ok(field.bytes().await?);
        }
    }

    Err(ApiError::InvalidUpload(format!(
        "missing `{}` file field",
        UPLOAD_FIELD
    )))
}
