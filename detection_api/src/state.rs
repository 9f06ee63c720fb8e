use crate::{config::ModelConfig, model_service::ModelService, ort_service::OrtModelService};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};

/// Outcome of the one-time model load at startup.
#[derive(Clone)]
pub enum ModelHandle {
    Ready(Arc<dyn ModelService>),
    Unavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub path: String,
    pub error: Option<String>,
}

/// Process-wide model state, built once and shared read-only by every request.
#[derive(Clone)]
pub struct ServiceState {
    model: ModelHandle,
    model_path: PathBuf,
}

impl ServiceState {
    /// Loads the ONNX model described by `model_config`.
    ///
    /// A failed load is kept as an unavailable state rather than returned as
    /// an error, so the service can still answer health checks.
    pub fn load(model_config: &ModelConfig) -> Self {
        let model_path = model_config.get_model_path();
        tracing::info!("Loading model from {}", model_path.display());

        match OrtModelService::new(model_config) {
            Ok(service) => {
                tracing::info!("Model loaded successfully");
                Self::ready(model_path, service)
            }
            Err(e) => {
                tracing::error!("Error loading model: {}", e);
                Self::unavailable(model_path, e.to_string())
            }
        }
    }

    pub fn ready(model_path: impl Into<PathBuf>, model_service: impl ModelService) -> Self {
        Self {
            model: ModelHandle::Ready(Arc::new(model_service)),
            model_path: model_path.into(),
        }
    }

    pub fn unavailable(model_path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            model: ModelHandle::Unavailable {
                error: error.into(),
            },
            model_path: model_path.into(),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn readiness(&self) -> Readiness {
        let (ready, error) = match &self.model {
            ModelHandle::Ready(_) => (true, None),
            ModelHandle::Unavailable { error } => (false, Some(error.clone())),
        };
        Readiness {
            ready,
            path: self.model_path.display().to_string(),
            error,
        }
    }
}
