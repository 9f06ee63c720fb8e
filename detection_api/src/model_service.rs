use crate::detection::DetectionResult;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to build input tensor: {0}")]
    Input(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unexpected model output: {0}")]
    Output(String),
}

/// A loaded detection model.
///
/// Implementations are shared across requests and called from the blocking
/// thread pool, so they must be safe to call concurrently.
pub trait ModelService: Send + Sync + 'static {
    fn detect(&self, image: &RgbImage) -> Result<DetectionResult, DetectorError>;

    /// The label vocabulary, in class-id order.
    fn labels(&self) -> &[String];
}
