use crate::{
    config::ModelConfig,
    detection::{DetectedObject, DetectionResult},
    labels::load_labels,
    model_service::{DetectorError, ModelService},
};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, ArrayD, ArrayViewD, Axis, Ix3, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{
    io,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};
use thiserror::Error;

const INPUT_SIZE: u32 = 640;
const OUTPUT_NAME: &str = "output0";

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("Failed to load labels from {}: {source}", path.display())]
    Labels { path: PathBuf, source: io::Error },
    #[error("Failed to create ONNX session: {0}")]
    Session(#[from] ort::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    class_id: usize,
    confidence: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

fn intersection(box1: &Candidate, box2: &Candidate) -> f32 {
    let width = (box1.x2.min(box2.x2) - box1.x1.max(box2.x1)).max(0.0);
    let height = (box1.y2.min(box2.y2) - box1.y1.max(box2.y1)).max(0.0);
    width * height
}

fn union(box1: &Candidate, box2: &Candidate) -> f32 {
    ((box1.x2 - box1.x1) * (box1.y2 - box1.y1)) + ((box2.x2 - box2.x1) * (box2.y2 - box2.y1))
        - intersection(box1, box2)
}

fn iou(box1: &Candidate, box2: &Candidate) -> f32 {
    let union = union(box1, box2);
    if union <= 0.0 {
        return 0.0;
    }
    intersection(box1, box2) / union
}

fn transform_image(image: &RgbImage) -> Array<f32, Ix4> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let size = INPUT_SIZE as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

/// Turns a `[1, 4 + classes, anchors]` YOLOv8 output into candidates scaled
/// to the source image, best class per anchor.
fn decode_output(
    output: ArrayViewD<f32>,
    img_width: u32,
    img_height: u32,
    min_probability: f32,
) -> Result<Vec<Candidate>, DetectorError> {
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|e| DetectorError::Output(format!("expected a rank 3 tensor: {}", e)))?;
    if output.shape()[0] != 1 || output.shape()[1] <= 4 {
        return Err(DetectorError::Output(format!(
            "unsupported output shape {:?}",
            output.shape()
        )));
    }

    let scale_x = img_width as f32 / INPUT_SIZE as f32;
    let scale_y = img_height as f32 / INPUT_SIZE as f32;

    let predictions = output.index_axis_move(Axis(0), 0).reversed_axes();
    let mut boxes = Vec::new();

    for row in predictions.axis_iter(Axis(0)) {
        let best = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, item| if item.1 > accum.1 { item } else { accum });
        let Some((class_id, prob)) = best else {
            continue;
        };

        if prob < min_probability {
            continue;
        }

        let xc = row[0] * scale_x;
        let yc = row[1] * scale_y;
        let w = row[2] * scale_x;
        let h = row[3] * scale_y;

        boxes.push(Candidate {
            class_id,
            confidence: prob,
            x1: xc - w / 2.,
            y1: yc - h / 2.,
            x2: xc + w / 2.,
            y2: yc + h / 2.,
        });
    }

    Ok(boxes)
}

/// Per-class suppression; survivors come out in descending confidence.
fn non_max_suppression(mut boxes: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));

    let mut result: Vec<Candidate> = Vec::new();
    for candidate in boxes {
        let suppressed = result.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(kept, &candidate) > iou_threshold
        });
        if !suppressed {
            result.push(candidate);
        }
    }

    result
}

/// YOLOv8 ONNX model served through a round-robin pool of ONNX Runtime sessions.
pub struct OrtModelService {
    sessions: Vec<Mutex<Session>>,
    counter: AtomicUsize,
    labels: Vec<String>,
    min_probability: f32,
    iou_threshold: f32,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let model_path = model_config.get_model_path();
        if !model_path.is_file() {
            return Err(ModelLoadError::ModelNotFound(model_path));
        }

        let labels_path = model_config.get_labels_path();
        let labels = load_labels(&labels_path).map_err(|source| ModelLoadError::Labels {
            path: labels_path.clone(),
            source,
        })?;

        ort::init().with_name("detection_api").commit()?;

        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(&model_path)?;
                Ok(Mutex::new(session))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!(
            "Created {} ONNX sessions for {} labels",
            num_instances,
            labels.len()
        );

        Ok(Self {
            sessions,
            counter: AtomicUsize::new(0),
            labels,
            min_probability: model_config.min_probability,
            iou_threshold: model_config.iou_threshold,
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, DetectorError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| DetectorError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);

        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| DetectorError::Input(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let output = outputs
            .get(OUTPUT_NAME)
            .ok_or_else(|| DetectorError::Output(format!("missing output `{}`", OUTPUT_NAME)))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Output(format!("failed to extract tensor: {}", e)))?;

        ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())
            .map_err(|e| DetectorError::Output(format!("invalid tensor shape: {}", e)))
    }

    fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

impl ModelService for OrtModelService {
    fn detect(&self, image: &RgbImage) -> Result<DetectionResult, DetectorError> {
        let (img_width, img_height) = image.dimensions();
        let input = transform_image(image);

        let outputs = self.run_inference(&input)?;
        let candidates = decode_output(outputs.view(), img_width, img_height, self.min_probability)?;
        let kept = non_max_suppression(candidates, self.iou_threshold);

        let objects = kept
            .into_iter()
            .map(|bbox| {
                DetectedObject::from_corners(
                    self.label_for(bbox.class_id),
                    [bbox.x1, bbox.y1, bbox.x2, bbox.y2],
                    bbox.confidence,
                    img_width,
                    img_height,
                )
            })
            .collect::<Vec<_>>();

        tracing::debug!("Returning {} detections", objects.len());

        Ok(DetectionResult::new(objects))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
