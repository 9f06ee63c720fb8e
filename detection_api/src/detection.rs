/// One predicted object, in input-image pixel coordinates.
///
/// `(x, y)` is the top-left corner of the axis-aligned box. Construction goes
/// through [`DetectedObject::from_corners`], which keeps the box inside the
/// image and the confidence inside `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    label: String,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    confidence: f32,
}

impl DetectedObject {
    /// Builds a detection from raw corner coordinates, clamped to an image of
    /// `image_width` x `image_height` pixels.
    pub fn from_corners(
        label: impl Into<String>,
        corners: [f32; 4],
        confidence: f32,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let [x1, y1, x2, y2] = corners;
        let clamp_x = |v: f32| clamp_coordinate(v, image_width);
        let clamp_y = |v: f32| clamp_coordinate(v, image_height);

        let (left, right) = (clamp_x(x1.min(x2)), clamp_x(x1.max(x2)));
        let (top, bottom) = (clamp_y(y1.min(y2)), clamp_y(y1.max(y2)));

        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            label: label.into(),
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
            confidence,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn matches_label(&self, filter: &str) -> bool {
        self.label.to_lowercase() == filter.to_lowercase()
    }
}

fn clamp_coordinate(value: f32, limit: u32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, limit as f32) as u32
}

/// Detections from a single inference call, in the detector's native order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    objects: Vec<DetectedObject>,
}

impl DetectionResult {
    pub fn new(objects: Vec<DetectedObject>) -> Self {
        Self { objects }
    }

    pub fn objects(&self) -> &[DetectedObject] {
        &self.objects
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    /// Keeps the detections whose label equals `filter`, ignoring case.
    /// An empty filter keeps everything.
    pub fn filter_label(self, filter: &str) -> Self {
        if filter.is_empty() {
            return self;
        }
        Self {
            objects: self
                .objects
                .into_iter()
                .filter(|object| object.matches_label(filter))
                .collect(),
        }
    }
}
