use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::collections::HashSet;

pub struct Metrics {
    request_counter: IntCounterVec,
    inference_duration: HistogramVec,
    detection_counter: IntCounterVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_counter = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of requests"),
            &["route"],
        )?;

        let boundaries = generate_boundaries((10, 100, 200, 1000, 3000));
        let inference_duration = HistogramVec::new(
            HistogramOpts::new(
                "inference_duration_ms",
                "Duration of detect, render and encode in milliseconds",
            )
            .buckets(boundaries),
            &["route"],
        )?;

        let detection_counter = IntCounterVec::new(
            Opts::new("detections_total", "Total number of returned detections"),
            &["route"],
        )?;

        registry.register(Box::new(request_counter.clone()))?;
        registry.register(Box::new(inference_duration.clone()))?;
        registry.register(Box::new(detection_counter.clone()))?;

        Ok(Metrics {
            request_counter,
            inference_duration,
            detection_counter,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        self.request_counter.with_label_values(&[route]).inc();
    }

    pub fn record_inference_duration(&self, duration_ms: f64, route: &str) {
        self.inference_duration
            .with_label_values(&[route])
            .observe(duration_ms);
    }

    pub fn record_detections(&self, count: usize, route: &str) {
        self.detection_counter
            .with_label_values(&[route])
            .inc_by(count as u64);
    }
}

/// Fine buckets up to the second boundary, then progressively coarser ones.
fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 20;
    let end_step: usize = 100;
    let tail_step: usize = 500;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    #[test]
    fn test_generate_boundaries() {
        let parts = (2, 22, 62, 262, 1262);
        let get = generate_boundaries(parts);
        let expected = vec![
            2.0, 12.0, 22.0, 42.0, 62.0, 162.0, 262.0, 762.0, 1262.0,
        ];

        assert_eq!(get, expected);
    }

    #[test]
    fn test_metrics_are_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("/detect");
        metrics.record_inference_duration(42.0, "/detect");
        metrics.record_detections(3, "/detect");

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("http_requests_total{route=\"/detect\"} 1"));
        assert!(text.contains("detections_total{route=\"/detect\"} 3"));
        assert!(text.contains("inference_duration_ms_count{route=\"/detect\"} 1"));
    }
}
