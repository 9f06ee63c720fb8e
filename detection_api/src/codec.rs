use crate::detection::DetectedObject;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ImageReader, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

pub const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Uploaded file is empty")]
    EmptyUpload,
    #[error("Error decoding image: {0}")]
    Decode(String),
    #[error("Error encoding image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Wire form of a detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub label: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl From<&DetectedObject> for ObjectRecord {
    fn from(object: &DetectedObject) -> Self {
        Self {
            label: object.label().to_string(),
            x: object.x(),
            y: object.y(),
            width: object.width(),
            height: object.height(),
            confidence: object.confidence(),
        }
    }
}

/// Decodes uploaded bytes of any supported format into 8-bit RGB.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyUpload);
    }

    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    Ok(image.to_rgb8())
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buffer)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn to_records(objects: &[DetectedObject]) -> Vec<ObjectRecord> {
    objects.iter().map(ObjectRecord::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_upload_converts_to_rgb() {
        let rgba = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 128]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(rgba));

        let decoded = decode_upload(&bytes).unwrap();

        assert_eq!(decoded.dimensions(), (7, 5));
        assert_eq!(*decoded.get_pixel(3, 3), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_upload_accepts_grayscale() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([200]));
        let bytes = png_bytes(DynamicImage::ImageLuma8(gray));

        let decoded = decode_upload(&bytes).unwrap();

        assert_eq!(*decoded.get_pixel(0, 0), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_decode_upload_rejects_empty_and_text() {
        assert!(matches!(decode_upload(&[]), Err(CodecError::EmptyUpload)));
        assert!(matches!(
            decode_upload(b"this is definitely not a picture"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_upload_rejects_truncated_png() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(16, 16)));

        assert!(decode_upload(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_jpeg_base64_payload_keeps_dimensions() {
        let image = RgbImage::from_pixel(33, 21, Rgb([120, 60, 200]));

        let jpeg = encode_jpeg(&image).unwrap();
        assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);

        let payload = encode_base64(&jpeg);
        let restored = image::load_from_memory(&STANDARD.decode(payload).unwrap()).unwrap();
        assert_eq!((restored.width(), restored.height()), (33, 21));
    }

    #[test]
    fn test_records_use_wire_field_names() {
        let objects = vec![DetectedObject::from_corners(
            "person",
            [1.0, 2.0, 11.0, 22.0],
            0.5,
            100,
            100,
        )];

        let value = serde_json::to_value(to_records(&objects)).unwrap();

        assert_eq!(
            value,
            serde_json::json!([{
                "label": "person",
                "x": 1,
                "y": 2,
                "width": 10,
                "height": 20,
                "confidence": 0.5
            }])
        );
    }
}
