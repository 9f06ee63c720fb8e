use crate::detection::DetectedObject;
use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use thiserror::Error;

/// Outline and label background color.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline thickness in pixels, drawn inward from the box edge.
pub const LINE_WIDTH: u32 = 2;
pub const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
pub const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 2;

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to load the embedded label font: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

/// Draws detection boxes and `"{label} {confidence:.2}"` captions.
pub struct Annotator {
    font: FontRef<'static>,
    scale: PxScale,
}

impl Annotator {
    pub fn new() -> Result<Self, RenderError> {
        let font = FontRef::try_from_slice(FONT_DATA)?;
        Ok(Self {
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
        })
    }

    /// Returns an annotated copy; `image` is left untouched.
    pub fn render(&self, image: &RgbImage, detections: &[DetectedObject]) -> RgbImage {
        let mut canvas = image.clone();
        for detection in detections {
            self.draw_box(&mut canvas, detection);
            self.draw_label(&mut canvas, detection);
        }
        canvas
    }

    fn draw_box(&self, canvas: &mut RgbImage, detection: &DetectedObject) {
        let (x, y) = (detection.x() as i32, detection.y() as i32);
        let (width, height) = (detection.width(), detection.height());

        for inset in 0..LINE_WIDTH {
            let inner_width = width.saturating_sub(2 * inset);
            let inner_height = height.saturating_sub(2 * inset);
            if inner_width == 0 || inner_height == 0 {
                break;
            }
            let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(inner_width, inner_height);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, detection: &DetectedObject) {
        let caption = format!("{} {:.2}", detection.label(), detection.confidence());
        let (text_width, text_height) = text_size(self.scale, &self.font, &caption);

        let label_height = text_height as i32 + 2 * LABEL_PADDING;
        let label_x = detection.x() as i32;
        // above the box, never above row 0
        let label_y = (detection.y() as i32 - label_height).max(0);

        let background_width = (text_width as i32 + 2 * LABEL_PADDING)
            .min(canvas.width() as i32 - label_x)
            .max(0) as u32;
        if background_width > 0 && label_height > 0 {
            let background =
                Rect::at(label_x, label_y).of_size(background_width, label_height as u32);
            draw_filled_rect_mut(canvas, background, BOX_COLOR);
        }

        draw_text_mut(
            canvas,
            LABEL_TEXT_COLOR,
            label_x + LABEL_PADDING,
            label_y + LABEL_PADDING,
            self.scale,
            &self.font,
            &caption,
        );
    }
}
