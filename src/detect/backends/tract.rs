#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectOptions, LocalizerBackend};
use crate::detect::result::Detection;

/// Tract-based localizer for ONNX detection models.
///
/// Expects a model exported with NMS baked in, producing one output tensor of
/// shape `[1, n, 6]` where each row is `(x1, y1, x2, y2, score, class)` in
/// model-input coordinates. The frame is letterboxed to the square model input
/// and decoded boxes are mapped back to frame pixel coordinates.
///
/// This backend loads a local model file only; no network I/O, no disk writes.
pub struct TractLocalizer {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
}

/// Letterbox fill value, matches common YOLO export preprocessing.
const PAD_VALUE: u8 = 114;

impl TractLocalizer {
    /// Load an ONNX model from disk with a square `input_size` input.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    /// Letterbox the RGB8 frame into the square model input.
    ///
    /// Returns the tensor plus the scale and the x/y padding used, so decoded
    /// boxes can be mapped back to frame coordinates.
    fn build_input(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(Tensor, f32, f32, f32)> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let side = self.input_size;
        let scale = (side as f32 / width as f32).min(side as f32 / height as f32);
        let scaled_w = ((width as f32 * scale).round() as u32).max(1);
        let scaled_h = ((height as f32 * scale).round() as u32).max(1);
        let pad_x = (side - scaled_w) as f32 / 2.0;
        let pad_y = (side - scaled_h) as f32 / 2.0;

        let src = image::RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match dimensions"))?;
        let resized =
            image::imageops::resize(&src, scaled_w, scaled_h, image::imageops::FilterType::Triangle);

        let mut canvas =
            image::RgbImage::from_pixel(side, side, image::Rgb([PAD_VALUE, PAD_VALUE, PAD_VALUE]));
        image::imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        let side = side as usize;
        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
                canvas.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
            });

        Ok((input.into_tensor(), scale, pad_x, pad_y))
    }

    fn decode_output(
        &self,
        outputs: TVec<TValue>,
        scale: f32,
        pad_x: f32,
        pad_y: f32,
        frame_w: f32,
        frame_h: f32,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = view.iter().cloned().collect();
        if flat.len() % 6 != 0 {
            return Err(anyhow!(
                "unexpected model output length {}, want rows of 6",
                flat.len()
            ));
        }

        let mut detections = Vec::new();
        for row in flat.chunks_exact(6) {
            let score = row[4];
            if !score.is_finite() || score < min_confidence {
                continue;
            }
            // Undo the letterbox: model-input coords -> frame coords.
            let x1 = ((row[0] - pad_x) / scale).clamp(0.0, frame_w);
            let y1 = ((row[1] - pad_y) / scale).clamp(0.0, frame_h);
            let x2 = ((row[2] - pad_x) / scale).clamp(0.0, frame_w);
            let y2 = ((row[3] - pad_y) / scale).clamp(0.0, frame_h);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            detections.push(Detection::new(x1, y1, x2, y2, score));
        }
        Ok(detections)
    }
}

impl LocalizerBackend for TractLocalizer {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(
            outputs,
            scale,
            pad_x,
            pad_y,
            width as f32,
            height as f32,
            opts.min_confidence,
        )
    }
}
