//! Decoded image container.
//!
//! A `Frame` holds the RGB8 pixels of one uploaded photo for the duration of a
//! single inspection request. Frames are produced at the request boundary and
//! dropped as soon as the verdict is assembled; nothing in the pipeline retains
//! pixel data beyond its own call stack.

use anyhow::{Context, Result};
use base64::Engine;

/// Owned RGB8 raster for one request.
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Decode an encoded image (JPEG/PNG) into an RGB8 frame.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).context("failed to decode image bytes")?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            pixels: rgb.into_raw(),
            width,
            height,
        })
    }

    /// Decode a standard-base64 payload into an RGB8 frame.
    pub fn decode_base64(payload: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .context("payload is not valid base64")?;
        Self::decode(&bytes)
    }

    /// Build a frame from raw RGB8 bytes. Length must be `width * height * 3`.
    pub fn from_rgb8(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .context("frame dimensions overflow")?;
        anyhow::ensure!(
            pixels.len() == expected,
            "expected {} RGB bytes, received {}",
            expected,
            pixels.len()
        );
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
