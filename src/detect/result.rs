/// Axis-aligned detection box in pixel coordinates of the analyzed image.
///
/// Invariant: `x1 < x2` and `y1 < y2`.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Localizer confidence in `[0, 1]`, already thresholded by the backend.
    pub confidence: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    /// Box width in pixels.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}
