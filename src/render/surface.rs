use image::RgbaImage;

/// The raster the live preview is drawn on.
///
/// Dimensions follow whatever frame was drawn last; clearing drops the pixels
/// but keeps the size, like clearing a canvas.
#[derive(Debug, Default)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Option<RgbaImage>,
    frames_drawn: u64,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes to the frame's native size and draws it at the origin, 1:1.
    pub fn draw(&mut self, frame: RgbaImage) {
        self.width = frame.width();
        self.height = frame.height();
        self.pixels = Some(frame);
        self.frames_drawn = self.frames_drawn.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.pixels = None;
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_none()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}
