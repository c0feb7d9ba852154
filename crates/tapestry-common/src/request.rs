//! The rendering request model.

use crate::quant::Quantized;
use crate::viewport::CameraTile;

/// Background color as 8-bit RGBA components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn components(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Everything the engine needs to render one image tile.
///
/// Names (`volume_name`, `color_map_name`, `opacity_map_name`) refer to
/// datasets and transfer-function presets known to the engine; they are
/// passed through unchecked. Camera `up` and `direction` are not normalized
/// here, that is the engine's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingRequest {
    pub image_width: u32,
    pub image_height: u32,

    pub volume_name: String,
    pub volume_timestep: u32,
    pub color_map_name: String,
    pub opacity_map_name: String,
    pub isosurface_values: Vec<f64>,

    pub camera_position: [Quantized; 3],
    pub camera_up: [Quantized; 3],
    pub camera_direction: [Quantized; 3],
    pub camera_tile: CameraTile,

    pub background_color: Rgba,
}

impl RenderingRequest {
    /// Normalized (left, bottom) corner of the rendered region.
    pub fn camera_image_start(&self) -> (f64, f64) {
        self.camera_tile.image_start()
    }

    /// Normalized (right, top) corner of the rendered region.
    pub fn camera_image_end(&self) -> (f64, f64) {
        self.camera_tile.image_end()
    }
}
