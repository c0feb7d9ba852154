//! Request fixtures.

use tapestry_common::{CameraTile, Quantized, RenderingRequest, Rgba};

/// Parse three camera components, panicking on bad input.
pub fn vec3(x: &str, y: &str, z: &str) -> [Quantized; 3] {
    [
        x.parse().expect("valid x component"),
        y.parse().expect("valid y component"),
        z.parse().expect("valid z component"),
    ]
}

/// A full-frame 256x256 request for `volume`, looking at the origin
/// along (-1, 0, -1).
pub fn request_for_volume(volume: &str) -> RenderingRequest {
    RenderingRequest {
        image_width: 256,
        image_height: 256,
        volume_name: volume.to_string(),
        volume_timestep: 0,
        color_map_name: "spectralReverse".to_string(),
        opacity_map_name: "ramp".to_string(),
        isosurface_values: Vec::new(),
        camera_position: vec3("1", "0", "1"),
        camera_up: vec3("0", "1", "0"),
        camera_direction: vec3("-1", "0", "-1"),
        camera_tile: CameraTile::full(),
        background_color: Rgba::new(0, 0, 0, 0),
    }
}

pub fn sample_request() -> RenderingRequest {
    request_for_volume("supernova")
}
