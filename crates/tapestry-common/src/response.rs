//! The rendering response model.

use bytes::Bytes;

/// One decoded engine reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingResponse {
    /// Engine-reported render time, microseconds.
    pub render_duration: u64,
    /// Engine-reported image encode time, microseconds.
    pub encode_duration: u64,
    /// Encoded image (JPEG or PNG, depending on how the engine was built).
    pub image_data: Bytes,
}

impl RenderingResponse {
    pub fn new(render_duration: u64, encode_duration: u64, image_data: impl Into<Bytes>) -> Self {
        Self {
            render_duration,
            encode_duration,
            image_data: image_data.into(),
        }
    }

    /// Length of the encoded image; always equals `image_data.len()`.
    pub fn image_length(&self) -> usize {
        self.image_data.len()
    }
}
