//! Service configuration shared by the binary and the handlers.

use serde::Serialize;

/// Codec of the images the engine produces. The engine does not say, so
/// this must match how it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Runtime settings for the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub image_format: ImageFormat,

    /// Renders allowed to wait for or hold the engine at once. `None`
    /// means unbounded; excess requests get 503 instead of queueing.
    pub max_pending_renders: Option<usize>,
}
