//! Request encoding (server -> engine).

use std::fmt::Display;
use std::io;

use tapestry_common::RenderingRequest;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Text of one request frame under construction.
#[derive(Default)]
pub(crate) struct FrameText(String);

impl FrameText {
    pub(crate) fn line(&mut self, value: impl Display) -> &mut Self {
        self.0.push_str(&value.to_string());
        self.0.push('\n');
        self
    }

    /// Write several values space-separated on one line.
    pub(crate) fn fields<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.line(joined)
    }

    pub(crate) fn finish(&mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

/// Shortest round-trip decimal text of a real, always with a fractional
/// part (`0.0`, `0.5`, `1.0`).
///
/// Very large or small magnitudes use Rust's exponent form (`1e20`,
/// `1e-7`), without the explicit `+` and zero padding of C's `%g`
/// (`1e+20`, `1e-07`). The engine's number parser accepts both.
pub fn format_real(value: f64) -> String {
    format!("{value:?}")
}

/// Serialize a request into the engine's line protocol.
pub fn encode_request(request: &RenderingRequest) -> String {
    let (start_x, start_y) = request.camera_image_start();
    let (end_x, end_y) = request.camera_image_end();

    let mut text = FrameText::default();

    text.line("renderer")
        .fields(request.background_color.components());

    text.line("world")
        .line(&request.volume_name)
        .line(request.volume_timestep)
        .line(&request.color_map_name)
        .line(&request.opacity_map_name)
        .line(request.isosurface_values.len());
    for value in &request.isosurface_values {
        text.line(format_real(*value));
    }

    text.line("camera")
        .fields(&request.camera_position)
        .fields(&request.camera_up)
        .fields(&request.camera_direction)
        .fields([format_real(start_x), format_real(start_y)])
        .fields([format_real(end_x), format_real(end_y)]);

    text.line("render")
        .line(request.image_width)
        .line(request.image_height);

    text.finish()
}

/// Write one request frame and flush it so the engine sees it immediately.
pub async fn write_request<W>(writer: &mut W, request: &RenderingRequest) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let text = encode_request(request);
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}
