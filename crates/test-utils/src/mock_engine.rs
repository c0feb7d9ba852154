//! A stand-in for the rendering engine.
//!
//! The mock reads real request frames and answers each with exactly one
//! response frame, in order, like the engine does. Its payload either
//! echoes the request frame text (so tests can pair every response with
//! the request that caused it) or is a solid image in the requested size
//! and background color.

use std::io::Cursor;
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use tapestry_common::RenderingResponse;
use tapestry_protocol::{
    encode_response, read_request_frame, write_response, ProtocolError, RequestFrame,
};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffer size of each in-process pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Largest side of a generated image.
const MAX_IMAGE_SIDE: u32 = 4096;

/// What the mock puts in `imageData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MockPayload {
    /// The request frame text, byte for byte.
    #[default]
    Echo,
    /// A solid PNG filled with the background color.
    Png,
    /// A solid JPEG filled with the background color.
    Jpeg,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    payload: MockPayload,
    delay: Option<Duration>,
    exit_after: Option<usize>,
    truncate_response: Option<usize>,
}

/// The caller's ends of an in-process mock engine.
pub struct MockEnginePipes {
    /// Write request frames here.
    pub stdin: DuplexStream,
    /// Read response frames from here.
    pub stdout: DuplexStream,
    /// Resolves to the number of frames answered once the engine stops.
    pub task: JoinHandle<Result<usize, ProtocolError>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, payload: MockPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Sleep this long before answering each frame.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Exit (close both pipes) after answering `frames` requests.
    pub fn exit_after(mut self, frames: usize) -> Self {
        self.exit_after = Some(frames);
        self
    }

    /// Send only half of the response to request number `index` (0-based),
    /// then exit.
    pub fn truncate_response(mut self, index: usize) -> Self {
        self.truncate_response = Some(index);
        self
    }

    /// Build the response for one frame.
    pub fn respond(&self, frame: &RequestFrame) -> RenderingResponse {
        let render_duration = self.delay.map(|d| d.as_micros() as u64).unwrap_or(0);

        let started = Instant::now();
        let image_data = match self.payload {
            MockPayload::Echo => frame.to_string().into_bytes(),
            MockPayload::Png => solid_image(frame, ImageOutputFormat::Png),
            MockPayload::Jpeg => solid_image(frame, ImageOutputFormat::Jpeg(85)),
        };
        let encode_duration = started.elapsed().as_micros() as u64;

        RenderingResponse::new(render_duration, encode_duration, image_data)
    }

    /// Answer frames from `reader` on `writer` until the input ends.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<usize, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut served = 0;
        loop {
            if self.exit_after == Some(served) {
                debug!(served, "Mock engine exiting early");
                return Ok(served);
            }

            let Some(frame) = read_request_frame(&mut reader).await? else {
                return Ok(served);
            };

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let response = self.respond(&frame);

            if self.truncate_response == Some(served) {
                let wire = encode_response(&response);
                writer.write_all(&wire[..wire.len() / 2]).await?;
                writer.flush().await?;
                debug!(served, "Mock engine sent a truncated frame");
                return Ok(served);
            }

            write_response(&mut writer, &response).await?;
            served += 1;
        }
    }

    /// Run the mock on a background task connected by in-memory pipes.
    pub fn spawn(self) -> MockEnginePipes {
        let (stdin, engine_stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (engine_stdout, stdout) = tokio::io::duplex(PIPE_CAPACITY);

        let task = tokio::spawn(async move {
            self.serve(BufReader::new(engine_stdin), engine_stdout)
                .await
        });

        MockEnginePipes {
            stdin,
            stdout,
            task,
        }
    }
}

fn solid_image(frame: &RequestFrame, format: ImageOutputFormat) -> Vec<u8> {
    let side = |text: &str| text.parse::<u32>().unwrap_or(1).clamp(1, MAX_IMAGE_SIDE);
    let width = side(&frame.image_width);
    let height = side(&frame.image_height);

    let channel = |i: usize| {
        frame
            .background
            .get(i)
            .and_then(|c| c.parse::<u8>().ok())
            .unwrap_or(0)
    };
    let pixel = Rgb([channel(0), channel(1), channel(2)]);

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, pixel));
    let mut bytes = Vec::new();
    if let Err(e) = image.write_to(&mut Cursor::new(&mut bytes), format) {
        warn!(error = %e, "Mock engine failed to encode image");
        bytes.clear();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_request;
    use tapestry_protocol::{encode_request, read_response, write_request};

    #[tokio::test]
    async fn test_echo_round_trip() {
        let mut pipes = MockEngine::new().spawn();
        let request = sample_request();

        write_request(&mut pipes.stdin, &request).await.unwrap();
        let response = read_response(&mut pipes.stdout).await.unwrap();

        assert_eq!(response.image_data, encode_request(&request).into_bytes());
    }

    #[tokio::test]
    async fn test_exit_after_closes_output() {
        let mut pipes = MockEngine::new().exit_after(0).spawn();
        assert_eq!(pipes.task.await.unwrap().unwrap(), 0);

        let err = read_response(&mut pipes.stdout).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { received: 0, .. }));
    }

    #[tokio::test]
    async fn test_png_payload() {
        let mut request = sample_request();
        request.image_width = 8;
        request.image_height = 4;
        let text = encode_request(&request);
        let frame = read_request_frame(&mut text.as_bytes())
            .await
            .unwrap()
            .unwrap();

        let response = MockEngine::new()
            .with_payload(MockPayload::Png)
            .respond(&frame);
        assert_eq!(&response.image_data[..8], b"\x89PNG\r\n\x1a\n");
    }
}
