//! Engine-side view of a request frame.
//!
//! The engine reads whitespace-separated tokens and never interprets field
//! names, so this reader keeps every field as the exact text that was sent.
//! Re-serializing a [`RequestFrame`] reproduces the original bytes.

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::encode::FrameText;
use crate::error::ProtocolError;

/// One request frame, field by field, as text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestFrame {
    pub background: Vec<String>,

    pub volume_name: String,
    pub volume_timestep: String,
    pub color_map_name: String,
    pub opacity_map_name: String,
    pub isosurface_values: Vec<String>,

    pub position: Vec<String>,
    pub up: Vec<String>,
    pub direction: Vec<String>,
    pub image_start: Vec<String>,
    pub image_end: Vec<String>,

    pub image_width: String,
    pub image_height: String,
}

impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = FrameText::default();
        text.line("renderer").fields(&self.background);
        text.line("world")
            .line(&self.volume_name)
            .line(&self.volume_timestep)
            .line(&self.color_map_name)
            .line(&self.opacity_map_name)
            .line(self.isosurface_values.len());
        for value in &self.isosurface_values {
            text.line(value);
        }
        text.line("camera")
            .fields(&self.position)
            .fields(&self.up)
            .fields(&self.direction)
            .fields(&self.image_start)
            .fields(&self.image_end);
        text.line("render")
            .line(&self.image_width)
            .line(&self.image_height);
        f.write_str(&text.finish())
    }
}

/// Read the next request frame.
///
/// Returns `Ok(None)` when the stream ends cleanly between frames.
pub async fn read_request_frame<R>(reader: &mut R) -> Result<Option<RequestFrame>, ProtocolError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut lines = FrameLines { reader };

    match lines.next().await? {
        None => return Ok(None),
        Some(marker) => expect_marker(&marker, "renderer")?,
    }
    let background = lines.fields("background", 4).await?;

    lines.marker("world").await?;
    let volume_name = lines.single("volume name").await?;
    let volume_timestep = lines.single("volume timestep").await?;
    let color_map_name = lines.single("color map").await?;
    let opacity_map_name = lines.single("opacity map").await?;
    let count = lines.single("isosurface count").await?;
    let count: usize = count
        .parse()
        .map_err(|_| ProtocolError::malformed(format!("isosurface count {count:?} is not a number")))?;
    let mut isosurface_values = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        isosurface_values.push(lines.single("isosurface value").await?);
    }

    lines.marker("camera").await?;
    let position = lines.fields("camera position", 3).await?;
    let up = lines.fields("camera up", 3).await?;
    let direction = lines.fields("camera direction", 3).await?;
    let image_start = lines.fields("image start", 2).await?;
    let image_end = lines.fields("image end", 2).await?;

    lines.marker("render").await?;
    let image_width = lines.single("image width").await?;
    let image_height = lines.single("image height").await?;

    Ok(Some(RequestFrame {
        background,
        volume_name,
        volume_timestep,
        color_map_name,
        opacity_map_name,
        isosurface_values,
        position,
        up,
        direction,
        image_start,
        image_end,
        image_width,
        image_height,
    }))
}

struct FrameLines<'a, R: ?Sized> {
    reader: &'a mut R,
}

impl<R> FrameLines<'_, R>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    async fn next(&mut self) -> Result<Option<String>, ProtocolError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if !line.ends_with('\n') {
            return Err(ProtocolError::malformed(format!(
                "unterminated line {line:?}"
            )));
        }
        line.pop();
        Ok(Some(line))
    }

    async fn required(&mut self, what: &str) -> Result<String, ProtocolError> {
        self.next()
            .await?
            .ok_or_else(|| ProtocolError::malformed(format!("frame ended before {what}")))
    }

    async fn marker(&mut self, name: &str) -> Result<(), ProtocolError> {
        let line = self.required(name).await?;
        expect_marker(&line, name)
    }

    async fn single(&mut self, what: &str) -> Result<String, ProtocolError> {
        let line = self.required(what).await?;
        if line.is_empty() || line.contains(char::is_whitespace) {
            return Err(ProtocolError::malformed(format!(
                "{what} must be a single token, got {line:?}"
            )));
        }
        Ok(line)
    }

    async fn fields(&mut self, what: &str, count: usize) -> Result<Vec<String>, ProtocolError> {
        let line = self.required(what).await?;
        let fields: Vec<String> = line.split(' ').map(str::to_string).collect();
        if fields.len() != count || fields.iter().any(String::is_empty) {
            return Err(ProtocolError::malformed(format!(
                "{what} needs {count} fields, got {line:?}"
            )));
        }
        Ok(fields)
    }
}

fn expect_marker(line: &str, name: &str) -> Result<(), ProtocolError> {
    if line == name {
        Ok(())
    } else {
        Err(ProtocolError::malformed(format!(
            "expected section marker {name:?}, got {line:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = "renderer\n0 0 0 255\nworld\nteapot\n0\nviridis\nramp\n1\n0.5\n\
camera\n1 0 1\n0 1 0\n-1 0 -1\n0.0 1.0\n1.0 0.0\nrender\n256\n256\n";

    #[tokio::test]
    async fn test_read_request_frame() {
        let mut reader = FRAME.as_bytes();
        let frame = read_request_frame(&mut reader).await.unwrap().unwrap();

        assert_eq!(frame.background, ["0", "0", "0", "255"]);
        assert_eq!(frame.volume_name, "teapot");
        assert_eq!(frame.isosurface_values, ["0.5"]);
        assert_eq!(frame.direction, ["-1", "0", "-1"]);
        assert_eq!(frame.image_end, ["1.0", "0.0"]);
        assert_eq!(frame.image_height, "256");

        assert!(read_request_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_reproduces_bytes() {
        let frame = read_request_frame(&mut FRAME.as_bytes())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.to_string(), FRAME);
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let text = &FRAME[..FRAME.find("camera").unwrap()];
        let err = read_request_frame(&mut text.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedRequest(msg) if msg.contains("camera")));
    }

    #[tokio::test]
    async fn test_wrong_marker() {
        let err = read_request_frame(&mut "render\n".as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedRequest(_)));
    }
}
