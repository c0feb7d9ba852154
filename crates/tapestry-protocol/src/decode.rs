//! Response framing (engine -> server).
//!
//! ```text
//! +----------------+----------------+-------------+------------------+
//! | renderDuration | encodeDuration | imageLength | imageData ...    |
//! | word           | word           | word        | imageLength bytes|
//! +----------------+----------------+-------------+------------------+
//! ```
//!
//! A word is the native pointer-sized unsigned integer in native byte
//! order. The engine and this process must agree on its size.

use std::io;

use tapestry_common::RenderingResponse;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ProtocolError;

/// Size in bytes of one header word.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Largest image a frame may declare (1 GiB). Anything bigger means the
/// header words are garbage.
pub const MAX_IMAGE_LENGTH: u64 = 1 << 30;

/// Read exactly one response frame.
///
/// Any shortfall is an error: a frame is never returned partially.
pub async fn read_response<R>(reader: &mut R) -> Result<RenderingResponse, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let render_duration = read_word(reader, "renderDuration").await?;
    let encode_duration = read_word(reader, "encodeDuration").await?;
    let image_length = read_word(reader, "imageLength").await?;

    if image_length > MAX_IMAGE_LENGTH {
        return Err(ProtocolError::ImageTooLarge(image_length));
    }

    let mut image_data = Vec::with_capacity(image_length as usize);
    let received = (&mut *reader)
        .take(image_length)
        .read_to_end(&mut image_data)
        .await? as u64;
    if received < image_length {
        return Err(ProtocolError::Truncated {
            field: "imageData",
            expected: image_length,
            received,
        });
    }

    trace!(
        render_duration,
        encode_duration,
        image_length,
        "Decoded engine response"
    );

    Ok(RenderingResponse::new(
        render_duration,
        encode_duration,
        image_data,
    ))
}

async fn read_word<R>(reader: &mut R, field: &'static str) -> Result<u64, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; WORD_SIZE];
    let mut filled = 0;
    while filled < WORD_SIZE {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(ProtocolError::Truncated {
                field,
                expected: WORD_SIZE as u64,
                received: filled as u64,
            });
        }
        filled += n;
    }
    Ok(usize::from_ne_bytes(buf) as u64)
}

/// Build the binary frame for a response, as the engine would emit it.
pub fn encode_response(response: &RenderingResponse) -> Vec<u8> {
    let mut frame = Vec::with_capacity(3 * WORD_SIZE + response.image_length());
    frame.extend_from_slice(&(response.render_duration as usize).to_ne_bytes());
    frame.extend_from_slice(&(response.encode_duration as usize).to_ne_bytes());
    frame.extend_from_slice(&response.image_length().to_ne_bytes());
    frame.extend_from_slice(&response.image_data);
    frame
}

/// Write one response frame and flush it.
pub async fn write_response<W>(writer: &mut W, response: &RenderingResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&encode_response(response)).await?;
    writer.flush().await
}
