//! Common types shared by the tapestry rendering bridge.
//!
//! The request model describes exactly one image (or one tile of an image)
//! for the external volume rendering engine; the response model is what the
//! engine sends back.

pub mod error;
pub mod quant;
pub mod request;
pub mod response;
pub mod viewport;

pub use error::{ParseError, ParseResult, ViewportError};
pub use quant::Quantized;
pub use request::{Rgba, RenderingRequest};
pub use response::RenderingResponse;
pub use viewport::{CameraTile, TileGrid};
