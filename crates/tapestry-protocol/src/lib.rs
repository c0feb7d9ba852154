//! Engine wire protocol.
//!
//! Requests travel to the engine's stdin as newline-terminated UTF-8 lines
//! grouped under section markers (`renderer`, `world`, `camera`, `render`).
//! The engine has no field names: order is the contract. Responses come back
//! on stdout as a binary frame of three native-endian machine words
//! (render time, encode time, image length) followed by the image bytes.
//!
//! Both directions are implemented here. The server side writes requests and
//! reads responses; the engine side (request reader, response writer) backs
//! the mock engine used in tests and local development.

pub mod decode;
pub mod encode;
pub mod error;
pub mod frame;

pub use decode::{encode_response, read_response, write_response, MAX_IMAGE_LENGTH, WORD_SIZE};
pub use encode::{encode_request, format_real, write_request};
pub use error::ProtocolError;
pub use frame::{read_request_frame, RequestFrame};
