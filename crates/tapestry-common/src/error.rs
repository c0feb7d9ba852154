//! Error types for request construction.

use thiserror::Error;

/// Result type alias using ParseError.
pub type ParseResult<T> = Result<T, ParseError>;

/// A malformed or missing option while building a rendering request.
///
/// Every variant names the offending field so the HTTP layer can echo it
/// back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {value:?} ({message})")]
    InvalidField {
        field: String,
        value: String,
        message: String,
    },

    #[error("Option '{0}' has no value")]
    UnpairedOption(String),

    #[error("Invalid tiling from '{field}': {source}")]
    Tiling {
        field: &'static str,
        #[source]
        source: ViewportError,
    },
}

impl ParseError {
    pub fn invalid(field: impl Into<String>, value: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Name of the field that failed to parse.
    pub fn field(&self) -> &str {
        match self {
            ParseError::MissingField(field) => field,
            ParseError::InvalidField { field, .. } => field,
            ParseError::UnpairedOption(key) => key,
            ParseError::Tiling { field, .. } => field,
        }
    }
}

/// Tile coordinates that cannot describe a sub-rectangle of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("tile count must be at least 1")]
    EmptyTiling,

    #[error("{axis} count must be at least 1")]
    ZeroCount { axis: &'static str },

    #[error("{axis} index {index} is out of range for count {count}")]
    IndexOutOfRange {
        axis: &'static str,
        index: u32,
        count: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_is_reported() {
        assert_eq!(ParseError::MissingField("resolution").field(), "resolution");
        assert_eq!(ParseError::invalid("timestep", "x", "not an integer").field(), "timestep");
        assert_eq!(ParseError::UnpairedOption("colormap".into()).field(), "colormap");
    }

    #[test]
    fn test_error_display_mentions_value() {
        let err = ParseError::invalid("background", "1/2/3", "expected R/G/B/A");
        let display = err.to_string();
        assert!(display.contains("background"));
        assert!(display.contains("1/2/3"));
    }

    #[test]
    fn test_tiling_error_display() {
        let err = ParseError::Tiling {
            field: "row",
            source: ViewportError::IndexOutOfRange {
                axis: "row",
                index: 3,
                count: 2,
            },
        };
        assert_eq!(
            err.to_string(),
            "Invalid tiling from 'row': row index 3 is out of range for count 2"
        );
    }
}
