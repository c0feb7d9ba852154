//! Image path option parsing.
//!
//! An image path looks like
//!
//! ```text
//! <dataset>/<px>/<py>/<pz>/<ux>/<uy>/<uz>/<dx>/<dy>/<dz>/<resolution>/,<key>=<value>,...
//! ```
//!
//! The positional part is consumed left to right. Everything after the
//! resolution is rejoined and read as comma-separated options, either
//! `key=value` tokens or `key,value` pairs.

use std::collections::HashMap;
use std::str::FromStr;

use tapestry_common::{
    CameraTile, ParseError, ParseResult, Quantized, RenderingRequest, Rgba, TileGrid,
    ViewportError,
};
use tracing::debug;

pub const DEFAULT_COLOR_MAP: &str = "spectralReverse";
pub const DEFAULT_OPACITY_MAP: &str = "ramp";

/// A parsed image path.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub request: RenderingRequest,
    /// Output side length; used as both width and height.
    pub resolution: u32,
}

/// Parse an image path into a rendering request.
pub fn parse_image_path(path: &str) -> ParseResult<ImageRequest> {
    let mut fields = path.split('/');

    let volume_name = identifier("dataset", next_field(&mut fields, "dataset")?)?;
    let camera_position = vec3(&mut fields, ["position.x", "position.y", "position.z"])?;
    let camera_up = vec3(&mut fields, ["up.x", "up.y", "up.z"])?;
    let camera_direction = vec3(&mut fields, ["direction.x", "direction.y", "direction.z"])?;

    let resolution: u32 = number("resolution", next_field(&mut fields, "resolution")?)?;
    if resolution == 0 {
        return Err(ParseError::invalid("resolution", "0", "must be at least 1"));
    }

    let remainder = fields.collect::<Vec<_>>().join("/");
    let options = parse_options(&remainder)?;

    let background_color = match options.get("background") {
        Some(value) => background(value)?,
        None => Rgba::default(),
    };
    let color_map_name = match options.get("colormap") {
        Some(value) => identifier("colormap", value)?,
        None => DEFAULT_COLOR_MAP.to_string(),
    };
    let opacity_map_name = match options.get("opacitymap") {
        Some(value) => identifier("opacitymap", value)?,
        None => DEFAULT_OPACITY_MAP.to_string(),
    };
    let volume_timestep = match options.get("timestep") {
        Some(value) => number("timestep", value)?,
        None => 0,
    };
    let isosurface_values = match (options.get("isosurface"), options.get("isovalues")) {
        (Some(value), _) => real_list("isosurface", value)?,
        (None, Some(value)) => real_list("isovalues", value)?,
        (None, None) => Vec::new(),
    };
    let camera_tile = camera_tile(&options)?;

    Ok(ImageRequest {
        request: RenderingRequest {
            image_width: resolution,
            image_height: resolution,
            volume_name,
            volume_timestep,
            color_map_name,
            opacity_map_name,
            isosurface_values,
            camera_position,
            camera_up,
            camera_direction,
            camera_tile,
            background_color,
        },
        resolution,
    })
}

/// Split the option remainder into a key/value map.
///
/// The segment before the first comma is discarded when empty (the usual
/// `/,key=value` form). Later duplicates overwrite earlier ones.
pub fn parse_options(remainder: &str) -> ParseResult<HashMap<String, String>> {
    let mut tokens = remainder.split(',').peekable();
    if tokens.peek() == Some(&"") {
        tokens.next();
    }

    let mut options = HashMap::new();
    while let Some(token) = tokens.next() {
        if token.is_empty() {
            continue;
        }
        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key, value),
            None => match tokens.next() {
                Some(value) => (token, value),
                None => return Err(ParseError::UnpairedOption(token.to_string())),
            },
        };
        options.insert(key.to_string(), value.to_string());
    }

    for key in options.keys() {
        if !KNOWN_OPTIONS.contains(&key.as_str()) {
            debug!(key = %key, "Ignoring unknown image option");
        }
    }

    Ok(options)
}

const KNOWN_OPTIONS: &[&str] = &[
    "background",
    "colormap",
    "opacitymap",
    "timestep",
    "isosurface",
    "isovalues",
    "tiling",
    "row",
    "col",
];

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> ParseResult<&'a str> {
    fields.next().ok_or(ParseError::MissingField(name))
}

fn vec3<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    names: [&'static str; 3],
) -> ParseResult<[Quantized; 3]> {
    let x = quantized(names[0], next_field(fields, names[0])?)?;
    let y = quantized(names[1], next_field(fields, names[1])?)?;
    let z = quantized(names[2], next_field(fields, names[2])?)?;
    Ok([x, y, z])
}

fn quantized(field: &str, text: &str) -> ParseResult<Quantized> {
    text.parse()
        .map_err(|e| ParseError::invalid(field, text, format!("{e}")))
}

fn number<T: FromStr>(field: &str, text: &str) -> ParseResult<T> {
    text.parse()
        .map_err(|_| ParseError::invalid(field, text, "not a non-negative integer"))
}

/// Names travel to the engine as single protocol tokens.
fn identifier(field: &str, text: &str) -> ParseResult<String> {
    if text.is_empty() {
        return Err(ParseError::invalid(field, text, "must not be empty"));
    }
    if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ParseError::invalid(
            field,
            text,
            "must not contain whitespace or control characters",
        ));
    }
    Ok(text.to_string())
}

fn background(text: &str) -> ParseResult<Rgba> {
    let parts: Vec<&str> = text.split('/').collect();
    let [r, g, b, a] = parts[..] else {
        return Err(ParseError::invalid("background", text, "expected R/G/B/A"));
    };
    let channel = |part: &str| {
        part.parse::<u8>()
            .map_err(|_| ParseError::invalid("background", text, "channels must be integers 0-255"))
    };
    Ok(Rgba::new(channel(r)?, channel(g)?, channel(b)?, channel(a)?))
}

/// Reals separated by `/` when the value contains one, else by `-`.
fn real_list(field: &str, text: &str) -> ParseResult<Vec<f64>> {
    let separator = if text.contains('/') { '/' } else { '-' };
    text.split(separator)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::invalid(field, text, format!("{token:?} is not a finite number"))),
        })
        .collect()
}

fn index_pair(field: &'static str, text: &str, separator: char) -> ParseResult<(u32, u32)> {
    let expected = format!("expected index{separator}count");
    let (index, count) = text
        .split_once(separator)
        .ok_or_else(|| ParseError::invalid(field, text, expected.clone()))?;
    let parse = |part: &str| {
        part.parse::<u32>()
            .map_err(|_| ParseError::invalid(field, text, expected.clone()))
    };
    Ok((parse(index)?, parse(count)?))
}

fn camera_tile(options: &HashMap<String, String>) -> ParseResult<CameraTile> {
    let (tile, ntiles) = match options.get("tiling") {
        Some(value) => index_pair("tiling", value, '-')?,
        None => (0, 1),
    };
    let grid = TileGrid::approximate(tile, ntiles).map_err(|source| ParseError::Tiling {
        field: "tiling",
        source,
    })?;

    let row = options.get("row").map(|v| index_pair("row", v, '/')).transpose()?;
    let col = options.get("col").map(|v| index_pair("col", v, '/')).transpose()?;
    let (row_index, row_count) = row.unwrap_or((grid.row, grid.nrows));
    let (col_index, col_count) = col.unwrap_or((grid.col, grid.ncols));

    CameraTile::new(row_index, row_count, col_index, col_count).map_err(|source| {
        let field = match source {
            ViewportError::ZeroCount { axis } | ViewportError::IndexOutOfRange { axis, .. }
                if axis == "row" && row.is_some() =>
            {
                "row"
            }
            ViewportError::ZeroCount { axis } | ViewportError::IndexOutOfRange { axis, .. }
                if axis == "col" && col.is_some() =>
            {
                "col"
            }
            _ => "tiling",
        };
        ParseError::Tiling { field, source }
    })
}
