//! Camera viewport math for tiled rendering.
//!
//! A full image is split into `rows × cols` tiles. Each request renders one
//! tile, described to the engine as a normalized sub-rectangle of the full
//! viewport with its origin at the bottom-left. Row 0 is the top row, so
//! the y axis is inverted relative to the row index.

use crate::error::ViewportError;

/// A row/column placement derived from tiling options, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub row: u32,
    pub nrows: u32,
    pub col: u32,
    pub ncols: u32,
}

impl TileGrid {
    /// Place tile `tile` of `ntiles` on a square-ish grid.
    ///
    /// `nrows = floor(sqrt(ntiles))` and `ncols = floor(ntiles / nrows)`;
    /// both row and column are taken relative to `nrows`. This is exact for
    /// perfect squares only. Other counts are not corrected and may cover
    /// the image unevenly; callers that need an exact layout pass explicit
    /// row/column counts instead.
    pub fn approximate(tile: u32, ntiles: u32) -> Result<Self, ViewportError> {
        if ntiles == 0 {
            return Err(ViewportError::EmptyTiling);
        }

        let nrows = integer_sqrt(ntiles);
        let ncols = ntiles / nrows;

        Ok(Self {
            row: tile / nrows,
            nrows,
            col: tile % nrows,
            ncols,
        })
    }
}

/// A validated tile: `index < count` and `count >= 1` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraTile {
    row_index: u32,
    row_count: u32,
    col_index: u32,
    col_count: u32,
}

impl CameraTile {
    pub fn new(
        row_index: u32,
        row_count: u32,
        col_index: u32,
        col_count: u32,
    ) -> Result<Self, ViewportError> {
        check_axis("row", row_index, row_count)?;
        check_axis("col", col_index, col_count)?;

        Ok(Self {
            row_index,
            row_count,
            col_index,
            col_count,
        })
    }

    /// The whole image as a single tile.
    pub fn full() -> Self {
        Self {
            row_index: 0,
            row_count: 1,
            col_index: 0,
            col_count: 1,
        }
    }

    pub fn from_grid(grid: TileGrid) -> Result<Self, ViewportError> {
        Self::new(grid.row, grid.nrows, grid.col, grid.ncols)
    }

    pub fn row_index(&self) -> u32 {
        self.row_index
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn col_index(&self) -> u32 {
        self.col_index
    }

    pub fn col_count(&self) -> u32 {
        self.col_count
    }

    /// Normalized (left, bottom) corner of this tile.
    pub fn image_start(&self) -> (f64, f64) {
        (
            self.col_index as f64 / self.col_count as f64,
            1.0 - self.row_index as f64 / self.row_count as f64,
        )
    }

    /// Normalized (right, top) corner of this tile.
    pub fn image_end(&self) -> (f64, f64) {
        (
            (self.col_index + 1) as f64 / self.col_count as f64,
            1.0 - (self.row_index + 1) as f64 / self.row_count as f64,
        )
    }
}

impl Default for CameraTile {
    fn default() -> Self {
        Self::full()
    }
}

fn check_axis(axis: &'static str, index: u32, count: u32) -> Result<(), ViewportError> {
    if count == 0 {
        return Err(ViewportError::ZeroCount { axis });
    }
    if index >= count {
        return Err(ViewportError::IndexOutOfRange { axis, index, count });
    }
    Ok(())
}

fn integer_sqrt(n: u32) -> u32 {
    let mut root = (n as f64).sqrt() as u32;
    while (root as u64) * (root as u64) > n as u64 {
        root -= 1;
    }
    while ((root + 1) as u64) * ((root + 1) as u64) <= n as u64 {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(1), 1);
        assert_eq!(integer_sqrt(3), 1);
        assert_eq!(integer_sqrt(4), 2);
        assert_eq!(integer_sqrt(15), 3);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(u32::MAX), 65535);
    }

    #[test]
    fn test_single_tile_covers_everything() {
        let tile = CameraTile::from_grid(TileGrid::approximate(0, 1).unwrap()).unwrap();
        assert_eq!(tile, CameraTile::full());
        assert_eq!(tile.image_start(), (0.0, 1.0));
        assert_eq!(tile.image_end(), (1.0, 0.0));
    }

    #[test]
    fn test_zero_tiles_rejected() {
        assert_eq!(TileGrid::approximate(0, 0), Err(ViewportError::EmptyTiling));
    }

    #[test]
    fn test_axis_validation() {
        assert_eq!(
            CameraTile::new(0, 0, 0, 1),
            Err(ViewportError::ZeroCount { axis: "row" })
        );
        assert_eq!(
            CameraTile::new(0, 1, 2, 2),
            Err(ViewportError::IndexOutOfRange {
                axis: "col",
                index: 2,
                count: 2
            })
        );
    }
}
