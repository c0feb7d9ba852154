//! Tests for tile placement and camera viewport math.

use tapestry_common::{CameraTile, TileGrid, ViewportError};
use test_utils::assert_approx_eq;

/// (left, bottom, right, top) of a tile's viewport.
fn rect(tile: &CameraTile) -> (f64, f64, f64, f64) {
    let (left, bottom) = tile.image_start();
    let (right, top) = tile.image_end();
    (left, bottom, right, top)
}

fn overlap_area(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> f64 {
    // For tiles, "bottom" is the larger y value (row 0 is at the top).
    let width = a.2.min(b.2) - a.0.max(b.0);
    let height = a.1.min(b.1) - a.3.max(b.3);
    width.max(0.0) * height.max(0.0)
}

// ============================================================================
// Approximate (tile/ntiles) placement
// ============================================================================

#[test]
fn test_tile_two_of_four() {
    let grid = TileGrid::approximate(2, 4).unwrap();
    assert_eq!(
        grid,
        TileGrid {
            row: 1,
            nrows: 2,
            col: 0,
            ncols: 2
        }
    );

    let tile = CameraTile::from_grid(grid).unwrap();
    assert_eq!(tile.image_start(), (0.0, 0.5));
    assert_eq!(tile.image_end(), (0.5, 0.0));
}

#[test]
fn test_perfect_squares_partition_unit_square() {
    for side in 1..=6u32 {
        let ntiles = side * side;
        let tiles: Vec<CameraTile> = (0..ntiles)
            .map(|t| CameraTile::from_grid(TileGrid::approximate(t, ntiles).unwrap()).unwrap())
            .collect();

        let expected_area = 1.0 / ntiles as f64;
        let mut total_area = 0.0;
        for (i, a) in tiles.iter().enumerate() {
            let (left, bottom, right, top) = rect(a);
            assert!(left >= 0.0 && right <= 1.0, "tile {i} of {ntiles} leaves [0,1] in x");
            assert!(top >= 0.0 && bottom <= 1.0, "tile {i} of {ntiles} leaves [0,1] in y");

            let area = (right - left) * (bottom - top);
            assert_approx_eq!(area, expected_area, 1e-12);
            total_area += area;

            for b in tiles.iter().skip(i + 1) {
                assert_approx_eq!(overlap_area(rect(a), rect(b)), 0.0, 1e-12);
            }
        }

        // Equal, pairwise disjoint pieces inside the square summing to 1
        // cover it exactly.
        assert_approx_eq!(total_area, 1.0, 1e-9);
    }
}

#[test]
fn test_non_square_counts_are_not_corrected() {
    // 3 tiles: nrows = 1, ncols = 3, and the column is taken modulo nrows.
    let grid = TileGrid::approximate(1, 3).unwrap();
    assert_eq!(
        grid,
        TileGrid {
            row: 1,
            nrows: 1,
            col: 0,
            ncols: 3
        }
    );
    assert!(matches!(
        CameraTile::from_grid(grid),
        Err(ViewportError::IndexOutOfRange { axis: "row", .. })
    ));

    // 8 tiles: a 2x4 grid whose upper columns are never addressed.
    let cols: Vec<u32> = (0..8)
        .map(|t| TileGrid::approximate(t, 8).unwrap().col)
        .collect();
    assert_eq!(cols, vec![0, 1, 0, 1, 0, 1, 0, 1]);
}

// ============================================================================
// Explicit row/col placement
// ============================================================================

#[test]
fn test_tiles_are_never_degenerate() {
    for row_count in 1..=7u32 {
        for col_count in 1..=7u32 {
            for row in 0..row_count {
                for col in 0..col_count {
                    let tile = CameraTile::new(row, row_count, col, col_count).unwrap();
                    let (start_x, start_y) = tile.image_start();
                    let (end_x, end_y) = tile.image_end();
                    assert!(start_x < end_x);
                    assert!(start_y > end_y);
                }
            }
        }
    }
}

#[test]
fn test_row_zero_is_top() {
    let top = CameraTile::new(0, 2, 0, 1).unwrap();
    let bottom = CameraTile::new(1, 2, 0, 1).unwrap();
    assert_eq!(top.image_start(), (0.0, 1.0));
    assert_eq!(top.image_end(), (1.0, 0.5));
    assert_eq!(bottom.image_start(), (0.0, 0.5));
    assert_eq!(bottom.image_end(), (1.0, 0.0));
}

#[test]
fn test_thirds() {
    let tile = CameraTile::new(1, 3, 2, 3).unwrap();
    let (start_x, start_y) = tile.image_start();
    let (end_x, end_y) = tile.image_end();
    assert_approx_eq!(start_x, 2.0 / 3.0, 1e-12);
    assert_approx_eq!(end_x, 1.0, 1e-12);
    assert_approx_eq!(start_y, 2.0 / 3.0, 1e-12);
    assert_approx_eq!(end_y, 1.0 / 3.0, 1e-12);
}

#[test]
fn test_out_of_range_rejected() {
    assert_eq!(
        CameraTile::new(2, 2, 0, 1),
        Err(ViewportError::IndexOutOfRange {
            axis: "row",
            index: 2,
            count: 2
        })
    );
    assert_eq!(
        CameraTile::new(0, 1, 0, 0),
        Err(ViewportError::ZeroCount { axis: "col" })
    );
}
