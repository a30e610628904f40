//! Shapes module - tetromino matrices and rotation
//!
//! Every tetromino is a small square boolean matrix written in a compact
//! row-major encoding: `-` is blank, `#` is filled, `,` separates rows and the
//! first row is the top of the piece.
//!
//! Shapes are re-derived from the encoding on every request rather than cached,
//! so [`shape`] must stay bit-for-bit stable: collision detection and history
//! replay depend on the exact matrices.
//!
//! In the returned [`Shape`], matrix row 0 is the **bottom** of the piece, which
//! matches board coordinates (row 0 is the bottom of the board).

use arrayvec::ArrayVec;

use crate::types::{PieceKind, Rotation};

/// Largest matrix edge (the I piece).
pub const MAX_SHAPE_SIZE: usize = 4;

/// Offsets `(row, col)` of the four filled cells of a shape.
pub type MinoCells = ArrayVec<(i8, i8), 4>;

/// Compact encoding of the canonical orientation of a piece kind.
pub fn encoding(kind: PieceKind) -> &'static str {
    match kind {
        PieceKind::I => "--#-,--#-,--#-,--#-",
        PieceKind::O => "##,##",
        PieceKind::T => "---,###,-#-",
        PieceKind::S => "---,-##,##-",
        PieceKind::L => "#--,#--,##-",
        PieceKind::J => "--#,--#,-##",
        PieceKind::Z => "---,##-,-##",
    }
}

/// Square boolean matrix of a tetromino in a given rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    size: u8,
    rows: [[bool; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE],
}

impl Shape {
    /// Parse the compact row-major encoding (first row = top, as written).
    fn parse(encoding: &str) -> Self {
        let mut rows = [[false; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        let mut size = 0u8;
        for (i, row) in encoding.split(',').take(MAX_SHAPE_SIZE).enumerate() {
            for (j, ch) in row.chars().take(MAX_SHAPE_SIZE).enumerate() {
                rows[i][j] = ch == '#';
            }
            size = (i + 1) as u8;
        }
        Self { size, rows }
    }

    /// Clockwise quarter turn: transpose, then reverse every row.
    fn rotated_cw(&self) -> Self {
        let n = self.size as usize;
        let mut rows = [[false; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (i, out_row) in rows.iter_mut().enumerate().take(n) {
            for (j, out) in out_row.iter_mut().enumerate().take(n) {
                *out = self.rows[n - 1 - j][i];
            }
        }
        Self {
            size: self.size,
            rows,
        }
    }

    /// Reverse the row order (top-first <-> bottom-first).
    fn flipped_rows(&self) -> Self {
        let n = self.size as usize;
        let mut rows = [[false; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (i, out_row) in rows.iter_mut().enumerate().take(n) {
            *out_row = self.rows[n - 1 - i];
        }
        Self {
            size: self.size,
            rows,
        }
    }

    /// Matrix edge length (2, 3 or 4).
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Whether the cell at `(row, col)` is filled. Row 0 is the bottom.
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.size as usize && col < self.size as usize && self.rows[row][col]
    }

    /// Offsets `(row, col)` of the filled cells, bottom row first.
    pub fn cells(&self) -> MinoCells {
        let mut out = MinoCells::new();
        iterate_matrix(self.size as usize, |row, col| {
            if self.rows[row][col] {
                let _ = out.try_push((row as i8, col as i8));
            }
        });
        out
    }

    /// Smallest filled column offset.
    pub fn leftmost_column(&self) -> i8 {
        self.cells().iter().map(|&(_, c)| c).min().unwrap_or(0)
    }

    /// Render as the compact encoding again (top row first). Used in tests and logs.
    pub fn to_encoding(&self) -> String {
        let n = self.size as usize;
        (0..n)
            .rev()
            .map(|row| {
                (0..n)
                    .map(|col| if self.rows[row][col] { '#' } else { '-' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Visit every `(row, col)` of an `n`x`n` matrix in row-major order.
pub fn iterate_matrix(n: usize, mut visit: impl FnMut(usize, usize)) {
    for row in 0..n {
        for col in 0..n {
            visit(row, col);
        }
    }
}

/// Shape of `kind` rotated clockwise `rotation` quarter turns.
///
/// The rotation is applied to the encoded (top-first) matrix, and the result is
/// row-reversed once so that row 0 is the bottom of the piece.
pub fn shape(kind: PieceKind, rotation: Rotation) -> Shape {
    let mut matrix = Shape::parse(encoding(kind));
    for _ in 0..rotation.quarter_turns() {
        matrix = matrix.rotated_cw();
    }
    matrix.flipped_rows()
}
