//! Board module - manages the game grid
//!
//! The board is a `height` x `width` grid where each cell is empty, a tetromino
//! block, or garbage fill. Uses a flat vector in row-major order for cache
//! locality; the size is fixed at construction.
//!
//! Coordinates: `(row, col)` where row 0 is the **bottom** row and col 0 is the
//! leftmost column. Cells above the top row are treated as open space: pieces
//! may poke out of the top while spawning, and such cells are clipped when
//! written.

use crate::shapes::Shape;
use crate::types::{Block, Cell, MAX_GRID_HEIGHT, MAX_GRID_WIDTH, MIN_GRID_EDGE};

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardSize {
    pub height: u8,
    pub width: u8,
}

impl BoardSize {
    pub const fn new(height: u8, width: u8) -> Self {
        Self { height, width }
    }

    /// Whether the simulation supports this size.
    pub fn is_valid(&self) -> bool {
        (MIN_GRID_EDGE..=MAX_GRID_HEIGHT).contains(&self.height)
            && (MIN_GRID_EDGE..=MAX_GRID_WIDTH).contains(&self.width)
    }

    pub fn cell_count(&self) -> usize {
        self.height as usize * self.width as usize
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::new(crate::types::GRID_HEIGHT, crate::types::GRID_WIDTH)
    }
}

/// The settled board (finalized geometry only, never the active piece).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: BoardSize,
    /// Flat array of cells, row-major order (row * width + col), row 0 at the bottom
    cells: Vec<Cell>,
}

impl Board {
    /// Create a new empty board.
    ///
    /// # Panics
    ///
    /// Panics if `size` is outside the supported range; a malformed board is a
    /// programmer error.
    pub fn new(size: BoardSize) -> Self {
        assert!(
            size.is_valid(),
            "unsupported board size {}x{}",
            size.height,
            size.width
        );
        Self {
            size,
            cells: vec![None; size.cell_count()],
        }
    }

    #[inline(always)]
    fn index(&self, row: i16, col: i16) -> Option<usize> {
        if row < 0 || col < 0 || row >= self.size.height as i16 || col >= self.size.width as i16 {
            return None;
        }
        Some(row as usize * self.size.width as usize + col as usize)
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn width(&self) -> u8 {
        self.size.width
    }

    pub fn height(&self) -> u8 {
        self.size.height
    }

    /// Get cell at `(row, col)`. Returns None if out of bounds.
    pub fn get(&self, row: i16, col: i16) -> Option<Cell> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    /// Set cell at `(row, col)`. Returns false if out of bounds.
    pub fn set(&mut self, row: i16, col: i16, cell: Cell) -> bool {
        match self.index(row, col) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Whether a block may occupy `(row, col)`.
    ///
    /// Below the floor and outside the side walls is blocked; above the top row
    /// is open.
    pub fn is_open(&self, row: i16, col: i16) -> bool {
        if row < 0 || col < 0 || col >= self.size.width as i16 {
            return false;
        }
        if row >= self.size.height as i16 {
            return true;
        }
        matches!(self.get(row, col), Some(None))
    }

    /// Whether `shape` placed with its lower-left corner at `(row, col)` fits.
    pub fn fits(&self, shape: &Shape, row: i16, col: i16) -> bool {
        shape
            .cells()
            .iter()
            .all(|&(dr, dc)| self.is_open(row + dr as i16, col + dc as i16))
    }

    /// Write a shape's cells. Cells outside the grid are clipped.
    pub fn stamp(&mut self, shape: &Shape, row: i16, col: i16, block: Block) {
        for &(dr, dc) in shape.cells().iter() {
            self.set(row + dr as i16, col + dc as i16, Some(block));
        }
    }

    fn row_slice(&self, row: usize) -> &[Cell] {
        let width = self.size.width as usize;
        &self.cells[row * width..(row + 1) * width]
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, row: usize) -> bool {
        row < self.size.height as usize && self.row_slice(row).iter().all(|c| c.is_some())
    }

    /// Check if every cell of a row is garbage fill
    pub fn is_row_all_fill(&self, row: usize) -> bool {
        row < self.size.height as usize
            && self.row_slice(row).iter().all(|c| *c == Some(Block::Fill))
    }

    /// A full row that is not made of garbage only.
    pub fn is_row_clearable(&self, row: usize) -> bool {
        self.is_row_full(row) && !self.is_row_all_fill(row)
    }

    /// Remove a row, shifting every row above it down and leaving an empty top row.
    pub fn remove_row(&mut self, row: usize) {
        let height = self.size.height as usize;
        if row >= height {
            return;
        }
        let width = self.size.width as usize;
        self.cells.copy_within((row + 1) * width..height * width, row * width);
        for cell in &mut self.cells[(height - 1) * width..] {
            *cell = None;
        }
    }

    /// Push a garbage row in at the bottom, shifting everything up one row.
    ///
    /// The top row falls off the board. The new bottom row is fill except for
    /// `gap_column`, which stays empty.
    pub fn insert_garbage_row(&mut self, gap_column: u8) {
        let height = self.size.height as usize;
        let width = self.size.width as usize;
        self.cells.copy_within(0..(height - 1) * width, width);
        for (col, cell) in self.cells[..width].iter_mut().enumerate() {
            *cell = if col == gap_column as usize {
                None
            } else {
                Some(Block::Fill)
            };
        }
    }

    /// Rows ordered top to bottom, as presenters draw them.
    pub fn rows_top_down(&self) -> Vec<Vec<Cell>> {
        (0..self.size.height as usize)
            .rev()
            .map(|row| self.row_slice(row).to_vec())
            .collect()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardSize::default())
    }
}
