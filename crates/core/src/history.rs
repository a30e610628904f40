//! Piece history - the source of truth for the board
//!
//! A match records every finalized piece and board event in an append-only
//! log. Replaying the log from an empty board reproduces the settled board
//! exactly. The history also keeps the replay result as an incrementally
//! maintained cache so collision checks don't replay the whole log; both paths
//! go through [`apply`], and [`History::replay`] lets tests prove they agree.
//!
//! The single mutable active piece lives next to the log and is never part of
//! the settled board.

use arrayvec::ArrayVec;

use crate::board::{Board, BoardSize};
use crate::shapes::{shape, Shape};
use crate::types::{Block, PieceKind, Rotation};

/// A tetromino placement: kind, rotation, matrix and lower-left position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tetromino {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub shape: Shape,
    /// Board row of the matrix's bottom edge.
    pub row: i16,
    /// Board column of the matrix's left edge.
    pub col: i16,
}

impl Tetromino {
    pub fn new(kind: PieceKind, rotation: Rotation, row: i16, col: i16) -> Self {
        Self {
            kind,
            rotation,
            shape: shape(kind, rotation),
            row,
            col,
        }
    }

    /// Rotation 0, horizontally centered, top of the matrix flush with the top of the board.
    pub fn at_spawn(kind: PieceKind, size: BoardSize) -> Self {
        let matrix = shape(kind, Rotation::North);
        let col = (size.width as i16 + 1) / 2 - 2;
        let row = size.height as i16 - matrix.size() as i16;
        Self {
            kind,
            rotation: Rotation::North,
            shape: matrix,
            row,
            col,
        }
    }

    pub fn moved(&self, rows: i16, cols: i16) -> Self {
        Self {
            row: self.row + rows,
            col: self.col + cols,
            ..*self
        }
    }

    /// Next clockwise rotation at the same position (no kicks).
    pub fn rotated_cw(&self) -> Self {
        Self::new(self.kind, self.rotation.rotate_cw(), self.row, self.col)
    }

    /// Absolute `(row, col)` of each filled cell.
    pub fn cells(&self) -> impl Iterator<Item = (i16, i16)> + '_ {
        self.shape
            .cells()
            .into_iter()
            .map(move |(dr, dc)| (self.row + dr as i16, self.col + dc as i16))
    }

    pub fn fits(&self, board: &Board) -> bool {
        board.fits(&self.shape, self.row, self.col)
    }
}

/// One entry of the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    /// A locked tetromino.
    Tetromino(Tetromino),
    /// A cleared row, indexed against the board as it stands when the event is replayed.
    LineClear { row: u8 },
    /// A garbage row pushed in at the bottom, with the session's gap column left open.
    Garbage,
}

/// Apply a single history entry to a board.
pub fn apply(board: &mut Board, piece: &Piece, gap_column: u8) {
    match piece {
        Piece::Tetromino(t) => board.stamp(&t.shape, t.row, t.col, Block::Tetromino(t.kind)),
        Piece::LineClear { row } => board.remove_row(*row as usize),
        Piece::Garbage => board.insert_garbage_row(gap_column),
    }
}

/// Row indices cleared by one lock, in replay order.
pub type ClearedRows = ArrayVec<u8, 4>;

/// Append-only piece log plus the active piece.
#[derive(Debug, Clone)]
pub struct History {
    size: BoardSize,
    gap_column: u8,
    pieces: Vec<Piece>,
    active: Option<Tetromino>,
    settled: Board,
}

impl History {
    /// # Panics
    ///
    /// Panics if `size` is unsupported or `gap_column` is outside the board.
    pub fn new(size: BoardSize, gap_column: u8) -> Self {
        assert!(gap_column < size.width, "gap column outside the board");
        Self {
            size,
            gap_column,
            pieces: Vec::new(),
            active: None,
            settled: Board::new(size),
        }
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn gap_column(&self) -> u8 {
        self.gap_column
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn active(&self) -> Option<&Tetromino> {
        self.active.as_ref()
    }

    /// Finalized geometry only (the active piece excluded).
    pub fn settled(&self) -> &Board {
        &self.settled
    }

    /// Whether a candidate placement is legal against finalized geometry.
    pub fn fits(&self, piece: &Tetromino) -> bool {
        piece.fits(&self.settled)
    }

    /// Append an entry to the log and apply it to the settled board.
    pub fn record(&mut self, piece: Piece) {
        apply(&mut self.settled, &piece, self.gap_column);
        self.pieces.push(piece);
    }

    /// Install a new active piece, finalizing the previous one first.
    pub fn set_active(&mut self, piece: Tetromino) {
        self.lock_active();
        self.active = Some(piece);
    }

    /// Replace the active piece in place (move/rotate/hold), without locking.
    pub fn replace_active(&mut self, piece: Tetromino) {
        self.active = Some(piece);
    }

    /// Move the active piece into the log.
    pub fn lock_active(&mut self) -> Option<Tetromino> {
        let piece = self.active.take()?;
        self.record(Piece::Tetromino(piece));
        Some(piece)
    }

    /// Drop the active piece without recording it.
    pub fn discard_active(&mut self) -> Option<Tetromino> {
        self.active.take()
    }

    /// Record a line clear for every clearable row of the settled board.
    ///
    /// Rows are scanned bottom-up; each recorded index is shifted down by the
    /// number of rows already removed in this batch so that replay removes
    /// the right rows. A lock can complete at most the four rows its piece
    /// spans, since any earlier full row was already cleared.
    pub fn clear_full_rows(&mut self) -> ClearedRows {
        let mut full = ClearedRows::new();
        for row in 0..self.size.height as usize {
            if self.settled.is_row_clearable(row) && full.try_push(row as u8).is_err() {
                break;
            }
        }
        let mut recorded = ClearedRows::new();
        for (already_cleared, row) in full.iter().enumerate() {
            let adjusted = row - already_cleared as u8;
            self.record(Piece::LineClear { row: adjusted });
            recorded.push(adjusted);
        }
        recorded
    }

    /// Push `count` garbage rows in at the bottom and lift the active piece by the same amount.
    pub fn push_garbage(&mut self, count: u8) {
        for _ in 0..count {
            self.record(Piece::Garbage);
        }
        if let Some(active) = self.active.as_mut() {
            active.row += count as i16;
        }
    }

    /// Number of garbage events in the log.
    pub fn garbage_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Garbage))
            .count()
    }

    /// Rebuild the settled board by replaying the whole log from scratch.
    pub fn replay(&self) -> Board {
        let mut board = Board::new(self.size);
        for piece in &self.pieces {
            apply(&mut board, piece, self.gap_column);
        }
        board
    }

    /// Settled board with the active piece drawn on top, for presenters.
    pub fn render(&self) -> Board {
        let mut board = self.settled.clone();
        if let Some(active) = &self.active {
            board.stamp(
                &active.shape,
                active.row,
                active.col,
                Block::Tetromino(active.kind),
            );
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> History {
        History::new(BoardSize::default(), 9)
    }

    #[test]
    fn test_spawn_column_is_centered() {
        let o = Tetromino::at_spawn(PieceKind::O, BoardSize::default());
        assert_eq!(o.col, 3);
        assert_eq!(o.row, 14);

        let t = Tetromino::at_spawn(PieceKind::T, BoardSize::default());
        assert_eq!(t.col, 3);
        assert_eq!(t.row, 13);
    }

    #[test]
    fn test_active_piece_not_in_settled_board() {
        let mut h = history();
        h.set_active(Tetromino::new(PieceKind::O, Rotation::North, 0, 0));
        assert_eq!(h.settled().occupied(), 0);
        assert_eq!(h.render().occupied(), 4);
        assert!(h.pieces().is_empty());
    }

    #[test]
    fn test_set_active_locks_previous_piece() {
        let mut h = history();
        h.set_active(Tetromino::new(PieceKind::O, Rotation::North, 0, 0));
        h.set_active(Tetromino::new(PieceKind::O, Rotation::North, 5, 5));
        assert_eq!(h.pieces().len(), 1);
        assert_eq!(h.settled().occupied(), 4);
    }

    #[test]
    fn test_clear_rows_records_adjusted_indices() {
        let mut h = history();
        // Fill rows 0 and 1 with five O pieces.
        for col in [0, 2, 4, 6, 8] {
            h.set_active(Tetromino::new(PieceKind::O, Rotation::North, 0, col));
        }
        h.lock_active();

        let cleared = h.clear_full_rows();
        assert_eq!(cleared.as_slice(), &[0, 0]);
        assert_eq!(h.settled().occupied(), 0);
        assert_eq!(h.replay(), *h.settled());
    }

    #[test]
    fn test_garbage_lifts_active_piece() {
        let mut h = history();
        h.set_active(Tetromino::new(PieceKind::T, Rotation::North, 4, 3));
        h.push_garbage(2);
        assert_eq!(h.active().map(|t| t.row), Some(6));
        assert_eq!(h.garbage_count(), 2);
        assert!(!h.settled().is_row_full(0));
        assert_eq!(h.settled().get(0, 9), Some(None));
    }

    #[test]
    fn test_replay_matches_cache() {
        let mut h = history();
        h.set_active(Tetromino::new(PieceKind::I, Rotation::East, 0, 0));
        h.push_garbage(1);
        h.set_active(Tetromino::new(PieceKind::L, Rotation::South, 3, 5));
        h.lock_active();
        assert_eq!(h.replay(), *h.settled());
        assert_eq!(h.replay(), h.replay());
    }
}
