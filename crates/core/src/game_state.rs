//! Game state module - one match's complete simulation state
//!
//! Ties together the piece history, the bag queue, the hold slot and scoring.
//! Time does not exist in here: the caller drives gravity by calling
//! [`GameState::tick`] at [`GameState::gravity_interval_ms`] and passes the
//! elapsed duration into [`GameState::snapshot`].
//!
//! Player intents that are not legal (moving into a wall, rotating into a
//! block, holding twice) are rejected silently and report `false`.

use std::time::Duration;

use crate::board::{Board, BoardSize};
use crate::history::{History, Piece, Tetromino};
use crate::rng::{PieceQueue, SimpleRng};
use crate::scoring::{calculate_drop_bonus, calculate_line_score, gravity_interval_ms, level_for_score};
use crate::snapshot::{ActiveSnapshot, RenderState};
use crate::types::*;

/// What a single gravity tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// A new active piece entered the board.
    pub spawned: bool,
    /// The active piece fell one row.
    pub moved: bool,
    /// The active piece landed and was locked.
    pub lock: Option<LockEvent>,
    /// The match ended during this tick (top-out).
    pub ended: bool,
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct GameState {
    history: History,
    queue: PieceQueue,
    hold: Option<PieceKind>,
    /// Set once the hold slot was used for the current piece; cleared on lock.
    hold_used: bool,
    score: u32,
    /// Level seen by the last [`GameState::take_level_change`] call.
    last_level: u32,
    lines: u32,
    pieces_locked: u32,
    status: MatchStatus,
    end_reason: Option<EndReason>,
    /// Last lock/line-clear event (consumed by observers).
    last_event: Option<LockEvent>,
    seed: u32,
}

impl GameState {
    /// Create a new match on the default 16x10 board.
    pub fn new(seed: u32) -> Self {
        Self::with_size(BoardSize::default(), seed)
    }

    /// Create a new match on a board of the given size.
    ///
    /// # Panics
    ///
    /// Panics if the size is unsupported (see [`BoardSize::is_valid`]).
    pub fn with_size(size: BoardSize, seed: u32) -> Self {
        assert!(
            size.is_valid(),
            "unsupported board size {}x{}",
            size.height,
            size.width
        );
        let mut rng = SimpleRng::new(seed);
        let gap_column = rng.next_range(size.width as u32) as u8;

        Self {
            history: History::new(size, gap_column),
            queue: PieceQueue::with_rng(rng),
            hold: None,
            hold_used: false,
            score: 0,
            last_level: level_for_score(0),
            lines: 0,
            pieces_locked: 0,
            status: MatchStatus::NotStarted,
            end_reason: None,
            last_event: None,
            seed,
        }
    }

    /// Seed a starting layout before the match starts (puzzles, restored sessions).
    ///
    /// Returns false once the match has started; history is append-only from then on.
    pub fn preload(&mut self, pieces: impl IntoIterator<Item = Piece>) -> bool {
        if self.status != MatchStatus::NotStarted || self.history.active().is_some() {
            return false;
        }
        for piece in pieces {
            self.history.record(piece);
        }
        true
    }

    /// Put the first piece on the board ahead of [`GameState::start`].
    ///
    /// The piece is shown but frozen: controls and gravity ignore it until the
    /// match starts. Returns false when there is nothing to deal; a blocked
    /// spawn position is left for `start` to top out on.
    pub fn deal(&mut self) -> bool {
        if self.status != MatchStatus::NotStarted || self.history.active().is_some() {
            return false;
        }
        let piece = Tetromino::at_spawn(self.queue.peek(), self.size());
        if !self.history.fits(&piece) {
            return false;
        }
        self.queue.draw();
        self.history.set_active(piece);
        true
    }

    /// Start the match and spawn the first piece, unless one was dealt already.
    pub fn start(&mut self) -> bool {
        if self.status != MatchStatus::NotStarted {
            return false;
        }
        self.status = MatchStatus::Running;
        if self.history.active().is_none() {
            self.spawn_piece();
        }
        true
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == MatchStatus::Running
    }

    pub fn game_over(&self) -> bool {
        self.status == MatchStatus::Ended
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Level derived from the current score.
    pub fn level(&self) -> u32 {
        level_for_score(self.score)
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold
    }

    pub fn can_hold(&self) -> bool {
        !self.hold_used
    }

    pub fn next_piece(&self) -> PieceKind {
        self.queue.peek()
    }

    pub fn active(&self) -> Option<Tetromino> {
        self.history.active().copied()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Settled board (active piece excluded).
    pub fn board(&self) -> &Board {
        self.history.settled()
    }

    pub fn size(&self) -> BoardSize {
        self.history.size()
    }

    /// Current gravity interval.
    pub fn gravity_interval_ms(&self) -> u32 {
        gravity_interval_ms(self.level())
    }

    /// Report a level-up once: returns the new level if it rose since the last call.
    pub fn take_level_change(&mut self) -> Option<u32> {
        let level = self.level();
        if level > self.last_level {
            self.last_level = level;
            Some(level)
        } else {
            None
        }
    }

    /// Take and clear the last lock event.
    pub fn take_last_event(&mut self) -> Option<LockEvent> {
        self.last_event.take()
    }

    fn end(&mut self, reason: EndReason) {
        if self.status == MatchStatus::Ended {
            return;
        }
        self.status = MatchStatus::Ended;
        self.end_reason = Some(reason);
    }

    /// Spawn the next piece from the queue, ending the match if it doesn't fit.
    pub fn spawn_piece(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        let piece = Tetromino::at_spawn(self.queue.draw(), self.size());
        if !self.history.fits(&piece) {
            self.end(EndReason::ToppedOut);
            return false;
        }

        self.history.set_active(piece);
        true
    }

    /// Try to translate the active piece.
    pub(crate) fn try_move(&mut self, rows: i16, cols: i16) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(active) = self.history.active().copied() else {
            return false;
        };

        let candidate = active.moved(rows, cols);
        if !self.history.fits(&candidate) {
            return false;
        }
        self.history.replace_active(candidate);
        true
    }

    /// Move the active piece one column.
    pub fn move_piece(&mut self, direction: Direction) -> bool {
        self.try_move(0, direction.column_delta() as i16)
    }

    /// Rotate the active piece clockwise in place. No wall kicks.
    pub fn rotate(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(active) = self.history.active().copied() else {
            return false;
        };

        let candidate = active.rotated_cw();
        if !self.history.fits(&candidate) {
            return false;
        }
        self.history.replace_active(candidate);
        true
    }

    /// Hard drop: fall as far as possible, then lock once.
    ///
    /// The next piece spawns on the following gravity tick. Returns None when
    /// there is nothing to drop.
    pub fn drop_piece(&mut self) -> Option<LockEvent> {
        if !self.is_running() || self.history.active().is_none() {
            return None;
        }

        let level = self.level();
        let mut rows = 0u32;
        while self.try_move(-1, 0) {
            rows += 1;
        }
        self.lock_piece(level, calculate_drop_bonus(rows, level))
    }

    /// Swap the active piece with the hold slot (or the queue when the slot is empty).
    ///
    /// The incoming piece appears at the spawn position. Allowed once per lock.
    pub fn hold(&mut self) -> bool {
        if !self.is_running() || self.hold_used {
            return false;
        }
        let Some(active) = self.history.active().copied() else {
            return false;
        };

        let incoming = self.hold.unwrap_or_else(|| self.queue.peek());
        let candidate = Tetromino::at_spawn(incoming, self.size());
        if !self.history.fits(&candidate) {
            return false;
        }

        if self.hold.is_none() {
            self.queue.draw();
        }
        self.hold = Some(active.kind);
        self.history.replace_active(candidate);
        self.hold_used = true;
        true
    }

    /// End the match now, whatever the board looks like.
    pub fn stop(&mut self) -> bool {
        if self.status == MatchStatus::Ended {
            return false;
        }
        self.end(EndReason::Stopped);
        true
    }

    /// Receive `count` garbage rows from the opponent.
    ///
    /// The active piece is lifted by the same amount so it keeps its position
    /// relative to the stack.
    pub fn receive_garbage(&mut self, count: u8) -> bool {
        if self.status == MatchStatus::Ended || count == 0 {
            return false;
        }
        self.history.push_garbage(count);
        true
    }

    /// Lock the active piece, record clears and award points.
    ///
    /// `level` is the level captured before the action that caused the lock.
    fn lock_piece(&mut self, level: u32, drop_bonus: u32) -> Option<LockEvent> {
        self.history.lock_active()?;
        self.pieces_locked = self.pieces_locked.wrapping_add(1);
        self.hold_used = false;

        let cleared = self.history.clear_full_rows();
        let lines_cleared = cleared.len();
        let line_clear_score = calculate_line_score(lines_cleared, level);

        self.score = self
            .score
            .saturating_add(line_clear_score)
            .saturating_add(drop_bonus);
        self.lines += lines_cleared as u32;

        let event = LockEvent {
            lines_cleared: lines_cleared as u8,
            line_clear_score,
            drop_bonus,
            level,
        };
        self.last_event = Some(event);
        Some(event)
    }

    /// Main gravity tick
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.is_running() {
            return outcome;
        }

        if self.history.active().is_none() {
            outcome.spawned = self.spawn_piece();
            outcome.ended = self.game_over();
            return outcome;
        }

        let level = self.level();
        if self.try_move(-1, 0) {
            outcome.moved = true;
            return outcome;
        }

        outcome.lock = self.lock_piece(level, 0);
        outcome.spawned = self.spawn_piece();
        outcome.ended = self.game_over();
        outcome
    }

    /// Apply an inbound control signal.
    pub fn apply_control(&mut self, control: Control) -> bool {
        match control {
            Control::Left => self.move_piece(Direction::Left),
            Control::Right => self.move_piece(Direction::Right),
            Control::Down => self.drop_piece().is_some(),
            Control::Rotate => self.rotate(),
            Control::Hold => self.hold(),
            Control::Stop => self.stop(),
        }
    }

    /// Render the current state for presenters.
    pub fn snapshot(&self, elapsed: Duration) -> RenderState {
        RenderState {
            grid: self.history.render().rows_top_down(),
            active: self.active().map(ActiveSnapshot::from),
            next: Some(self.queue.peek()),
            held: self.hold,
            can_hold: self.can_hold(),
            score: self.score,
            level: self.level(),
            lines: self.lines,
            duration: elapsed,
            status: self.status,
            game_over: self.game_over(),
            starting_in: None,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(seed: u32) -> GameState {
        let mut state = GameState::new(seed);
        assert!(state.start());
        state
    }

    /// First seed whose opening piece is `kind`.
    fn seed_opening_with(kind: PieceKind) -> u32 {
        (1..1000)
            .find(|&seed| GameState::new(seed).next_piece() == kind)
            .expect("some seed opens with the requested piece")
    }

    /// Rebuild the history around a known gap column and lay `rows` garbage rows.
    fn with_garbage(state: &mut GameState, gap: u8, rows: u8) {
        state.history = History::new(state.size(), gap);
        state.preload((0..rows).map(|_| Piece::Garbage));
    }

    #[test]
    fn test_new_game_state() {
        let state = GameState::new(12345);

        assert_eq!(state.status(), MatchStatus::NotStarted);
        assert_eq!(state.score(), 0);
        assert_eq!(state.level(), 1);
        assert_eq!(state.lines(), 0);
        assert!(state.active().is_none());
        assert!(state.hold_piece().is_none());
        assert!(state.history().gap_column() < GRID_WIDTH);
    }

    #[test]
    fn test_start_spawns_once() {
        let mut state = GameState::new(12345);
        assert!(state.start());
        assert!(state.active().is_some());
        assert!(!state.start());
    }

    #[test]
    fn test_actions_ignored_before_start() {
        let mut state = GameState::new(1);
        assert!(!state.move_piece(Direction::Left));
        assert!(!state.rotate());
        assert!(!state.hold());
        assert!(state.drop_piece().is_none());
        assert_eq!(state.tick(), TickOutcome::default());
    }

    #[test]
    fn test_o_piece_moves_left_to_wall() {
        let mut state = started(seed_opening_with(PieceKind::O));
        let active = state.active().unwrap();
        assert_eq!(active.kind, PieceKind::O);
        assert_eq!(active.col, 3);

        for _ in 0..3 {
            assert!(state.move_piece(Direction::Left));
        }
        assert_eq!(state.active().unwrap().col, 0);
        assert!(!state.move_piece(Direction::Left));
        assert_eq!(state.active().unwrap().col, 0);
    }

    #[test]
    fn test_i_piece_can_hang_past_left_edge_of_matrix() {
        let mut state = started(seed_opening_with(PieceKind::I));
        while state.move_piece(Direction::Left) {}
        let active = state.active().unwrap();
        // Column offset of the vertical bar inside the matrix.
        assert_eq!(active.col, -active.shape.leftmost_column() as i16);
    }

    #[test]
    fn test_tick_gravity() {
        let mut state = started(1);
        let row = state.active().unwrap().row;
        let outcome = state.tick();
        assert!(outcome.moved);
        assert_eq!(state.active().unwrap().row, row - 1);
    }

    #[test]
    fn test_tick_locks_and_spawns() {
        let mut state = started(1);
        let mut ticks = 0;
        loop {
            let outcome = state.tick();
            ticks += 1;
            if outcome.lock.is_some() {
                assert!(outcome.spawned);
                break;
            }
            assert!(ticks < 100);
        }
        assert_eq!(state.pieces_locked(), 1);
        assert_eq!(state.score(), 0);
        assert!(state.active().is_some());
    }

    #[test]
    fn test_hard_drop_awards_row_bonus_and_leaves_no_active() {
        let mut state = started(seed_opening_with(PieceKind::O));
        let event = state.drop_piece().unwrap();
        // O spawns at row 14 and falls to row 0.
        assert_eq!(event.drop_bonus, 14);
        assert_eq!(event.level, 1);
        assert_eq!(state.score(), 14);
        assert!(state.active().is_none());

        // Dropping again with nothing active is a no-op.
        assert!(state.drop_piece().is_none());
        assert_eq!(state.score(), 14);

        // Next tick brings in the next piece.
        assert!(state.tick().spawned);
    }

    #[test]
    fn test_rotation_rejected_against_wall() {
        let mut state = started(seed_opening_with(PieceKind::I));
        // Vertical I in matrix column 2; push it against the right wall.
        while state.move_piece(Direction::Right) {}
        let before = state.active().unwrap();
        assert!(!state.rotate());
        assert_eq!(state.active().unwrap(), before);
    }

    #[test]
    fn test_rotate_updates_shape() {
        let mut state = started(seed_opening_with(PieceKind::T));
        assert!(state.rotate());
        let active = state.active().unwrap();
        assert_eq!(active.rotation, Rotation::East);
        assert_eq!(active.shape, crate::shapes::shape(PieceKind::T, Rotation::East));
    }

    #[test]
    fn test_hold_once_per_piece() {
        let mut state = started(1);
        let first = state.active().unwrap().kind;
        let upcoming = state.next_piece();

        assert!(state.hold());
        assert_eq!(state.hold_piece(), Some(first));
        assert_eq!(state.active().unwrap().kind, upcoming);

        // Second hold before a lock is rejected and swaps nothing.
        assert!(!state.hold());
        assert_eq!(state.hold_piece(), Some(first));
        assert_eq!(state.active().unwrap().kind, upcoming);

        state.drop_piece();
        state.tick();
        assert!(state.can_hold());
        let current = state.active().unwrap().kind;
        assert!(state.hold());
        assert_eq!(state.active().unwrap().kind, first);
        assert_eq!(state.hold_piece(), Some(current));
    }

    #[test]
    fn test_hold_respawns_at_spawn_position() {
        let mut state = started(1);
        state.tick();
        state.move_piece(Direction::Left);
        assert!(state.hold());
        let active = state.active().unwrap();
        let spawn = Tetromino::at_spawn(active.kind, state.size());
        assert_eq!((active.row, active.col), (spawn.row, spawn.col));
    }

    #[test]
    fn test_four_line_clear_at_level_one() {
        let seed = seed_opening_with(PieceKind::I);
        let mut state = GameState::new(seed);
        with_garbage(&mut state, 9, 4);
        state.start();
        while state.move_piece(Direction::Right) {}
        assert_eq!(state.active().unwrap().col, 7);

        // Let gravity land it so no drop bonus is mixed in.
        let event = loop {
            if let Some(event) = state.tick().lock {
                break event;
            }
        };
        assert_eq!(event.lines_cleared, 4);
        assert_eq!(event.line_clear_score, 1200);
        assert_eq!(state.score(), 1200);
        assert_eq!(state.lines(), 4);
        assert_eq!(state.board().occupied(), 0);
    }

    #[test]
    fn test_clear_uses_level_before_the_drop() {
        let seed = seed_opening_with(PieceKind::I);
        let mut state = GameState::new(seed);
        with_garbage(&mut state, 9, 4);
        state.score = 39;
        state.start();
        while state.move_piece(Direction::Right) {}
        let event = state.drop_piece().unwrap();
        assert_eq!(event.level, 1);
        assert_eq!(event.line_clear_score, 1200);
        // 12 rows from spawn row 12 down to 0.
        assert_eq!(event.drop_bonus, 12);
        assert_eq!(state.score(), 39 + 1200 + 12);
        assert_eq!(state.take_level_change(), Some(level_for_score(1251)));
        assert_eq!(state.take_level_change(), None);
    }

    #[test]
    fn test_garbage_row_needs_its_gap_filled() {
        let seed = seed_opening_with(PieceKind::I);
        let mut state = GameState::new(seed);
        let gap = state.history().gap_column() as i16;
        assert!(state.receive_garbage(1));
        state.start();

        let target = gap - 2;
        while state.active().unwrap().col > target && state.move_piece(Direction::Left) {}
        while state.active().unwrap().col < target && state.move_piece(Direction::Right) {}
        assert_eq!(state.active().unwrap().col, target);

        let event = state.drop_piece().unwrap();
        assert_eq!(event.lines_cleared, 1);
        assert_eq!(state.history().garbage_count(), 1);
        assert_eq!(state.board().cells().iter().filter(|c| **c == Some(Block::Fill)).count(), 0);
    }

    #[test]
    fn test_receive_garbage_lifts_active_piece() {
        let mut state = started(1);
        state.tick();
        let before = state.active().unwrap();
        assert!(state.receive_garbage(2));
        assert_eq!(state.active().unwrap().row, before.row + 2);
        assert_eq!(state.history().garbage_count(), 2);
    }

    #[test]
    fn test_top_out_on_spawn() {
        let mut state = GameState::new(5);
        // Gap away from every spawn column.
        with_garbage(&mut state, 0, GRID_HEIGHT);
        assert!(state.start());
        assert!(state.game_over());
        assert_eq!(state.end_reason(), Some(EndReason::ToppedOut));
        assert!(state.active().is_none());
        assert!(!state.stop());
    }

    #[test]
    fn test_stop_freezes_state() {
        let mut state = started(1);
        assert!(state.stop());
        assert_eq!(state.end_reason(), Some(EndReason::Stopped));
        let before = state.snapshot(Duration::ZERO);
        assert_eq!(state.tick(), TickOutcome::default());
        assert!(!state.move_piece(Direction::Left));
        assert!(!state.receive_garbage(1));
        assert_eq!(state.snapshot(Duration::ZERO), before);
    }

    #[test]
    fn test_preload_only_before_start() {
        let mut state = started(1);
        assert!(!state.preload([Piece::Garbage]));
        assert_eq!(state.history().garbage_count(), 0);
    }

    #[test]
    fn test_dealt_piece_is_frozen_until_start() {
        let seed = seed_opening_with(PieceKind::T);
        let mut state = GameState::new(seed);
        assert!(state.deal());
        assert!(!state.deal());
        assert!(!state.preload([Piece::Garbage]));

        let dealt = state.active().unwrap();
        assert_eq!(dealt, Tetromino::at_spawn(PieceKind::T, state.size()));
        let waiting = state.snapshot(Duration::ZERO);
        assert_eq!(waiting.status, MatchStatus::NotStarted);
        assert_eq!(waiting.active.unwrap().kind, PieceKind::T);
        assert_eq!(
            waiting.board_codes().iter().flatten().filter(|&&c| c != 0).count(),
            4
        );
        assert!(!waiting.playable());

        assert!(!state.apply_control(Control::Left));
        assert!(!state.apply_control(Control::Hold));
        assert_eq!(state.tick(), TickOutcome::default());
        assert_eq!(state.active(), Some(dealt));

        // Starting keeps the dealt piece instead of drawing another.
        let next = state.next_piece();
        assert!(state.start());
        assert_eq!(state.active(), Some(dealt));
        assert_eq!(state.next_piece(), next);
        assert!(state.move_piece(Direction::Left));

        let mut plain = GameState::new(seed);
        plain.start();
        assert_eq!(plain.active(), Some(dealt));
    }

    #[test]
    fn test_snapshot_contents() {
        let mut state = started(1);
        state.tick();
        let snap = state.snapshot(Duration::from_millis(1500));
        assert_eq!(snap.grid.len(), GRID_HEIGHT as usize);
        assert_eq!(snap.grid[0].len(), GRID_WIDTH as usize);
        assert_eq!(snap.duration, Duration::from_millis(1500));
        assert_eq!(snap.next, Some(state.next_piece()));
        assert_eq!(
            snap.board_codes().iter().flatten().filter(|&&c| c != 0).count(),
            4
        );
        assert!(snap.playable());
    }

    #[test]
    fn test_apply_control() {
        let mut state = started(seed_opening_with(PieceKind::O));
        assert!(state.apply_control(Control::Left));
        assert!(state.apply_control(Control::Right));
        assert!(state.apply_control(Control::Down));
        assert!(!state.apply_control(Control::Down));
        assert!(state.apply_control(Control::Stop));
        assert!(state.game_over());
    }
}
