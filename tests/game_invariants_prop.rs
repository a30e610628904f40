//! Property tests for match invariants.
//!
//! Random sequences of controls, gravity ticks and incoming garbage are played
//! against a fresh match; after every step the history must still replay to
//! the settled board, and score, level and line count may only grow.

use proptest::prelude::*;

use chat_tetris::core::{level_for_score, GameState, Piece};
use chat_tetris::types::{Control, MatchStatus};

#[derive(Debug, Clone, Copy)]
enum Step {
    Control(Control),
    Tick,
    Garbage(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => prop_oneof![
            Just(Control::Left),
            Just(Control::Right),
            Just(Control::Down),
            Just(Control::Rotate),
            Just(Control::Hold),
        ]
        .prop_map(Step::Control),
        4 => Just(Step::Tick),
        1 => (1u8..4).prop_map(Step::Garbage),
    ]
}

fn line_clears(state: &GameState) -> u32 {
    state
        .history()
        .pieces()
        .iter()
        .filter(|p| matches!(p, Piece::LineClear { .. }))
        .count() as u32
}

proptest! {
    #[test]
    fn random_play_keeps_history_and_counters_consistent(
        seed in any::<u32>(),
        steps in prop::collection::vec(step(), 1..200),
    ) {
        let mut state = GameState::new(seed);
        state.start();
        let mut held_this_piece = false;

        for step in steps {
            let before = state.clone();

            match step {
                Step::Control(Control::Hold) => {
                    if state.apply_control(Control::Hold) {
                        prop_assert!(!held_this_piece, "hold used twice for one piece");
                        held_this_piece = true;
                    }
                }
                Step::Control(control) => {
                    state.apply_control(control);
                }
                Step::Tick => {
                    state.tick();
                }
                Step::Garbage(count) => {
                    state.receive_garbage(count);
                }
            }

            if state.pieces_locked() != before.pieces_locked() {
                held_this_piece = false;
            }

            prop_assert_eq!(&state.history().replay(), state.board());
            prop_assert!(state.score() >= before.score());
            prop_assert!(state.level() >= before.level());
            prop_assert_eq!(state.level(), level_for_score(state.score()));
            prop_assert!(state.lines() >= before.lines());
            prop_assert_eq!(state.lines(), line_clears(&state));

            if let Some(active) = state.active() {
                prop_assert!(state.history().fits(&active));
            }
            if before.status() == MatchStatus::Ended {
                prop_assert_eq!(state.status(), MatchStatus::Ended);
                break;
            }
        }
    }

    #[test]
    fn same_seed_same_opening(seed in any::<u32>()) {
        let mut a = GameState::new(seed);
        let mut b = GameState::new(seed);
        a.start();
        b.start();
        prop_assert_eq!(a.active(), b.active());
        prop_assert_eq!(a.next_piece(), b.next_piece());
        prop_assert_eq!(a.history().gap_column(), b.history().gap_column());
    }
}
