//! Tests for scrambling and the board properties it must preserve.

use proptest::prelude::*;
use slidebench_puzzle::{Board, BoardError, Direction, Scrambler, scramble};

#[test]
fn test_scramble_depth_zero_is_solved() {
    let board = Scrambler::seeded(1).scramble(4, 0);
    assert!(board.is_solved());
}

#[test]
fn test_scramble_depth_one_is_one_move_from_solved() {
    for seed in 0..20 {
        let board = Scrambler::seeded(seed).scramble(3, 1);
        assert!(!board.is_solved());
        let solving: Vec<Direction> = board
            .legal_moves()
            .expect("Legal moves")
            .into_iter()
            .filter(|d| board.apply_move(*d).expect("Legal move").is_solved())
            .collect();
        assert_eq!(solving.len(), 1, "seed {seed} should have one solving move");
    }
}

#[test]
fn test_scramble_depth_two_never_returns_to_goal() {
    // The walk never undoes its previous move, so two moves cannot cancel out.
    for seed in 0..50 {
        let board = Scrambler::seeded(seed).scramble(2, 2);
        assert!(!board.is_solved(), "seed {seed} walked back to the goal");
    }
}

#[test]
fn test_seeded_scrambles_are_reproducible() {
    let a = Scrambler::seeded(42).scramble(5, 80);
    let b = Scrambler::seeded(42).scramble(5, 80);
    assert_eq!(a, b);
}

#[test]
fn test_scramble_on_single_cell_board() {
    let board = scramble(1, 10);
    assert!(board.is_solved());
    assert!(board.legal_moves().expect("Legal moves").is_empty());
}

proptest! {
    #[test]
    fn scrambled_boards_are_valid(size in 2usize..=6, depth in 0usize..200, seed in any::<u64>()) {
        let board = Scrambler::seeded(seed).scramble(size, depth);
        prop_assert!(board.is_valid());
        prop_assert_eq!(board.size(), size);
    }

    #[test]
    fn moves_are_undone_by_their_opposite(size in 2usize..=6, depth in 0usize..60, seed in any::<u64>()) {
        let board = Scrambler::seeded(seed).scramble(size, depth);
        for direction in board.legal_moves().expect("Legal moves") {
            let moved = board.apply_move(direction).expect("Legal move");
            prop_assert!(moved.is_valid());
            prop_assert_eq!(moved.apply_move(direction.opposite()).expect("Undo"), board.clone());
        }
    }

    #[test]
    fn illegal_moves_fail_without_change(size in 2usize..=6, depth in 0usize..60, seed in any::<u64>()) {
        let board = Scrambler::seeded(seed).scramble(size, depth);
        let snapshot = board.clone();
        let legal = board.legal_moves().expect("Legal moves");
        for direction in Direction::ALL.into_iter().filter(|d| !legal.contains(d)) {
            let is_illegal = matches!(board.apply_move(direction), Err(BoardError::IllegalMove { .. }));
            prop_assert!(is_illegal);
        }
        prop_assert_eq!(board, snapshot);
    }
}

#[test]
fn test_solved_board_round_trips_through_every_legal_move() {
    let solved = Board::solved(2);
    for direction in solved.legal_moves().expect("Legal moves") {
        let moved = solved.apply_move(direction).expect("Legal move");
        assert_eq!(moved.apply_move(direction.opposite()).expect("Undo"), solved);
    }
}
