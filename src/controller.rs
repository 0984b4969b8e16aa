//! Turn control and move validation.
//!
//! The [`Controller`] owns whose turn it is, the single "current player in
//! check" flag, the cached king squares and the data needed for en passant.
//! It filters pseudo-legal candidates from [`crate::pieces`] down to legal
//! moves by simulating each one on a cloned board, and applies the chosen
//! move to the real board.
//!
//! King squares are cached in each king's OWN frame, the frame the board is
//! in when that king's side is to move. Because the board mirrors once per
//! ply, a full round of two plies restores a king's frame, so the cache
//! needs no remapping on rotation. Only the current player's cached square
//! is ever consulted against the current board.

use crate::pieces;
use crate::types::{Board, Color, Feedback, Piece, PieceKind, Square};
use serde::{Deserialize, Serialize};

/// The persisted view of a [`Controller`], one per history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub current: Color,
    pub check: bool,
    pub white_king: Square,
    pub black_king: Square,
    /// Destination of the previous ply, in the current frame.
    pub last_moved: Option<Square>,
    /// Whether the previous ply was a pawn double step.
    pub last_double_step: bool,
}

/// Validates and applies moves for the side to move.
#[derive(Debug, Clone)]
pub struct Controller {
    current: Color,
    check: bool,
    white_king: Square,
    black_king: Square,
    last_moved: Option<Square>,
    last_double_step: bool,
    selected: Option<Square>,
}

impl Controller {
    /// A controller for a fresh game: White to move, kings on their
    /// starting squares, no previous move.
    pub fn new() -> Self {
        Self {
            current: Color::White,
            check: false,
            // Each cached in its owner's frame, hence differing columns.
            white_king: Square::new(4, 7),
            black_king: Square::new(3, 7),
            last_moved: None,
            last_double_step: false,
            selected: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Controller::new();
    }

    #[cfg(test)]
    pub(crate) fn with_kings(current: Color, white_king: Square, black_king: Square) -> Self {
        Self {
            current,
            white_king,
            black_king,
            ..Controller::new()
        }
    }

    pub fn current(&self) -> Color {
        self.current
    }

    pub fn check(&self) -> bool {
        self.check
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    /// Captures the persistable state. The selection is transient and not
    /// part of it.
    pub fn snapshot(&self) -> ControllerState {
        ControllerState {
            current: self.current,
            check: self.check,
            white_king: self.white_king,
            black_king: self.black_king,
            last_moved: self.last_moved,
            last_double_step: self.last_double_step,
        }
    }

    /// Restores a snapshot, dropping any pending selection.
    pub fn restore(&mut self, state: &ControllerState) {
        self.current = state.current;
        self.check = state.check;
        self.white_king = state.white_king;
        self.black_king = state.black_king;
        self.last_moved = state.last_moved;
        self.last_double_step = state.last_double_step;
        self.selected = None;
    }

    /// Hands the turn to the other player and remaps the last-move marker
    /// into the new frame. The king cache stays untouched on purpose.
    pub fn rotate(&mut self) {
        self.current = self.current.opponent();
        self.last_moved = self.last_moved.map(Square::mirrored);
        self.selected = None;
    }

    fn king_square(&self) -> Square {
        match self.current {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    fn set_king_square(&mut self, sq: Square) {
        match self.current {
            Color::White => self.white_king = sq,
            Color::Black => self.black_king = sq,
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Attempts to select the piece on `sq` for the side to move and
    /// returns its legal destinations. Returns an empty list (and clears
    /// any previous selection) for empty squares, enemy pieces and pieces
    /// with no legal move. The selected piece's transient special-move data
    /// is written back to the board for `commit` to read.
    pub fn select(&mut self, board: &mut Board, sq: Square) -> Vec<Square> {
        self.selected = None;
        let Some(piece) = board.get(sq).cloned() else {
            return Vec::new();
        };
        if piece.color != self.current {
            return Vec::new();
        }

        let mut set = pieces::candidate_moves(&piece, board, self.check);
        if piece.kind == PieceKind::Pawn
            && self.last_double_step
            && let Some(last) = self.last_moved
            && board.get(last).is_some_and(|p| p.kind == PieceKind::Pawn)
            && let Some(ep) = pieces::en_passant_destination(&piece, last)
        {
            set.moves.push(ep);
            set.special_moves.push(ep);
        }

        let mut legal: Vec<Square> = set
            .moves
            .iter()
            .copied()
            .filter(|&dest| self.is_safe_after(board, &piece, dest))
            .collect();

        // A castling king must not pass through an attacked square, so its
        // transit squares are re-checked one step at a time.
        if piece.kind == PieceKind::King && !set.special_moves.is_empty() {
            legal.retain(|&dest| {
                if !set.special_moves.contains(&dest) {
                    return true;
                }
                self.castle_path_safe(board, &piece, dest)
            });
        }

        if legal.is_empty() {
            return legal;
        }
        self.selected = Some(sq);
        if let Some(live) = board.get_mut(sq) {
            live.special_moves = set.special_moves;
            live.castling = set.castling;
        }
        legal
    }

    fn castle_path_safe(&self, board: &Board, king: &Piece, dest: Square) -> bool {
        let dx = dest.x as i8 - king.square.x as i8;
        let step = dx.signum();
        for i in 1..dx.abs() {
            let transit = Square::new((king.square.x as i8 + step * i) as u8, king.square.y);
            if !self.is_safe_after(board, king, transit) {
                return false;
            }
        }
        true
    }

    /// Simulates moving `piece` to `dest` on a cloned board and reports
    /// whether the current player's king would be safe afterwards.
    fn is_safe_after(&self, board: &Board, piece: &Piece, dest: Square) -> bool {
        let mut virtual_board = board.clone();
        let mut moved = match virtual_board.remove(piece.square) {
            Some(p) => p,
            None => return false,
        };
        moved.square = dest;
        virtual_board.insert(moved);
        let king_sq = if piece.kind == PieceKind::King {
            dest
        } else {
            self.king_square()
        };
        !Self::square_attacked(&virtual_board, king_sq, self.current.opponent())
    }

    fn square_attacked(board: &Board, sq: Square, by: Color) -> bool {
        board
            .iter()
            .filter(|p| p.color == by)
            .any(|p| pieces::attack_squares(p, board).contains(&sq))
    }

    // -----------------------------------------------------------------------
    // Check predicates
    // -----------------------------------------------------------------------

    /// Whether the current player's king is attacked on the given board.
    pub fn king_in_check(&self, board: &Board) -> bool {
        Self::square_attacked(board, self.king_square(), self.current.opponent())
    }

    /// Whether the current player has at least one legal move. Scans piece
    /// by piece and stops at the first survivor of the safety filter.
    pub fn any_legal_moves(&self, board: &Board) -> bool {
        for piece in board.iter().filter(|p| p.color == self.current) {
            let set = pieces::candidate_moves(piece, board, self.check);
            if set
                .moves
                .iter()
                .any(|&dest| self.is_safe_after(board, piece, dest))
            {
                return true;
            }
        }
        false
    }

    /// Sets or clears the check flag for the current player, asserting that
    /// the cached king square actually holds that king.
    pub fn mark_check(&mut self, board: &Board, check: bool) {
        let king_sq = self.king_square();
        assert!(
            board
                .get(king_sq)
                .is_some_and(|p| p.kind == PieceKind::King && p.color == self.current),
            "king cache corrupt: no {} king at {}",
            self.current,
            king_sq,
        );
        self.check = check;
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Applies the previously selected piece's move to `dest`, which must
    /// come from the list `select` returned. Handles promotion (falling
    /// back to queen when `promotion` is absent or invalid), en-passant
    /// removal and castling rook relocation, and records the move for the
    /// next en-passant query. Clears the selection.
    pub fn commit(
        &mut self,
        board: &mut Board,
        dest: Square,
        promotion: Option<PieceKind>,
    ) -> Feedback {
        let src = self.selected.take().expect("commit without a selection");
        let mut piece = board.remove(src).expect("selected square is empty");
        debug_assert_eq!(piece.color, self.current);

        let was_pawn = piece.kind == PieceKind::Pawn;
        let capture = board.occupied(dest);
        let mut feedback = None;

        match piece.kind {
            PieceKind::Pawn => {
                if dest.y == 0 {
                    piece.kind = match promotion {
                        Some(k) if k != PieceKind::King && k != PieceKind::Pawn => k,
                        _ => PieceKind::Queen,
                    };
                    feedback = Some(Feedback::Promotion);
                } else if piece.special_moves.contains(&dest) {
                    // En passant: the captured pawn sits one row behind.
                    let behind = Square::new(dest.x, dest.y + 1);
                    let captured = board.remove(behind);
                    assert!(captured.is_some(), "no pawn behind en-passant square");
                    feedback = Some(Feedback::Capture);
                }
            }
            PieceKind::King => {
                self.set_king_square(dest);
                if piece.special_moves.contains(&dest) {
                    let castle = piece
                        .castling
                        .iter()
                        .find(|c| c.dest == dest)
                        .copied()
                        .expect("castling destination without rook mapping");
                    let mut rook = board
                        .remove(castle.rook_from)
                        .expect("no rook on castling corner");
                    assert_eq!(rook.kind, PieceKind::Rook);
                    rook.relocate(castle.rook_to);
                    board.insert(rook);
                    feedback = Some(Feedback::Castle);
                }
            }
            _ => {}
        }

        piece.relocate(dest);
        board.insert(piece);

        self.last_moved = Some(dest);
        self.last_double_step = was_pawn && src.x == dest.x && src.y.abs_diff(dest.y) == 2;
        if self.check {
            // The move passed the safety filter, so the mover's king is free.
            self.mark_check(board, false);
        }

        feedback.unwrap_or(if capture { Feedback::Capture } else { Feedback::Move })
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(pieces: Vec<Piece>) -> Board {
        Board::from_pieces(pieces).unwrap()
    }

    #[test]
    fn select_rejects_empty_and_enemy_squares() {
        let mut board = Board::starting_position();
        let mut ctl = Controller::new();
        assert!(ctl.select(&mut board, Square::new(4, 4)).is_empty());
        assert!(ctl.select(&mut board, Square::new(4, 1)).is_empty());
        assert_eq!(ctl.selected(), None);
    }

    #[test]
    fn starting_side_has_twenty_moves() {
        let mut board = Board::starting_position();
        let mut ctl = Controller::new();
        let mut total = 0;
        for x in 0..8 {
            total += ctl.select(&mut board, Square::new(x, 6)).len();
            total += ctl.select(&mut board, Square::new(x, 7)).len();
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn pinned_rook_cannot_leave_the_file() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(4, 5));
        let enemy = Piece::new(PieceKind::Rook, Color::Black, Square::new(4, 0));
        let mut board = board_with(vec![king, rook, enemy]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(3, 7));
        let legal = ctl.select(&mut board, Square::new(4, 5));
        assert!(!legal.is_empty());
        assert!(legal.iter().all(|sq| sq.x == 4));
        assert!(legal.contains(&Square::new(4, 0)));
    }

    #[test]
    fn king_may_not_step_into_cover() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let enemy = Piece::new(PieceKind::Rook, Color::Black, Square::new(3, 0));
        let mut board = board_with(vec![king, enemy]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
        let legal = ctl.select(&mut board, Square::new(4, 7));
        assert!(legal.iter().all(|sq| sq.x != 3));
    }

    #[test]
    fn castle_through_attacked_transit_is_dropped() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let attacker = Piece::new(PieceKind::Rook, Color::Black, Square::new(5, 0));
        let mut board = board_with(vec![king, rook, attacker]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
        let legal = ctl.select(&mut board, Square::new(4, 7));
        assert!(!legal.contains(&Square::new(6, 7)));
        // Without the attacker the castle is available.
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let mut open = board_with(vec![king, rook]);
        let legal = ctl.select(&mut open, Square::new(4, 7));
        assert!(legal.contains(&Square::new(6, 7)));
    }

    #[test]
    fn commit_castle_moves_the_rook_too() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let mut board = board_with(vec![king, rook]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
        let legal = ctl.select(&mut board, Square::new(4, 7));
        assert!(legal.contains(&Square::new(6, 7)));
        let feedback = ctl.commit(&mut board, Square::new(6, 7), None);
        assert_eq!(feedback, Feedback::Castle);
        assert_eq!(
            board.get(Square::new(6, 7)).map(|p| p.kind),
            Some(PieceKind::King)
        );
        assert_eq!(
            board.get(Square::new(5, 7)).map(|p| p.kind),
            Some(PieceKind::Rook)
        );
        assert!(board.get(Square::new(7, 7)).is_none());
        assert_eq!(ctl.snapshot().white_king, Square::new(6, 7));
    }

    #[test]
    fn commit_promotion_defaults_to_queen_and_honors_choice() {
        for (choice, expected) in [
            (None, PieceKind::Queen),
            (Some(PieceKind::Knight), PieceKind::Knight),
            (Some(PieceKind::King), PieceKind::Queen),
        ] {
            let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(2, 1));
            let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
            let enemy_king = Piece::new(PieceKind::King, Color::Black, Square::new(0, 3));
            let mut board = board_with(vec![pawn, king, enemy_king]);
            let mut ctl =
                Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
            let legal = ctl.select(&mut board, Square::new(2, 1));
            assert!(legal.contains(&Square::new(2, 0)));
            let feedback = ctl.commit(&mut board, Square::new(2, 0), choice);
            assert_eq!(feedback, Feedback::Promotion);
            let promoted = board.get(Square::new(2, 0)).unwrap();
            assert_eq!(promoted.kind, expected);
            assert!(promoted.moved);
        }
    }

    #[test]
    fn commit_en_passant_removes_the_bypassed_pawn() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(3, 3));
        let mut victim = Piece::new(PieceKind::Pawn, Color::Black, Square::new(4, 3));
        victim.moved = true;
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let mut board = board_with(vec![pawn, victim, king]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
        ctl.last_moved = Some(Square::new(4, 3));
        ctl.last_double_step = true;
        let legal = ctl.select(&mut board, Square::new(3, 3));
        assert!(legal.contains(&Square::new(4, 2)));
        let feedback = ctl.commit(&mut board, Square::new(4, 2), None);
        assert_eq!(feedback, Feedback::Capture);
        assert!(board.get(Square::new(4, 3)).is_none());
        assert_eq!(
            board.get(Square::new(4, 2)).map(|p| p.kind),
            Some(PieceKind::Pawn)
        );
    }

    #[test]
    fn en_passant_needs_the_double_step_flag() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(3, 3));
        let mut neighbor = Piece::new(PieceKind::Pawn, Color::Black, Square::new(4, 3));
        neighbor.moved = true;
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let mut board = board_with(vec![pawn, neighbor, king]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(4, 7), Square::new(0, 0));
        ctl.last_moved = Some(Square::new(4, 3));
        ctl.last_double_step = false;
        let legal = ctl.select(&mut board, Square::new(3, 3));
        assert!(!legal.contains(&Square::new(4, 2)));
    }

    #[test]
    fn commit_double_step_is_recorded() {
        let mut board = Board::starting_position();
        let mut ctl = Controller::new();
        ctl.select(&mut board, Square::new(4, 6));
        ctl.commit(&mut board, Square::new(4, 4), None);
        let state = ctl.snapshot();
        assert_eq!(state.last_moved, Some(Square::new(4, 4)));
        assert!(state.last_double_step);
        // A single step does not set the flag.
        let mut ctl2 = Controller::new();
        let mut board2 = Board::starting_position();
        ctl2.select(&mut board2, Square::new(4, 6));
        ctl2.commit(&mut board2, Square::new(4, 5), None);
        assert!(!ctl2.snapshot().last_double_step);
    }

    #[test]
    fn rotate_remaps_last_moved_and_flips_turn() {
        let mut ctl = Controller::new();
        ctl.last_moved = Some(Square::new(4, 4));
        ctl.rotate();
        assert_eq!(ctl.current(), Color::Black);
        assert_eq!(ctl.snapshot().last_moved, Some(Square::new(3, 3)));
    }

    #[test]
    fn back_rank_mate_has_no_legal_moves() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(7, 7));
        let p1 = Piece::new(PieceKind::Pawn, Color::White, Square::new(6, 6));
        let p2 = Piece::new(PieceKind::Pawn, Color::White, Square::new(7, 6));
        let enemy = Piece::new(PieceKind::Rook, Color::Black, Square::new(0, 7));
        let board = board_with(vec![king, p1, p2, enemy]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(7, 7), Square::new(0, 0));
        assert!(ctl.king_in_check(&board));
        ctl.mark_check(&board, true);
        assert!(!ctl.any_legal_moves(&board));
    }

    #[test]
    #[should_panic(expected = "king cache corrupt")]
    fn mark_check_panics_on_stale_cache() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let board = board_with(vec![king]);
        let mut ctl = Controller::with_kings(Color::White, Square::new(3, 3), Square::new(0, 0));
        ctl.mark_check(&board, true);
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut ctl = Controller::new();
        ctl.check = true;
        ctl.last_moved = Some(Square::new(1, 2));
        ctl.last_double_step = true;
        ctl.selected = Some(Square::new(0, 6));
        let state = ctl.snapshot();
        let mut other = Controller::new();
        other.restore(&state);
        assert_eq!(other.snapshot(), state);
        assert_eq!(other.selected(), None);
    }
}
