//! Per-piece candidate move generation.
//!
//! Candidates are pseudo-legal: they honor piece movement rules, blocking
//! and capture targets, but not king safety. The controller filters them
//! through a virtual-board simulation afterwards.
//!
//! Generation runs in the frame of the querying side, so normal candidates
//! are only meaningful for the side to move (pawns advance toward row 0).
//! Attack squares are the dual: they answer "which squares does this piece
//! cover" for the side that is NOT to move (its pawns strike toward row 7),
//! and they include friendly-occupied squares, since a covered friendly
//! square still denies the enemy king passage.

use crate::types::{Board, CastlingMove, Color, Piece, PieceKind, Square};

// ---------------------------------------------------------------------------
// Direction tables
// ---------------------------------------------------------------------------

const ROOK_DIRS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROYAL_DIRS: [(i8, i8); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

// ---------------------------------------------------------------------------
// Candidate sets
// ---------------------------------------------------------------------------

/// The result of a candidate query for one piece.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Every candidate destination, special ones included.
    pub moves: Vec<Square>,
    /// The destinations that need extra handling on commit: castling
    /// destinations for a king, the en-passant destination for a pawn.
    pub special_moves: Vec<Square>,
    /// Rook relocations keyed by castling destination.
    pub castling: Vec<CastlingMove>,
}

/// Computes the pseudo-legal candidates for a piece of the side to move.
///
/// `king_checked` suppresses castling candidates while the king is in
/// check; it is ignored for every other kind. En-passant is not generated
/// here because it depends on the previous move (see
/// [`en_passant_destination`]).
pub fn candidate_moves(piece: &Piece, board: &Board, king_checked: bool) -> CandidateSet {
    let mut set = CandidateSet::default();
    match piece.kind {
        PieceKind::Pawn => pawn_moves(piece, board, &mut set),
        PieceKind::Knight => step_moves(piece, board, &KNIGHT_OFFSETS, &mut set),
        PieceKind::Bishop => ray_moves(piece, board, &BISHOP_DIRS, &mut set),
        PieceKind::Rook => ray_moves(piece, board, &ROOK_DIRS, &mut set),
        PieceKind::Queen => ray_moves(piece, board, &ROYAL_DIRS, &mut set),
        PieceKind::King => {
            step_moves(piece, board, &ROYAL_DIRS, &mut set);
            if !piece.moved && !king_checked {
                castling_candidates(piece, board, &mut set);
            }
        }
    }
    set
}

/// Computes the squares a piece of the waiting side covers.
///
/// Friendly-occupied squares are included. Sliding pieces stop at the first
/// occupied square on each ray but include it. A pawn covers its two
/// forward diagonals (toward row 7 in this frame) unconditionally and never
/// its forward square.
pub fn attack_squares(piece: &Piece, board: &Board) -> Vec<Square> {
    let mut squares = Vec::new();
    match piece.kind {
        PieceKind::Pawn => {
            for dx in [-1, 1] {
                if let Some(sq) = piece.square.offset(dx, 1) {
                    squares.push(sq);
                }
            }
        }
        PieceKind::Knight => {
            for &(dx, dy) in &KNIGHT_OFFSETS {
                if let Some(sq) = piece.square.offset(dx, dy) {
                    squares.push(sq);
                }
            }
        }
        PieceKind::King => {
            for &(dx, dy) in &ROYAL_DIRS {
                if let Some(sq) = piece.square.offset(dx, dy) {
                    squares.push(sq);
                }
            }
        }
        PieceKind::Bishop => attack_rays(piece, board, &BISHOP_DIRS, &mut squares),
        PieceKind::Rook => attack_rays(piece, board, &ROOK_DIRS, &mut squares),
        PieceKind::Queen => attack_rays(piece, board, &ROYAL_DIRS, &mut squares),
    }
    squares
}

/// Returns the en-passant destination for a pawn given the square the
/// opposing pawn just double-stepped to, or `None` if the geometry does not
/// match. The caller is responsible for verifying that the previous move
/// really was a double step by an enemy pawn.
pub fn en_passant_destination(piece: &Piece, double_step_to: Square) -> Option<Square> {
    if piece.square.y != 3 || double_step_to.y != 3 {
        return None;
    }
    if piece.square.x.abs_diff(double_step_to.x) != 1 {
        return None;
    }
    Some(Square::new(double_step_to.x, 2))
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn ray_moves(piece: &Piece, board: &Board, dirs: &[(i8, i8)], set: &mut CandidateSet) {
    for &(dx, dy) in dirs {
        let mut current = piece.square;
        while let Some(sq) = current.offset(dx, dy) {
            match board.get(sq) {
                None => set.moves.push(sq),
                Some(other) => {
                    if other.color != piece.color {
                        set.moves.push(sq);
                    }
                    break;
                }
            }
            current = sq;
        }
    }
}

fn step_moves(piece: &Piece, board: &Board, offsets: &[(i8, i8)], set: &mut CandidateSet) {
    for &(dx, dy) in offsets {
        if let Some(sq) = piece.square.offset(dx, dy)
            && board.get(sq).is_none_or(|other| other.color != piece.color)
        {
            set.moves.push(sq);
        }
    }
}

fn pawn_moves(piece: &Piece, board: &Board, set: &mut CandidateSet) {
    // Single step, then the initial double step over two empty squares.
    if let Some(forward) = piece.square.offset(0, -1)
        && !board.occupied(forward)
    {
        set.moves.push(forward);
        if !piece.moved
            && let Some(double) = piece.square.offset(0, -2)
            && !board.occupied(double)
        {
            set.moves.push(double);
        }
    }
    // Diagonal captures.
    for dx in [-1, 1] {
        if let Some(sq) = piece.square.offset(dx, -1)
            && let Some(other) = board.get(sq)
            && other.color != piece.color
        {
            set.moves.push(sq);
        }
    }
}

fn attack_rays(piece: &Piece, board: &Board, dirs: &[(i8, i8)], out: &mut Vec<Square>) {
    for &(dx, dy) in dirs {
        let mut current = piece.square;
        while let Some(sq) = current.offset(dx, dy) {
            out.push(sq);
            if board.occupied(sq) {
                break;
            }
            current = sq;
        }
    }
}

/// Adds castling candidates for an unmoved, unchecked king.
///
/// The board faces the king's own side here, so the queenside direction
/// depends on color: White's king sits on column 4 with the queenside rook
/// at column 0, Black's on column 3 with the queenside rook at column 7.
fn castling_candidates(piece: &Piece, board: &Board, set: &mut CandidateSet) {
    let long_dx: i8 = match piece.color {
        Color::White => -1,
        Color::Black => 1,
    };
    // (direction, number of empty squares between king and rook)
    for (dx, gap) in [(long_dx, 3), (-long_dx, 2)] {
        if let Some(candidate) = castle_in_direction(piece, board, dx, gap) {
            set.moves.push(candidate.dest);
            set.special_moves.push(candidate.dest);
            set.castling.push(candidate);
        }
    }
}

fn castle_in_direction(piece: &Piece, board: &Board, dx: i8, gap: i8) -> Option<CastlingMove> {
    for step in 1..=gap {
        let between = piece.square.offset(dx * step, 0)?;
        if board.occupied(between) {
            return None;
        }
    }
    let corner = piece.square.offset(dx * (gap + 1), 0)?;
    let rook = board.get(corner)?;
    if rook.kind != PieceKind::Rook || rook.color != piece.color || rook.moved {
        return None;
    }
    let dest = piece.square.offset(dx * 2, 0)?;
    Some(CastlingMove {
        dest,
        rook_from: corner,
        rook_to: piece.square.offset(dx, 0)?,
    })
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

    fn moves_of(piece: &Piece, board: &Board) -> Vec<Square> {
        candidate_moves(piece, board, false).moves
    }

    #[test]
    fn pawn_single_and_double_step() {
        let board = Board::starting_position();
        let pawn = board.get(Square::new(4, 6)).unwrap();
        let moves = moves_of(pawn, &board);
        assert_eq!(moves.len(), 2);
        assert!(moves.contains(&Square::new(4, 5)));
        assert!(moves.contains(&Square::new(4, 4)));
    }

    #[test]
    fn pawn_double_step_blocked_by_far_square() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(4, 6));
        let blocker = Piece::new(PieceKind::Knight, Color::Black, Square::new(4, 4));
        let board = board_with(vec![pawn.clone(), blocker]);
        let moves = moves_of(&pawn, &board);
        assert_eq!(moves, vec![Square::new(4, 5)]);
    }

    #[test]
    fn pawn_blocked_straight_ahead_cannot_advance() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(4, 6));
        let blocker = Piece::new(PieceKind::Knight, Color::Black, Square::new(4, 5));
        let board = board_with(vec![pawn.clone(), blocker]);
        assert!(moves_of(&pawn, &board).is_empty());
    }

    #[test]
    fn pawn_captures_diagonally_only_enemies() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(4, 4));
        let enemy = Piece::new(PieceKind::Pawn, Color::Black, Square::new(3, 3));
        let friend = Piece::new(PieceKind::Pawn, Color::White, Square::new(5, 3));
        let board = board_with(vec![pawn.clone(), enemy, friend]);
        let moves = moves_of(&pawn, &board);
        assert!(moves.contains(&Square::new(3, 3)));
        assert!(!moves.contains(&Square::new(5, 3)));
        assert!(moves.contains(&Square::new(4, 3)));
    }

    #[test]
    fn pawn_attacks_backward_diagonals_unconditionally() {
        let pawn = Piece::new(PieceKind::Pawn, Color::Black, Square::new(4, 4));
        let board = board_with(vec![pawn.clone()]);
        let attacks = attack_squares(&pawn, &board);
        assert_eq!(attacks.len(), 2);
        assert!(attacks.contains(&Square::new(3, 5)));
        assert!(attacks.contains(&Square::new(5, 5)));
    }

    #[test]
    fn rook_rays_stop_at_blockers() {
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(3, 3));
        let friend = Piece::new(PieceKind::Pawn, Color::White, Square::new(3, 1));
        let enemy = Piece::new(PieceKind::Pawn, Color::Black, Square::new(6, 3));
        let board = board_with(vec![rook.clone(), friend, enemy]);
        let moves = moves_of(&rook, &board);
        assert!(moves.contains(&Square::new(3, 2)));
        assert!(!moves.contains(&Square::new(3, 1)));
        assert!(moves.contains(&Square::new(6, 3)));
        assert!(!moves.contains(&Square::new(7, 3)));
        // down and left are open
        assert!(moves.contains(&Square::new(3, 7)));
        assert!(moves.contains(&Square::new(0, 3)));
    }

    #[test]
    fn attack_rays_include_first_blocker_even_friendly() {
        let rook = Piece::new(PieceKind::Rook, Color::Black, Square::new(3, 3));
        let friend = Piece::new(PieceKind::Pawn, Color::Black, Square::new(3, 1));
        let board = board_with(vec![rook.clone(), friend]);
        let attacks = attack_squares(&rook, &board);
        assert!(attacks.contains(&Square::new(3, 2)));
        assert!(attacks.contains(&Square::new(3, 1)));
        assert!(!attacks.contains(&Square::new(3, 0)));
    }

    #[test]
    fn knight_jumps_ignore_blockers_but_not_friends() {
        let board = Board::starting_position();
        let knight = board.get(Square::new(1, 7)).unwrap();
        let moves = moves_of(knight, &board);
        assert_eq!(moves.len(), 2);
        assert!(moves.contains(&Square::new(0, 5)));
        assert!(moves.contains(&Square::new(2, 5)));
    }

    #[test]
    fn bishop_covers_diagonals() {
        let bishop = Piece::new(PieceKind::Bishop, Color::White, Square::new(0, 7));
        let board = board_with(vec![bishop.clone()]);
        let moves = moves_of(&bishop, &board);
        assert_eq!(moves.len(), 7);
        assert!(moves.contains(&Square::new(7, 0)));
    }

    #[test]
    fn queen_combines_rook_and_bishop_rays() {
        let queen = Piece::new(PieceKind::Queen, Color::White, Square::new(3, 3));
        let board = board_with(vec![queen.clone()]);
        assert_eq!(moves_of(&queen, &board).len(), 27);
    }

    #[test]
    fn king_steps_one_square() {
        let mut king = Piece::new(PieceKind::King, Color::White, Square::new(4, 4));
        king.moved = true;
        let board = board_with(vec![king.clone()]);
        assert_eq!(moves_of(&king, &board).len(), 8);
    }

    #[test]
    fn white_king_gets_both_castles_on_open_back_rank() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook_q = Piece::new(PieceKind::Rook, Color::White, Square::new(0, 7));
        let rook_k = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let board = board_with(vec![king.clone(), rook_q, rook_k]);
        let set = candidate_moves(&king, &board, false);
        assert!(set.special_moves.contains(&Square::new(2, 7)));
        assert!(set.special_moves.contains(&Square::new(6, 7)));
        let short = set
            .castling
            .iter()
            .find(|c| c.dest == Square::new(6, 7))
            .unwrap();
        assert_eq!(short.rook_from, Square::new(7, 7));
        assert_eq!(short.rook_to, Square::new(5, 7));
    }

    #[test]
    fn black_king_castles_in_its_own_frame() {
        let king = Piece::new(PieceKind::King, Color::Black, Square::new(3, 7));
        let rook_q = Piece::new(PieceKind::Rook, Color::Black, Square::new(7, 7));
        let rook_k = Piece::new(PieceKind::Rook, Color::Black, Square::new(0, 7));
        let board = board_with(vec![king.clone(), rook_q, rook_k]);
        let set = candidate_moves(&king, &board, false);
        assert!(set.special_moves.contains(&Square::new(5, 7)));
        assert!(set.special_moves.contains(&Square::new(1, 7)));
        let long = set
            .castling
            .iter()
            .find(|c| c.dest == Square::new(5, 7))
            .unwrap();
        assert_eq!(long.rook_from, Square::new(7, 7));
        assert_eq!(long.rook_to, Square::new(4, 7));
    }

    #[test]
    fn castling_needs_clear_path_and_unmoved_rook() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let bishop = Piece::new(PieceKind::Bishop, Color::White, Square::new(5, 7));
        let rook_k = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let mut rook_q = Piece::new(PieceKind::Rook, Color::White, Square::new(0, 7));
        rook_q.moved = true;
        let board = board_with(vec![king.clone(), bishop, rook_k, rook_q]);
        let set = candidate_moves(&king, &board, false);
        assert!(set.special_moves.is_empty());
    }

    #[test]
    fn castling_suppressed_while_checked_or_after_moving() {
        let king = Piece::new(PieceKind::King, Color::White, Square::new(4, 7));
        let rook = Piece::new(PieceKind::Rook, Color::White, Square::new(7, 7));
        let board = board_with(vec![king.clone(), rook]);
        assert!(candidate_moves(&king, &board, true).special_moves.is_empty());
        let mut moved_king = king;
        moved_king.moved = true;
        assert!(
            candidate_moves(&moved_king, &board, false)
                .special_moves
                .is_empty()
        );
    }

    #[test]
    fn en_passant_requires_row_three_adjacency() {
        let pawn = Piece::new(PieceKind::Pawn, Color::White, Square::new(3, 3));
        assert_eq!(
            en_passant_destination(&pawn, Square::new(4, 3)),
            Some(Square::new(4, 2))
        );
        assert_eq!(en_passant_destination(&pawn, Square::new(5, 3)), None);
        assert_eq!(en_passant_destination(&pawn, Square::new(4, 4)), None);
        let off_row = Piece::new(PieceKind::Pawn, Color::White, Square::new(3, 4));
        assert_eq!(en_passant_destination(&off_row, Square::new(4, 3)), None);
    }
}
