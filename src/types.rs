//! Core types for the chessply engine.
//!
//! This module defines the fundamental data structures used throughout the
//! engine: colors, squares, pieces, the board mapping, and the feedback and
//! status identifiers exposed at the rendering boundary.
//!
//! The board is always stored from the side to move's perspective: that
//! player's back rank is row 7 and their pawns advance toward row 0. After
//! every committed move the representation is mirrored (see
//! `Board::rotate`), so coordinates are frame-relative, never absolute.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Represents the color (side) of a chess piece or player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Returns the opposite color.
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

// ---------------------------------------------------------------------------
// Piece kinds
// ---------------------------------------------------------------------------

/// Represents a chess piece type (without color information).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    /// Returns `true` for the minor pieces (bishop and knight), which are
    /// what the insufficient-material draw conditions look for.
    pub fn is_minor(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Knight)
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::King => "King",
            PieceKind::Queen => "Queen",
            PieceKind::Rook => "Rook",
            PieceKind::Bishop => "Bishop",
            PieceKind::Knight => "Knight",
            PieceKind::Pawn => "Pawn",
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A board square, both coordinates in `[0, 7]`.
///
/// `x` is the column (0 = leftmost from the current perspective), `y` is the
/// row (0 = farthest from the side to move, 7 = that side's back rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: u8,
    pub y: u8,
}

impl Square {
    /// Creates a new square from 0-based coordinates.
    pub fn new(x: u8, y: u8) -> Self {
        debug_assert!(x < 8 && y < 8, "square out of bounds: ({}, {})", x, y);
        Self { x, y }
    }

    /// Returns a new square offset by `(dx, dy)`, or `None` if out of bounds.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Square> {
        let x = self.x as i8 + dx;
        let y = self.y as i8 + dy;
        if (0..8).contains(&x) && (0..8).contains(&y) {
            Some(Square::new(x as u8, y as u8))
        } else {
            None
        }
    }

    /// Returns the square's position after a 180-degree board rotation.
    pub fn mirrored(self) -> Square {
        Square::new(7 - self.x, 7 - self.y)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

/// The rook relocation paired with one castling destination of the king.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingMove {
    /// The king's two-square destination.
    pub dest: Square,
    /// Where the paired rook currently stands.
    pub rook_from: Square,
    /// Where the rook lands after the castle.
    pub rook_to: Square,
}

/// A chess piece.
///
/// Besides kind, color and square, a piece carries a `moved` flag
/// (meaningful for pawns, rooks and kings) and the transient results of its
/// most recent candidate-move query: `special_moves` holds castling
/// destinations for a king or the en-passant destination for a pawn, and
/// `castling` maps each castling destination to the paired rook relocation.
/// Transient data is cleared whenever the piece relocates.
///
/// Equality compares kind, color and square only; two pieces with the same
/// identity are interchangeable regardless of their history flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    pub square: Square,
    pub moved: bool,
    pub special_moves: Vec<Square>,
    pub castling: Vec<CastlingMove>,
}

impl Piece {
    /// Creates an unmoved piece on the given square.
    pub fn new(kind: PieceKind, color: Color, square: Square) -> Self {
        Self {
            kind,
            color,
            square,
            moved: false,
            special_moves: Vec::new(),
            castling: Vec::new(),
        }
    }

    /// Moves the piece to a new square, clearing transient special-move data
    /// and marking it as moved.
    pub fn relocate(&mut self, to: Square) {
        self.square = to;
        self.moved = true;
        self.special_moves.clear();
        self.castling.clear();
    }
}

impl PartialEq for Piece {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.color == other.color && self.square == other.square
    }
}

impl Eq for Piece {}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The back-rank layout, left to right, for both sides.
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// The board: a mapping of occupied squares to pieces.
///
/// An absent key means the square is empty. The key always equals the
/// piece's own `square`, and no two pieces share a square.
///
/// Equality compares piece identity (kind, color, square) per square, which
/// is what history deduplication and the repetition heuristic rely on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Board {
    pieces: HashMap<Square, Piece>,
}

impl Board {
    /// Returns an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard starting position from the perspective of the
    /// side to move: White occupies rows 6 and 7.
    pub fn starting_position() -> Self {
        let mut board = Board::new();
        for (x, &kind) in BACK_RANK.iter().enumerate() {
            let x = x as u8;
            board.insert(Piece::new(kind, Color::Black, Square::new(x, 0)));
            board.insert(Piece::new(PieceKind::Pawn, Color::Black, Square::new(x, 1)));
            board.insert(Piece::new(PieceKind::Pawn, Color::White, Square::new(x, 6)));
            board.insert(Piece::new(kind, Color::White, Square::new(x, 7)));
        }
        board
    }

    /// Returns the piece on the given square, if any.
    pub fn get(&self, sq: Square) -> Option<&Piece> {
        self.pieces.get(&sq)
    }

    /// Returns a mutable reference to the piece on the given square.
    pub fn get_mut(&mut self, sq: Square) -> Option<&mut Piece> {
        self.pieces.get_mut(&sq)
    }

    /// Places a piece on its own square, replacing any occupant.
    pub fn insert(&mut self, piece: Piece) {
        self.pieces.insert(piece.square, piece);
    }

    /// Removes and returns the piece on the given square.
    pub fn remove(&mut self, sq: Square) -> Option<Piece> {
        self.pieces.remove(&sq)
    }

    /// Returns `true` if the square is occupied.
    pub fn occupied(&self, sq: Square) -> bool {
        self.pieces.contains_key(&sq)
    }

    /// Number of pieces on the board.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Returns `true` if the board holds no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Iterates over all pieces in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Mirrors the board 180 degrees, moving every piece from `(x, y)` to
    /// `(7-x, 7-y)`. Called once per committed move so the representation
    /// always faces the side to move.
    pub fn rotate(&mut self) {
        let drained: Vec<Piece> = self.pieces.drain().map(|(_, p)| p).collect();
        for mut piece in drained {
            piece.square = piece.square.mirrored();
            self.pieces.insert(piece.square, piece);
        }
    }

    /// Returns the pieces as a list in a stable order, for serialization.
    pub fn to_pieces(&self) -> Vec<Piece> {
        let mut pieces: Vec<Piece> = self.pieces.values().cloned().collect();
        pieces.sort_by_key(|p| (p.square.y, p.square.x));
        pieces
    }

    /// Rebuilds a board from a piece list, validating that no two pieces
    /// claim the same square.
    pub fn from_pieces(pieces: Vec<Piece>) -> Result<Self, String> {
        let mut board = Board::new();
        for piece in pieces {
            let sq = piece.square;
            if board.pieces.insert(sq, piece).is_some() {
                return Err(format!("two pieces on square {}", sq));
            }
        }
        Ok(board)
    }
}

// ---------------------------------------------------------------------------
// Feedback events and status
// ---------------------------------------------------------------------------

/// Identifies the feedback event produced by a mutating input. The view
/// layer decides how to present it; a `None` result from the session means
/// no event occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Move,
    Capture,
    Check,
    Checkmate,
    Castle,
    Promotion,
    GameEnd,
}

impl Feedback {
    /// The stable string identifier of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            Feedback::Move => "move",
            Feedback::Capture => "capture",
            Feedback::Check => "check",
            Feedback::Checkmate => "checkmate",
            Feedback::Castle => "castle",
            Feedback::Promotion => "promotion",
            Feedback::GameEnd => "game_end",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The game status backing the display message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    WhiteTurn,
    BlackTurn,
    Check,
    Checkmate,
    Stalemate,
    Surrendered,
}

impl Status {
    /// The turn message for the given side to move.
    pub fn turn(color: Color) -> Status {
        match color {
            Color::White => Status::WhiteTurn,
            Color::Black => Status::BlackTurn,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::WhiteTurn => "White's turn",
            Status::BlackTurn => "Black's turn",
            Status::Check => "Check!",
            Status::Checkmate => "Checkmate!",
            Status::Stalemate => "Stalemate!",
            Status::Surrendered => "Surrendered!",
        };
        write!(f, "{}", text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
