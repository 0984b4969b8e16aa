//! The playable game session.
//!
//! [`Session`] ties the board, the [`Controller`] and the move history into
//! the single facade a front end talks to. Inputs are square clicks and a
//! handful of commands (navigation, surrender, restart, view rotation);
//! outputs are optional [`Feedback`] events plus the queryable status,
//! winner and highlight state.
//!
//! History is a cursor over deep snapshots: every committed ply appends a
//! copy of the rotated board and controller state. Navigating backwards
//! moves the cursor without discarding entries; committing a move while
//! behind the end truncates the abandoned branch, unless the move
//! reproduces the very next entry, in which case the cursor just advances
//! along the existing line.

use crate::controller::{Controller, ControllerState};
use crate::storage::{FORMAT_VERSION, SavedEntry, SavedSession};
use crate::types::{Board, Color, Feedback, Piece, PieceKind, Square, Status};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default asset theme shipped with the game.
pub const DEFAULT_THEME_DIR: &str = "themes/classic";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("theme directory does not exist: {0}")]
    ThemeNotFound(PathBuf),
    #[error("saved session has an empty history")]
    EmptyHistory,
    #[error("saved session is inconsistent: {0}")]
    InvalidBoard(String),
}

/// History navigation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    First,
    Previous,
    Next,
    Last,
}

/// One history entry: the position after a ply, already rotated to face
/// the next player.
#[derive(Debug, Clone, PartialEq)]
struct HistoryEntry {
    board: Board,
    state: ControllerState,
}

/// A two-player chess session with history and persistence support.
#[derive(Debug, Clone)]
pub struct Session {
    board: Board,
    controller: Controller,
    valid_moves: Vec<Square>,
    status: Status,
    game_over: bool,
    winner: Option<Color>,
    main_player: Color,
    theme_dir: PathBuf,
    history: Vec<HistoryEntry>,
    cursor: usize,
}

impl Session {
    /// Starts a fresh game with White to move.
    pub fn new(theme_dir: impl Into<PathBuf>) -> Self {
        let mut session = Self {
            board: Board::new(),
            controller: Controller::new(),
            valid_moves: Vec::new(),
            status: Status::WhiteTurn,
            game_over: false,
            winner: None,
            main_player: Color::White,
            theme_dir: theme_dir.into(),
            history: Vec::new(),
            cursor: 0,
        };
        session.reset();
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Destinations highlighted for the currently selected piece.
    pub fn valid_moves(&self) -> &[Square] {
        &self.valid_moves
    }

    /// The currently selected piece, if a selection is active.
    pub fn selected(&self) -> Option<&Piece> {
        self.controller.selected().and_then(|sq| self.board.get(sq))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn current_player(&self) -> Color {
        self.controller.current()
    }

    pub fn theme_dir(&self) -> &Path {
        &self.theme_dir
    }

    /// Number of stored positions (initial position included).
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Index of the displayed position within the history.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Switches to a different asset theme. The directory must exist.
    pub fn set_theme_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), SessionError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SessionError::ThemeNotFound(dir));
        }
        self.theme_dir = dir;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Click handling
    // -----------------------------------------------------------------------

    /// Processes a click on board coordinates, promoting to a queen when a
    /// promotion occurs.
    pub fn handle_click(&mut self, x: u8, y: u8) -> Option<Feedback> {
        self.handle_click_with(x, y, None)
    }

    /// Processes a click on board coordinates with an explicit promotion
    /// choice. Out-of-range clicks and clicks after game over are ignored.
    ///
    /// A click on a highlighted destination commits the pending move; any
    /// other click becomes a selection attempt, replacing the previous
    /// highlights (or clearing them, for an empty or enemy square).
    pub fn handle_click_with(
        &mut self,
        x: u8,
        y: u8,
        promotion: Option<PieceKind>,
    ) -> Option<Feedback> {
        if self.game_over || x > 7 || y > 7 {
            return None;
        }
        let sq = Square::new(x, y);

        if self.valid_moves.contains(&sq) {
            self.valid_moves.clear();
            let feedback = self.controller.commit(&mut self.board, sq, promotion);
            self.rotate();
            let feedback = self.classify_position(feedback);
            self.record_position();
            if self.game_over {
                // One extra rotation so the final position faces the loser's
                // opponent consistently; remember that side as the main view.
                self.rotate();
                self.main_player = self.controller.current();
            }
            log::debug!("committed move to {}: {}", sq, feedback);
            return Some(feedback);
        }

        self.valid_moves = self.controller.select(&mut self.board, sq);
        None
    }

    /// Evaluates the position for the player who just received the turn
    /// and derives status, game-over state and the feedback event.
    fn classify_position(&mut self, feedback: Feedback) -> Feedback {
        if self.controller.king_in_check(&self.board) {
            self.controller.mark_check(&self.board, true);
            if self.controller.any_legal_moves(&self.board) {
                self.status = Status::Check;
                Feedback::Check
            } else {
                self.game_over = true;
                self.status = Status::Checkmate;
                self.winner = Some(self.controller.current().opponent());
                Feedback::Checkmate
            }
        } else if self.is_draw() {
            self.game_over = true;
            self.status = Status::Stalemate;
            self.winner = None;
            Feedback::GameEnd
        } else {
            self.status = Status::turn(self.controller.current());
            feedback
        }
    }

    /// Simplified draw detection: a short repetition heuristic (both sides
    /// repeated their previous position), insufficient mating material, or
    /// no legal move while not in check.
    fn is_draw(&self) -> bool {
        let n = self.history.len();
        if n >= 6
            && self.history[n - 1].board == self.history[n - 5].board
            && self.history[n - 2].board == self.history[n - 6].board
        {
            return true;
        }

        match self.board.len() {
            2 => return true,
            3 => {
                if self.board.iter().any(|p| p.kind.is_minor()) {
                    return true;
                }
            }
            4 => {
                let minors: Vec<&Piece> =
                    self.board.iter().filter(|p| p.kind.is_minor()).collect();
                if minors.len() == 2 && minors[0].color != minors[1].color {
                    return true;
                }
            }
            _ => {}
        }

        !self.controller.any_legal_moves(&self.board)
    }

    /// Mirrors the board and hands the turn over.
    fn rotate(&mut self) {
        self.board.rotate();
        self.controller.rotate();
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    fn snapshot(&self) -> HistoryEntry {
        HistoryEntry {
            board: self.board.clone(),
            state: self.controller.snapshot(),
        }
    }

    /// Appends the current position behind the cursor. When the cursor sits
    /// inside the history, an identical next entry is reused (the cursor
    /// walks forward along the existing line); otherwise the abandoned
    /// branch is truncated first.
    fn record_position(&mut self) {
        self.cursor += 1;
        if self.cursor != self.history.len() {
            if self.board == self.history[self.cursor].board {
                return;
            }
            self.history.truncate(self.cursor);
        }
        let entry = self.snapshot();
        self.history.push(entry);
    }

    fn load_entry(&mut self, index: usize) {
        let entry = &self.history[index];
        self.board = entry.board.clone();
        self.controller.restore(&entry.state);
    }

    /// Executes a history navigation command. Returns `None` when already
    /// at the corresponding end of the history.
    pub fn navigate(&mut self, cmd: NavCommand) -> Option<Feedback> {
        match cmd {
            NavCommand::First => self.jump_to_start(),
            NavCommand::Previous => self.step_back(),
            NavCommand::Next => self.step_forward(false),
            NavCommand::Last => self.step_forward(true),
        }
    }

    fn jump_to_start(&mut self) -> Option<Feedback> {
        if self.cursor == 0 {
            return None;
        }
        self.valid_moves.clear();
        self.cursor = 0;
        self.load_entry(0);
        if !self.game_over {
            self.status = Status::WhiteTurn;
        }
        Some(Feedback::Move)
    }

    fn step_back(&mut self) -> Option<Feedback> {
        if self.cursor == 0 {
            return None;
        }
        self.valid_moves.clear();
        self.cursor -= 1;
        self.load_entry(self.cursor);
        let feedback = if self.controller.check() {
            Feedback::Check
        } else {
            Feedback::Move
        };
        if !self.game_over {
            self.status = Status::turn(self.controller.current());
        }
        Some(feedback)
    }

    fn step_forward(&mut self, to_end: bool) -> Option<Feedback> {
        self.valid_moves.clear();
        if self.cursor + 1 >= self.history.len() {
            return None;
        }
        self.cursor = if to_end {
            self.history.len() - 1
        } else {
            self.cursor + 1
        };
        self.load_entry(self.cursor);

        let at_end = self.cursor + 1 == self.history.len();
        let feedback = if self.controller.check() {
            if !self.game_over {
                self.status = Status::Check;
            }
            if at_end && self.game_over {
                Feedback::Checkmate
            } else {
                Feedback::Check
            }
        } else if at_end && matches!(self.status, Status::Surrendered | Status::Stalemate) {
            Feedback::GameEnd
        } else {
            let previous = &self.history[self.cursor - 1];
            if self.history[self.cursor].board.len() < previous.board.len() {
                Feedback::Capture
            } else {
                Feedback::Move
            }
        };
        if !self.game_over && self.status != Status::Check {
            self.status = Status::turn(self.controller.current());
        }
        Some(feedback)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Discards everything and starts a new game. The history holds only
    /// the starting position afterwards.
    pub fn reset(&mut self) {
        self.board = Board::starting_position();
        self.controller.reset();
        self.valid_moves.clear();
        self.status = Status::WhiteTurn;
        self.game_over = false;
        self.winner = None;
        self.history.clear();
        self.cursor = 0;
        let entry = self.snapshot();
        self.history.push(entry);
        log::info!("session reset, White to move");
    }

    /// The current player gives up; the opponent wins. When the player was
    /// not already in check, the final history entry is rewritten with the
    /// check flag raised so the resignation reads as a loss there too.
    pub fn handle_surrender(&mut self) -> Option<Feedback> {
        if self.game_over {
            return None;
        }
        self.valid_moves.clear();
        self.game_over = true;
        self.status = Status::Surrendered;
        self.winner = Some(self.controller.current().opponent());

        if !self.controller.check() {
            self.controller.mark_check(&self.board, true);
            self.history.pop();
            if self.cursor == self.history.len() {
                let entry = self.snapshot();
                self.history.push(entry);
            }
        }

        self.main_player = self.controller.current();
        self.history.truncate(self.cursor + 1);
        log::info!("{} surrendered", self.controller.current());
        Some(Feedback::GameEnd)
    }

    /// Flips the displayed perspective after a finished game. With
    /// `change_player` the preferred side itself is toggled first; the
    /// board is rotated whenever it does not face the preferred side.
    pub fn change_view(&mut self, change_player: bool) {
        if change_player {
            self.main_player = self.main_player.opponent();
        }
        if self.controller.current() != self.main_player {
            self.rotate();
        }
    }

    // -----------------------------------------------------------------------
    // Persistence conversion
    // -----------------------------------------------------------------------

    /// Converts the session into its save document.
    pub fn to_saved(&self) -> SavedSession {
        SavedSession {
            version: FORMAT_VERSION,
            status: self.status,
            winner: self.winner,
            game_over: self.game_over,
            main_player: self.main_player,
            theme_dir: self.theme_dir.clone(),
            history: self
                .history
                .iter()
                .map(|entry| SavedEntry {
                    pieces: entry.board.to_pieces(),
                    state: entry.state.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a session from a save document, resuming at the latest
    /// recorded position.
    pub fn from_saved(saved: SavedSession) -> Result<Self, SessionError> {
        if saved.history.is_empty() {
            return Err(SessionError::EmptyHistory);
        }
        let mut history = Vec::with_capacity(saved.history.len());
        for entry in saved.history {
            let board = Board::from_pieces(entry.pieces).map_err(SessionError::InvalidBoard)?;
            history.push(HistoryEntry {
                board,
                state: entry.state,
            });
        }
        let cursor = history.len() - 1;
        let mut session = Self {
            board: Board::new(),
            controller: Controller::new(),
            valid_moves: Vec::new(),
            status: saved.status,
            game_over: saved.game_over,
            winner: saved.winner,
            main_player: saved.main_player,
            theme_dir: saved.theme_dir,
            history,
            cursor,
        };
        session.load_entry(cursor);
        log::info!(
            "restored session with {} plies, {}",
            session.history.len(),
            session.status
        );
        Ok(session)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
