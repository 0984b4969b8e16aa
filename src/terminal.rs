//! Terminal interface for chessply.
//!
//! This module drives a [`Session`] from the command line:
//!
//! - Colored board display, always from the current player's perspective
//! - Click-style input: enter a square to select, then a highlighted
//!   square to move
//! - History navigation (first/prev/next/last), surrender and restart
//! - Automatic save on quit and after every input
//!
//! Coordinates shown and accepted are frame-relative: column `a` is the
//! current player's left, row `1` their back rank. Because the board
//! rotates every move, both players read their own pieces from the bottom.

use colored::Colorize;
use std::io::{self, BufRead, Write};

use crate::session::{NavCommand, Session};
use crate::storage::SessionStorage;
use crate::types::{Color, Feedback, PieceKind, Square, Status};

/// Renders the board with the selected piece's destinations highlighted.
pub fn print_board(session: &Session) {
    println!();
    println!("  +---+---+---+---+---+---+---+---+");

    for y in 0..8u8 {
        print!("{} ", 8 - y);
        for x in 0..8u8 {
            let sq = Square::new(x, y);
            let highlighted = session.valid_moves().contains(&sq);

            let cell = match session.board().get(sq) {
                Some(piece) => {
                    let symbol = piece_symbol(piece.kind);
                    let symbol = if piece.color == Color::White {
                        symbol.white().bold()
                    } else {
                        symbol.blue().bold()
                    };
                    if highlighted {
                        symbol.on_green().to_string()
                    } else {
                        symbol.to_string()
                    }
                }
                None if highlighted => "*".green().to_string(),
                None => {
                    if (x + y) % 2 == 0 {
                        "·".dimmed().to_string()
                    } else {
                        " ".to_string()
                    }
                }
            };

            print!("| {} ", cell);
        }
        println!("|");
        println!("  +---+---+---+---+---+---+---+---+");
    }
    println!("    a   b   c   d   e   f   g   h");
    println!();
}

fn piece_symbol(kind: PieceKind) -> &'static str {
    match kind {
        PieceKind::King => "K",
        PieceKind::Queen => "Q",
        PieceKind::Rook => "R",
        PieceKind::Bishop => "B",
        PieceKind::Knight => "N",
        PieceKind::Pawn => "P",
    }
}

/// Prints the status line: whose move, check state, history position.
pub fn print_status(session: &Session) {
    let message = session.status().to_string();
    let message = match session.status() {
        Status::Check => message.red().bold(),
        Status::Checkmate | Status::Stalemate | Status::Surrendered => message.yellow().bold(),
        _ => message.normal(),
    };
    print!("{}", message);
    if let Some(winner) = session.winner() {
        print!("  {}", format!("{} wins!", winner).green().bold());
    }
    println!(
        "  [position {}/{}]",
        session.cursor() + 1,
        session.history_len()
    );
    println!();
}

/// Prints available commands.
pub fn print_help() {
    println!("{}", "Commands:".yellow().bold());
    println!("  {}        - select a piece or move to a highlighted square", "e2".green());
    println!("  {}     - show the board again", "board".green());
    println!("  {}  - step through the game history", "first/prev/next/last".green());
    println!("  {} - give up the game", "surrender".green());
    println!("  {}   - start a new game", "restart".green());
    println!("  {}    - flip the view after a finished game", "flip".green());
    println!("  {} - switch the piece theme directory", "theme <dir>".green());
    println!("  {}      - save without quitting", "save".green());
    println!("  {}      - show this help", "help".green());
    println!("  {}      - save and exit", "quit".green());
    println!();
}

fn print_feedback(feedback: Feedback) {
    let line = match feedback {
        Feedback::Move => return,
        Feedback::Capture => "Capture!".normal(),
        Feedback::Check => "Check!".red().bold(),
        Feedback::Checkmate => "Checkmate!".yellow().bold(),
        Feedback::Castle => "Castled.".normal(),
        Feedback::Promotion => "Promoted!".normal(),
        Feedback::GameEnd => "The game is over.".yellow().bold(),
    };
    println!("{}", line);
}

/// Parses a square like "e2" in the current frame: column `a` is x 0,
/// row `1` is y 7.
fn parse_square(input: &str) -> Option<(u8, u8)> {
    let mut chars = input.chars();
    let col = chars.next()?;
    let row = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if !('a'..='h').contains(&col) || !('1'..='8').contains(&row) {
        return None;
    }
    let x = col as u8 - b'a';
    let y = 8 - (row as u8 - b'0');
    Some((x, y))
}

fn parse_promotion(input: &str) -> Option<PieceKind> {
    match input {
        "q" => Some(PieceKind::Queen),
        "r" => Some(PieceKind::Rook),
        "b" => Some(PieceKind::Bishop),
        "n" => Some(PieceKind::Knight),
        _ => None,
    }
}

fn save_session(session: &Session, storage: &SessionStorage) {
    if let Err(e) = storage.save(&session.to_saved()) {
        log::error!("saving failed: {}", e);
        println!("{} {}", "Could not save the game:".red().bold(), e);
    }
}

/// Runs the interactive terminal game until the user quits. The session is
/// persisted after every input and on exit.
pub fn run(mut session: Session, storage: SessionStorage) -> io::Result<()> {
    println!();
    println!("{}", "=== chessply ===".cyan().bold());
    println!("Both players play from their own side; the board turns after every move.");
    print_help();
    print_board(&session);
    print_status(&session);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} > ", session.current_player());
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let input = line?.trim().to_lowercase();
        if input.is_empty() {
            continue;
        }

        match input.as_str() {
            "quit" | "exit" | "q" => break,
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "board" => {
                print_board(&session);
                print_status(&session);
                continue;
            }
            "save" => {
                save_session(&session, &storage);
                println!("Saved to {}.", storage.path().display());
                continue;
            }
            "surrender" => {
                if let Some(feedback) = session.handle_surrender() {
                    print_feedback(feedback);
                }
            }
            "restart" => {
                session.reset();
            }
            "flip" => {
                if session.game_over() {
                    session.change_view(true);
                } else {
                    println!("The view can only be flipped after the game has ended.");
                    continue;
                }
            }
            _ if input.starts_with("theme ") => {
                let dir = input.trim_start_matches("theme ").trim();
                match session.set_theme_dir(dir) {
                    Ok(()) => println!("Theme switched to {}.", dir),
                    Err(e) => {
                        println!("{} {}", "Cannot switch theme:".red().bold(), e);
                        continue;
                    }
                }
            }
            "first" => nav(&mut session, NavCommand::First),
            "prev" | "previous" => nav(&mut session, NavCommand::Previous),
            "next" => nav(&mut session, NavCommand::Next),
            "last" => nav(&mut session, NavCommand::Last),
            _ => {
                let Some((x, y)) = parse_square(&input) else {
                    println!("Unknown command '{}'. Type {} for help.", input, "help".green());
                    continue;
                };
                let promotion = promotion_choice(&session, x, y, &mut lines)?;
                match session.handle_click_with(x, y, promotion) {
                    Some(feedback) => print_feedback(feedback),
                    None => {
                        if session.game_over() {
                            println!("The game is over. Use the history commands or {}.", "restart".green());
                        }
                    }
                }
            }
        }

        save_session(&session, &storage);
        print_board(&session);
        print_status(&session);
    }

    save_session(&session, &storage);
    println!("Goodbye.");
    Ok(())
}

fn nav(session: &mut Session, cmd: NavCommand) {
    match session.navigate(cmd) {
        Some(feedback) => print_feedback(feedback),
        None => println!("Already there."),
    }
}

/// Asks for a promotion piece when the entered square completes a pawn
/// move onto the far rank. Defaults to a queen on unrecognized input.
fn promotion_choice(
    session: &Session,
    x: u8,
    y: u8,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<Option<PieceKind>> {
    if y != 0 || x > 7 {
        return Ok(None);
    }
    let promoting = session
        .selected()
        .is_some_and(|p| p.kind == PieceKind::Pawn)
        && session.valid_moves().contains(&Square::new(x, y));
    if !promoting {
        return Ok(None);
    }
    print!("Promote to [q/r/b/n] (default q): ");
    io::stdout().flush()?;
    let choice = match lines.next() {
        Some(line) => parse_promotion(line?.trim()),
        None => None,
    };
    Ok(choice.or(Some(PieceKind::Queen)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
