//! # chessply — local two-player chess with time travel
//!
//! chessply is a terminal chess game for two players sharing one screen.
//! The board always faces the side to move: after every move it rotates
//! 180 degrees, so each player reads their own pieces from the bottom.
//!
//! ## Features
//!
//! - **Full rules engine**: legal move filtering with pins and checks,
//!   castling (including the transit-square rule), en passant, promotion
//!   with a free piece choice, checkmate and stalemate detection, and
//!   simplified repetition and material draws.
//!
//! - **History time travel**: every position is kept; step backwards and
//!   forwards freely, and branch off into a new line at any point.
//!
//! - **Persistence**: the session is saved after every input as a
//!   compressed snapshot and resumed automatically on the next start.
//!
//! ## Usage
//!
//! ```bash
//! # Play (resumes a saved game if one exists)
//! chessply play
//!
//! # Throw away the saved game and start over
//! chessply play --fresh
//!
//! # Show what is in the save file without opening the game
//! chessply status
//! ```

pub mod controller;
pub mod pieces;
pub mod session;
pub mod storage;
pub mod terminal;
pub mod types;

use clap::{Parser, Subcommand};

use crate::session::{DEFAULT_THEME_DIR, Session};
use crate::storage::{SessionStorage, StorageError};

/// chessply — a local two-player chess game.
#[derive(Parser, Debug)]
#[command(name = "chessply")]
#[command(about = "Local two-player chess with history time travel")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play in the terminal, resuming a saved session if present.
    Play {
        /// Directory for the session snapshot.
        #[arg(long, default_value = "data")]
        data_dir: String,

        /// Discard any saved session and start a new game.
        #[arg(long)]
        fresh: bool,
    },

    /// Print a summary of the saved session.
    Status {
        /// Directory for the session snapshot.
        #[arg(long, default_value = "data")]
        data_dir: String,
    },
}

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { data_dir, fresh } => {
            let storage = SessionStorage::new(&data_dir)?;
            if fresh {
                storage.remove().map_err(std::io::Error::other)?;
            }
            let session = load_or_start(&storage).map_err(std::io::Error::other)?;
            terminal::run(session, storage)
        }
        Commands::Status { data_dir } => {
            let storage = SessionStorage::new(&data_dir)?;
            print_status(&storage).map_err(std::io::Error::other)
        }
    }
}

/// Loads the saved session, falling back to a fresh game only when no save
/// exists. A save that exists but cannot be decoded is a hard error; it is
/// never silently overwritten.
fn load_or_start(
    storage: &SessionStorage,
) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
    match storage.load() {
        Ok(saved) => {
            log::info!("resuming saved game from {}", storage.path().display());
            Ok(Session::from_saved(saved)?)
        }
        Err(StorageError::NotFound(_)) => {
            log::info!("no saved game, starting fresh");
            Ok(Session::new(DEFAULT_THEME_DIR))
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints a one-screen summary of the saved session.
fn print_status(storage: &SessionStorage) -> Result<(), StorageError> {
    match storage.load() {
        Ok(saved) => {
            println!("Save file:  {}", storage.path().display());
            println!("Status:     {}", saved.status);
            println!("Positions:  {}", saved.history.len());
            match saved.winner {
                Some(winner) => println!("Winner:     {}", winner),
                None if saved.game_over => println!("Winner:     none (draw)"),
                None => println!("Winner:     undecided"),
            }
            Ok(())
        }
        Err(StorageError::NotFound(path)) => {
            println!("No saved game at {}.", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
