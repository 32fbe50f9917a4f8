// Library surface for the game engine, persistence and the terminal front-end.
// Rendering lives in ui.rs and only reads the plain data exposed by game.rs.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod game;
pub mod profile;
pub mod runtime;
pub mod selector;
pub mod session;
pub mod share;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod validity;
pub mod words;

/// Number of letters in every solution and every guess.
pub const WORD_LENGTH: usize = 5;

/// Number of guesses a player gets per puzzle.
pub const MAX_GUESSES: usize = 6;

pub use error::{KalimaError, Result};
