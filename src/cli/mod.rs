// src/cli/mod.rs
pub mod args;
pub mod helper;
pub mod menu;
pub mod repl;
pub mod replay;

use crate::cli::helper::ReplHelper;
use crate::error::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;
use tracing::{error, warn};

const HISTORY_FILE: &str = "history.txt";

pub type LineEditor = Editor<ReplHelper, DefaultHistory>;

/// What one read from the terminal produced.
pub enum Input {
    Line(String),
    Interrupted,
    Eof,
}

fn get_history_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("persona-chat");
    std::fs::create_dir_all(&path).ok();
    path.push(HISTORY_FILE);
    path
}

pub fn new_editor() -> Result<LineEditor> {
    let mut rl = LineEditor::new()?;
    rl.set_helper(Some(ReplHelper::new()));
    let history_path = get_history_path();
    if let Err(e) = rl.load_history(&history_path) {
        warn!("Failed to load command history from {:?}: {}", history_path, e);
    }
    Ok(rl)
}

pub fn save_history(rl: &mut LineEditor) {
    let history_path = get_history_path();
    if let Err(e) = rl.save_history(&history_path) {
        error!("Failed to save command history to {:?}: {}", history_path, e);
    }
}

/// Reads one trimmed line. Non-empty lines go into the editor history.
pub fn read_input(rl: &mut LineEditor, prompt: &str) -> Result<Input> {
    let input = match read_raw_line(rl, prompt)? {
        Input::Line(line) => line.trim().to_string(),
        other => return Ok(other),
    };
    if !input.is_empty() {
        if let Err(e) = rl.add_history_entry(input.as_str()) {
            warn!("Failed to add line to history: {}", e);
        }
    }
    Ok(Input::Line(input))
}

/// Reads one line exactly as typed, indentation included. Kept out of history.
pub fn read_raw_line(rl: &mut LineEditor, prompt: &str) -> Result<Input> {
    match rl.readline(prompt) {
        Ok(line) => Ok(Input::Line(line)),
        Err(ReadlineError::Interrupted) => {
            println!("^C");
            Ok(Input::Interrupted)
        }
        Err(ReadlineError::Eof) => {
            println!("^D");
            Ok(Input::Eof)
        }
        Err(err) => {
            error!("Readline error: {:?}", err);
            Err(err.into())
        }
    }
}
