// src/cli/replay.rs

use crate::cli::{read_input, Input, LineEditor};
use crate::error::Result;
use crate::transcript::{self, SessionSummary};
use crate::ui;
use std::io;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    Cancel,
    Index(usize),
    Invalid,
}

/// Reads a 1-based pick out of `len` entries; `0` cancels.
pub fn parse_selection(input: &str, len: usize) -> Selection {
    match input.trim().parse::<usize>() {
        Ok(0) => Selection::Cancel,
        Ok(n) if n <= len => Selection::Index(n - 1),
        _ => Selection::Invalid,
    }
}

pub fn run_replay(rl: &mut LineEditor, dir: Option<&Path>) -> Result<()> {
    let Some(dir) = dir else {
        println!("Transcripts are disabled for this run.");
        println!("{}", ui::SEPARATOR);
        return Ok(());
    };

    loop {
        let sessions = transcript::list_sessions(dir)?;
        if sessions.is_empty() {
            println!("No transcripts recorded yet in {}.", dir.display());
            println!("{}", ui::SEPARATOR);
            return Ok(());
        }
        print_sessions(&sessions)?;

        let choice = match read_input(rl, "Replay which session (0 to go back)? ")? {
            Input::Line(line) => line,
            Input::Interrupted => continue,
            Input::Eof => return Ok(()),
        };
        match parse_selection(&choice, sessions.len()) {
            Selection::Cancel => return Ok(()),
            Selection::Index(i) => replay_one(&sessions[i]),
            Selection::Invalid => println!("Invalid input. Try again."),
        }
    }
}

fn print_sessions(sessions: &[SessionSummary]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    ui::print_header(&mut stdout, "Conversation Replay", &format!("{} saved sessions", sessions.len()))?;
    let labels: Vec<String> = sessions.iter().map(SessionSummary::label).collect();
    let items: Vec<ui::MenuItem<'_>> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| ui::MenuItem {
            key: (i + 1).to_string(),
            icon: "#",
            name: label,
            description: "",
        })
        .collect();
    ui::print_menu(&mut stdout, "SESSIONS", &items)?;
    Ok(())
}

fn replay_one(summary: &SessionSummary) {
    info!(path = ?summary.path, "Replaying transcript");
    let result = transcript::load(&summary.path)
        .and_then(|t| transcript::render_replay(&t, &mut io::stdout().lock()).map_err(Into::into));
    if let Err(e) = result {
        error!("Replay failed: {:?}", e);
        eprintln!("Error: could not replay {}: {:#}", summary.path.display(), e);
    }
    println!("{}", ui::SEPARATOR);
}
