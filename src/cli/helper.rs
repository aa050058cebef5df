// src/cli/helper.rs
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper, Result as RustylineResult};

// Chat commands offered for tab completion
const CHAT_COMMANDS: [&str; 12] = [
    "/help", "/clear", "/warp", "/paste", "/history", "/transcript", "/debug", "/generate", "/rate",
    "/back", "/quit", "/exit",
];

#[derive(Helper)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        Self {}
    }
}

fn command_candidates(prefix: &str) -> Vec<Pair> {
    CHAT_COMMANDS
        .iter()
        .filter(|cmd| cmd.starts_with(prefix))
        .map(|cmd| Pair {
            display: cmd.to_string(),
            replacement: cmd.to_string(),
        })
        .collect()
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> RustylineResult<(usize, Vec<Self::Candidate>)> {
        if !line.starts_with('/') || pos == 0 {
            return Ok((pos, Vec::new()));
        }
        // Only the command word completes; arguments are free text.
        if line.find(' ').is_some_and(|space_idx| pos > space_idx) {
            return Ok((pos, Vec::new()));
        }
        Ok((0, command_candidates(&line[..pos])))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Validator for ReplHelper {}

impl Highlighter for ReplHelper {}
