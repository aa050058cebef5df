// src/cli/repl.rs

// --- Imports ---
use crate::cli::{read_input, read_raw_line, Input, LineEditor};
use crate::config::Config;
use crate::error::Result;
use crate::llm::gemini::GeminiClient;
use crate::persona::{Persona, Task};
use crate::session::ChatSession;
use crate::transcript::Role;
use crate::ui;
use reqwest::Client;
use std::io;
use tracing::{debug, error, info, warn};

// --- Constants ---
const UNKNOWN_COMMAND_MSG: &str = "Unknown command. Type '/help' for available commands.";
const EXIT_HINT: &str = "Type '/help' for commands, 'back' to return to the menu.";
const PASTE_END: &str = "END";
const PASTE_PROMPT: &str = "... ";

/// Collects pasted lines until one reads `END`.
#[derive(Debug, Default)]
pub struct PasteBuffer {
    lines: Vec<String>,
}

impl PasteBuffer {
    /// Returns true once the terminator arrives; it is not kept.
    pub fn push(&mut self, line: &str) -> bool {
        if line.trim() == PASTE_END {
            return true;
        }
        self.lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        false
    }

    /// The pasted text, or `None` if only blank lines came in.
    pub fn finish(self) -> Option<String> {
        let text = self.lines.join("\n");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// How a line typed in the chat screen is handled.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Empty,
    Exit,
    Command { name: &'a str, args: &'a str },
    Prompt(&'a str),
}

pub fn classify(input: &str) -> ChatInput<'_> {
    let input = input.trim();
    if input.is_empty() {
        return ChatInput::Empty;
    }
    if is_exit_command(input) {
        return ChatInput::Exit;
    }
    match input.strip_prefix('/') {
        Some(rest) => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let name = parts.next().unwrap_or("").trim();
            let args = parts.next().unwrap_or("").trim();
            ChatInput::Command { name, args }
        }
        None => ChatInput::Prompt(input),
    }
}

fn is_exit_command(input: &str) -> bool {
    matches!(
        input.to_lowercase().as_str(),
        "quit" | "exit" | "back" | "bye" | "/quit" | "/exit" | "/back"
    )
}

// --- Main Chat Function ---
pub async fn run_chat(
    rl: &mut LineEditor,
    config: &Config,
    client: &Client,
    persona: &'static Persona,
    param: Option<String>,
) -> Result<()> {
    info!(persona = persona.id, "Starting chat session.");

    let param = match (&persona.param, param) {
        (Some(p), None) => match ask_param(rl, p.label, p.default)? {
            Some(value) => Some(value),
            None => return Ok(()),
        },
        (_, param) => param,
    };

    let mut session = ChatSession::new(persona, param, &config.model);
    if let Some(dir) = &config.transcript_dir {
        session = session.with_transcript_dir(dir);
    }

    let gemini = GeminiClient::new(client, config);
    print_chat_header(&session)?;

    if let Some(greeting) = persona.greeting(session.param()) {
        send_and_show(&mut session, &gemini, config, &greeting).await;
    }

    // --- Main Loop ---
    loop {
        let prompt = format!("{} > ", persona.name);
        let line = match read_input(rl, &prompt)? {
            Input::Line(line) => line,
            Input::Interrupted => continue,
            Input::Eof => break,
        };

        match classify(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Command { name, args } => {
                if let Err(e) = handle_chat_command(rl, &mut session, &gemini, config, name, args).await {
                    error!("Chat command failed: {:?}", e);
                    eprintln!("Error executing command: {}", e);
                    eprintln!("{}", ui::SEPARATOR);
                }
            }
            ChatInput::Prompt(text) => send_and_show(&mut session, &gemini, config, text).await,
        }
    } // --- End Main Loop ---

    if let Some(writer) = session.transcript() {
        println!("Transcript saved to {}", writer.path().display());
    }
    info!(persona = persona.id, turns = session.history().len(), "Chat session ended.");
    Ok(())
}

// --- Helper Functions ---

fn ask_param(rl: &mut LineEditor, label: &str, default: &str) -> Result<Option<String>> {
    let prompt = format!("{} [{}]: ", label, default);
    match read_input(rl, &prompt)? {
        Input::Line(value) if value.is_empty() => Ok(Some(default.to_string())),
        Input::Line(value) => Ok(Some(value)),
        Input::Interrupted | Input::Eof => Ok(None),
    }
}

fn print_chat_header(session: &ChatSession) -> Result<()> {
    let persona = session.persona();
    let subtitle = match session.param() {
        Some(param) => format!("{} | {}", persona.description, param),
        None => persona.description.to_string(),
    };
    let mut stdout = io::stdout().lock();
    ui::print_header(&mut stdout, &format!("{} {}", persona.icon, persona.name), &subtitle)?;
    ui::print_success(&mut stdout, EXIT_HINT)?;
    Ok(())
}

// --- Prompt Handler ---
async fn send_and_show(session: &mut ChatSession, gemini: &GeminiClient<'_>, config: &Config, input: &str) {
    println!("... thinking ...");
    match session.send(gemini, input).await {
        Ok(reply) => {
            if let Err(e) = ui::display_response(&session.speaker(), &reply, config.render_markdown) {
                error!("Failed to display response: {:?}", e);
            }
        }
        Err(e) => {
            error!(persona = session.persona().id, "Generation error: {:?}", e);
            if let Err(io_err) = ui::print_error(&mut io::stderr(), &e.to_string()) {
                warn!("Failed to print provider error: {}", io_err);
            }
            println!("{}", ui::SEPARATOR);
        }
    }
}

// --- Chat Command Handler ---
async fn handle_chat_command(
    rl: &mut LineEditor,
    session: &mut ChatSession,
    gemini: &GeminiClient<'_>,
    config: &Config,
    name: &str,
    args: &str,
) -> Result<()> {
    debug!("Handling chat command: '{}', args: {:?}", name, args);

    match name {
        "help" => print_help(session.persona()),
        "clear" => {
            session.clear();
            println!("Conversation cleared. The persona has forgotten earlier messages.");
            println!("{}", ui::SEPARATOR);
        }
        "warp" => handle_warp_command(rl, session, gemini, config, args).await?,
        "history" => handle_history_command(session)?,
        "transcript" => {
            match (session.transcript(), session.pending_transcript_dir()) {
                (Some(writer), _) => println!("Recording to {}", writer.path().display()),
                (None, Some(dir)) => println!(
                    "A transcript starts in {} with the first answer.",
                    dir.display()
                ),
                (None, None) => println!("Transcripts are disabled for this session."),
            }
            println!("{}", ui::SEPARATOR);
        }
        "paste" => match read_multiline(rl, "Paste or type your message.")? {
            Some(text) => send_and_show(session, gemini, config, &text).await,
            None => {
                println!("Nothing to send.");
                println!("{}", ui::SEPARATOR);
            }
        },
        _ => match session.persona().task(name) {
            Some(task) => handle_task_command(rl, session, gemini, config, task, args).await?,
            None => {
                println!("{} ('/{}')", UNKNOWN_COMMAND_MSG, name);
                println!("{}", ui::SEPARATOR);
            }
        },
    }
    Ok(())
}

async fn handle_warp_command(
    rl: &mut LineEditor,
    session: &mut ChatSession,
    gemini: &GeminiClient<'_>,
    config: &Config,
    args: &str,
) -> Result<()> {
    let Some(param) = &session.persona().param else {
        println!("{} has nothing to warp.", session.persona().name);
        println!("{}", ui::SEPARATOR);
        return Ok(());
    };

    let value = if args.is_empty() {
        match ask_param(rl, param.label, param.default)? {
            Some(value) => value,
            None => return Ok(()),
        }
    } else {
        args.to_string()
    };

    session.warp(&value);
    println!("Now: {}", session.param().unwrap_or(param.default));
    if let Some(greeting) = session.persona().warp_greeting(session.param()) {
        send_and_show(session, gemini, config, &greeting).await;
    } else {
        println!("{}", ui::SEPARATOR);
    }
    Ok(())
}

async fn handle_task_command(
    rl: &mut LineEditor,
    session: &mut ChatSession,
    gemini: &GeminiClient<'_>,
    config: &Config,
    task: &Task,
    args: &str,
) -> Result<()> {
    let language = match (args.is_empty(), task.default_language) {
        (false, _) => args.to_string(),
        (true, Some(default)) => default.to_string(),
        (true, None) => match read_input(rl, "Language (e.g. Python, JS): ")? {
            Input::Line(value) if !value.is_empty() => value,
            _ => {
                println!("{}", ui::SEPARATOR);
                return Ok(());
            }
        },
    };

    let Some(body) = read_multiline(rl, task.input_hint)? else {
        println!("Nothing provided.");
        println!("{}", ui::SEPARATOR);
        return Ok(());
    };
    debug!(task = task.command, %language, lines = body.lines().count(), "Running persona task");
    send_and_show(session, gemini, config, &task.render(&language, &body)).await;
    Ok(())
}

/// Reads lines up to `END`. Ctrl+C abandons the paste, Ctrl+D ends it early.
fn read_multiline(rl: &mut LineEditor, hint: &str) -> Result<Option<String>> {
    println!("{} (type '{}' on a new line to finish)", hint, PASTE_END);
    let mut buffer = PasteBuffer::default();
    loop {
        match read_raw_line(rl, PASTE_PROMPT)? {
            Input::Line(line) => {
                if buffer.push(&line) {
                    break;
                }
            }
            Input::Interrupted => return Ok(None),
            Input::Eof => break,
        }
    }
    Ok(buffer.finish())
}

fn handle_history_command(session: &ChatSession) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if session.history().is_empty() {
        ui::print_success(&mut stdout, "Nothing said yet.")?;
    }
    let speaker = session.speaker();
    for turn in session.history() {
        match turn.role {
            Role::User => ui::print_user_msg(&mut stdout, "You", &turn.text)?,
            Role::Model => ui::print_bot_msg(&mut stdout, &speaker, &turn.text)?,
        }
    }
    ui::print_success(&mut stdout, ui::SEPARATOR)?;
    Ok(())
}

// --- Help Command ---
fn print_help(persona: &Persona) {
    println!("Available Commands:");
    println!("  /help                    - Show this help message.");
    println!("  /clear                   - Forget the conversation so far.");
    if let Some(param) = &persona.param {
        println!("  /warp [value]            - Change {} and start over.", param.label.to_lowercase());
    }
    println!("  /paste                   - Send several lines at once, ended by '{}'.", PASTE_END);
    for task in persona.tasks() {
        let usage = match task.default_language {
            Some(_) => format!("/{} [language]", task.command),
            None => format!("/{} <language>", task.command),
        };
        println!("  {:<25}- {}", usage, task.summary);
    }
    println!("  /history                 - Show this session's messages.");
    println!("  /transcript              - Show where the transcript is written.");
    println!("  back | exit | /quit      - Return to the main menu.");
    println!("Controls:");
    println!("  Up/Down Arrows           - Navigate input history.");
    println!("  Tab                      - Complete commands.");
    println!("  Ctrl+C                   - Discard the current line.");
    println!("  Ctrl+D                   - Return to the main menu.");
    println!("{}", ui::SEPARATOR);
}
