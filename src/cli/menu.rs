// src/cli/menu.rs

use crate::cli::args::Args;
use crate::cli::replay::run_replay;
use crate::cli::repl::run_chat;
use crate::cli::{new_editor, read_input, save_history, Input, LineEditor};
use crate::config::Config;
use crate::error::Result;
use crate::llm::gemini::GeminiClient;
use crate::persona::{self, Persona};
use crate::ui;
use anyhow::anyhow;
use reqwest::Client;
use std::io::{self, Write};
use tracing::{error, info};

#[derive(Debug)]
pub enum MenuChoice {
    Persona(&'static Persona),
    Replay,
    Status,
    Exit,
    Invalid,
}

pub fn parse_choice(input: &str) -> MenuChoice {
    match input.trim().to_lowercase().as_str() {
        "0" | "q" | "quit" | "exit" => MenuChoice::Exit,
        "r" | "replay" => MenuChoice::Replay,
        "s" | "status" => MenuChoice::Status,
        other => persona::by_menu_number(other)
            .or_else(|| persona::find(other))
            .map_or(MenuChoice::Invalid, MenuChoice::Persona),
    }
}

/// Entry point after startup: menu, direct persona, or replay only.
pub async fn run(config: &Config, client: &Client, args: &Args) -> Result<()> {
    let mut rl = new_editor()?;
    let result = dispatch(&mut rl, config, client, args).await;
    save_history(&mut rl);
    println!("Goodbye!");
    result
}

async fn dispatch(rl: &mut LineEditor, config: &Config, client: &Client, args: &Args) -> Result<()> {
    if args.replay {
        return run_replay(rl, config.transcript_dir.as_deref());
    }
    if let Some(id) = &args.persona {
        let persona = persona::find(id).ok_or_else(|| {
            let known: Vec<_> = persona::catalogue().iter().map(|p| p.id).collect();
            anyhow!("Unknown persona '{}'. Available: {}", id, known.join(", "))
        })?;
        return run_chat(rl, config, client, persona, args.param.clone()).await;
    }
    run_menu(rl, config, client).await
}

async fn run_menu(rl: &mut LineEditor, config: &Config, client: &Client) -> Result<()> {
    info!("Showing main menu.");
    loop {
        print_main_menu()?;
        let line = match read_input(rl, "Choice: ")? {
            Input::Line(line) => line,
            Input::Interrupted => continue,
            Input::Eof => break,
        };
        if line.is_empty() {
            continue;
        }

        match parse_choice(&line) {
            MenuChoice::Persona(p) => {
                if let Err(e) = run_chat(rl, config, client, p, None).await {
                    error!("Chat session failed: {:?}", e);
                    eprintln!("Error: {:#}", e);
                }
            }
            MenuChoice::Replay => {
                if let Err(e) = run_replay(rl, config.transcript_dir.as_deref()) {
                    error!("Replay failed: {:?}", e);
                    eprintln!("Error: {:#}", e);
                }
            }
            MenuChoice::Status => handle_status_command(config, client).await?,
            MenuChoice::Exit => break,
            MenuChoice::Invalid => {
                println!("Invalid choice '{}'. Please try again.", line);
            }
        }
    }
    Ok(())
}

fn print_main_menu() -> Result<()> {
    let mut items: Vec<ui::MenuItem<'_>> = persona::catalogue()
        .iter()
        .enumerate()
        .map(|(i, p)| ui::MenuItem {
            key: (i + 1).to_string(),
            icon: p.icon,
            name: p.name,
            description: p.description,
        })
        .collect();
    items.push(ui::MenuItem { key: "r".into(), icon: "📜", name: "Replay", description: "Read back earlier sessions" });
    items.push(ui::MenuItem { key: "s".into(), icon: "🔌", name: "Status", description: "Show settings and check the API" });
    items.push(ui::MenuItem { key: "0".into(), icon: "👋", name: "Exit", description: "" });

    let mut stdout = io::stdout().lock();
    ui::print_header(&mut stdout, "Persona Chat", "Pick someone to talk to")?;
    ui::print_menu(&mut stdout, "MAIN MENU", &items)?;
    Ok(())
}

async fn handle_status_command(config: &Config, client: &Client) -> Result<()> {
    println!("Current Configuration:");
    for (name, value) in config.summary() {
        println!("  {:<12} {}", format!("{}:", name), value);
    }
    print!("Checking Gemini API... ");
    io::stdout().flush()?;
    match GeminiClient::new(client, config).check_connection().await {
        Ok(()) => println!("Connected"),
        Err(e) => println!("Error ({})", e),
    }
    println!("{}", ui::SEPARATOR);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pick_personas() {
        assert!(matches!(parse_choice("2"), MenuChoice::Persona(p) if p.id == "study-buddy"));
    }

    #[test]
    fn ids_pick_personas_too() {
        assert!(matches!(parse_choice("Translator"), MenuChoice::Persona(p) if p.id == "translator"));
    }

    #[test]
    fn letters_pick_actions() {
        assert!(matches!(parse_choice("R"), MenuChoice::Replay));
        assert!(matches!(parse_choice("s"), MenuChoice::Status));
        assert!(matches!(parse_choice("0"), MenuChoice::Exit));
        assert!(matches!(parse_choice("q"), MenuChoice::Exit));
    }

    #[test]
    fn anything_else_is_invalid() {
        assert!(matches!(parse_choice("42"), MenuChoice::Invalid));
        assert!(matches!(parse_choice("hello"), MenuChoice::Invalid));
    }
}
