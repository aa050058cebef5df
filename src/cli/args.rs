// src/cli/args.rs

use crate::config::Config;
use crate::error::Result;
use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

/// Chat with a handful of AI personas from the terminal.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Gemini model to use (overrides GEMINI_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Start chatting with this persona instead of showing the menu.
    #[arg(long, conflicts_with = "replay")]
    pub persona: Option<String>,

    /// Persona parameter, e.g. the year for time-travel.
    #[arg(long, requires = "persona")]
    pub param: Option<String>,

    /// Directory for session transcripts.
    #[arg(long, env = "PERSONA_CHAT_TRANSCRIPT_DIR")]
    pub transcript_dir: Option<PathBuf>,

    /// Do not record a transcript for this run.
    #[arg(long)]
    pub no_transcript: bool,

    /// Print responses as plain text instead of piping them through glow.
    #[arg(long)]
    pub plain: bool,

    /// Sampling temperature (0.0 to 2.0).
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Open the transcript browser and exit.
    #[arg(long)]
    pub replay: bool,
}

impl Args {
    /// Layers command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("Invalid temperature '{}'. Must be 0.0-2.0.", t);
            }
            config.temperature = Some(t);
        }
        if let Some(dir) = &self.transcript_dir {
            config.transcript_dir = Some(dir.clone());
        }
        if self.no_transcript {
            config.transcript_dir = None;
        }
        if self.plain {
            config.render_markdown = false;
        }
        Ok(())
    }
}
