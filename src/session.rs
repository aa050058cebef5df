// src/session.rs

use crate::error::ProviderError;
use crate::llm::Generator;
use crate::persona::Persona;
use crate::transcript::{SessionHeader, TranscriptWriter, Turn};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where this session's transcript stands.
enum TranscriptState {
    Off,
    /// Created on the first recorded turn, so an empty session leaves no file.
    Pending(PathBuf),
    Open(TranscriptWriter),
}

/// One conversation with a persona.
///
/// Only completed exchanges are kept: a failed provider call leaves history
/// and transcript untouched.
pub struct ChatSession {
    persona: &'static Persona,
    param: Option<String>,
    model: String,
    history: Vec<Turn>,
    transcript: TranscriptState,
    transcript_errors: usize,
}

impl ChatSession {
    pub fn new(persona: &'static Persona, param: Option<String>, model: &str) -> Self {
        let param = persona.resolve_param(param.as_deref()).map(String::from);
        ChatSession {
            persona,
            param,
            model: model.to_string(),
            history: Vec::new(),
            transcript: TranscriptState::Off,
            transcript_errors: 0,
        }
    }

    /// Records exchanges under `dir`. The file appears with the first exchange.
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript = TranscriptState::Pending(dir.into());
        self
    }

    pub fn header(&self) -> SessionHeader {
        SessionHeader {
            persona_id: self.persona.id.to_string(),
            persona_name: self.persona.name.to_string(),
            param: self.param.clone(),
            model: self.model.clone(),
            started_at: Local::now(),
        }
    }

    pub fn persona(&self) -> &'static Persona {
        self.persona
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The open transcript, once something has been recorded.
    pub fn transcript(&self) -> Option<&TranscriptWriter> {
        match &self.transcript {
            TranscriptState::Open(writer) => Some(writer),
            _ => None,
        }
    }

    /// Directory a transcript will be created in, before the first exchange.
    pub fn pending_transcript_dir(&self) -> Option<&Path> {
        match &self.transcript {
            TranscriptState::Pending(dir) => Some(dir),
            _ => None,
        }
    }

    /// True once any transcript write has failed in this session.
    pub fn transcript_failed(&self) -> bool {
        self.transcript_errors > 0
    }

    pub fn system_prompt(&self) -> String {
        self.persona.system_prompt(self.param.as_deref())
    }

    pub fn speaker(&self) -> String {
        self.persona.speaker(self.param.as_deref())
    }

    /// Sends `input` with the persona prompt and prior turns, then records the
    /// exchange.
    pub async fn send<G>(&mut self, generator: &G, input: &str) -> Result<String, ProviderError>
    where
        G: Generator + ?Sized,
    {
        let user_turn = Turn::user(input);
        let reply = generator
            .generate(&self.system_prompt(), &self.history, input)
            .await?;
        let model_turn = Turn::model(reply.clone());

        self.persist(&user_turn);
        self.persist(&model_turn);
        self.history.push(user_turn);
        self.history.push(model_turn);
        Ok(reply)
    }

    /// Switches the persona parameter and starts the conversation over.
    pub fn warp(&mut self, param: &str) {
        self.param = self.persona.resolve_param(Some(param)).map(String::from);
        self.history.clear();
        info!(persona = self.persona.id, param = ?self.param, "Persona parameter changed");
        // A pending transcript picks up the new parameter when it is created.
        let result = match &self.transcript {
            TranscriptState::Open(writer) => writer.append_header(&self.header()),
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.report_transcript_error(e);
        }
    }

    /// Forgets prior turns; the transcript keeps them.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn persist(&mut self, turn: &Turn) {
        if let TranscriptState::Pending(dir) = &self.transcript {
            match TranscriptWriter::create(dir, &self.header()) {
                Ok(writer) => {
                    debug!(path = ?writer.path(), "Recording transcript");
                    self.transcript = TranscriptState::Open(writer);
                }
                Err(e) => {
                    self.transcript = TranscriptState::Off;
                    self.report_transcript_error(e);
                    return;
                }
            }
        }
        let result = match &self.transcript {
            TranscriptState::Open(writer) => writer.append(turn),
            _ => return,
        };
        if let Err(e) = result {
            self.report_transcript_error(e);
        }
    }

    fn report_transcript_error(&mut self, e: anyhow::Error) {
        warn!("Transcript write failed: {:#}", e);
        if self.transcript_errors == 0 {
            eprintln!("Warning: could not write transcript ({:#}). Chat continues.", e);
        }
        self.transcript_errors += 1;
    }
}
