// src/transcript.rs
//
// Append-only session transcripts. One file per session, one JSON record per
// line: a header first, then turns in the order they happened. A persona
// parameter change mid-session appends another header.

use crate::error::Result;
use crate::persona;
use crate::ui;
use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TRANSCRIPT_EXT: &str = "jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Turn {
            role: Role::Model,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub persona_id: String,
    pub persona_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    pub model: String,
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Header(SessionHeader),
    Turn(Turn),
}

// --- Writer ---

#[derive(Debug)]
pub struct TranscriptWriter {
    path: PathBuf,
}

impl TranscriptWriter {
    /// Creates a fresh transcript file under `dir` and writes `header` to it.
    pub fn create(dir: &Path, header: &SessionHeader) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create transcript directory {:?}", dir))?;

        let stem = format!(
            "{}-{}",
            header.persona_id,
            header.started_at.format("%Y%m%d-%H%M%S")
        );
        let mut path = dir.join(format!("{}.{}", stem, TRANSCRIPT_EXT));
        let mut n = 2;
        // Two sessions started within the same second get numbered suffixes.
        let file = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    path = dir.join(format!("{}-{}.{}", stem, n, TRANSCRIPT_EXT));
                    n += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create transcript {:?}", path))
                }
            }
        };
        drop(file);

        let writer = TranscriptWriter { path };
        writer.write_record(&Record::Header(header.clone()))?;
        debug!(path = ?writer.path, "Started transcript");
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, turn: &Turn) -> Result<()> {
        self.write_record(&Record::Turn(turn.clone()))
    }

    pub fn append_header(&self, header: &SessionHeader) -> Result<()> {
        self.write_record(&Record::Header(header.clone()))
    }

    fn write_record(&self, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to serialize transcript record")?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open transcript {:?}", self.path))?;
        writeln!(file, "{}", line)
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to write transcript {:?}", self.path))?;
        Ok(())
    }
}

// --- Reader ---

#[derive(Debug, Clone)]
pub struct Transcript {
    pub path: PathBuf,
    pub records: Vec<Record>,
}

impl Transcript {
    pub fn header(&self) -> Option<&SessionHeader> {
        self.records.iter().find_map(|r| match r {
            Record::Header(h) => Some(h),
            Record::Turn(_) => None,
        })
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.records.iter().filter_map(|r| match r {
            Record::Turn(t) => Some(t),
            Record::Header(_) => None,
        })
    }
}

/// Reads a transcript in file order. Malformed lines are skipped.
pub fn load(path: &Path) -> Result<Transcript> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {:?}", path))?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(?path, line = idx + 1, error = %e, "Skipping malformed transcript line"),
        }
    }

    Ok(Transcript {
        path: path.to_path_buf(),
        records,
    })
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub path: PathBuf,
    pub header: Option<SessionHeader>,
    pub turn_count: usize,
}

impl SessionSummary {
    pub fn label(&self) -> String {
        let name = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &self.header {
            Some(h) => {
                let param = h.param.as_deref().map(|p| format!(" ({})", p)).unwrap_or_default();
                format!(
                    "{} {}{}, {} turns",
                    h.started_at.format("%Y-%m-%d %H:%M"),
                    h.persona_name,
                    param,
                    self.turn_count
                )
            }
            None => format!("{}, {} turns", name, self.turn_count),
        }
    }
}

/// Lists transcripts with at least one turn under `dir`, newest first. A
/// missing directory has none.
pub fn list_sessions(dir: &Path) -> Result<Vec<SessionSummary>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read transcript directory {:?}", dir))?;

    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TRANSCRIPT_EXT) {
            continue;
        }
        match load(&path) {
            // Nothing to replay in a session that never got an answer.
            Ok(transcript) if transcript.turns().next().is_none() => {
                debug!(?path, "Skipping transcript without turns");
            }
            Ok(transcript) => sessions.push(SessionSummary {
                header: transcript.header().cloned(),
                turn_count: transcript.turns().count(),
                path,
            }),
            Err(e) => warn!(?path, "Skipping unreadable transcript: {:#}", e),
        }
    }

    sessions.sort_by(|a, b| {
        let a_key = a.header.as_ref().map(|h| h.started_at);
        let b_key = b.header.as_ref().map(|h| h.started_at);
        b_key.cmp(&a_key).then_with(|| b.path.cmp(&a.path))
    });
    Ok(sessions)
}

/// Writes a transcript the way the chat screen showed it.
pub fn render_replay<W: Write>(transcript: &Transcript, out: &mut W) -> io::Result<()> {
    writeln!(out, "Transcript: {}", transcript.path.display())?;
    let mut speaker = "Model".to_string();
    for record in &transcript.records {
        match record {
            Record::Header(h) => {
                let param = h.param.as_deref().map(|p| format!(" | {}", p)).unwrap_or_default();
                ui::print_header(
                    out,
                    &h.persona_name,
                    &format!("{}{} | {}", h.started_at.format("%Y-%m-%d %H:%M:%S"), param, h.model),
                )?;
                speaker = persona::find(&h.persona_id)
                    .map(|p| p.speaker(h.param.as_deref()))
                    .unwrap_or_else(|| h.persona_name.clone());
            }
            Record::Turn(t) => {
                let time = t.timestamp.format("%H:%M:%S");
                match t.role {
                    Role::User => ui::print_user_msg(out, &format!("You [{}]", time), &t.text)?,
                    Role::Model => ui::print_bot_msg(out, &format!("{} [{}]", speaker, time), &t.text)?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header(persona_id: &str) -> SessionHeader {
        SessionHeader {
            persona_id: persona_id.to_string(),
            persona_name: "Study Buddy".to_string(),
            param: None,
            model: "gemini-test".to_string(),
            started_at: Local::now(),
        }
    }

    #[test]
    fn appended_turns_come_back_in_order() {
        let dir = tempdir().unwrap();
        let writer = TranscriptWriter::create(dir.path(), &header("study-buddy")).unwrap();
        for i in 0..5 {
            writer.append(&Turn::user(format!("question {}", i))).unwrap();
            writer.append(&Turn::model(format!("answer {}", i))).unwrap();
        }

        let transcript = load(writer.path()).unwrap();
        assert_eq!(transcript.header().unwrap().persona_id, "study-buddy");
        let texts: Vec<_> = transcript.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts.len(), 10);
        assert_eq!(texts[0], "question 0");
        assert_eq!(texts[1], "answer 0");
        assert_eq!(texts[8], "question 4");
        assert_eq!(texts[9], "answer 4");
    }

    #[test]
    fn multiline_text_survives() {
        let dir = tempdir().unwrap();
        let writer = TranscriptWriter::create(dir.path(), &header("code-helper")).unwrap();
        writer.append(&Turn::model("```rust\nfn main() {}\n```")).unwrap();

        let transcript = load(writer.path()).unwrap();
        assert_eq!(transcript.turns().next().unwrap().text, "```rust\nfn main() {}\n```");
    }

    #[test]
    fn sessions_in_same_second_get_distinct_files() {
        let dir = tempdir().unwrap();
        let h = header("translator");
        let a = TranscriptWriter::create(dir.path(), &h).unwrap();
        let b = TranscriptWriter::create(dir.path(), &h).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let writer = TranscriptWriter::create(dir.path(), &header("study-buddy")).unwrap();
        writer.append(&Turn::user("first")).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(writer.path()).unwrap();
            writeln!(f, "{{not json").unwrap();
        }
        writer.append(&Turn::model("second")).unwrap();

        let texts: Vec<_> = load(writer.path())
            .unwrap()
            .turns()
            .map(|t| t.text.clone())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn list_sessions_newest_first_and_ignores_other_files() {
        let dir = tempdir().unwrap();
        let mut older = header("study-buddy");
        older.started_at = Local::now() - chrono::Duration::hours(1);
        let old = TranscriptWriter::create(dir.path(), &older).unwrap();
        old.append(&Turn::user("hi")).unwrap();
        let new = TranscriptWriter::create(dir.path(), &header("translator")).unwrap();
        new.append(&Turn::user("hallo")).unwrap();
        new.append(&Turn::model("hello")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let sessions = list_sessions(dir.path()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].path, new.path());
        assert_eq!(sessions[0].turn_count, 2);
        assert_eq!(sessions[1].turn_count, 1);
    }

    #[test]
    fn sessions_without_turns_are_not_listed() {
        let dir = tempdir().unwrap();
        let empty = TranscriptWriter::create(dir.path(), &header("time-travel")).unwrap();
        empty.append_header(&header("time-travel")).unwrap();
        let used = TranscriptWriter::create(dir.path(), &header("study-buddy")).unwrap();
        used.append(&Turn::user("hi")).unwrap();

        let sessions = list_sessions(dir.path()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].path, used.path());
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(list_sessions(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn replay_shows_both_sides() {
        let dir = tempdir().unwrap();
        let writer = TranscriptWriter::create(dir.path(), &header("study-buddy")).unwrap();
        writer.append(&Turn::user("what is a monad")).unwrap();
        writer.append(&Turn::model("a burrito")).unwrap();

        let mut out = Vec::new();
        render_replay(&load(writer.path()).unwrap(), &mut out).unwrap();
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.starts_with(&format!("Transcript: {}\n", writer.path().display())));
        assert!(shown.contains("Study Buddy"));
        assert!(shown.contains("what is a monad"));
        assert!(shown.contains("a burrito"));
        assert!(shown.find("what is a monad") < shown.find("a burrito"));
    }
}
