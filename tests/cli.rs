use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The binary with a clean environment rooted in `home`.
fn persona_chat(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("persona-chat").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_MODEL")
        .env_remove("GEMINI_API_BASE_URL")
        .env_remove("PERSONA_CHAT_TRANSCRIPT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let home = tempdir().unwrap();
    persona_chat(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: persona-chat"))
        .stdout(predicate::str::contains("--persona <PERSONA>"))
        .stdout(predicate::str::contains("--no-transcript"))
        .stdout(predicate::str::contains("--replay"));
}

#[test]
fn test_missing_api_key_exits_non_zero() {
    let home = tempdir().unwrap();
    persona_chat(home.path())
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_unknown_persona_is_rejected() {
    let home = tempdir().unwrap();
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .args(["--persona", "pirate", "--no-transcript"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown persona 'pirate'"));
}

#[test]
fn test_replay_with_no_transcripts() {
    let home = tempdir().unwrap();
    let transcripts = home.path().join("transcripts");
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .arg("--replay")
        .arg("--transcript-dir")
        .arg(&transcripts)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("No transcripts recorded yet"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_prints_reply_and_records_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Photosynthesis turns light into sugar." }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    let transcripts = home.path().join("transcripts");
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_MODEL", "gemini-test")
        .env("GEMINI_API_BASE_URL", server.uri())
        .args(["--persona", "study-buddy", "--plain"])
        .arg("--transcript-dir")
        .arg(&transcripts)
        .write_stdin("what is photosynthesis?\nand in plants?\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Photosynthesis turns light into sugar.\n---"));

    let files: Vec<_> = fs::read_dir(&transcripts).unwrap().flatten().collect();
    assert_eq!(files.len(), 1);
    let content = fs::read_to_string(files[0].path()).unwrap();
    let turns: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["kind"] == "turn")
        .collect();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["text"], "what is photosynthesis?");
    assert_eq!(turns[2]["text"], "and in plants?");
    assert_eq!(turns[3]["role"], "model");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_provider_failure_is_reported_and_chat_continues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_API_BASE_URL", server.uri())
        .args(["--persona", "code-helper", "--plain", "--no-transcript"])
        .write_stdin("fix my code\nexit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Error: quota exceeded: Quota exceeded"));
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_paste_sends_lines_as_one_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "def f():\n    return 1" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("It returns one.")))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_API_BASE_URL", server.uri())
        .args(["--persona", "study-buddy", "--plain", "--no-transcript"])
        .write_stdin("/paste\ndef f():\n    return 1\nEND\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("It returns one.\n---"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_debug_task_frames_pasted_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Debug this Rust code."))
        .and(body_string_contains("    let x = ;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Missing expression after '='.")))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_API_BASE_URL", server.uri())
        .args(["--persona", "code-helper", "--plain", "--no-transcript"])
        .write_stdin("/debug Rust\nfn main() {\n    let x = ;\n}\nEND\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing expression after '='."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_warp_sends_the_arrival_greeting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Hello! What is happening in 1850?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("The railways are spreading!")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Where am I? What year is this?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Why, it is 3000, stranger.")))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .env("GEMINI_API_BASE_URL", server.uri())
        .args(["--persona", "time-travel", "--param", "1850", "--plain", "--no-transcript"])
        .write_stdin("/warp 3000\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Now: 3000"))
        .stdout(predicate::str::contains("Why, it is 3000, stranger."));
}

#[test]
fn test_session_without_messages_leaves_no_transcript() {
    let home = tempdir().unwrap();
    let transcripts = home.path().join("transcripts");
    persona_chat(home.path())
        .env("GEMINI_API_KEY", "test-key")
        .args(["--persona", "study-buddy", "--plain"])
        .arg("--transcript-dir")
        .arg(&transcripts)
        .write_stdin("exit\n")
        .assert()
        .success();

    assert!(!transcripts.exists());
}
