// src/ui.rs
//
// Plain-text rendering. Every helper takes the writer so the chat screens can
// target stdout while tests capture into a Vec<u8>.

use crate::error::Result;
use anyhow::Context;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub const SEPARATOR: &str = "---";
const MARKDOWN_RENDERER: &str = "glow";

pub struct MenuItem<'a> {
    pub key: String,
    pub icon: &'a str,
    pub name: &'a str,
    pub description: &'a str,
}

pub fn print_header<W: Write>(out: &mut W, title: &str, subtitle: &str) -> io::Result<()> {
    let width = title.chars().count().max(subtitle.chars().count()) + 4;
    writeln!(out, "{}", "=".repeat(width))?;
    writeln!(out, "  {}", title)?;
    if !subtitle.is_empty() {
        writeln!(out, "  {}", subtitle)?;
    }
    writeln!(out, "{}", "=".repeat(width))?;
    writeln!(out)
}

pub fn print_menu<W: Write>(out: &mut W, title: &str, items: &[MenuItem<'_>]) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    for item in items {
        writeln!(out, " [{:>1}] {} {}", item.key, item.icon, item.name)?;
        if !item.description.is_empty() {
            writeln!(out, "       {}", item.description)?;
        }
    }
    writeln!(out, "{}", SEPARATOR)
}

pub fn print_user_msg<W: Write>(out: &mut W, title: &str, text: &str) -> io::Result<()> {
    writeln!(out, "> {}:", title)?;
    for line in text.lines() {
        writeln!(out, "> {}", line)?;
    }
    writeln!(out)
}

pub fn print_bot_msg<W: Write>(out: &mut W, title: &str, text: &str) -> io::Result<()> {
    writeln!(out, "{}:", title)?;
    write_response(out, text)?;
    writeln!(out)
}

pub fn print_error<W: Write>(out: &mut W, msg: &str) -> io::Result<()> {
    writeln!(out, "Error: {}", msg)
}

pub fn print_success<W: Write>(out: &mut W, msg: &str) -> io::Result<()> {
    writeln!(out, "{}", msg)
}

/// Writes the response text unchanged, then the separator line.
pub fn write_response<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    write!(out, "{}", text)?;
    if !text.ends_with('\n') {
        writeln!(out)?;
    }
    writeln!(out, "{}", SEPARATOR)?;
    out.flush()
}

/// Shows a model response on the terminal. Markdown goes through `glow` when it
/// is installed; otherwise the text is printed as-is.
pub fn display_response(title: &str, text: &str, render_markdown: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}:", title)?;
    stdout.flush()?;
    drop(stdout);

    if render_markdown && pipe_through(MARKDOWN_RENDERER, text) {
        println!("{}", SEPARATOR);
        return Ok(());
    }
    write_response(&mut io::stdout().lock(), text).context("Failed to write response to stdout")?;
    Ok(())
}

/// Feeds `text` to `program -` on the inherited terminal. Returns false only
/// when the program could not be started; a non-zero exit still counts as
/// displayed.
fn pipe_through(program: &str, text: &str) -> bool {
    let mut child = match Command::new(program)
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!("{} unavailable, printing plain text: {}", program, e);
            return false;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(text.as_bytes()) {
            warn!("Error writing to {}'s stdin: {}", program, e);
        }
    }
    match child.wait() {
        Ok(status) if !status.success() => warn!("{} exited with {}", program, status),
        Ok(_) => {}
        Err(e) => warn!("Error waiting for {} to finish: {}", program, e),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn response_is_written_verbatim() {
        let text = "Here is **bold** text.\n\n```py\nprint('x')\n```";
        let shown = capture(|out| write_response(out, text));
        assert_eq!(shown, format!("{}\n{}\n", text, SEPARATOR));
    }

    #[test]
    fn trailing_newline_is_not_doubled() {
        let shown = capture(|out| write_response(out, "done\n"));
        assert_eq!(shown, "done\n---\n");
    }

    #[test]
    fn menu_lists_every_item() {
        let items = vec![
            MenuItem { key: "1".into(), icon: "*", name: "One", description: "first" },
            MenuItem { key: "0".into(), icon: "<", name: "Exit", description: "" },
        ];
        let shown = capture(|out| print_menu(out, "MAIN MENU", &items));
        assert!(shown.starts_with("MAIN MENU\n"));
        assert!(shown.contains("[1] * One"));
        assert!(shown.contains("first"));
        assert!(shown.contains("[0] < Exit"));
    }

    #[test]
    fn user_message_is_quoted() {
        let shown = capture(|out| print_user_msg(out, "You", "line one\nline two"));
        assert_eq!(shown, "> You:\n> line one\n> line two\n\n");
    }

    #[test]
    fn missing_renderer_falls_back() {
        assert!(!pipe_through("persona-chat-no-such-renderer", "text"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_renderer_does_not_trigger_a_second_print() {
        // `false` starts fine and exits 1; its run counts as the display.
        assert!(pipe_through("false", "text"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn error_line_reports_write_failures() {
        let err = print_error(&mut ClosedPipe, "quota exceeded").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(capture(|out| print_error(out, "quota exceeded")), "Error: quota exceeded\n");
    }
}
