//! Console stand-in for the microphone permission prompt.
//!
//! The CLI runs text sessions, but the coordinator still asks for media
//! consent before connecting. The user answers on the terminal, or `--yes`
//! answers for them.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use secrely_core::MediaAccess;
use secrely_domain::{Result, SecrelyError};

const CONSENT_QUESTION: &str = "Allow Secrely to use the microphone for this session? [y/N] ";

/// [`MediaAccess`] answered on stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMediaAccess {
    assume_yes: bool,
}

impl ConsoleMediaAccess {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl MediaAccess for ConsoleMediaAccess {
    async fn request_microphone(&self) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        let answer = prompt_line(CONSENT_QUESTION).await?;
        consent_from_answer(answer.as_deref().unwrap_or_default())
    }
}

fn consent_from_answer(answer: &str) -> Result<()> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(SecrelyError::Permission("microphone access was declined".into())),
    }
}

/// Prints `question` and reads one line. `None` at end of input.
pub async fn prompt_line(question: &str) -> Result<Option<String>> {
    let question = question.to_string();
    tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{question}");
        let _ = stdout.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(err) => Err(SecrelyError::Internal(format!("failed to read from terminal: {err}"))),
        }
    })
    .await
    .map_err(|err| SecrelyError::Internal(format!("terminal reader failed: {err}")))?
}
