use crate::error::{BridgeError, Result};
use crate::prompt::Prompt;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// An opaque `prompt -> text` generator.
///
/// Any error (including a hang cut short by the engine's timeout) means the
/// backend is unavailable for this attempt.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether generation should be attempted at all
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Backend used when generation is turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackend;

#[async_trait]
impl GenerativeBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(BridgeError::BackendUnavailable(
            "generation is disabled".to_string(),
        ))
    }
}

/// One scripted reply of a [`StubBackend`]
#[derive(Debug, Clone)]
pub enum StubReply {
    Text(String),
    Fail(String),
    /// Reply after a delay
    Delayed(Duration, String),
    /// Never reply
    Hang,
}

/// Scripted backend for tests and offline runs.
///
/// Replies are consumed in order; the last one repeats once the script runs out.
#[derive(Debug)]
pub struct StubBackend {
    replies: Mutex<VecDeque<StubReply>>,
    last: Mutex<Option<StubReply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubBackend {
    pub fn new(replies: impl IntoIterator<Item = StubReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: StubReply) -> Self {
        Self::new([reply])
    }

    pub fn text(reply: impl Into<String>) -> Self {
        Self::always(StubReply::Text(reply.into()))
    }

    pub fn hanging() -> Self {
        Self::always(StubReply::Hang)
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt texts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Option<StubReply> {
        let mut replies = self.replies.lock().ok()?;
        let mut last = self.last.lock().ok()?;
        if let Some(reply) = replies.pop_front() {
            *last = Some(reply);
        }
        last.clone()
    }
}

#[async_trait]
impl GenerativeBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.text.clone());
        }

        match self.next_reply() {
            Some(StubReply::Text(text)) => Ok(text),
            Some(StubReply::Fail(reason)) => Err(BridgeError::BackendUnavailable(reason)),
            Some(StubReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(StubReply::Hang) => {
                std::future::pending::<()>().await;
                Err(BridgeError::BackendUnavailable("stub hang ended".to_string()))
            }
            None => Err(BridgeError::BackendUnavailable(
                "stub has no scripted replies".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    prompt: &'a str,
    query: &'a str,
    signatures: Vec<CommandSignature<'a>>,
}

#[derive(Serialize)]
struct CommandSignature<'a> {
    name: &'a str,
    qualified_name: String,
    module: &'a str,
    signature: String,
    location: String,
}

/// Runs an external generator program per attempt.
///
/// The request is written to stdin as one JSON object
/// `{prompt, query, signatures}`; stdout is the reply. The child is killed when
/// the attempt is dropped (timeout or cancelled query).
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    /// Parse a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            BridgeError::InvalidConfig("backend command must not be blank".to_string())
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl GenerativeBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = CommandRequest {
            prompt: &prompt.text,
            query: &prompt.query,
            signatures: prompt
                .signatures
                .iter()
                .map(|sig| CommandSignature {
                    name: &sig.name,
                    qualified_name: sig.qualified_name(),
                    module: &sig.module,
                    signature: sig.render(),
                    location: sig.location.to_string(),
                })
                .collect(),
        };
        let payload = serde_json::to_vec(&request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::BackendUnavailable(format!("failed to start {}: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| {
                BridgeError::BackendUnavailable(format!("failed to write request: {e}"))
            })?;
            stdin.shutdown().await.ok();
        }

        let output = child.wait_with_output().await.map_err(|e| {
            BridgeError::BackendUnavailable(format!("{} did not finish: {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::BackendUnavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| BridgeError::BackendUnavailable("reply is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prompt() -> Prompt {
        Prompt {
            query: "rocket_add 1 2".to_string(),
            text: "Task: rocket_add 1 2".to_string(),
            signatures: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_disabled_backend() {
        let backend = DisabledBackend;
        assert!(!backend.is_available());
        assert!(backend
            .generate(&prompt())
            .await
            .unwrap_err()
            .is_backend_unavailable());
    }

    #[tokio::test]
    async fn test_stub_script_then_repeat_last() {
        let backend = StubBackend::new([
            StubReply::Fail("boom".to_string()),
            StubReply::Text("a".to_string()),
        ]);
        assert!(backend.generate(&prompt()).await.is_err());
        assert_eq!(backend.generate(&prompt()).await.unwrap(), "a");
        assert_eq!(backend.generate(&prompt()).await.unwrap(), "a");
        assert_eq!(backend.calls(), 3);
        assert_eq!(backend.prompts().len(), 3);
    }

    #[test]
    fn test_command_line_parsing() {
        let backend = CommandBackend::from_command_line("  python3 bridge.py --json ").unwrap();
        assert_eq!(backend.program(), "python3");
        assert_eq!(backend.args, vec!["bridge.py", "--json"]);
        assert!(CommandBackend::from_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_backend_round_trip() {
        let backend = CommandBackend::from_command_line("cat").unwrap();
        let reply = backend.generate(&prompt()).await.unwrap();
        let request: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(request["query"], "rocket_add 1 2");
        assert_eq!(request["prompt"], "Task: rocket_add 1 2");
        assert!(request["signatures"].as_array().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_backend_failures_are_unavailable() {
        let failing = CommandBackend::from_command_line("false").unwrap();
        assert!(failing
            .generate(&prompt())
            .await
            .unwrap_err()
            .is_backend_unavailable());

        let missing = CommandBackend::from_command_line("/nonexistent/assembly-generator").unwrap();
        assert!(missing
            .generate(&prompt())
            .await
            .unwrap_err()
            .is_backend_unavailable());
    }
}
