//! CLI channel: runs the questionnaire over stdin/stdout.

use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatView, InputSurface, Message, OPTIONS_HINT, RESTART_LABEL, Role, SurfaceConfig};
use crate::flow::Conversation;

/// Prints the chat to the terminal.
pub struct CliView {
    assistant: String,
}

impl CliView {
    pub fn new(assistant: &str) -> Self {
        Self {
            assistant: assistant.to_string(),
        }
    }
}

impl ChatView for CliView {
    fn message_appended(&self, message: &Message) {
        let text = message.to_plain();
        match message.role {
            Role::Bot => println!("\n{}: {}", self.assistant, indent(&text)),
            Role::User => println!("You: {}", indent(&text)),
            Role::Error => println!("\n⚠️  {}", indent(&text)),
        }
    }

    fn cleared(&self) {
        println!("\n──────────── new conversation ────────────");
    }

    fn surface_changed(&self, surface: &InputSurface) {
        if !surface.is_live() {
            return;
        }
        match surface.config() {
            Some(SurfaceConfig::Text { placeholder }) => eprint!("\n[{placeholder}] > "),
            Some(SurfaceConfig::Options { labels }) => {
                println!();
                for (i, label) in labels.iter().enumerate() {
                    println!("  {}. {}", i + 1, label);
                }
                eprint!("[{OPTIONS_HINT}: type a number] > ");
            }
            Some(SurfaceConfig::Terminal) => eprint!("\n[{RESTART_LABEL}: type 'restart'] > "),
            None => {}
        }
    }
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n    ")
}

/// Stdin as a stream of trimmed lines. Ends on EOF.
fn stdin_lines() -> BoxStream<'static, String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line.trim().to_string()).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}

/// Terminal front end for one conversation.
pub struct CliChannel {
    conversation: Conversation,
}

impl CliChannel {
    pub fn new(conversation: Conversation) -> Self {
        Self { conversation }
    }

    /// Run until `/quit` or EOF. `/restart` starts over and `/export <file>`
    /// saves the transcript as HTML.
    pub async fn run(mut self) {
        let mut lines = stdin_lines();
        self.conversation.start();

        while let Some(line) = lines.next().await {
            match line.as_str() {
                "/quit" => break,
                "/restart" => self.conversation.restart(),
                cmd if cmd.starts_with("/export ") => {
                    self.export(cmd["/export ".len()..].trim()).await
                }
                _ => self.answer(&line).await,
            }
            // Lines typed while the surface was locked are dropped.
            while let Some(Some(_)) = lines.next().now_or_never() {}
        }
    }

    /// Write the transcript so far to `path` as HTML.
    async fn export(&self, path: &str) {
        let html = self.conversation.transcript().to_html();
        match tokio::fs::write(path, html).await {
            Ok(()) => eprintln!("   Transcript saved to {path}"),
            Err(e) => {
                tracing::warn!("Failed to export transcript to {}: {}", path, e);
                eprintln!("   Could not save transcript: {e}");
            }
        }
    }

    async fn answer(&mut self, line: &str) {
        let config = self.conversation.surface().config().cloned();
        match config {
            Some(SurfaceConfig::Text { .. }) => {
                self.conversation.submit_text(line).await;
            }
            Some(SurfaceConfig::Options { labels }) => match option_position(&labels, line) {
                Some(position) => {
                    self.conversation.select_option(position).await;
                }
                None => eprint!("[{OPTIONS_HINT}: type 1-{}] > ", labels.len()),
            },
            Some(SurfaceConfig::Terminal) => {
                if line.eq_ignore_ascii_case("restart") {
                    self.conversation.press_restart();
                } else {
                    eprint!("[{RESTART_LABEL}: type 'restart'] > ");
                }
            }
            None => {}
        }
    }
}

/// 1-based option picked by number or by exact label.
fn option_position(labels: &[String], line: &str) -> Option<usize> {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return (1..=labels.len()).contains(&n).then_some(n);
    }
    labels
        .iter()
        .position(|l| l.eq_ignore_ascii_case(line))
        .map(|i| i + 1)
}
