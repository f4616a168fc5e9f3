//! Confirmation prompts

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Asks whether to proceed with a side effect
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Answers every prompt the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    accept: bool,
}

impl AutoConfirm {
    pub fn new(accept: bool) -> Self {
        Self { accept }
    }
}

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, message: &str) -> bool {
        info!("{} -> {}", message, if self.accept { "yes" } else { "no" });
        self.accept
    }
}

/// Asks on the terminal; anything other than `y` or `yes` declines
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptConfirm;

#[async_trait]
impl Confirm for PromptConfirm {
    async fn confirm(&self, message: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        let prompt = format!("{} [y/N] ", message);
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            warn!("Unable to prompt, declining");
            return false;
        }

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(e) => {
                warn!("Unable to read answer ({}), declining", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
