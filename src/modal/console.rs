//! 命令行里的对话框：打印提示，从 stdin 读 y/n

use crate::modal::manager::{DialogOutcome, ModalHost, ModalRef, ModalSettings};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::warn;

pub struct ConsoleModalHost;

impl ConsoleModalHost {
    fn prompt(content: &str, params: &Value) -> String {
        match params.get("message").and_then(Value::as_str) {
            Some(message) => format!("{}: {} [y/N] ", content, message),
            None => format!("{} [y/N] ", content),
        }
    }
}

impl ModalHost for ConsoleModalHost {
    fn open(&self, content: &str, _settings: &ModalSettings, params: Value) -> ModalRef {
        let (tx, rx) = oneshot::channel();
        let prompt = Self::prompt(content, &params);

        let task = tokio::spawn(async move {
            eprint!("{}", prompt);
            let mut line = String::new();
            let mut stdin = BufReader::new(tokio::io::stdin());
            let outcome = match stdin.read_line(&mut line).await {
                Ok(_) if is_yes(&line) => DialogOutcome::Accepted(json!({})),
                Ok(_) => DialogOutcome::Rejected(json!("declined")),
                Err(e) => {
                    warn!("Failed to read answer: {}", e);
                    DialogOutcome::Rejected(Value::Null)
                }
            };
            let _ = tx.send(outcome);
        });

        ModalRef::new(rx, move || task.abort())
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_prompt_includes_message() {
        let prompt = ConsoleModalHost::prompt("Confirm", &json!({ "message": "Delete Device: A" }));
        assert_eq!(prompt, "Confirm: Delete Device: A [y/N] ");
        assert_eq!(ConsoleModalHost::prompt("Confirm", &Value::Null), "Confirm [y/N] ");
    }
}
