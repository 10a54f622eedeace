//! Tracing layer that mirrors warnings and errors into an operator chat.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::desk::Messenger;

/// Telegram rejects messages longer than this.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Records arriving within this window go out as one message.
const BATCH_WINDOW: Duration = Duration::from_secs(2);

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl TelegramLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(messenger: Arc<dyn Messenger>, chat_id: i64) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut batch = vec![first];
                let deadline = tokio::time::sleep(BATCH_WINDOW);
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        line = rx.recv() => match line {
                            Some(line) => batch.push(line),
                            None => break,
                        },
                        _ = &mut deadline => break,
                    }
                }

                let text = truncate(&batch.join("\n"));
                // eprintln, not tracing: a failed forward must not feed back into this layer.
                if let Err(e) = messenger.send(chat_id, &text, None).await {
                    eprintln!("Failed to send log to Telegram: {e}");
                }
            }
        });

        Self { tx }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{head}...")
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let prefix = if level == Level::ERROR { "❌" } else { "⚠️" };
        let line = format!("{prefix} {}{}", visitor.message, visitor.fields);

        if self.tx.send(line).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::RecordingMessenger;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("ok"), "ok");
        let long = "ж".repeat(MAX_MESSAGE_CHARS + 10);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[tokio::test]
    async fn test_only_warnings_and_errors_are_forwarded() {
        let messenger = Arc::new(RecordingMessenger::new());
        let layer = TelegramLogLayer::new(messenger.clone(), 777);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("registration started");
            tracing::warn!(admin_id = 5, "delivery failed");
            tracing::error!("store unavailable");
        });

        tokio::time::sleep(BATCH_WINDOW + Duration::from_millis(500)).await;

        let sent = messenger.sent_to(777);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "⚠️ delivery failed admin_id=5\n❌ store unavailable");
    }
}
