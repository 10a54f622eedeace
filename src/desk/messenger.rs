//! Outbound side of the bot.
//!
//! The desk decides what to say and which keyboard to show; a [`Messenger`]
//! delivers it. Production uses the teloxide client, tests use
//! [`RecordingMessenger`].

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

/// Faculties offered on the first registration step.
pub const FACULTIES: [&str; 10] = [
    "Raqamli iqtisodiyot va axborot texnologiyalari",
    "Iqtisodiyot",
    "Menejment",
    "Turizm",
    "Bank ishi",
    "TDIU-PDU qo'shma ta'lim fakulteti",
    "Pendidikan xalqaro qoʻshma taʼlim fakulteti",
    "TDIU-URDIU qo'shma ta'lim dasturi fakulteti",
    "TDIU To'rtko'l fakulteti",
    "Soliq va budjet hisobi fakulteti",
];

/// Label of the single main-menu button.
pub const REQUEST_BUTTON: &str = "📩 Murojaat yuborish";

/// Label of the contact-sharing button.
pub const SHARE_PHONE_BUTTON: &str = "📞 Telefon raqamini yuborish";

/// Which reply keyboard accompanies a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// One button per faculty.
    Faculties,
    /// Main menu with the request button.
    Menu,
    /// Single button that shares the user's phone number.
    SharePhone,
    /// Hide whatever keyboard is showing.
    Remove,
}

/// Delivery failure for one outbound message.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("delivery to {chat_id} rejected: {reason}")]
    Rejected { chat_id: i64, reason: String },
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` to `chat_id`, optionally replacing the reply keyboard.
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), SendError>;
}

/// A message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// In-memory messenger for tests.
///
/// Records every successful send. Chats marked with [`fail_for`] reject
/// delivery; the attempt is still counted.
///
/// [`fail_for`]: RecordingMessenger::fail_for
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    attempts: Mutex<Vec<i64>>,
    failing: Mutex<HashSet<i64>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(chat_id);
    }

    /// Successfully delivered messages, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages delivered to one chat.
    pub fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.chat_id == chat_id).collect()
    }

    /// Every chat id a send was attempted for, failed or not.
    pub fn attempts(&self) -> Vec<i64> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), SendError> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).push(chat_id);

        if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(&chat_id) {
            return Err(SendError::Rejected {
                chat_id,
                reason: "bot was blocked by the user".to_string(),
            });
        }

        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }
}
