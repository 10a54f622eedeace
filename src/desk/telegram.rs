//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};
use teloxide::utils::command::BotCommands;

use crate::desk::messenger::{FACULTIES, Keyboard, Messenger, REQUEST_BUTTON, SHARE_PHONE_BUTTON, SendError};
use crate::desk::router::{EventKind, Inbound};

/// Commands the bot understands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Mavjud buyruqlar:")]
pub enum Command {
    #[command(description = "ro‘yxatdan o‘tish yoki menyuni ochish")]
    Start,
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), SendError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(reply_markup(keyboard));
        }
        request.await?;
        Ok(())
    }
}

/// Render a keyboard choice as Telegram reply markup.
pub fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Faculties => {
            let rows = FACULTIES
                .iter()
                .map(|faculty| vec![KeyboardButton::new(*faculty)])
                .collect::<Vec<_>>();
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
        }
        Keyboard::Menu => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![vec![KeyboardButton::new(REQUEST_BUTTON)]]).resize_keyboard(),
        ),
        Keyboard::SharePhone => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![vec![
                KeyboardButton::new(SHARE_PHONE_BUTTON).request(ButtonRequest::Contact),
            ]])
            .resize_keyboard(),
        ),
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

/// Classify a message body. `bot_username` lets `/start@bot` parse.
///
/// A deep-link payload (`/start abc`) still counts as the start command.
pub fn classify(text: Option<&str>, phone: Option<&str>, bot_username: &str) -> EventKind {
    if let Some(phone) = phone {
        return EventKind::Contact { phone: phone.to_string() };
    }
    match text {
        Some(text) if is_start(text, bot_username) => EventKind::Start,
        Some(text) => EventKind::Text(text.to_string()),
        None => EventKind::Other,
    }
}

fn is_start(text: &str, bot_username: &str) -> bool {
    let head = text.split_whitespace().next().unwrap_or_default();
    matches!(Command::parse(head, bot_username), Ok(Command::Start))
}

/// Strip a teloxide message down to an [`Inbound`] event.
///
/// Returns `None` for messages without a sender (channel posts).
pub fn to_inbound(msg: &Message, bot_username: &str) -> Option<Inbound> {
    let user = msg.from.as_ref()?;
    let kind = classify(
        msg.text(),
        msg.contact().map(|c| c.phone_number.as_str()),
        bot_username,
    );

    Some(Inbound {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        full_name: user.full_name(),
        kind,
    })
}
