//! Routing of inbound events onto the registration flow or the request desk.
//!
//! Routing is a plain match on (current state, event kind). Each arm calls
//! one handler; anything without an arm is dropped silently.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::desk::conversation::{Conversations, RegistrationState};
use crate::desk::dispatch::dispatch_request;
use crate::desk::messenger::{Keyboard, Messenger, REQUEST_BUTTON};
use crate::desk::profile::UserProfile;
use crate::desk::store::UserStore;

pub const WELCOME: &str = "Assalomu alaykum!\nIltimos, fakultetingizni tanlang 👇";
pub const ASK_GROUP: &str = "Guruhingizni yozing:";
pub const ASK_PHONE: &str = "Telefon raqamingizni yuboring:";
pub const REGISTERED: &str = "✅ Ro‘yxatdan muvaffaqiyatli o‘tdingiz!";
pub const MAIN_MENU: &str = "Asosiy menyu 👇";
pub const ASK_REQUEST: &str = "✍️ Murojaatingizni yozing.";
pub const REGISTER_FIRST: &str = "❗ Avval ro‘yxatdan o‘ting. /start";
pub const REQUEST_SENT: &str = "✅ Murojaatingiz yuborildi!";

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The `/start` command.
    Start,
    Text(String),
    /// A shared contact carrying a phone number.
    Contact { phone: String },
    /// Stickers, photos and everything else.
    Other,
}

/// One inbound update, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: i64,
    /// Chat to reply into. Equal to `user_id` in private chats.
    pub chat_id: i64,
    pub full_name: String,
    pub kind: EventKind,
}

/// The bot's core: conversation state, profile store and admin broadcast.
pub struct Desk {
    store: Arc<dyn UserStore>,
    conversations: Conversations,
    messenger: Arc<dyn Messenger>,
    admin_ids: Vec<i64>,
}

impl Desk {
    pub fn new(store: Arc<dyn UserStore>, messenger: Arc<dyn Messenger>, admin_ids: Vec<i64>) -> Self {
        Self {
            store,
            conversations: Conversations::new(),
            messenger,
            admin_ids,
        }
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    /// Handle one inbound event. Never fails; problems are logged.
    pub async fn handle(&self, event: Inbound) {
        let state = self.conversations.get(event.user_id).await;
        debug!(
            user_id = event.user_id,
            state = state.as_ref().map(|s| s.name()).unwrap_or("idle"),
            "Inbound {:?}",
            event.kind
        );

        match (state, &event.kind) {
            (_, EventKind::Start) => self.on_start(&event).await,
            (Some(RegistrationState::AwaitingFaculty), EventKind::Text(text)) => {
                self.on_faculty(&event, text).await
            }
            (Some(RegistrationState::AwaitingGroup { faculty }), EventKind::Text(text)) => {
                self.on_group(&event, &faculty, text).await
            }
            (Some(RegistrationState::AwaitingPhone { faculty, group }), EventKind::Contact { phone }) => {
                self.on_contact(&event, &faculty, &group, phone).await
            }
            (Some(state), _) => {
                debug!(user_id = event.user_id, "Ignoring message in state {}", state.name());
            }
            (None, EventKind::Text(text)) if text == REQUEST_BUTTON => self.on_request_button(&event).await,
            (None, EventKind::Text(text)) => self.on_request(&event, text).await,
            (None, _) => {}
        }
    }

    async fn on_start(&self, event: &Inbound) {
        let registered = match self.store.exists(event.user_id) {
            Ok(registered) => registered,
            Err(e) => {
                error!(user_id = event.user_id, "Store lookup failed: {e}");
                return;
            }
        };

        if registered {
            self.reply(event, MAIN_MENU, Some(Keyboard::Menu)).await;
        } else {
            info!(user_id = event.user_id, "Registration started");
            self.conversations.set(event.user_id, RegistrationState::AwaitingFaculty).await;
            self.reply(event, WELCOME, Some(Keyboard::Faculties)).await;
        }
    }

    async fn on_faculty(&self, event: &Inbound, faculty: &str) {
        self.conversations
            .set(event.user_id, RegistrationState::AwaitingGroup { faculty: faculty.to_string() })
            .await;
        self.reply(event, ASK_GROUP, Some(Keyboard::Remove)).await;
    }

    async fn on_group(&self, event: &Inbound, faculty: &str, group: &str) {
        self.conversations
            .set(
                event.user_id,
                RegistrationState::AwaitingPhone {
                    faculty: faculty.to_string(),
                    group: group.to_string(),
                },
            )
            .await;
        self.reply(event, ASK_PHONE, Some(Keyboard::SharePhone)).await;
    }

    async fn on_contact(&self, event: &Inbound, faculty: &str, group: &str, phone: &str) {
        let profile = UserProfile {
            user_id: event.user_id,
            full_name: event.full_name.clone(),
            faculty: faculty.to_string(),
            group: group.to_string(),
            phone: phone.to_string(),
        };

        // State stays put on failure so the user can share the contact again.
        if let Err(e) = self.store.upsert(&profile) {
            error!(user_id = event.user_id, "Failed to save profile: {e}");
            return;
        }

        self.conversations.clear(event.user_id).await;
        info!(user_id = event.user_id, faculty, group, "Registration complete");
        self.reply(event, REGISTERED, Some(Keyboard::Menu)).await;
    }

    async fn on_request_button(&self, event: &Inbound) {
        match self.store.exists(event.user_id) {
            Ok(true) => self.reply(event, ASK_REQUEST, None).await,
            Ok(false) => self.reply(event, REGISTER_FIRST, None).await,
            Err(e) => error!(user_id = event.user_id, "Store lookup failed: {e}"),
        }
    }

    async fn on_request(&self, event: &Inbound, body: &str) {
        let profile = match self.store.get(event.user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.reply(event, REGISTER_FIRST, None).await;
                return;
            }
            Err(e) => {
                error!(user_id = event.user_id, "Store lookup failed: {e}");
                return;
            }
        };

        dispatch_request(self.messenger.as_ref(), &self.admin_ids, &profile, body).await;
        self.reply(event, REQUEST_SENT, None).await;
    }

    async fn reply(&self, event: &Inbound, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.messenger.send(event.chat_id, text, keyboard).await {
            warn!(user_id = event.user_id, "Failed to reply: {e}");
        }
    }
}
