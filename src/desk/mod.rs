//! Student desk - registers students and forwards their requests to admins.

pub mod conversation;
pub mod dispatch;
pub mod messenger;
pub mod profile;
pub mod router;
pub mod store;
pub mod telegram;


pub use conversation::{Conversations, RegistrationState};
pub use messenger::{Keyboard, Messenger, RecordingMessenger, SendError};
pub use profile::UserProfile;
pub use router::{Desk, EventKind, Inbound};
pub use store::{MemoryStore, SqliteStore, StoreError, UserStore};
pub use telegram::TelegramClient;
