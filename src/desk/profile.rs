//! Registered student profile.

use serde::{Deserialize, Serialize};

/// A student who completed registration.
///
/// Committed in one write once the phone number arrives; never partially
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Telegram user id, primary key.
    pub user_id: i64,
    /// Display name at the time the phone number was shared.
    pub full_name: String,
    pub faculty: String,
    pub group: String,
    /// Taken from the shared contact, not typed by hand.
    pub phone: String,
}
