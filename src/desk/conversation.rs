//! In-flight registration state, one entry per user.
//!
//! Nothing here is persisted. A restart drops every half-finished
//! registration and the user starts over with `/start`.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// Where a user is in the registration flow.
///
/// Fields collected so far travel inside the variant until the phone step
/// commits them as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    AwaitingFaculty,
    AwaitingGroup { faculty: String },
    AwaitingPhone { faculty: String, group: String },
}

impl RegistrationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingFaculty => "awaiting_faculty",
            Self::AwaitingGroup { .. } => "awaiting_group",
            Self::AwaitingPhone { .. } => "awaiting_phone",
        }
    }
}

/// Per-user conversation states. Absent key means idle.
#[derive(Default)]
pub struct Conversations {
    states: Mutex<HashMap<i64, RegistrationState>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> Option<RegistrationState> {
        self.states.lock().await.get(&user_id).cloned()
    }

    pub async fn set(&self, user_id: i64, state: RegistrationState) {
        self.states.lock().await.insert(user_id, state);
    }

    pub async fn clear(&self, user_id: i64) {
        self.states.lock().await.remove(&user_id);
    }

    /// Number of users currently mid-registration.
    pub async fn len(&self) -> usize {
        self.states.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_users_do_not_share_state() {
        let conversations = Conversations::new();
        conversations.set(1, RegistrationState::AwaitingFaculty).await;
        conversations
            .set(2, RegistrationState::AwaitingGroup { faculty: "Turizm".to_string() })
            .await;

        assert_eq!(conversations.get(1).await, Some(RegistrationState::AwaitingFaculty));
        assert_eq!(conversations.get(2).await.map(|s| s.name()), Some("awaiting_group"));
        assert_eq!(conversations.get(3).await, None);

        conversations.clear(1).await;
        assert_eq!(conversations.get(1).await, None);
        assert_eq!(conversations.len().await, 1);
    }
}
