use crate::slack::SlackError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
    pub email: Option<String>,
}

/// Read-only lookups against the workspace user directory.
pub trait UserDirectory {
    fn user_by_id(&self, user_id: &str) -> Result<Option<DirectoryUser>, SlackError>;
    fn user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, SlackError>;
    fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError>;

    /// First bot account named `name`. Implementations that page should stop
    /// at the first match.
    fn find_bot(&self, name: &str) -> Result<Option<DirectoryUser>, SlackError> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|user| user.is_bot && user.name == name))
    }
}

/// Membership reads and mutations for a single conversation.
///
/// `list_members` returns `None` when the conversation does not exist.
pub trait ConversationGateway {
    fn list_members(&self, conversation_id: &str) -> Result<Option<BTreeSet<String>>, SlackError>;
    fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<(), SlackError>;
    fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<(), SlackError>;
    fn join(&self, conversation_id: &str) -> Result<(), SlackError>;
    fn leave(&self, conversation_id: &str) -> Result<(), SlackError>;
}
