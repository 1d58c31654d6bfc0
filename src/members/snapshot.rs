use super::remote::ConversationGateway;
use super::MembershipError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub current_member_ids: BTreeSet<String>,
}

/// Reads the full member set. `Ok(None)` means the conversation is gone.
pub fn take_snapshot(
    gateway: &dyn ConversationGateway,
    conversation_id: &str,
) -> Result<Option<ConversationSnapshot>, MembershipError> {
    let members = gateway
        .list_members(conversation_id)
        .map_err(|source| MembershipError::Snapshot {
            conversation_id: conversation_id.to_string(),
            source,
        })?;
    Ok(members.map(|current_member_ids| ConversationSnapshot {
        conversation_id: conversation_id.to_string(),
        current_member_ids,
    }))
}
