use super::remote::{ConversationGateway, DirectoryUser, UserDirectory};
use crate::slack::SlackError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    UserById(String),
    UserByEmail(String),
    ListUsers,
    ListMembers(String),
    Add(String, Vec<String>),
    Remove(String, String),
    Join(String),
    Leave(String),
}

impl Call {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Add(..) | Self::Remove(..) | Self::Join(_) | Self::Leave(_)
        )
    }
}

/// In-memory workspace that answers like Slack does for the calls the engine makes.
pub(crate) struct FakeSlack {
    acting_user: String,
    users: Vec<DirectoryUser>,
    conversations: Mutex<BTreeMap<String, BTreeSet<String>>>,
    add_failures: Mutex<BTreeMap<String, String>>,
    remove_failures: Mutex<BTreeMap<String, String>>,
    join_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
}

pub(crate) fn user(id: &str, name: &str, email: Option<&str>) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        name: name.to_string(),
        is_bot: false,
        email: email.map(str::to_string),
    }
}

pub(crate) fn bot(id: &str, name: &str) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        name: name.to_string(),
        is_bot: true,
        email: None,
    }
}

impl FakeSlack {
    pub(crate) fn new(acting_user: &str, users: Vec<DirectoryUser>) -> Self {
        Self {
            acting_user: acting_user.to_string(),
            users,
            conversations: Mutex::new(BTreeMap::new()),
            add_failures: Mutex::new(BTreeMap::new()),
            remove_failures: Mutex::new(BTreeMap::new()),
            join_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_conversation(self, conversation_id: &str, members: &[&str]) -> Self {
        self.conversations.lock().expect("lock").insert(
            conversation_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub(crate) fn fail_add(&self, user_id: &str, code: &str) {
        self.add_failures
            .lock()
            .expect("lock")
            .insert(user_id.to_string(), code.to_string());
    }

    pub(crate) fn fail_remove(&self, user_id: &str, code: &str) {
        self.remove_failures
            .lock()
            .expect("lock")
            .insert(user_id.to_string(), code.to_string());
    }

    pub(crate) fn fail_join(&self, code: &str) {
        *self.join_failure.lock().expect("lock") = Some(code.to_string());
    }

    pub(crate) fn delete_conversation(&self, conversation_id: &str) {
        self.conversations
            .lock()
            .expect("lock")
            .remove(conversation_id);
    }

    pub(crate) fn members(&self, conversation_id: &str) -> BTreeSet<String> {
        self.conversations
            .lock()
            .expect("lock")
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub(crate) fn mutation_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().expect("lock").clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }
}

impl UserDirectory for FakeSlack {
    fn user_by_id(&self, user_id: &str) -> Result<Option<DirectoryUser>, SlackError> {
        self.record(Call::UserById(user_id.to_string()));
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, SlackError> {
        self.record(Call::UserByEmail(email.to_string()));
        Ok(self
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError> {
        self.record(Call::ListUsers);
        Ok(self.users.clone())
    }
}

impl ConversationGateway for FakeSlack {
    fn list_members(&self, conversation_id: &str) -> Result<Option<BTreeSet<String>>, SlackError> {
        self.record(Call::ListMembers(conversation_id.to_string()));
        Ok(self
            .conversations
            .lock()
            .expect("lock")
            .get(conversation_id)
            .cloned())
    }

    fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<(), SlackError> {
        self.record(Call::Add(conversation_id.to_string(), user_ids.to_vec()));
        let mut conversations = self.conversations.lock().expect("lock");
        let members = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| SlackError::api("conversations.invite", "channel_not_found"))?;
        let failures = self.add_failures.lock().expect("lock");
        for user_id in user_ids {
            if let Some(code) = failures.get(user_id) {
                return Err(SlackError::api("conversations.invite", code));
            }
            if *user_id == self.acting_user {
                return Err(SlackError::api("conversations.invite", "cant_invite_self"));
            }
            if members.contains(user_id) {
                return Err(SlackError::api(
                    "conversations.invite",
                    "already_in_channel",
                ));
            }
        }
        members.extend(user_ids.iter().cloned());
        Ok(())
    }

    fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<(), SlackError> {
        self.record(Call::Remove(
            conversation_id.to_string(),
            user_id.to_string(),
        ));
        if let Some(code) = self.remove_failures.lock().expect("lock").get(user_id) {
            return Err(SlackError::api("conversations.kick", code));
        }
        let mut conversations = self.conversations.lock().expect("lock");
        let members = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| SlackError::api("conversations.kick", "channel_not_found"))?;
        if user_id == self.acting_user {
            return Err(SlackError::api("conversations.kick", "cant_kick_self"));
        }
        if !members.remove(user_id) {
            return Err(SlackError::api("conversations.kick", "not_in_channel"));
        }
        Ok(())
    }

    fn join(&self, conversation_id: &str) -> Result<(), SlackError> {
        self.record(Call::Join(conversation_id.to_string()));
        if let Some(code) = self.join_failure.lock().expect("lock").clone() {
            return Err(SlackError::api("conversations.join", &code));
        }
        let mut conversations = self.conversations.lock().expect("lock");
        let members = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| SlackError::api("conversations.join", "channel_not_found"))?;
        members.insert(self.acting_user.clone());
        Ok(())
    }

    fn leave(&self, conversation_id: &str) -> Result<(), SlackError> {
        self.record(Call::Leave(conversation_id.to_string()));
        let mut conversations = self.conversations.lock().expect("lock");
        let members = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| SlackError::api("conversations.leave", "channel_not_found"))?;
        members.remove(&self.acting_user);
        Ok(())
    }
}
