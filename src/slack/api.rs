use super::SlackError;
use crate::config::SlackSettings;
use crate::members::remote::{ConversationGateway, DirectoryUser, UserDirectory};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::ops::ControlFlow;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const API_BASE_ENV: &str = "MEMBER_SYNC_SLACK_API_BASE";
const PAGE_LIMIT: &str = "200";

#[derive(Debug, Clone)]
pub struct SlackApiClient {
    api_base: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: Option<T>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    profile: SlackUserProfile,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SlackUserProfile {
    #[serde(default)]
    email: Option<String>,
}

impl From<SlackUser> for DirectoryUser {
    fn from(user: SlackUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            is_bot: user.is_bot,
            email: user.profile.email.filter(|v| !v.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct UserData {
    user: SlackUser,
}

#[derive(Debug, Clone, Deserialize)]
struct UsersListData {
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct ConversationMembersData {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthTestData {
    user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: String,
}

fn is_user_not_found(code: &str) -> bool {
    matches!(code, "user_not_found" | "users_not_found")
}

fn is_conversation_not_found(code: &str) -> bool {
    matches!(code, "channel_not_found" | "conversation_not_found")
}

impl SlackApiClient {
    /// `api_base` falls back to the `MEMBER_SYNC_SLACK_API_BASE` env var, then the public endpoint.
    pub fn new(api_base: Option<&str>, token: String) -> Self {
        let api_base = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                api_base
                    .filter(|v| !v.trim().is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string());
        Self { api_base, token }
    }

    pub fn from_settings(settings: &SlackSettings) -> Result<Self, SlackError> {
        let token = std::env::var(&settings.token_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SlackError::MissingEnvVar(settings.token_env.clone()))?;
        Ok(Self::new(settings.api_base.as_deref(), token))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let mut url = self.endpoint(method);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }

        let response = ureq::get(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;

        let envelope: SlackEnvelope<T> = response
            .into_json()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;
        unwrap_envelope(method, envelope)
    }

    fn post<B: Serialize>(&self, method: &str, body: &B) -> Result<(), SlackError> {
        let url = self.endpoint(method);
        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(
                serde_json::to_value(body).map_err(|e| SlackError::ApiRequest(e.to_string()))?,
            )
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;

        let envelope: SlackEnvelope<serde_json::Value> = response
            .into_json()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;
        unwrap_envelope(method, envelope).map(|_| ())
    }

    pub fn auth_test(&self) -> Result<AuthIdentity, SlackError> {
        let data: AuthTestData = self.get("auth.test", &[])?;
        Ok(AuthIdentity {
            user_id: data.user_id,
        })
    }

    fn lookup_user(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<Option<DirectoryUser>, SlackError> {
        match self.get::<UserData>(method, query) {
            Ok(data) if data.user.deleted => Ok(None),
            Ok(data) => Ok(Some(data.user.into())),
            Err(err) if err.api_code().is_some_and(is_user_not_found) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Pages through `users.list`, skipping deactivated accounts. Stops fetching
    /// as soon as `visit` breaks.
    fn scan_users<F>(&self, mut visit: F) -> Result<(), SlackError>
    where
        F: FnMut(DirectoryUser) -> ControlFlow<()>,
    {
        let mut cursor = String::new();
        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let data: UsersListData = self.get("users.list", &query)?;
            for user in data.members.into_iter().filter(|user| !user.deleted) {
                if visit(user.into()).is_break() {
                    return Ok(());
                }
            }
            cursor = data.response_metadata.next_cursor;
            if cursor.trim().is_empty() {
                return Ok(());
            }
        }
    }
}

fn unwrap_envelope<T>(method: &str, envelope: SlackEnvelope<T>) -> Result<T, SlackError> {
    if !envelope.ok {
        let code = envelope
            .error
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unknown_error".to_string());
        return Err(SlackError::api(method, &code));
    }
    envelope
        .data
        .ok_or_else(|| SlackError::ApiRequest(format!("{method} returned an empty payload")))
}

impl UserDirectory for SlackApiClient {
    fn user_by_id(&self, user_id: &str) -> Result<Option<DirectoryUser>, SlackError> {
        self.lookup_user("users.info", &[("user", user_id.to_string())])
    }

    fn user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, SlackError> {
        self.lookup_user("users.lookupByEmail", &[("email", email.to_string())])
    }

    fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackError> {
        let mut all = Vec::new();
        self.scan_users(|user| {
            all.push(user);
            ControlFlow::Continue(())
        })?;
        Ok(all)
    }

    fn find_bot(&self, name: &str) -> Result<Option<DirectoryUser>, SlackError> {
        let mut found = None;
        self.scan_users(|user| {
            if user.is_bot && user.name == name {
                found = Some(user);
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        })?;
        Ok(found)
    }
}

impl ConversationGateway for SlackApiClient {
    fn list_members(&self, conversation_id: &str) -> Result<Option<BTreeSet<String>>, SlackError> {
        let mut all = BTreeSet::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![
                ("channel", conversation_id.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let data: ConversationMembersData = match self.get("conversations.members", &query) {
                Ok(data) => data,
                Err(err) if err.api_code().is_some_and(is_conversation_not_found) => {
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            all.extend(data.members);
            cursor = data.response_metadata.next_cursor;
            if cursor.trim().is_empty() {
                break;
            }
        }
        Ok(Some(all))
    }

    fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<(), SlackError> {
        self.post(
            "conversations.invite",
            &json!({
                "channel": conversation_id,
                "users": user_ids.join(","),
            }),
        )
    }

    fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<(), SlackError> {
        self.post(
            "conversations.kick",
            &json!({
                "channel": conversation_id,
                "user": user_id,
            }),
        )
    }

    fn join(&self, conversation_id: &str) -> Result<(), SlackError> {
        self.post("conversations.join", &json!({ "channel": conversation_id }))
    }

    fn leave(&self, conversation_id: &str) -> Result<(), SlackError> {
        self.post("conversations.leave", &json!({ "channel": conversation_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_envelope_surfaces_remote_code() {
        let envelope: SlackEnvelope<UserData> =
            serde_json::from_str(r#"{"ok":false,"error":"users_not_found"}"#).expect("parse");
        let err = unwrap_envelope("users.lookupByEmail", envelope).expect_err("should fail");
        assert_eq!(err.api_code(), Some("users_not_found"));
    }

    #[test]
    fn failed_envelope_without_code_is_still_an_api_error() {
        let envelope: SlackEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"ok":false}"#).expect("parse");
        let err = unwrap_envelope("conversations.join", envelope).expect_err("should fail");
        assert_eq!(err.api_code(), Some("unknown_error"));
    }

    #[test]
    fn user_payload_maps_profile_email() {
        let envelope: SlackEnvelope<UserData> = serde_json::from_str(
            r#"{"ok":true,"user":{"id":"U1","name":"ana","is_bot":false,"profile":{"email":"ana@x.com"}}}"#,
        )
        .expect("parse");
        let user: DirectoryUser = unwrap_envelope("users.info", envelope)
            .expect("ok")
            .user
            .into();
        assert_eq!(
            user,
            DirectoryUser {
                id: "U1".to_string(),
                name: "ana".to_string(),
                is_bot: false,
                email: Some("ana@x.com".to_string()),
            }
        );
    }

    #[test]
    fn not_found_codes_are_recognized() {
        assert!(is_user_not_found("users_not_found"));
        assert!(is_user_not_found("user_not_found"));
        assert!(!is_user_not_found("invalid_auth"));
        assert!(is_conversation_not_found("channel_not_found"));
        assert!(!is_conversation_not_found("not_in_channel"));
    }
}
