use crate::slack::SlackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationDirection {
    Add,
    Remove,
}

impl MutationDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for MutationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("invalid member expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("unsupported member expression kind `{kind}`; expected one of: id, email, bot")]
    UnsupportedExpressionKind { kind: String },
    #[error("no user matches `{expression}`")]
    UserNotFound { expression: String },
    #[error("no bot user named `{name}`")]
    BotNotFound { name: String },
    #[error("failed to resolve `{expression}`: {source}")]
    Lookup {
        expression: String,
        #[source]
        source: SlackError,
    },
    #[error("failed to list members of conversation `{conversation_id}`: {source}")]
    Snapshot {
        conversation_id: String,
        #[source]
        source: SlackError,
    },
    #[error("failed to {direction} `{user_id}` in conversation `{conversation_id}`: {source}")]
    Mutation {
        conversation_id: String,
        direction: MutationDirection,
        user_id: String,
        #[source]
        source: SlackError,
    },
    #[error(
        "self-{direction} fallback for `{user_id}` in conversation `{conversation_id}` failed: {source}"
    )]
    SelfReference {
        conversation_id: String,
        direction: MutationDirection,
        user_id: String,
        #[source]
        source: SlackError,
    },
}

impl MembershipError {
    /// True when the referenced identity no longer exists in the directory.
    pub fn is_identity_missing(&self) -> bool {
        matches!(self, Self::UserNotFound { .. } | Self::BotNotFound { .. })
    }
}
