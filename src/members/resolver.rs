use super::remote::{DirectoryUser, UserDirectory};
use super::{MemberExpression, MembershipError};
use crate::slack::SlackError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    pub canonical_id: String,
    pub display_name: String,
    pub is_bot: bool,
    pub email: Option<String>,
}

impl From<DirectoryUser> for ResolvedMember {
    fn from(user: DirectoryUser) -> Self {
        Self {
            canonical_id: user.id,
            display_name: user.name,
            is_bot: user.is_bot,
            email: user.email,
        }
    }
}

/// Resolves one expression against the directory. Never cached: identities can
/// change between passes.
pub fn resolve(
    directory: &dyn UserDirectory,
    expression: &MemberExpression,
) -> Result<ResolvedMember, MembershipError> {
    let lookup_err = |source: SlackError| MembershipError::Lookup {
        expression: expression.to_string(),
        source,
    };
    let not_found = || MembershipError::UserNotFound {
        expression: expression.to_string(),
    };

    match expression {
        MemberExpression::ById(id) => directory
            .user_by_id(id)
            .map_err(lookup_err)?
            .map(ResolvedMember::from)
            .ok_or_else(not_found),
        MemberExpression::ByEmail(email) => directory
            .user_by_email(email)
            .map_err(lookup_err)?
            .map(ResolvedMember::from)
            .ok_or_else(not_found),
        MemberExpression::ByBotName(name) => directory
            .find_bot(name)
            .map_err(lookup_err)?
            .map(ResolvedMember::from)
            .ok_or_else(|| MembershipError::BotNotFound { name: name.clone() }),
    }
}

/// Resolves every expression, failing the whole batch on the first error.
pub fn resolve_all(
    directory: &dyn UserDirectory,
    expressions: &[MemberExpression],
) -> Result<Vec<(MemberExpression, ResolvedMember)>, MembershipError> {
    expressions
        .iter()
        .map(|e| resolve(directory, e).map(|member| (e.clone(), member)))
        .collect()
}

/// Like [`resolve_all`] but drops identities that no longer exist in the directory.
pub fn resolve_existing(
    directory: &dyn UserDirectory,
    expressions: &[MemberExpression],
) -> Result<Vec<(MemberExpression, ResolvedMember)>, MembershipError> {
    let mut out = Vec::with_capacity(expressions.len());
    for expression in expressions {
        match resolve(directory, expression) {
            Ok(member) => out.push((expression.clone(), member)),
            Err(err) if err.is_identity_missing() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}
