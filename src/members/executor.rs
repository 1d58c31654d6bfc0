use super::remote::ConversationGateway;
use super::{MembershipError, MutationDirection};
use crate::logging::ReconcileLog;
use crate::slack::SlackError;
use std::collections::BTreeSet;
use std::slice;

/// What to do with a failed single-identifier mutation, keyed by remote error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Absorb,
    JoinInstead,
    LeaveInstead,
    Fatal,
}

pub fn classify(direction: MutationDirection, code: Option<&str>) -> Disposition {
    let Some(code) = code else {
        return Disposition::Fatal;
    };
    match (direction, code) {
        (MutationDirection::Add, "cant_invite_self") => Disposition::JoinInstead,
        (MutationDirection::Add, "already_in_channel") => Disposition::Absorb,
        (MutationDirection::Remove, "cant_kick_self") => Disposition::LeaveInstead,
        (
            MutationDirection::Remove,
            "not_in_channel"
            | "not_in_conversation"
            | "user_not_found"
            | "channel_not_found"
            | "conversation_not_found"
            | "cant_kick_from_general",
        ) => Disposition::Absorb,
        _ => Disposition::Fatal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsorbedMutation {
    pub user_id: String,
    pub direction: MutationDirection,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub absorbed: Vec<AbsorbedMutation>,
    pub joined: bool,
    pub left: bool,
    pub batch_fallbacks: usize,
}

impl MutationReport {
    /// Number of calls that changed remote membership.
    pub fn remote_mutations(&self) -> usize {
        self.added.len() + self.removed.len() + usize::from(self.joined) + usize::from(self.left)
    }

    fn record_applied(&mut self, direction: MutationDirection, ids: &[String]) {
        match direction {
            MutationDirection::Add => self.added.extend(ids.iter().cloned()),
            MutationDirection::Remove => self.removed.extend(ids.iter().cloned()),
        }
    }
}

/// Applies add and remove sets for one conversation, strictly one call at a time.
///
/// Each direction is two-tier: a single batched call when the remote offers one,
/// then one call per identifier if the batch fails. Per-identifier failures are
/// classified with [`classify`]; the first fatal one aborts the pass without
/// undoing mutations already applied.
pub struct MutationExecutor<'a> {
    gateway: &'a dyn ConversationGateway,
    log: &'a ReconcileLog,
    conversation_id: &'a str,
}

impl<'a> MutationExecutor<'a> {
    pub fn new(
        gateway: &'a dyn ConversationGateway,
        log: &'a ReconcileLog,
        conversation_id: &'a str,
    ) -> Self {
        Self {
            gateway,
            log,
            conversation_id,
        }
    }

    pub fn apply_adds(
        &self,
        user_ids: &BTreeSet<String>,
        report: &mut MutationReport,
    ) -> Result<(), MembershipError> {
        self.apply(MutationDirection::Add, user_ids, report)
    }

    pub fn apply_removes(
        &self,
        user_ids: &BTreeSet<String>,
        report: &mut MutationReport,
    ) -> Result<(), MembershipError> {
        self.apply(MutationDirection::Remove, user_ids, report)
    }

    fn apply(
        &self,
        direction: MutationDirection,
        user_ids: &BTreeSet<String>,
        report: &mut MutationReport,
    ) -> Result<(), MembershipError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let user_ids: Vec<String> = user_ids.iter().cloned().collect();

        // A one-element batch is already a per-identifier call.
        if user_ids.len() > 1 {
            if let Some(result) = self.try_batch(direction, &user_ids) {
                match result {
                    Ok(()) => {
                        report.record_applied(direction, &user_ids);
                        return Ok(());
                    }
                    Err(err) => {
                        report.batch_fallbacks += 1;
                        self.log.warn(
                            "mutation.batch_fallback",
                            self.conversation_id,
                            &format!(
                                "batched {direction} of {} users failed ({err}); retrying singly",
                                user_ids.len()
                            ),
                        );
                    }
                }
            }
        }

        for user_id in &user_ids {
            match self.apply_single(direction, user_id) {
                Ok(()) => report.record_applied(direction, slice::from_ref(user_id)),
                Err(err) => self.settle(direction, user_id, err, report)?,
            }
        }
        Ok(())
    }

    fn try_batch(
        &self,
        direction: MutationDirection,
        user_ids: &[String],
    ) -> Option<Result<(), SlackError>> {
        match direction {
            MutationDirection::Add => {
                Some(self.gateway.add_members(self.conversation_id, user_ids))
            }
            MutationDirection::Remove => None,
        }
    }

    fn apply_single(&self, direction: MutationDirection, user_id: &str) -> Result<(), SlackError> {
        match direction {
            MutationDirection::Add => self
                .gateway
                .add_members(self.conversation_id, &[user_id.to_string()]),
            MutationDirection::Remove => self.gateway.remove_member(self.conversation_id, user_id),
        }
    }

    fn settle(
        &self,
        direction: MutationDirection,
        user_id: &str,
        err: SlackError,
        report: &mut MutationReport,
    ) -> Result<(), MembershipError> {
        match classify(direction, err.api_code()) {
            Disposition::Absorb => {
                let code = err.api_code().unwrap_or_default().to_string();
                self.log.info(
                    "mutation.absorbed",
                    self.conversation_id,
                    &format!("{direction} {user_id}: {code}"),
                );
                report.absorbed.push(AbsorbedMutation {
                    user_id: user_id.to_string(),
                    direction,
                    code,
                });
                Ok(())
            }
            Disposition::JoinInstead => {
                self.gateway
                    .join(self.conversation_id)
                    .map_err(|source| self.self_reference_error(direction, user_id, source))?;
                self.log.info(
                    "mutation.self_join",
                    self.conversation_id,
                    &format!("{user_id} is the acting user; joined instead of inviting"),
                );
                report.joined = true;
                Ok(())
            }
            Disposition::LeaveInstead => {
                self.gateway
                    .leave(self.conversation_id)
                    .map_err(|source| self.self_reference_error(direction, user_id, source))?;
                self.log.info(
                    "mutation.self_leave",
                    self.conversation_id,
                    &format!("{user_id} is the acting user; left instead of kicking"),
                );
                report.left = true;
                Ok(())
            }
            Disposition::Fatal => {
                self.log.error(
                    "mutation.failed",
                    self.conversation_id,
                    &format!("{direction} {user_id}: {err}"),
                );
                Err(MembershipError::Mutation {
                    conversation_id: self.conversation_id.to_string(),
                    direction,
                    user_id: user_id.to_string(),
                    source: err,
                })
            }
        }
    }

    fn self_reference_error(
        &self,
        direction: MutationDirection,
        user_id: &str,
        source: SlackError,
    ) -> MembershipError {
        self.log.error(
            "mutation.self_fallback_failed",
            self.conversation_id,
            &format!("{direction} {user_id}: {source}"),
        );
        MembershipError::SelfReference {
            conversation_id: self.conversation_id.to_string(),
            direction,
            user_id: user_id.to_string(),
            source,
        }
    }
}
