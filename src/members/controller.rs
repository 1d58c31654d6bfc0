use super::diff::{compute_diff, MembershipDiff, MembershipPolicy};
use super::executor::{MutationExecutor, MutationReport};
use super::expression::dedupe_expressions;
use super::remote::{ConversationGateway, UserDirectory};
use super::resolver::{resolve_all, resolve_existing, ResolvedMember};
use super::snapshot::{take_snapshot, ConversationSnapshot};
use super::{MemberExpression, MembershipError};
use crate::logging::ReconcileLog;
use std::collections::BTreeSet;

/// Post-state of a pass as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub conversation_id: String,
    /// Sorted ascending.
    pub final_member_ids: Vec<String>,
    /// Declared expressions still present, in declaration order.
    pub final_expressions: Vec<MemberExpression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Present(ReconciliationResult),
    /// The conversation no longer exists, or the resource was deleted.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub state: ResourceState,
    pub mutations: MutationReport,
}

impl ReconcileOutcome {
    fn absent(mutations: MutationReport) -> Self {
        Self {
            state: ResourceState::Absent,
            mutations,
        }
    }

    pub fn result(&self) -> Option<&ReconciliationResult> {
        match &self.state {
            ResourceState::Present(result) => Some(result),
            ResourceState::Absent => None,
        }
    }
}

type Resolved = Vec<(MemberExpression, ResolvedMember)>;

fn id_set(resolved: &Resolved) -> BTreeSet<String> {
    resolved
        .iter()
        .map(|(_, member)| member.canonical_id.clone())
        .collect()
}

fn narrow(snapshot: &ConversationSnapshot, declared: &Resolved) -> ReconciliationResult {
    let present: Vec<&(MemberExpression, ResolvedMember)> = declared
        .iter()
        .filter(|(_, member)| snapshot.current_member_ids.contains(&member.canonical_id))
        .collect();
    let final_member_ids: BTreeSet<String> = present
        .iter()
        .map(|(_, member)| member.canonical_id.clone())
        .collect();
    ReconciliationResult {
        conversation_id: snapshot.conversation_id.clone(),
        final_member_ids: final_member_ids.into_iter().collect(),
        final_expressions: present.into_iter().map(|(e, _)| e.clone()).collect(),
    }
}

/// Drives the materialize, diff, mutate, re-read cycle for one conversation per call.
///
/// Holds no state between calls. Two passes against the same conversation must be
/// serialized by the caller; passes on different conversations are independent.
pub struct Reconciler<'a> {
    directory: &'a dyn UserDirectory,
    gateway: &'a dyn ConversationGateway,
    log: &'a ReconcileLog,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        directory: &'a dyn UserDirectory,
        gateway: &'a dyn ConversationGateway,
        log: &'a ReconcileLog,
    ) -> Self {
        Self {
            directory,
            gateway,
            log,
        }
    }

    pub fn create(
        &self,
        conversation_id: &str,
        desired: &[MemberExpression],
        policy: MembershipPolicy,
    ) -> Result<ReconcileOutcome, MembershipError> {
        self.run("create", conversation_id, || {
            self.converge(conversation_id, desired, policy, &[])
        })
    }

    pub fn read(
        &self,
        conversation_id: &str,
        last_known: &[MemberExpression],
    ) -> Result<ReconcileOutcome, MembershipError> {
        self.run("read", conversation_id, || {
            let declared = resolve_existing(self.directory, &dedupe_expressions(last_known))?;
            self.observe(conversation_id, &declared, MutationReport::default())
        })
    }

    pub fn update(
        &self,
        conversation_id: &str,
        desired: &[MemberExpression],
        policy: MembershipPolicy,
        previous: &[MemberExpression],
    ) -> Result<ReconcileOutcome, MembershipError> {
        self.run("update", conversation_id, || {
            self.converge(conversation_id, desired, policy, previous)
        })
    }

    /// Removes every member declared by either list. Targets that already left or
    /// vanished are treated as removed.
    pub fn delete(
        &self,
        conversation_id: &str,
        desired: &[MemberExpression],
        previous: &[MemberExpression],
    ) -> Result<ReconcileOutcome, MembershipError> {
        self.run("delete", conversation_id, || {
            let union: Vec<MemberExpression> =
                previous.iter().chain(desired.iter()).cloned().collect();
            let declared = resolve_existing(self.directory, &dedupe_expressions(&union))?;
            let mut report = MutationReport::default();
            MutationExecutor::new(self.gateway, self.log, conversation_id)
                .apply_removes(&id_set(&declared), &mut report)?;
            Ok(ReconcileOutcome::absent(report))
        })
    }

    /// Computes what an update would do without mutating anything.
    pub fn plan(
        &self,
        conversation_id: &str,
        desired: &[MemberExpression],
        policy: MembershipPolicy,
        previous: &[MemberExpression],
    ) -> Result<Option<MembershipDiff>, MembershipError> {
        let desired = resolve_all(self.directory, &dedupe_expressions(desired))?;
        let Some(snapshot) = take_snapshot(self.gateway, conversation_id)? else {
            return Ok(None);
        };
        let previous = self.previous_ids(previous, policy)?;
        Ok(Some(compute_diff(
            &id_set(&desired),
            &snapshot.current_member_ids,
            policy,
            &previous,
        )))
    }

    fn converge(
        &self,
        conversation_id: &str,
        desired: &[MemberExpression],
        policy: MembershipPolicy,
        previous: &[MemberExpression],
    ) -> Result<ReconcileOutcome, MembershipError> {
        let desired = resolve_all(self.directory, &dedupe_expressions(desired))?;
        let Some(snapshot) = take_snapshot(self.gateway, conversation_id)? else {
            return Ok(ReconcileOutcome::absent(MutationReport::default()));
        };
        let previous = self.previous_ids(previous, policy)?;
        let diff = compute_diff(
            &id_set(&desired),
            &snapshot.current_member_ids,
            policy,
            &previous,
        );
        self.log.info(
            "reconcile.diff",
            conversation_id,
            &format!(
                "policy={policy} add={:?} remove={:?}",
                diff.add, diff.remove
            ),
        );

        let mut report = MutationReport::default();
        let executor = MutationExecutor::new(self.gateway, self.log, conversation_id);
        executor.apply_adds(&diff.add, &mut report)?;
        executor.apply_removes(&diff.remove, &mut report)?;

        self.observe(conversation_id, &desired, report)
    }

    fn previous_ids(
        &self,
        previous: &[MemberExpression],
        policy: MembershipPolicy,
    ) -> Result<BTreeSet<String>, MembershipError> {
        if policy.is_authoritative() || previous.is_empty() {
            return Ok(BTreeSet::new());
        }
        let resolved = resolve_existing(self.directory, &dedupe_expressions(previous))?;
        Ok(id_set(&resolved))
    }

    fn observe(
        &self,
        conversation_id: &str,
        declared: &Resolved,
        mutations: MutationReport,
    ) -> Result<ReconcileOutcome, MembershipError> {
        let state = match take_snapshot(self.gateway, conversation_id)? {
            Some(snapshot) => ResourceState::Present(narrow(&snapshot, declared)),
            None => ResourceState::Absent,
        };
        Ok(ReconcileOutcome { state, mutations })
    }

    fn run<F>(
        &self,
        verb: &str,
        conversation_id: &str,
        pass: F,
    ) -> Result<ReconcileOutcome, MembershipError>
    where
        F: FnOnce() -> Result<ReconcileOutcome, MembershipError>,
    {
        self.log.info(
            "reconcile.started",
            conversation_id,
            &format!("verb={verb}"),
        );
        match pass() {
            Ok(outcome) => {
                let event = match outcome.state {
                    ResourceState::Present(_) => "reconcile.finished",
                    ResourceState::Absent => "reconcile.absent",
                };
                self.log.info(
                    event,
                    conversation_id,
                    &format!(
                        "verb={verb} mutations={} absorbed={}",
                        outcome.mutations.remote_mutations(),
                        outcome.mutations.absorbed.len()
                    ),
                );
                Ok(outcome)
            }
            Err(err) => {
                self.log.error(
                    "reconcile.failed",
                    conversation_id,
                    &format!("verb={verb}: {err}"),
                );
                Err(err)
            }
        }
    }
}
