//! Membership reconciliation: resolve declared members, diff them against the
//! conversation, and apply the difference through the remote capabilities.

pub mod controller;
pub mod diff;
pub mod error;
pub mod executor;
pub mod expression;
pub mod remote;
pub mod resolver;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ReconcileOutcome, ReconciliationResult, Reconciler, ResourceState};
pub use diff::{compute_diff, MembershipDiff, MembershipPolicy};
pub use error::{MembershipError, MutationDirection};
pub use executor::{classify, AbsorbedMutation, Disposition, MutationExecutor, MutationReport};
pub use expression::{parse_expressions, MemberExpression};
pub use remote::{ConversationGateway, DirectoryUser, UserDirectory};
pub use resolver::{resolve, ResolvedMember};
pub use snapshot::{take_snapshot, ConversationSnapshot};
