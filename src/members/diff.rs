use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipPolicy {
    /// Only removes members this resource declared before and no longer wants.
    #[default]
    Additive,
    /// Enforces exact equality between declared and actual membership.
    Authoritative,
}

impl MembershipPolicy {
    pub fn from_authoritative(authoritative: bool) -> Self {
        if authoritative {
            Self::Authoritative
        } else {
            Self::Additive
        }
    }

    pub fn is_authoritative(self) -> bool {
        self == Self::Authoritative
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Additive => "additive",
            Self::Authoritative => "authoritative",
        }
    }
}

impl std::fmt::Display for MembershipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes the add and remove sets for one pass.
///
/// `previous_desired` only matters under [`MembershipPolicy::Additive`]; members the
/// conversation has but this resource never declared are left alone there.
pub fn compute_diff(
    desired: &BTreeSet<String>,
    current: &BTreeSet<String>,
    policy: MembershipPolicy,
    previous_desired: &BTreeSet<String>,
) -> MembershipDiff {
    let add = desired.difference(current).cloned().collect();
    let remove = match policy {
        MembershipPolicy::Authoritative => current.difference(desired).cloned().collect(),
        MembershipPolicy::Additive => previous_desired.difference(desired).cloned().collect(),
    };
    MembershipDiff { add, remove }
}
