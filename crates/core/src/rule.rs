// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule engine: maps a record's match status to a provisioning disposition.
//!
//! Pure: no I/O, no clock. Identical inputs always yield identical outputs.

use crate::task::{MatchingRule, ProvisioningCommon, UnmatchingRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an externally-observed record relates to the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchStatus {
    /// No authoritative counterpart exists.
    Unmatched,
    /// Corresponds to an authoritative identity.
    Matched {
        /// Key of the matched authoritative record.
        identity: String,
        /// The external record has disappeared upstream; the match is a
        /// leftover authoritative entry flagged for removal.
        #[serde(default)]
        vanished: bool,
    },
}

/// Why a record produced no external side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    /// Unmatched record, unmatching rule says ignore.
    UnmatchedIgnored,
    /// Matched record, matching rule says ignore.
    MatchedIgnored,
    /// Matched record, matching rule says skip. Recorded distinctly from
    /// ignore for audit.
    MatchedSkipped,
    /// Rule indicated create but `perform_create` is off.
    CreateSuppressed,
    /// Rule indicated update but `perform_update` is off.
    UpdateSuppressed,
    /// Record vanished upstream but `perform_delete` is off.
    DeleteSuppressed,
}

impl fmt::Display for NoopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoopReason::UnmatchedIgnored => write!(f, "unmatched-ignored"),
            NoopReason::MatchedIgnored => write!(f, "matched-ignored"),
            NoopReason::MatchedSkipped => write!(f, "matched-skipped"),
            NoopReason::CreateSuppressed => write!(f, "create-suppressed"),
            NoopReason::UpdateSuppressed => write!(f, "update-suppressed"),
            NoopReason::DeleteSuppressed => write!(f, "delete-suppressed"),
        }
    }
}

/// The action decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Disposition {
    Create,
    Update,
    Delete,
    Noop { reason: NoopReason },
    /// A failed apply captured as a remediation item instead of aborting
    /// the run. Produced by the runner, never by [`disposition`].
    Remediate,
}

impl Disposition {
    /// True when executing this disposition touches the external system.
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self,
            Disposition::Create | Disposition::Update | Disposition::Delete
        )
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Create => write!(f, "CREATE"),
            Disposition::Update => write!(f, "UPDATE"),
            Disposition::Delete => write!(f, "DELETE"),
            Disposition::Noop { reason } => write!(f, "NOOP({})", reason),
            Disposition::Remediate => write!(f, "REMEDIATE"),
        }
    }
}

/// Compute the disposition for one record.
///
/// Unmatched records follow the unmatching rule, matched records the
/// matching rule; the perform flags suppress (never add) actions. A
/// matched record whose external counterpart vanished maps to DELETE when
/// `perform_delete` allows it, regardless of the matching rule's
/// UPDATE/IGNORE choice. SKIP still wins, since skip means "hands off".
pub fn disposition(status: &MatchStatus, rules: &ProvisioningCommon) -> Disposition {
    match status {
        MatchStatus::Unmatched => match rules.unmatching_rule {
            UnmatchingRule::Assign | UnmatchingRule::Provision => {
                if rules.perform_create {
                    Disposition::Create
                } else {
                    Disposition::Noop {
                        reason: NoopReason::CreateSuppressed,
                    }
                }
            }
            UnmatchingRule::Ignore => Disposition::Noop {
                reason: NoopReason::UnmatchedIgnored,
            },
        },
        MatchStatus::Matched { vanished, .. } => match rules.matching_rule {
            MatchingRule::Skip => Disposition::Noop {
                reason: NoopReason::MatchedSkipped,
            },
            MatchingRule::Update | MatchingRule::Ignore if *vanished => {
                if rules.perform_delete {
                    Disposition::Delete
                } else {
                    Disposition::Noop {
                        reason: NoopReason::DeleteSuppressed,
                    }
                }
            }
            MatchingRule::Update => {
                if rules.perform_update {
                    Disposition::Update
                } else {
                    Disposition::Noop {
                        reason: NoopReason::UpdateSuppressed,
                    }
                }
            }
            MatchingRule::Ignore => Disposition::Noop {
                reason: NoopReason::MatchedIgnored,
            },
        },
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
