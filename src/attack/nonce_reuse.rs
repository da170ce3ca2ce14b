//! Nonce reuse detection and private key recovery

use super::Attack;
use crate::math::{recover_nonce, recover_private_key, ScalarField};
use crate::signature::{group_by_r, Signature, SignatureGroup};
use num_bigint::BigUint;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Two or more signatures sharing one `r`.
///
/// Equal `r` is taken as evidence of a shared nonce. Distinct nonces mapping to
/// the same `r` is assumed not to happen.
pub type ReuseGroup = SignatureGroup;

/// Which reuse groups key recovery is attempted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Only the first reuse group, even if it turns out degenerate.
    #[default]
    First,
    /// Every reuse group, in order.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Recovered,
    NoReuse,
    /// `s_i1 - s_i2 ≡ 0`, so the nonce cannot be isolated.
    DegenerateSDifference,
    /// `r ≡ 0`, so the key cannot be isolated from the nonce.
    DegenerateR,
    /// Fewer than two members, or a member index outside the batch.
    InvalidGroup,
}

impl RecoveryStatus {
    /// Why no key came out of the attempt, `None` on success.
    pub fn reason(self) -> Option<&'static str> {
        match self {
            RecoveryStatus::Recovered => None,
            RecoveryStatus::NoReuse => Some("no signatures share an r value"),
            RecoveryStatus::DegenerateSDifference => {
                Some("s1 == s2 mod n, nonce cannot be isolated")
            }
            RecoveryStatus::DegenerateR => Some("r == 0 mod n, key cannot be isolated"),
            RecoveryStatus::InvalidGroup => {
                Some("group does not name two signatures of the batch")
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecoveryStatus::Recovered => "recovered",
            RecoveryStatus::NoReuse => "no_reuse",
            RecoveryStatus::DegenerateSDifference => "degenerate_s_difference",
            RecoveryStatus::DegenerateR => "degenerate_r",
            RecoveryStatus::InvalidGroup => "invalid_group",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecovery {
    pub status: RecoveryStatus,
    /// Position of the reuse group in the detection output.
    pub group: Option<usize>,
    /// The two signature indices the computation used.
    pub pair: Option<(usize, usize)>,
    pub nonce: Option<BigUint>,
    pub private_key: Option<BigUint>,
}

impl KeyRecovery {
    pub fn no_reuse() -> Self {
        Self {
            status: RecoveryStatus::NoReuse,
            group: None,
            pair: None,
            nonce: None,
            private_key: None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        self.status == RecoveryStatus::Recovered
    }
}

/// Shared-nonce detection and key recovery as one attack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonceReuseAttack {
    pub policy: RecoveryPolicy,
}

impl NonceReuseAttack {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self { policy }
    }
}

impl Attack for NonceReuseAttack {
    fn name(&self) -> &'static str {
        "nonce-reuse"
    }

    fn min_signatures(&self) -> usize {
        2
    }

    fn detect(&self, signatures: &[Signature]) -> Vec<ReuseGroup> {
        find_reuse_groups(signatures)
    }

    fn recover(
        &self,
        signatures: &[Signature],
        groups: &[ReuseGroup],
        field: &ScalarField,
    ) -> Vec<KeyRecovery> {
        recover_key(signatures, groups, field, self.policy)
    }
}

/// Returns the groups of indices with identical `r`, of size two or more.
pub fn find_reuse_groups(signatures: &[Signature]) -> Vec<ReuseGroup> {
    group_by_r(signatures)
        .into_iter()
        .filter(|g| g.indices.len() >= 2)
        .collect()
}

/// Attempts key recovery on the groups selected by `policy`.
///
/// Always returns at least one entry: a lone `NoReuse` when `groups` is empty.
pub fn recover_key(
    signatures: &[Signature],
    groups: &[ReuseGroup],
    field: &ScalarField,
    policy: RecoveryPolicy,
) -> Vec<KeyRecovery> {
    if groups.is_empty() {
        debug!("no reuse groups, skipping key recovery");
        return vec![KeyRecovery::no_reuse()];
    }

    let limit = match policy {
        RecoveryPolicy::First => 1,
        RecoveryPolicy::All => groups.len(),
    };

    groups
        .iter()
        .enumerate()
        .take(limit)
        .map(|(g, group)| recover_from_group(signatures, g, group, field))
        .collect()
}

/// Picks the attempt the report leads with: the first success, else the first attempt.
pub fn primary_recovery(attempts: &[KeyRecovery]) -> KeyRecovery {
    attempts
        .iter()
        .find(|a| a.is_recovered())
        .or_else(|| attempts.first())
        .cloned()
        .unwrap_or_else(KeyRecovery::no_reuse)
}

/// Uses the first two members of the group; further members are ignored.
fn recover_from_group(
    signatures: &[Signature],
    group_index: usize,
    group: &ReuseGroup,
    field: &ScalarField,
) -> KeyRecovery {
    let mut attempt = KeyRecovery {
        status: RecoveryStatus::InvalidGroup,
        group: Some(group_index),
        pair: None,
        nonce: None,
        private_key: None,
    };

    let (i1, i2) = match group.indices.as_slice() {
        [i1, i2, ..] => (*i1, *i2),
        _ => {
            warn!(
                group = group_index,
                members = group.indices.len(),
                "reuse group has fewer than two members"
            );
            return attempt;
        }
    };
    let (Some(sig1), Some(sig2)) = (signatures.get(i1), signatures.get(i2)) else {
        warn!(
            group = group_index,
            i1,
            i2,
            batch = signatures.len(),
            "reuse group index outside the batch"
        );
        return attempt;
    };
    attempt.pair = Some((i1, i2));
    attempt.status = RecoveryStatus::DegenerateSDifference;

    let Some(k) = recover_nonce(field, &sig1.z, &sig2.z, &sig1.s, &sig2.s) else {
        warn!(group = group_index, i1, i2, "s values coincide mod n, nonce not recoverable");
        return attempt;
    };

    match recover_private_key(field, &sig1.r, &sig1.s, &sig1.z, &k) {
        Some(d) => {
            info!(group = group_index, i1, i2, "private key recovered from reused nonce");
            attempt.status = RecoveryStatus::Recovered;
            attempt.private_key = Some(d);
        }
        None => {
            warn!(group = group_index, "r is zero mod n, private key not recoverable");
            attempt.status = RecoveryStatus::DegenerateR;
        }
    }
    attempt.nonce = Some(k);
    attempt
}
