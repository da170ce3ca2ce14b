//! Signature batch analyzers.
//!
//! Nonce reuse is the one detect-then-recover attack and sits behind the
//! [`Attack`] trait. Low-S classification and the linear solver are plain
//! functions of the batch and the scalar field; neither depends on another
//! analyzer's state.

use crate::math::ScalarField;
use crate::signature::Signature;

pub mod linear;
pub mod low_s;
pub mod nonce_reuse;

pub use linear::{LinearOutcome, SolverOptions, UnknownMapping};
pub use low_s::low_s_indices;
pub use nonce_reuse::{
    find_reuse_groups, recover_key, KeyRecovery, NonceReuseAttack, RecoveryPolicy,
    RecoveryStatus, ReuseGroup,
};

pub trait Attack: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_signatures(&self) -> usize;
    fn detect(&self, signatures: &[Signature]) -> Vec<ReuseGroup>;
    fn recover(
        &self,
        signatures: &[Signature],
        groups: &[ReuseGroup],
        field: &ScalarField,
    ) -> Vec<KeyRecovery>;
}
