//! Low-S classification.
//!
//! A signature is low-S when `s <= floor(n / 2)`. For an odd prime `n` this is
//! the same as `s < n / 2` over the rationals. High-S signatures are valid but
//! non-canonical; this is informational, not a vulnerability.

use crate::math::ScalarField;
use crate::signature::Signature;

/// Indices of low-S signatures, ascending.
pub fn low_s_indices(signatures: &[Signature], field: &ScalarField) -> Vec<usize> {
    let half = field.half();
    signatures
        .iter()
        .enumerate()
        .filter(|(_, sig)| sig.s <= *half)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_boundary_small_field() {
        let field = ScalarField::new(BigUint::from(17u32)).unwrap();
        let sigs = vec![
            Signature::new(1u32, 8u32, 1u32),
            Signature::new(1u32, 9u32, 1u32),
            Signature::new(1u32, 1u32, 1u32),
            Signature::new(1u32, 16u32, 1u32),
        ];
        assert_eq!(low_s_indices(&sigs, &field), vec![0, 2]);
    }

    #[test]
    fn test_boundary_secp256k1() {
        let field = ScalarField::secp256k1();
        let half = field.half().clone();
        let sigs = vec![
            Signature::new(1u32, half.clone() + 1u32, 1u32),
            Signature::new(1u32, half, 1u32),
        ];
        assert_eq!(low_s_indices(&sigs, &field), vec![1]);
    }

    #[test]
    fn test_empty_batch() {
        let field = ScalarField::secp256k1();
        assert!(low_s_indices(&[], &field).is_empty());
    }
}
