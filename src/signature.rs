//! Signature data types and grouping logic

use crate::math::{InputPolicy, ScalarField, ScalarKind};
use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw record as it appears in JSON or CSV input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInput {
    pub r: String,
    pub s: String,
    pub z: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
    pub z: BigUint,
}

impl Signature {
    pub fn new(r: impl Into<BigUint>, s: impl Into<BigUint>, z: impl Into<BigUint>) -> Self {
        Self {
            r: r.into(),
            s: s.into(),
            z: z.into(),
        }
    }

    /// Parses and range checks one input record against `field`.
    pub fn from_input(
        input: &SignatureInput,
        field: &ScalarField,
        policy: InputPolicy,
    ) -> Result<Self> {
        let r = field
            .parse_scalar(&input.r, ScalarKind::RorS, policy)
            .context("field r")?;
        let s = field
            .parse_scalar(&input.s, ScalarKind::RorS, policy)
            .context("field s")?;
        let z = field
            .parse_scalar(&input.z, ScalarKind::Z, policy)
            .context("field z")?;
        Ok(Self { r, s, z })
    }
}

/// Converts every record, naming the offending index on failure.
pub fn parse_batch(
    inputs: &[SignatureInput],
    field: &ScalarField,
    policy: InputPolicy,
) -> Result<Vec<Signature>> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            Signature::from_input(input, field, policy)
                .with_context(|| format!("Invalid signature at index {}", i))
        })
        .collect()
}

/// Batch indices sharing one `r` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureGroup {
    pub r: BigUint,
    pub indices: Vec<usize>,
}

/// Groups signature indices by exact `r` equality.
///
/// Groups come out in order of first occurrence of their `r`, indices
/// ascending within a group. No `r` / `n - r` normalization is done.
pub fn group_by_r(sigs: &[Signature]) -> Vec<SignatureGroup> {
    let mut positions: HashMap<&BigUint, usize> = HashMap::new();
    let mut groups: Vec<SignatureGroup> = Vec::new();

    for (i, sig) in sigs.iter().enumerate() {
        match positions.get(&sig.r) {
            Some(&g) => groups[g].indices.push(i),
            None => {
                positions.insert(&sig.r, groups.len());
                groups.push(SignatureGroup {
                    r: sig.r.clone(),
                    indices: vec![i],
                });
            }
        }
    }

    groups
}
