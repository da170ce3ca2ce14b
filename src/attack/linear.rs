//! Linear dependencies among signature nonces.
//!
//! Every signature contributes one congruence `s_i * k_{u(i)} - z_i ≡ 0`,
//! where `u` maps signature indices to nonce unknowns. With the default
//! one-unknown-per-signature mapping each row solves on its own; mapping
//! several signatures onto one unknown tests the hypothesis that they share a
//! nonce. Optionally the private key `d` joins every row as a common unknown,
//! giving the full signing relation `s_i * k_{u(i)} - r_i * d ≡ z_i`.

use crate::math::linear_system::{LinearSystem, Solution};
use crate::math::ScalarField;
use crate::signature::Signature;
use anyhow::{anyhow, bail, Result};
use num_bigint::BigUint;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unknown {
    Nonce(usize),
    PrivateKey,
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unknown::Nonce(id) => write!(f, "k{}", id),
            Unknown::PrivateKey => write!(f, "d"),
        }
    }
}

/// Assignment of signatures to nonce unknowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnknownMapping {
    /// Signature `i` gets its own unknown `k_i`.
    #[default]
    PerSignature,
    /// Signature `i` uses unknown `k_{ids[i]}`.
    Explicit(Vec<usize>),
}

impl UnknownMapping {
    /// Unknown identifier for each of `len` signatures.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>> {
        match self {
            UnknownMapping::PerSignature => Ok((0..len).collect()),
            UnknownMapping::Explicit(ids) if ids.len() == len => Ok(ids.clone()),
            UnknownMapping::Explicit(ids) => bail!(
                "Unknown mapping has {} entries but the batch has {} signatures",
                ids.len(),
                len
            ),
        }
    }
}

impl FromStr for UnknownMapping {
    type Err = anyhow::Error;

    /// Comma separated identifiers, e.g. `0,0,1`.
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<usize>()
                    .map_err(|_| anyhow!("Invalid unknown identifier: {:?}", part))
            })
            .collect::<Result<Vec<_>>>()
            .map(UnknownMapping::Explicit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    pub mapping: UnknownMapping,
    pub with_private_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub unknown: Unknown,
    pub value: BigUint,
}

/// `unknown = constant + Σ coeff * free`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffineRelation {
    pub unknown: Unknown,
    pub constant: BigUint,
    pub terms: Vec<(Unknown, BigUint)>,
}

impl fmt::Display for AffineRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.unknown, self.constant)?;
        for (free, coeff) in &self.terms {
            write!(f, " + {}*{}", coeff, free)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearOutcome {
    UniqueSolution(Vec<Assignment>),
    Relationships {
        relations: Vec<AffineRelation>,
        free: Vec<Unknown>,
    },
    /// The signature at index `equation` contradicts the ones before it.
    Inconsistent { equation: usize },
    NoEquations,
    /// The mapping has `entries` ids for a batch of `signatures`; nothing was solved.
    InvalidMapping { entries: usize, signatures: usize },
}

/// Builds the congruence system for `signatures` and solves it.
///
/// A mapping that does not fit the batch is reported as
/// [`LinearOutcome::InvalidMapping`] rather than failing the batch.
pub fn solve(
    signatures: &[Signature],
    field: &ScalarField,
    options: &SolverOptions,
) -> LinearOutcome {
    let ids = match options.mapping.resolve(signatures.len()) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("{e}");
            let entries = match &options.mapping {
                UnknownMapping::Explicit(ids) => ids.len(),
                UnknownMapping::PerSignature => signatures.len(),
            };
            return LinearOutcome::InvalidMapping {
                entries,
                signatures: signatures.len(),
            };
        }
    };
    if signatures.is_empty() {
        return LinearOutcome::NoEquations;
    }

    let mut unknowns: Vec<Unknown> = ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(Unknown::Nonce)
        .collect();
    if options.with_private_key {
        unknowns.push(Unknown::PrivateKey);
    }
    let column_of = |unknown: Unknown| unknowns.binary_search(&unknown).ok();

    let mut system = LinearSystem::new(field, unknowns.len());
    for (sig, &id) in signatures.iter().zip(&ids) {
        let mut coeffs = vec![BigUint::default(); unknowns.len()];
        if let Some(col) = column_of(Unknown::Nonce(id)) {
            coeffs[col] = sig.s.clone();
        }
        if let Some(col) = column_of(Unknown::PrivateKey) {
            coeffs[col] = field.neg(&sig.r);
        }
        system.push_row(&coeffs, &sig.z);
    }
    debug!(
        equations = system.len(),
        unknowns = system.columns(),
        "solving nonce congruences"
    );

    match system.solve() {
        Solution::Empty => LinearOutcome::NoEquations,
        Solution::Inconsistent { equation } => LinearOutcome::Inconsistent { equation },
        Solution::Unique(values) => LinearOutcome::UniqueSolution(
            unknowns
                .iter()
                .zip(values)
                .map(|(&unknown, value)| Assignment { unknown, value })
                .collect(),
        ),
        Solution::Parametric { pivots, free } => LinearOutcome::Relationships {
            relations: pivots
                .into_iter()
                .map(|p| AffineRelation {
                    unknown: unknowns[p.column],
                    constant: p.constant,
                    terms: p
                        .terms
                        .into_iter()
                        .map(|(col, coeff)| (unknowns[col], coeff))
                        .collect(),
                })
                .collect(),
            free: free.into_iter().map(|col| unknowns[col]).collect(),
        },
    }
}
