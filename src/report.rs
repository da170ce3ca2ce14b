//! Runs every analyzer over one batch and collects the results.
//!
//! [`AnalysisReport`] serializes through [`ReportOutput`]: field elements as
//! `{decimal, hex}` pairs, recovery statuses in snake case, and the linear
//! outcome tagged by `outcome`.

use crate::attack::linear::{self, AffineRelation, LinearOutcome, SolverOptions};
use crate::attack::low_s::low_s_indices;
use crate::attack::nonce_reuse::{
    primary_recovery, KeyRecovery, NonceReuseAttack, RecoveryPolicy, RecoveryStatus, ReuseGroup,
};
use crate::attack::Attack;
use crate::math::{to_decimal_string, ScalarField};
use crate::signature::Signature;
use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use tracing::info;

/// Everything the analyzers need besides the batch itself.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub field: ScalarField,
    pub recovery: RecoveryPolicy,
    pub solver: SolverOptions,
}

impl AnalysisConfig {
    pub fn new(field: ScalarField) -> Self {
        Self {
            field,
            recovery: RecoveryPolicy::default(),
            solver: SolverOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Field the batch was analyzed over; fixes the hex width on output.
    pub field: ScalarField,
    pub total_signatures: usize,
    pub reuse_groups: Vec<ReuseGroup>,
    /// First successful recovery, else the first attempt, else `NoReuse`.
    pub recovered_key: KeyRecovery,
    pub recovery_attempts: Vec<KeyRecovery>,
    pub low_s_indices: Vec<usize>,
    pub linear_dependency: LinearOutcome,
}

impl AnalysisReport {
    pub fn keys_recovered(&self) -> usize {
        self.recovery_attempts
            .iter()
            .filter(|a| a.is_recovered())
            .count()
    }

    /// Nonce reuse is the only finding treated as a vulnerability.
    pub fn has_vulnerabilities(&self) -> bool {
        !self.reuse_groups.is_empty()
    }

    /// Renders the report into its serializable shape.
    pub fn output(&self) -> ReportOutput {
        let field = &self.field;
        ReportOutput {
            modulus: FieldValue::new(field, field.modulus()),
            reuse_groups: self
                .reuse_groups
                .iter()
                .map(|g| ReuseGroupOutput {
                    r: FieldValue::new(field, &g.r),
                    indices: g.indices.clone(),
                })
                .collect(),
            recovered_key: KeyRecoveryOutput::new(field, &self.recovered_key),
            recovery_attempts: self
                .recovery_attempts
                .iter()
                .map(|a| KeyRecoveryOutput::new(field, a))
                .collect(),
            low_s_indices: self.low_s_indices.clone(),
            linear_dependency: LinearOutput::new(field, &self.linear_dependency),
            summary: SummaryOutput {
                total_signatures: self.total_signatures,
                reuse_groups_found: self.reuse_groups.len(),
                keys_recovered: self.keys_recovered(),
                low_s_count: self.low_s_indices.len(),
            },
        }
    }
}

impl Serialize for AnalysisReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.output().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutput {
    pub modulus: FieldValue,
    pub reuse_groups: Vec<ReuseGroupOutput>,
    pub recovered_key: KeyRecoveryOutput,
    pub recovery_attempts: Vec<KeyRecoveryOutput>,
    pub low_s_indices: Vec<usize>,
    pub linear_dependency: LinearOutput,
    pub summary: SummaryOutput,
}

/// A field element in both notations; `hex` is padded to the modulus width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub decimal: String,
    pub hex: String,
}

impl FieldValue {
    pub fn new(field: &ScalarField, value: &BigUint) -> Self {
        Self {
            decimal: to_decimal_string(value),
            hex: field.to_hex(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReuseGroupOutput {
    pub r: FieldValue,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecoveryOutput {
    pub status: RecoveryStatus,
    pub group: Option<usize>,
    pub signatures: Option<[usize; 2]>,
    pub nonce: Option<FieldValue>,
    pub private_key: Option<FieldValue>,
    pub reason: Option<&'static str>,
}

impl KeyRecoveryOutput {
    fn new(field: &ScalarField, recovery: &KeyRecovery) -> Self {
        Self {
            status: recovery.status,
            group: recovery.group,
            signatures: recovery.pair.map(|(a, b)| [a, b]),
            nonce: recovery.nonce.as_ref().map(|k| FieldValue::new(field, k)),
            private_key: recovery
                .private_key
                .as_ref()
                .map(|d| FieldValue::new(field, d)),
            reason: recovery.status.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinearOutput {
    UniqueSolution {
        values: Vec<AssignmentOutput>,
    },
    Relationships {
        free: Vec<String>,
        relations: Vec<RelationOutput>,
    },
    Inconsistent {
        equation: usize,
    },
    NoEquations,
    InvalidMapping {
        entries: usize,
        signatures: usize,
    },
}

impl LinearOutput {
    fn new(field: &ScalarField, outcome: &LinearOutcome) -> Self {
        match outcome {
            LinearOutcome::UniqueSolution(values) => LinearOutput::UniqueSolution {
                values: values
                    .iter()
                    .map(|a| AssignmentOutput {
                        unknown: a.unknown.to_string(),
                        value: FieldValue::new(field, &a.value),
                    })
                    .collect(),
            },
            LinearOutcome::Relationships { relations, free } => LinearOutput::Relationships {
                free: free.iter().map(|u| u.to_string()).collect(),
                relations: relations
                    .iter()
                    .map(|r| RelationOutput::new(field, r))
                    .collect(),
            },
            LinearOutcome::Inconsistent { equation } => LinearOutput::Inconsistent {
                equation: *equation,
            },
            LinearOutcome::NoEquations => LinearOutput::NoEquations,
            LinearOutcome::InvalidMapping {
                entries,
                signatures,
            } => LinearOutput::InvalidMapping {
                entries: *entries,
                signatures: *signatures,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOutput {
    pub unknown: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationOutput {
    pub unknown: String,
    pub constant: FieldValue,
    pub terms: Vec<TermOutput>,
    /// Human readable form, e.g. `k0 = 16 + 9*d`.
    pub expression: String,
}

impl RelationOutput {
    fn new(field: &ScalarField, relation: &AffineRelation) -> Self {
        Self {
            unknown: relation.unknown.to_string(),
            constant: FieldValue::new(field, &relation.constant),
            terms: relation
                .terms
                .iter()
                .map(|(unknown, coeff)| TermOutput {
                    unknown: unknown.to_string(),
                    coefficient: FieldValue::new(field, coeff),
                })
                .collect(),
            expression: relation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermOutput {
    pub unknown: String,
    pub coefficient: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryOutput {
    pub total_signatures: usize,
    pub reuse_groups_found: usize,
    pub keys_recovered: usize,
    pub low_s_count: usize,
}

/// Runs all four analyzers.
///
/// Every analyzer outcome, degenerate or not, is recorded in the report,
/// including an unknown mapping that does not fit the batch.
pub fn analyze(signatures: &[Signature], config: &AnalysisConfig) -> AnalysisReport {
    info!(
        signatures = signatures.len(),
        modulus_bits = config.field.modulus().bits(),
        "analyzing batch"
    );

    let field = &config.field;
    let attack = NonceReuseAttack::new(config.recovery);
    let reuse_groups = attack.detect(signatures);
    let recovery_attempts = attack.recover(signatures, &reuse_groups, field);
    let recovered_key = primary_recovery(&recovery_attempts);
    let low_s = low_s_indices(signatures, field);
    let linear_dependency = linear::solve(signatures, field, &config.solver);

    let report = AnalysisReport {
        field: field.clone(),
        total_signatures: signatures.len(),
        reuse_groups,
        recovered_key,
        recovery_attempts,
        low_s_indices: low_s,
        linear_dependency,
    };

    info!(
        attack = attack.name(),
        reuse_groups = report.reuse_groups.len(),
        keys_recovered = report.keys_recovered(),
        low_s = report.low_s_indices.len(),
        "analysis complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::linear::UnknownMapping;
    use crate::attack::nonce_reuse::RecoveryStatus;
    use num_bigint::BigUint;

    fn f17() -> ScalarField {
        ScalarField::new(BigUint::from(17u32)).unwrap()
    }

    #[test]
    fn test_empty_batch_reports_nothing() {
        let report = analyze(&[], &AnalysisConfig::new(f17()));
        assert_eq!(report.total_signatures, 0);
        assert!(report.reuse_groups.is_empty());
        assert_eq!(report.recovered_key.status, RecoveryStatus::NoReuse);
        assert!(report.low_s_indices.is_empty());
        assert_eq!(report.linear_dependency, LinearOutcome::NoEquations);
        assert!(!report.has_vulnerabilities());
    }

    #[test]
    fn test_bad_mapping_is_recorded_and_other_analyzers_run() {
        let mut config = AnalysisConfig::new(f17());
        config.solver.mapping = UnknownMapping::Explicit(vec![0]);
        let sigs = vec![Signature::new(5u32, 2u32, 3u32), Signature::new(5u32, 5u32, 6u32)];
        let report = analyze(&sigs, &config);

        assert_eq!(
            report.linear_dependency,
            LinearOutcome::InvalidMapping {
                entries: 1,
                signatures: 2
            }
        );
        assert_eq!(report.reuse_groups.len(), 1);
        assert!(report.recovered_key.is_recovered());
        assert_eq!(report.low_s_indices, vec![0, 1]);
    }

    #[test]
    fn test_report_serializes_with_tags_and_status_names() {
        let sigs = vec![
            Signature::new(5u32, 10u32, 7u32),
            Signature::new(5u32, 12u32, 9u32),
            Signature::new(8u32, 3u32, 1u32),
        ];
        let json = serde_json::to_value(analyze(&sigs, &AnalysisConfig::new(f17()))).unwrap();

        assert_eq!(json["modulus"]["decimal"], "17");
        assert_eq!(json["modulus"]["hex"], "11");
        assert_eq!(json["reuse_groups"][0]["indices"], serde_json::json!([0, 1]));
        assert_eq!(json["recovered_key"]["status"], "recovered");
        assert_eq!(json["recovered_key"]["signatures"], serde_json::json!([0, 1]));
        assert_eq!(json["recovered_key"]["nonce"]["decimal"], "1");
        assert_eq!(json["recovered_key"]["private_key"]["hex"], "04");
        assert!(json["recovered_key"]["reason"].is_null());
        assert_eq!(json["low_s_indices"], serde_json::json!([2]));
        assert_eq!(json["linear_dependency"]["outcome"], "unique_solution");
        assert_eq!(json["linear_dependency"]["values"][0]["unknown"], "k0");
        assert_eq!(json["summary"]["total_signatures"], 3);
        assert_eq!(json["summary"]["reuse_groups_found"], 1);
        assert_eq!(json["summary"]["keys_recovered"], 1);
        assert_eq!(json["summary"]["low_s_count"], 1);
    }

    #[test]
    fn test_degenerate_and_invalid_mapping_serialize() {
        let mut config = AnalysisConfig::new(f17());
        config.solver.mapping = UnknownMapping::Explicit(vec![0, 0, 0]);
        let sigs = vec![Signature::new(5u32, 10u32, 7u32), Signature::new(5u32, 10u32, 9u32)];
        let json = serde_json::to_value(analyze(&sigs, &config)).unwrap();

        assert_eq!(json["recovered_key"]["status"], "degenerate_s_difference");
        assert!(json["recovered_key"]["reason"].is_string());
        assert!(json["recovered_key"]["private_key"].is_null());
        assert_eq!(json["linear_dependency"]["outcome"], "invalid_mapping");
        assert_eq!(json["linear_dependency"]["entries"], 3);
        assert_eq!(json["linear_dependency"]["signatures"], 2);
    }

    #[test]
    fn test_empty_batch_serializes_no_reuse() {
        let json = serde_json::to_value(analyze(&[], &AnalysisConfig::new(f17()))).unwrap();
        assert_eq!(json["recovered_key"]["status"], "no_reuse");
        assert_eq!(json["linear_dependency"]["outcome"], "no_equations");
        assert_eq!(json["reuse_groups"], serde_json::json!([]));
    }

    #[test]
    fn test_degenerate_recovery_does_not_block_other_analyzers() {
        let sigs = vec![Signature::new(5u32, 10u32, 7u32), Signature::new(5u32, 10u32, 9u32)];
        let report = analyze(&sigs, &AnalysisConfig::new(f17()));
        assert_eq!(
            report.recovered_key.status,
            RecoveryStatus::DegenerateSDifference
        );
        assert_eq!(report.keys_recovered(), 0);
        assert!(report.has_vulnerabilities());
        assert!(report.low_s_indices.is_empty());
        assert!(matches!(
            report.linear_dependency,
            LinearOutcome::UniqueSolution(_)
        ));
    }
}
