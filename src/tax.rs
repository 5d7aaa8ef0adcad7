//! TPS/TVQ reconciliation
//!
//! Recomputes the expected tax components from the configured rates and
//! flags reported values that deviate beyond tolerance. TPS and TVQ are
//! checked independently: a transaction can yield one finding per component.

use crate::config::AuditConfig;
use crate::{AnomalyKind, Finding, FindingDetail, TaxComponent, Transaction};

/// Check every transaction's reported taxes against the configured rates.
pub fn check(transactions: &[Transaction], config: &AuditConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for txn in transactions {
        if let Some(f) = check_component(txn, TaxComponent::Tps, txn.tps, config.tps_rate, config) {
            findings.push(f);
        }
        if let Some(f) = check_component(txn, TaxComponent::Tvq, txn.tvq, config.tvq_rate, config) {
            findings.push(f);
        }
    }

    findings
}

fn check_component(
    txn: &Transaction,
    component: TaxComponent,
    actual: f64,
    rate: f64,
    config: &AuditConfig,
) -> Option<Finding> {
    let expected = txn.debit * rate;
    let deviation = relative_deviation(expected, actual)?;

    if deviation <= config.tax_tolerance {
        return None;
    }

    Some(Finding {
        transaction_id: txn.id,
        kind: match component {
            TaxComponent::Tps => AnomalyKind::TpsDeviation,
            TaxComponent::Tvq => AnomalyKind::TvqDeviation,
        },
        raw_score: deviation,
        detail: FindingDetail::TaxDeviation {
            component,
            expected,
            actual,
        },
    })
}

/// Relative deviation of the reported value from the expected one.
///
/// When nothing is expected but something was reported there is no
/// meaningful ratio; that case counts as maximal deviation. Nothing
/// expected and nothing reported is clean (None).
fn relative_deviation(expected: f64, actual: f64) -> Option<f64> {
    if expected > 0.0 {
        Some((actual - expected).abs() / expected)
    } else if actual > 0.0 {
        Some(1.0)
    } else {
        None
    }
}
