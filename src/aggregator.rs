//! Risk aggregation and ranking
//!
//! Collapses raw detector findings into the final anomaly list: at most one
//! record per (transaction, category), severity and confidence derived from
//! the raw score, financial impact estimated per category, and the whole
//! list ordered for review by descending impact.

use crate::config::AuditConfig;
use crate::{
    AnomalyKind, AnomalyRecord, Finding, FindingDetail, RiskTier, Transaction,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Confidence added per corroborating category on the same transaction
const CORROBORATION_BOOST: f64 = 10.0;

pub fn aggregate(
    findings: Vec<Finding>,
    transactions: &[Transaction],
    config: &AuditConfig,
) -> Vec<AnomalyRecord> {
    let by_id: BTreeMap<usize, &Transaction> =
        transactions.iter().map(|t| (t.id, t)).collect();

    // One finding per (transaction, category), keeping the strongest.
    let mut grouped: BTreeMap<(usize, AnomalyKind), Finding> = BTreeMap::new();
    for finding in findings {
        match grouped.entry((finding.transaction_id, finding.kind)) {
            Entry::Vacant(slot) => {
                slot.insert(finding);
            }
            Entry::Occupied(mut slot) => {
                if finding.raw_score > slot.get().raw_score {
                    slot.insert(finding);
                }
            }
        }
    }

    // Distinct categories per transaction, for corroboration.
    let mut categories_per_txn: BTreeMap<usize, usize> = BTreeMap::new();
    for (txn_id, _) in grouped.keys() {
        *categories_per_txn.entry(*txn_id).or_insert(0) += 1;
    }

    let mut records: Vec<AnomalyRecord> = grouped
        .into_values()
        .filter_map(|finding| {
            let txn = by_id.get(&finding.transaction_id).copied()?;
            let corroborations = categories_per_txn
                .get(&finding.transaction_id)
                .copied()
                .unwrap_or(1)
                - 1;
            Some(build_record(finding, txn, corroborations, config))
        })
        .collect();

    // Descending impact, then descending confidence, then original row
    // order; the category index is a last-resort tiebreak within one row.
    records.sort_by(|a, b| {
        b.impact_estimate
            .total_cmp(&a.impact_estimate)
            .then(b.confidence.total_cmp(&a.confidence))
            .then(a.transaction_id.cmp(&b.transaction_id))
            .then(a.kind.cmp(&b.kind))
    });

    records
}

fn build_record(
    finding: Finding,
    txn: &Transaction,
    corroborations: usize,
    config: &AuditConfig,
) -> AnomalyRecord {
    let corroborated = corroborations > 0;
    let risk_tier = tier_for(&finding, corroborated, config);
    let confidence = (base_confidence(&finding, config)
        + CORROBORATION_BOOST * corroborations as f64)
        .clamp(0.0, 100.0);

    AnomalyRecord {
        transaction_id: finding.transaction_id,
        kind: finding.kind,
        description: describe(&finding, txn),
        vendor: txn.description.clone(),
        amount: txn.debit,
        impact_estimate: impact_for(&finding.detail, txn),
        risk_tier,
        recommendation: recommendation_for(finding.kind).to_string(),
        confidence,
    }
}

/// Severity per category. Population-level fraud signals stay below
/// CRITICAL unless a second independent category corroborates the same
/// transaction.
fn tier_for(finding: &Finding, corroborated: bool, config: &AuditConfig) -> RiskTier {
    let score = finding.raw_score;
    match finding.kind {
        AnomalyKind::TpsDeviation | AnomalyKind::TvqDeviation => {
            if score >= 0.50 {
                RiskTier::Critical
            } else if score >= 0.15 {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
        AnomalyKind::DuplicateInvoice => {
            if score >= 100.0 {
                RiskTier::Critical
            } else {
                RiskTier::Medium
            }
        }
        AnomalyKind::AmountOutlier => {
            if score >= 2.0 * config.outlier_z_threshold {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
        AnomalyKind::DateAnomaly => RiskTier::Low,
        AnomalyKind::RoundAmountPattern => {
            if score < 0.60 {
                RiskTier::Low
            } else if corroborated {
                RiskTier::Critical
            } else {
                RiskTier::Medium
            }
        }
        // Timing is the weakest signal; the original review process never
        // escalated it on its own.
        AnomalyKind::YearEndClustering => RiskTier::Low,
        AnomalyKind::VendorCollision => RiskTier::Medium,
    }
}

/// Raw score normalized to the category's expected range, 0-100.
fn base_confidence(finding: &Finding, config: &AuditConfig) -> f64 {
    let score = finding.raw_score;
    match finding.kind {
        AnomalyKind::TpsDeviation | AnomalyKind::TvqDeviation => {
            normalized(score, config.tax_tolerance, 1.0)
        }
        // The similarity score is already on the 0-100 scale.
        AnomalyKind::DuplicateInvoice => score.clamp(0.0, 100.0),
        AnomalyKind::AmountOutlier => normalized(
            score,
            config.outlier_z_threshold,
            3.0 * config.outlier_z_threshold,
        ),
        AnomalyKind::DateAnomaly => match finding.detail {
            FindingDetail::DateOutOfRange { future: true, .. } => 95.0,
            _ => 80.0,
        },
        // Population heuristics carry less weight than rule-based checks.
        AnomalyKind::RoundAmountPattern => {
            40.0 + normalized(score, config.round_amount_ratio, 1.0) * 0.35
        }
        AnomalyKind::YearEndClustering => {
            30.0 + normalized(score, config.year_end_cluster_ratio, 1.0) * 0.35
        }
        AnomalyKind::VendorCollision => (60.0 + 5.0 * (score - 2.0)).clamp(60.0, 80.0),
    }
}

fn normalized(score: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 100.0;
    }
    ((score - lo) / (hi - lo)).clamp(0.0, 1.0) * 100.0
}

/// Financial exposure implied by the anomaly; 0 when not quantifiable.
fn impact_for(detail: &FindingDetail, txn: &Transaction) -> f64 {
    match detail {
        FindingDetail::TaxDeviation {
            expected, actual, ..
        } => (actual - expected).abs(),
        FindingDetail::DuplicatePair { .. } => txn.debit,
        FindingDetail::AmountOutlier { mean, .. } => txn.debit - mean,
        FindingDetail::DateOutOfRange { .. } => 0.0,
        // Partial exposure for the population heuristics: 5% of the amount
        // for round figures, 2% for shifted timing.
        FindingDetail::RoundAmountCluster { .. } => txn.debit * 0.05,
        FindingDetail::YearEndCluster { .. } => txn.debit * 0.02,
        FindingDetail::VendorCollision { .. } => txn.debit,
    }
}

fn describe(finding: &Finding, txn: &Transaction) -> String {
    match &finding.detail {
        FindingDetail::TaxDeviation {
            component,
            expected,
            actual,
        } => format!(
            "{component} reported ${actual:.2} vs expected ${expected:.2}"
        ),
        FindingDetail::DuplicatePair {
            earlier_id,
            similarity,
        } => format!(
            "Possible duplicate of row {earlier_id}: ${:.2} on {} (similarity {similarity})",
            txn.debit, txn.date
        ),
        FindingDetail::AmountOutlier { mean, .. } => format!(
            "Amount ${:.2} is {:.1} standard deviations above the mean ${mean:.2}",
            txn.debit, finding.raw_score
        ),
        FindingDetail::DateOutOfRange {
            days_outside,
            future,
        } => {
            if *future {
                format!("Dated {}, {days_outside} days in the future", txn.date)
            } else {
                format!(
                    "Dated {}, {days_outside} days beyond the stale bound",
                    txn.date
                )
            }
        }
        FindingDetail::RoundAmountCluster { ratio } => format!(
            "{:.1}% of ledger amounts are exact multiples of a round unit",
            ratio * 100.0
        ),
        FindingDetail::YearEndCluster { ratio } => format!(
            "{:.1}% of ledger transactions are dated close to year-end",
            ratio * 100.0
        ),
        FindingDetail::VendorCollision { address, vendors } => format!(
            "{} vendors share address \"{address}\": {}",
            vendors.len(),
            vendors.join(", ")
        ),
    }
}

fn recommendation_for(kind: AnomalyKind) -> &'static str {
    match kind {
        AnomalyKind::DuplicateInvoice => {
            "Check whether this is a double payment or two legitimate charges"
        }
        AnomalyKind::TpsDeviation | AnomalyKind::TvqDeviation => {
            "Verify the vendor's tax registration number or an applicable exemption"
        }
        AnomalyKind::AmountOutlier => "Confirm the amount against the source invoice",
        AnomalyKind::DateAnomaly => "Verify the transaction date against the source document",
        AnomalyKind::RoundAmountPattern => {
            "Round amounts may be estimates rather than actual invoices"
        }
        AnomalyKind::YearEndClustering => {
            "Check whether transaction timing was shifted across year-end for tax advantages"
        }
        AnomalyKind::VendorCollision => {
            "Verify vendor identities; a shared address can indicate shell companies"
        }
    }
}
