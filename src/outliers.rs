//! Statistical outlier detection on debit amounts
//!
//! Flags amounts that sit far above the population mean in standard
//! deviations. The population is either the whole run or, when configured,
//! the transactions of a single normalized vendor. With fewer than two data
//! points or zero spread there is no meaningful deviation and the detector
//! abstains.

use crate::config::AuditConfig;
use crate::{normalize_vendor, AnomalyKind, Finding, FindingDetail, Transaction};
use std::collections::BTreeMap;

pub fn detect(transactions: &[Transaction], config: &AuditConfig) -> Vec<Finding> {
    if !config.group_outliers_by_vendor {
        return scan(transactions.iter().collect(), config);
    }

    // BTreeMap keeps vendor iteration deterministic.
    let mut by_vendor: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for txn in transactions {
        by_vendor
            .entry(normalize_vendor(&txn.description))
            .or_default()
            .push(txn);
    }

    by_vendor
        .into_values()
        .flat_map(|group| scan(group, config))
        .collect()
}

fn scan(population: Vec<&Transaction>, config: &AuditConfig) -> Vec<Finding> {
    if population.len() < 2 {
        return Vec::new();
    }

    let amounts: Vec<f64> = population.iter().map(|t| t.debit).collect();
    let (mean, std_dev) = mean_std(&amounts);
    if std_dev == 0.0 {
        return Vec::new();
    }

    population
        .iter()
        .filter_map(|txn| {
            let z = (txn.debit - mean) / std_dev;
            (z > config.outlier_z_threshold).then(|| Finding {
                transaction_id: txn.id,
                kind: AnomalyKind::AmountOutlier,
                raw_score: z,
                detail: FindingDetail::AmountOutlier { mean, std_dev },
            })
        })
        .collect()
}

/// Mean and sample standard deviation (n-1 denominator).
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}
