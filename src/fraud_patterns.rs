//! Fraud pattern heuristics
//!
//! Three weak signals that complement the deterministic checks:
//!
//! - **Round-amount clustering**: invoices tend to have irregular amounts;
//!   a ledger where a large fraction of debits are exact multiples of a
//!   round unit suggests estimated or fabricated figures rather than real
//!   bills. Population-level, so every contributing transaction is flagged
//!   once the fraction exceeds the configured ratio.
//! - **Year-end clustering**: a disproportionate share of transactions
//!   dated close to December 31 suggests timing shifted across the fiscal
//!   cutoff for tax advantages.
//! - **Address/vendor collision**: several distinct vendor names billing
//!   from the same normalized address is a shell-company indicator.
//!
//! All three signals carry inherently lower confidence than rule-based
//! checks; the aggregator caps their severity unless corroborated.

use crate::config::AuditConfig;
use crate::{normalize_vendor, AnomalyKind, Finding, FindingDetail, Transaction};
use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

/// Below this population size a cluster fraction is statistically
/// meaningless and the population heuristics abstain.
const CLUSTER_MIN_POPULATION: usize = 10;

pub fn detect(transactions: &[Transaction], config: &AuditConfig) -> Vec<Finding> {
    let mut findings = detect_round_amounts(transactions, config);
    findings.extend(detect_year_end_clustering(transactions, config));
    findings.extend(detect_vendor_collisions(transactions));
    findings
}

fn detect_round_amounts(transactions: &[Transaction], config: &AuditConfig) -> Vec<Finding> {
    if transactions.len() < CLUSTER_MIN_POPULATION {
        return Vec::new();
    }

    let unit_cents = (config.round_amount_unit * 100.0).round() as i64;
    let round: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| is_round(t.debit, unit_cents))
        .collect();

    let ratio = round.len() as f64 / transactions.len() as f64;
    if ratio <= config.round_amount_ratio {
        return Vec::new();
    }

    round
        .iter()
        .map(|txn| Finding {
            transaction_id: txn.id,
            kind: AnomalyKind::RoundAmountPattern,
            raw_score: ratio,
            detail: FindingDetail::RoundAmountCluster { ratio },
        })
        .collect()
}

/// Cent-exact multiple check; float modulo on dollar values is not reliable.
/// `unit_cents >= 1` is guaranteed by config validation.
fn is_round(debit: f64, unit_cents: i64) -> bool {
    let debit_cents = (debit * 100.0).round() as i64;
    debit_cents > 0 && debit_cents % unit_cents == 0
}

fn detect_year_end_clustering(
    transactions: &[Transaction],
    config: &AuditConfig,
) -> Vec<Finding> {
    if transactions.len() < CLUSTER_MIN_POPULATION {
        return Vec::new();
    }

    let clustered: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| days_from_year_end(t.date) <= config.year_end_window_days)
        .collect();

    let ratio = clustered.len() as f64 / transactions.len() as f64;
    if ratio <= config.year_end_cluster_ratio {
        return Vec::new();
    }

    clustered
        .iter()
        .map(|txn| Finding {
            transaction_id: txn.id,
            kind: AnomalyKind::YearEndClustering,
            raw_score: ratio,
            detail: FindingDetail::YearEndCluster { ratio },
        })
        .collect()
}

/// Distance in days to the nearest December 31, on either side.
///
/// Works from the transaction's own calendar position, so the signal does
/// not depend on the reference date: a mid-January row is 15 days past the
/// previous year-end no matter when the audit runs.
fn days_from_year_end(date: chrono::NaiveDate) -> i64 {
    let days_in_year: i64 = if date.leap_year() { 366 } else { 365 };
    let ordinal = i64::from(date.ordinal());
    // `ordinal` days past the previous Dec 31, or the remainder of the year
    // until the next one.
    ordinal.min(days_in_year - ordinal)
}

fn detect_vendor_collisions(transactions: &[Transaction]) -> Vec<Finding> {
    // BTreeMap keeps group iteration deterministic.
    let mut by_address: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for txn in transactions {
        if let Some(address) = &txn.address {
            let key = normalize_address(address);
            if !key.is_empty() {
                by_address.entry(key).or_default().push(txn);
            }
        }
    }

    let mut findings = Vec::new();
    for (address, group) in by_address {
        let vendors: BTreeSet<String> = group
            .iter()
            .map(|t| normalize_vendor(&t.description))
            .collect();
        if vendors.len() < 2 {
            continue;
        }

        let vendor_list: Vec<String> = vendors.into_iter().collect();
        for txn in group {
            findings.push(Finding {
                transaction_id: txn.id,
                kind: AnomalyKind::VendorCollision,
                raw_score: vendor_list.len() as f64,
                detail: FindingDetail::VendorCollision {
                    address: address.clone(),
                    vendors: vendor_list.clone(),
                },
            });
        }
    }

    findings
}

/// Case-fold, drop punctuation and collapse whitespace, so
/// "123 Main St." and "123  MAIN ST" group together.
fn normalize_address(address: &str) -> String {
    address
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // Mid-year date keeps these fixtures out of the year-end window.
    fn txn(id: usize, description: &str, debit: f64, address: Option<&str>) -> Transaction {
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            description: description.to_uppercase(),
            debit,
            tps: 0.0,
            tvq: 0.0,
            address: address.map(String::from),
        }
    }

    fn dated(id: usize, date: &str, debit: f64) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ..txn(id, "Vendor", debit, None)
        }
    }

    #[test]
    fn test_round_cluster_flagged() {
        // 5 of 12 amounts are multiples of $100: ratio 0.42 over the 0.30 bar.
        let mut transactions: Vec<Transaction> = (0..7)
            .map(|i| txn(i, "Vendor", 137.45 + i as f64, None))
            .collect();
        for i in 7..12 {
            transactions.push(txn(i, "Vendor", 500.0, None));
        }

        let findings = detect(&transactions, &AuditConfig::default());

        assert_eq!(findings.len(), 5);
        assert!(findings
            .iter()
            .all(|f| f.kind == AnomalyKind::RoundAmountPattern));
        assert!((findings[0].raw_score - 5.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_round_cluster_below_ratio_abstains() {
        // Only 2 of 12 round amounts.
        let mut transactions: Vec<Transaction> = (0..10)
            .map(|i| txn(i, "Vendor", 137.45 + i as f64, None))
            .collect();
        transactions.push(txn(10, "Vendor", 500.0, None));
        transactions.push(txn(11, "Vendor", 300.0, None));

        assert!(detect(&transactions, &AuditConfig::default()).is_empty());
    }

    #[test]
    fn test_round_cluster_small_population_abstains() {
        // All round, but far too few rows to call it a pattern.
        let transactions: Vec<Transaction> =
            (0..5).map(|i| txn(i, "Vendor", 500.0, None)).collect();

        assert!(detect(&transactions, &AuditConfig::default()).is_empty());
    }

    #[test]
    fn test_round_unit_configurable() {
        let config = AuditConfig {
            round_amount_unit: 1000.0,
            ..Default::default()
        };
        // $500 is round for unit 100 but not for unit 1000.
        let transactions: Vec<Transaction> = (0..6)
            .map(|i| txn(i, "Vendor", 500.0, None))
            .chain((6..12).map(|i| txn(i, "Vendor", 137.45, None)))
            .collect();

        assert!(detect(&transactions, &config).is_empty());
    }

    #[test]
    fn test_days_from_year_end() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert_eq!(days_from_year_end(d("2024-12-31")), 0);
        assert_eq!(days_from_year_end(d("2025-01-01")), 1);
        assert_eq!(days_from_year_end(d("2024-12-01")), 30);
        assert_eq!(days_from_year_end(d("2024-01-15")), 15);
        assert_eq!(days_from_year_end(d("2024-06-15")), 167);
    }

    #[test]
    fn test_year_end_cluster_flagged() {
        // 4 of 12 rows within 30 days of Dec 31: ratio 0.33 over the 0.25 bar.
        let mut transactions: Vec<Transaction> = (0..8)
            .map(|i| txn(i, "Vendor", 137.45 + i as f64, None))
            .collect();
        transactions.push(dated(8, "2023-12-15", 141.30));
        transactions.push(dated(9, "2023-12-28", 142.15));
        transactions.push(dated(10, "2024-01-05", 143.70));
        transactions.push(dated(11, "2024-01-20", 144.05));

        let findings = detect(&transactions, &AuditConfig::default());

        assert_eq!(findings.len(), 4);
        assert!(findings
            .iter()
            .all(|f| f.kind == AnomalyKind::YearEndClustering));
        assert!((findings[0].raw_score - 4.0 / 12.0).abs() < 1e-12);
        let flagged: Vec<usize> = findings.iter().map(|f| f.transaction_id).collect();
        assert_eq!(flagged, vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_year_end_below_ratio_abstains() {
        // Only 2 of 12 rows near year-end.
        let mut transactions: Vec<Transaction> = (0..10)
            .map(|i| txn(i, "Vendor", 137.45 + i as f64, None))
            .collect();
        transactions.push(dated(10, "2023-12-28", 141.30));
        transactions.push(dated(11, "2024-01-05", 142.15));

        assert!(detect(&transactions, &AuditConfig::default()).is_empty());
    }

    #[test]
    fn test_year_end_window_configurable() {
        let narrow = AuditConfig {
            year_end_window_days: 2,
            ..Default::default()
        };
        // All rows are 5 days from Dec 31, outside a 2-day window.
        let transactions: Vec<Transaction> = (0..12)
            .map(|i| dated(i, "2024-01-05", 137.45 + i as f64))
            .collect();

        assert!(detect(&transactions, &narrow).is_empty());
        // The default 30-day window catches them all.
        assert_eq!(detect(&transactions, &AuditConfig::default()).len(), 12);
    }

    #[test]
    fn test_vendor_collision_flagged() {
        let transactions = vec![
            txn(0, "Construction ABC", 1000.0, Some("123 Main St.")),
            txn(1, "Renovations XYZ", 2000.0, Some("123  MAIN ST")),
            txn(2, "Bell Canada", 150.0, Some("1 Carrefour Alexander-Graham-Bell")),
        ];

        let findings = detect_vendor_collisions(&transactions);

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == AnomalyKind::VendorCollision));
        assert!(matches!(
            &findings[0].detail,
            FindingDetail::VendorCollision { vendors, .. } if vendors.len() == 2
        ));
    }

    #[test]
    fn test_same_vendor_same_address_not_flagged() {
        let transactions = vec![
            txn(0, "Bell Canada", 150.0, Some("123 Main St")),
            txn(1, "BELL CANADA", 150.0, Some("123 Main St")),
        ];

        assert!(detect_vendor_collisions(&transactions).is_empty());
    }

    #[test]
    fn test_no_address_data_abstains() {
        let transactions = vec![
            txn(0, "Vendor A", 150.0, None),
            txn(1, "Vendor B", 150.0, None),
        ];

        assert!(detect_vendor_collisions(&transactions).is_empty());
    }
}
