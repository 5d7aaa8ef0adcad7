//! # Ledger Audit
//!
//! A purchase-ledger anomaly detection engine for fiscal review.
//!
//! The engine ingests a normalized transaction table (date, vendor
//! description, debit amount, TPS/TVQ tax components, optional address) and
//! produces a risk-ranked, explained anomaly list for human review.
//!
//! ## Checks
//!
//! - **Tax Reconciliation**: recomputes expected TPS/TVQ from configured
//!   rates and flags deviations beyond tolerance
//! - **Duplicate Detection**: fuzzy description similarity plus amount and
//!   date proximity to catch double-entered invoices
//! - **Statistical Outliers**: z-score detection of extreme amounts
//! - **Date Sanity**: future-dated and stale transactions
//! - **Fraud Patterns**: round-amount clustering, year-end timing
//!   clustering, and shared-address / differing-vendor collisions
//!   (shell-vendor indicator)
//!
//! The engine is a pure in-memory computation: no I/O, no persistence, and
//! identical input always yields identical ordered output. It surfaces
//! candidates for human review, not final determinations.

pub mod aggregator;
pub mod config;
pub mod dates;
pub mod duplicates;
pub mod fraud_patterns;
pub mod normalizer;
pub mod outliers;
pub mod tax;

pub use config::{AuditConfig, ConfigError};
pub use normalizer::{RawTable, RowError, RowErrorKind};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A normalized ledger row, immutable for the duration of one audit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable raw-row index in the source table
    pub id: usize,
    pub date: NaiveDate,
    /// Vendor description, trimmed and uppercased by the normalizer
    pub description: String,
    /// Debit amount, always >= 0
    pub debit: f64,
    /// Reported federal tax component
    pub tps: f64,
    /// Reported provincial tax component
    pub tvq: f64,
    pub address: Option<String>,
}

/// Tax component a finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxComponent {
    Tps,
    Tvq,
}

impl std::fmt::Display for TaxComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxComponent::Tps => write!(f, "TPS"),
            TaxComponent::Tvq => write!(f, "TVQ"),
        }
    }
}

/// Anomaly category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    DuplicateInvoice,
    TpsDeviation,
    TvqDeviation,
    AmountOutlier,
    DateAnomaly,
    RoundAmountPattern,
    YearEndClustering,
    VendorCollision,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::DuplicateInvoice => write!(f, "Duplicate invoice"),
            AnomalyKind::TpsDeviation => write!(f, "TPS deviation"),
            AnomalyKind::TvqDeviation => write!(f, "TVQ deviation"),
            AnomalyKind::AmountOutlier => write!(f, "Statistical outlier"),
            AnomalyKind::DateAnomaly => write!(f, "Date anomaly"),
            AnomalyKind::RoundAmountPattern => write!(f, "Round-amount pattern"),
            AnomalyKind::YearEndClustering => write!(f, "Year-end clustering"),
            AnomalyKind::VendorCollision => write!(f, "Vendor address collision"),
        }
    }
}

/// Coarse severity tier of an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    Critical,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Medium => write!(f, "MEDIUM"),
            RiskTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Category-specific evidence attached to a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FindingDetail {
    TaxDeviation {
        component: TaxComponent,
        expected: f64,
        actual: f64,
    },
    DuplicatePair {
        earlier_id: usize,
        similarity: u8,
    },
    AmountOutlier {
        mean: f64,
        std_dev: f64,
    },
    DateOutOfRange {
        days_outside: i64,
        future: bool,
    },
    RoundAmountCluster {
        ratio: f64,
    },
    YearEndCluster {
        ratio: f64,
    },
    VendorCollision {
        address: String,
        vendors: Vec<String>,
    },
}

/// One detector's raw output for one transaction
///
/// Ephemeral: produced and consumed within a single run, then collapsed
/// into [`AnomalyRecord`]s by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub transaction_id: usize,
    pub kind: AnomalyKind,
    /// Category-specific magnitude, used for severity ranking
    pub raw_score: f64,
    pub detail: FindingDetail,
}

/// Final output unit handed to the reporting/UI collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub transaction_id: usize,
    pub kind: AnomalyKind,
    /// Explanation text carrying expected-vs-actual detail
    pub description: String,
    pub vendor: String,
    pub amount: f64,
    /// Financial exposure implied by the anomaly; 0 when not quantifiable
    pub impact_estimate: f64,
    pub risk_tier: RiskTier,
    pub recommendation: String,
    /// Confidence in the finding, 0-100
    pub confidence: f64,
}

/// Result of one audit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Anomalies ordered by impact, then confidence, then row order
    pub anomalies: Vec<AnomalyRecord>,
    /// Rows excluded during normalization
    pub row_errors: Vec<RowError>,
    /// Number of transactions that passed normalization
    pub transactions_audited: usize,
}

impl AuditReport {
    /// Total financial exposure across all anomalies
    pub fn total_impact(&self) -> f64 {
        self.anomalies.iter().map(|a| a.impact_estimate).sum()
    }

    /// Number of anomalies at a given risk tier
    pub fn count_by_tier(&self, tier: RiskTier) -> usize {
        self.anomalies.iter().filter(|a| a.risk_tier == tier).count()
    }

    /// Export as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Case-fold and collapse whitespace so "Amazon  AWS " and "AMAZON AWS"
/// compare equal. Used for vendor grouping and duplicate matching.
pub(crate) fn normalize_vendor(description: &str) -> String {
    description
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The anomaly-detection engine
///
/// Holds a validated configuration; each [`run`](AuditEngine::run) is an
/// independent, idempotent pass over one table.
pub struct AuditEngine {
    config: AuditConfig,
}

impl AuditEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self {
            config: AuditConfig::default(),
        }
    }

    /// Create an engine with a custom configuration, validating it up front
    pub fn with_config(config: AuditConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit a raw table, using today as the reference date
    pub fn run(&self, table: &RawTable) -> Result<AuditReport, ConfigError> {
        self.run_as_of(table, chrono::Utc::now().date_naive())
    }

    /// Audit a raw table against an explicit reference date.
    ///
    /// With a fixed `as_of`, identical input and configuration always yield
    /// identical ordered output.
    pub fn run_as_of(&self, table: &RawTable, as_of: NaiveDate) -> Result<AuditReport, ConfigError> {
        let (transactions, row_errors) = normalizer::normalize(table)?;

        log::info!(
            "audit run: {} transactions, {} rows excluded",
            transactions.len(),
            row_errors.len()
        );
        for err in &row_errors {
            log::warn!("{err}");
        }

        // Detectors are independent passes over the same read-only table;
        // the aggregator is the only synchronization point.
        let mut findings = Vec::new();
        findings.extend(tax::check(&transactions, &self.config));
        findings.extend(duplicates::detect(&transactions, &self.config));
        findings.extend(outliers::detect(&transactions, &self.config));
        findings.extend(dates::check(&transactions, &self.config, as_of));
        findings.extend(fraud_patterns::detect(&transactions, &self.config));

        log::debug!("{} raw findings before aggregation", findings.len());

        let anomalies = aggregator::aggregate(findings, &transactions, &self.config);

        log::info!(
            "audit complete: {} anomalies, total impact ${:.2}",
            anomalies.len(),
            anomalies.iter().map(|a| a.impact_estimate).sum::<f64>()
        );

        Ok(AuditReport {
            anomalies,
            row_errors,
            transactions_audited: transactions.len(),
        })
    }
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_table(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(vec!["DATE", "DESCRIPTION", "DEBIT", "TPS", "TVQ"], rows)
    }

    #[test]
    fn test_clean_ledger_produces_no_anomalies() {
        let engine = AuditEngine::new();
        let table = ledger_table(vec![
            vec!["2024-01-15", "Amazon AWS", "500", "25", "49.88"],
            vec!["2024-02-01", "Bell Canada", "153", "7.65", "15.26"],
        ]);
        let report = engine
            .run_as_of(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        assert!(report.anomalies.is_empty());
        assert!(report.row_errors.is_empty());
        assert_eq!(report.transactions_audited, 2);
    }

    #[test]
    fn test_run_is_idempotent() {
        let engine = AuditEngine::new();
        let table = ledger_table(vec![
            vec!["2024-01-15", "Amazon AWS", "500", "10", "49.88"],
            vec!["2024-01-15", "AMAZON AWS ", "500", "10", "49.88"],
            vec!["2099-01-01", "Time Traveller Inc", "200", "10", "19.95"],
        ]);
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let first = engine.run_as_of(&table, as_of).unwrap();
        let second = engine.run_as_of(&table, as_of).unwrap();

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_duplicate_pair_and_tax_findings_are_separate_records() {
        let engine = AuditEngine::new();
        // Both rows have a bad TPS and they duplicate each other.
        let table = ledger_table(vec![
            vec!["2024-01-15", "Amazon AWS", "500", "10", "49.88"],
            vec!["2024-01-15", "AMAZON AWS ", "500", "10", "49.88"],
        ]);
        let report = engine
            .run_as_of(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::DuplicateInvoice));
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::TpsDeviation));
        // One record per (transaction, category): two TPS records, one
        // duplicate record attributed to the later row.
        assert_eq!(
            report
                .anomalies
                .iter()
                .filter(|a| a.kind == AnomalyKind::TpsDeviation)
                .count(),
            2
        );
        assert_eq!(
            report
                .anomalies
                .iter()
                .filter(|a| a.kind == AnomalyKind::DuplicateInvoice)
                .count(),
            1
        );
    }

    #[test]
    fn test_ranking_by_impact_over_tier() {
        let engine = AuditEngine::new();
        // Row 0: TPS off by 1000 (reported 1025 vs expected 25).
        // Row 1: TPS off by 500 (reported 510 vs expected 10).
        let table = ledger_table(vec![
            vec!["2024-01-15", "Vendor A", "500", "1025", "49.88"],
            vec!["2024-01-16", "Vendor B", "200", "510", "19.95"],
        ]);
        let report = engine
            .run_as_of(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        let tps: Vec<&AnomalyRecord> = report
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::TpsDeviation)
            .collect();
        assert_eq!(tps.len(), 2);
        assert!(tps[0].impact_estimate > tps[1].impact_estimate);
        assert_eq!(tps[0].transaction_id, 0);
    }

    #[test]
    fn test_row_errors_surface_alongside_anomalies() {
        let engine = AuditEngine::new();
        let table = ledger_table(vec![
            vec!["2024-01-15", "Amazon AWS", "500", "25", "49.88"],
            vec!["garbage", "Broken Row", "500", "25", "49.88"],
        ]);
        let report = engine
            .run_as_of(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        assert_eq!(report.transactions_audited, 1);
        assert_eq!(report.row_errors.len(), 1);
        assert_eq!(report.row_errors[0].kind, RowErrorKind::BadDate);
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let config = AuditConfig {
            tax_tolerance: -1.0,
            ..Default::default()
        };
        assert!(AuditEngine::with_config(config).is_err());
    }

    #[test]
    fn test_report_summaries() {
        let engine = AuditEngine::new();
        let table = ledger_table(vec![
            vec!["2024-01-15", "Vendor A", "500", "1025", "49.88"],
            vec!["2099-01-01", "Vendor B", "200", "10", "19.95"],
        ]);
        let report = engine
            .run_as_of(&table, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        assert!(report.total_impact() > 0.0);
        let counted: usize = [RiskTier::Low, RiskTier::Medium, RiskTier::Critical]
            .iter()
            .map(|t| report.count_by_tier(*t))
            .sum();
        assert_eq!(counted, report.anomalies.len());
    }

    #[test]
    fn test_normalize_vendor() {
        assert_eq!(normalize_vendor("  Amazon   AWS "), "amazon aws");
        assert_eq!(normalize_vendor("AMAZON AWS"), "amazon aws");
    }
}
