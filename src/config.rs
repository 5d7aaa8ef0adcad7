//! Audit run configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
///
/// All of these are fatal: a run started with a broken configuration would
/// produce meaningless findings, so validation happens before any detection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid tax rate for {component}: {value} (must be >= 0)")]
    InvalidRate { component: &'static str, value: f64 },

    #[error("Invalid tax tolerance: {0} (must be >= 0)")]
    InvalidTolerance(f64),

    #[error("Invalid fuzzy duplicate threshold: {0} (must be in 0-100)")]
    InvalidThreshold(u8),

    #[error("Invalid outlier z-threshold: {0} (must be > 0)")]
    InvalidZThreshold(f64),

    #[error("Invalid day window for {field}: {value} (must be >= 0)")]
    InvalidWindow { field: &'static str, value: i64 },

    #[error("Invalid round amount unit: {0} (must be at least $0.01)")]
    InvalidRoundUnit(f64),

    #[error("Invalid round amount ratio: {0} (must be in (0, 1])")]
    InvalidRoundRatio(f64),

    #[error("Invalid year-end cluster ratio: {0} (must be in (0, 1])")]
    InvalidClusterRatio(f64),

    #[error("Required column missing from input: {0}")]
    MissingColumn(&'static str),
}

/// Audit engine configuration
///
/// Loaded once per run and read-only to every detector. Defaults match the
/// Quebec TPS/TVQ rates and the recommended tolerances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Expected federal tax (TPS/GST) fraction of the debit amount
    pub tps_rate: f64,
    /// Expected provincial tax (TVQ/QST) fraction of the debit amount
    pub tvq_rate: f64,
    /// Allowed relative deviation from the expected tax before flagging
    pub tax_tolerance: f64,
    /// Minimum description similarity (0-100) for a duplicate candidate
    pub fuzzy_duplicate_threshold: u8,
    /// Maximum day gap between two rows of a duplicate pair
    pub duplicate_date_window_days: i64,
    /// Standard-deviation multiple beyond which an amount is an outlier
    pub outlier_z_threshold: f64,
    /// Compute outlier statistics per normalized vendor instead of globally
    pub group_outliers_by_vendor: bool,
    /// Days past the reference date before a transaction is future-dated
    pub date_future_limit_days: i64,
    /// Days before the reference date beyond which a transaction is stale
    pub date_past_limit_days: i64,
    /// Round unit for the round-amount clustering heuristic
    pub round_amount_unit: f64,
    /// Population fraction of round amounts that triggers the heuristic
    pub round_amount_ratio: f64,
    /// Days around December 31 that count as the year-end window
    pub year_end_window_days: i64,
    /// Population fraction of year-end transactions that triggers the
    /// timing heuristic
    pub year_end_cluster_ratio: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            tps_rate: 0.05,    // federal GST/TPS
            tvq_rate: 0.09975, // Quebec QST/TVQ
            tax_tolerance: 0.05,
            fuzzy_duplicate_threshold: 85,
            duplicate_date_window_days: 3,
            outlier_z_threshold: 3.0,
            group_outliers_by_vendor: false,
            date_future_limit_days: 0,
            date_past_limit_days: 1095, // 3 years
            round_amount_unit: 100.0,
            round_amount_ratio: 0.30,
            year_end_window_days: 30,
            year_end_cluster_ratio: 0.25,
        }
    }
}

impl AuditConfig {
    /// Validate the configuration before a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tps_rate < 0.0 || !self.tps_rate.is_finite() {
            return Err(ConfigError::InvalidRate {
                component: "TPS",
                value: self.tps_rate,
            });
        }
        if self.tvq_rate < 0.0 || !self.tvq_rate.is_finite() {
            return Err(ConfigError::InvalidRate {
                component: "TVQ",
                value: self.tvq_rate,
            });
        }
        if self.tax_tolerance < 0.0 || !self.tax_tolerance.is_finite() {
            return Err(ConfigError::InvalidTolerance(self.tax_tolerance));
        }
        if self.fuzzy_duplicate_threshold > 100 {
            return Err(ConfigError::InvalidThreshold(self.fuzzy_duplicate_threshold));
        }
        if self.outlier_z_threshold <= 0.0 || !self.outlier_z_threshold.is_finite() {
            return Err(ConfigError::InvalidZThreshold(self.outlier_z_threshold));
        }
        for (field, value) in [
            ("duplicate_date_window_days", self.duplicate_date_window_days),
            ("date_future_limit_days", self.date_future_limit_days),
            ("date_past_limit_days", self.date_past_limit_days),
            ("year_end_window_days", self.year_end_window_days),
        ] {
            if value < 0 {
                return Err(ConfigError::InvalidWindow { field, value });
            }
        }
        // The round check works in whole cents; a unit below one cent would
        // truncate to zero there.
        if !self.round_amount_unit.is_finite() || (self.round_amount_unit * 100.0).round() < 1.0 {
            return Err(ConfigError::InvalidRoundUnit(self.round_amount_unit));
        }
        if self.round_amount_ratio <= 0.0 || self.round_amount_ratio > 1.0 {
            return Err(ConfigError::InvalidRoundRatio(self.round_amount_ratio));
        }
        if self.year_end_cluster_ratio <= 0.0 || self.year_end_cluster_ratio > 1.0 {
            return Err(ConfigError::InvalidClusterRatio(self.year_end_cluster_ratio));
        }
        Ok(())
    }
}
