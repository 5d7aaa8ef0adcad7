//! Date sanity checking
//!
//! Pure threshold check against an injected reference date: future-dated
//! transactions and transactions older than the configured bound are
//! flagged. The score is the distance from the valid window in days.

use crate::config::AuditConfig;
use crate::{AnomalyKind, Finding, FindingDetail, Transaction};
use chrono::NaiveDate;

pub fn check(transactions: &[Transaction], config: &AuditConfig, as_of: NaiveDate) -> Vec<Finding> {
    let future_cutoff = as_of + chrono::Duration::days(config.date_future_limit_days);
    let past_cutoff = as_of - chrono::Duration::days(config.date_past_limit_days);

    transactions
        .iter()
        .filter_map(|txn| {
            if txn.date > future_cutoff {
                let days = (txn.date - future_cutoff).num_days();
                Some(out_of_range(txn, days, true))
            } else if txn.date < past_cutoff {
                let days = (past_cutoff - txn.date).num_days();
                Some(out_of_range(txn, days, false))
            } else {
                None
            }
        })
        .collect()
}

fn out_of_range(txn: &Transaction, days_outside: i64, future: bool) -> Finding {
    Finding {
        transaction_id: txn.id,
        kind: AnomalyKind::DateAnomaly,
        raw_score: days_outside as f64,
        detail: FindingDetail::DateOutOfRange {
            days_outside,
            future,
        },
    }
}
