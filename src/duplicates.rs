//! Fuzzy duplicate invoice detection
//!
//! Finds pairs of transactions that look like the same invoice entered
//! twice: near-identical descriptions, amounts equal to the cent, and dates
//! within a short window. The window also keeps legitimately recurring
//! charges (same vendor, months apart) out of the results.
//!
//! The scan is O(n²) over the transaction set, which is acceptable at the
//! expected scale of thousands of rows per run. If that ever becomes a
//! bottleneck, blocking by amount bucket before the pairwise comparison
//! would cut the candidate space without changing results.

use crate::config::AuditConfig;
use crate::{normalize_vendor, AnomalyKind, Finding, FindingDetail, Transaction};

/// Scan for duplicate candidate pairs. Each unordered pair is considered
/// once; a qualifying pair yields one finding attributed to the later row.
pub fn detect(transactions: &[Transaction], config: &AuditConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    // Normalized descriptions computed once, not per pair.
    let normalized: Vec<String> = transactions
        .iter()
        .map(|t| token_sort(&t.description))
        .collect();

    for i in 0..transactions.len() {
        for j in (i + 1)..transactions.len() {
            let (a, b) = (&transactions[i], &transactions[j]);

            let day_gap = (b.date - a.date).num_days().abs();
            if day_gap > config.duplicate_date_window_days {
                continue;
            }
            if !amounts_equal_to_cent(a.debit, b.debit) {
                continue;
            }

            let score = similarity(&normalized[i], &normalized[j]);
            if score < config.fuzzy_duplicate_threshold {
                continue;
            }

            findings.push(Finding {
                transaction_id: b.id,
                kind: AnomalyKind::DuplicateInvoice,
                raw_score: score as f64,
                detail: FindingDetail::DuplicatePair {
                    earlier_id: a.id,
                    similarity: score,
                },
            });
        }
    }

    findings
}

fn amounts_equal_to_cent(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// Case-fold, collapse whitespace and sort tokens, so word order and
/// formatting differences do not affect the comparison.
fn token_sort(description: &str) -> String {
    let normalized = normalize_vendor(description);
    let mut tokens: Vec<&str> = normalized.split(' ').collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two already token-sorted strings, 0-100.
///
/// Levenshtein distance normalized by the longer string's length.
pub(crate) fn similarity(a: &str, b: &str) -> u8 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100;
    }
    let distance = levenshtein(a, b);
    (100.0 * (1.0 - distance as f64 / max_len as f64)).round() as u8
}

/// Classic two-row Levenshtein.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, &ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution_cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + substitution_cost)
                .min(prev[j + 1] + 1)
                .min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
