//! Ledger audit example
//!
//! Builds a small purchase ledger with a few seeded problems (a duplicate
//! invoice, a TPS shortfall, a future date, a statistical outlier) and
//! prints the ranked anomaly list an auditor would review.

use chrono::NaiveDate;
use ledger_audit::{AuditEngine, RawTable};

fn main() {
    env_logger::init();

    println!("=== Purchase Ledger Audit ===\n");

    let headers = vec!["DATE", "DESCRIPTION", "DEBIT", "TPS", "TVQ", "ADDRESS"];
    let rows = vec![
        vec!["2024-01-15", "Amazon AWS", "500.00", "25.00", "49.88", ""],
        // Same invoice, entered twice with sloppier formatting.
        vec!["2024-01-15", "AMAZON AWS ", "500.00", "25.00", "49.88", ""],
        // TPS reported at half the expected rate.
        vec!["2024-02-01", "Bell Canada", "153.00", "3.80", "15.26", ""],
        vec!["2024-02-10", "Hydro Quebec", "412.33", "20.62", "41.13", ""],
        // Future-dated row.
        vec!["2099-01-01", "Consulting Plus", "275.00", "13.75", "27.43", ""],
        // Two vendor names billing from one address.
        vec![
            "2024-03-05",
            "Construction ABC",
            "1200.00",
            "60.00",
            "119.70",
            "123 Main St.",
        ],
        vec![
            "2024-03-12",
            "Renovations XYZ",
            "980.00",
            "49.00",
            "97.76",
            "123  MAIN ST",
        ],
        // An amount far outside the population.
        vec!["2024-03-20", "Equipment Depot", "48000.00", "2400.00", "4788.00", ""],
        vec!["2024-03-22", "Depanneur Chez Luc", "38.12", "1.91", "3.80", ""],
        // Everyday charges to give the statistics a baseline.
        vec!["2024-04-02", "Postes Canada", "89.45", "4.47", "8.92", ""],
        vec!["2024-04-05", "Bureau en Gros", "132.80", "6.64", "13.25", ""],
        vec!["2024-04-09", "Uline Shipping", "76.31", "3.82", "7.61", ""],
        vec!["2024-04-12", "Garage Tremblay", "210.15", "10.51", "20.96", ""],
        vec!["2024-04-16", "Cafe Depot", "54.60", "2.73", "5.45", ""],
        vec!["2024-04-19", "Imprimerie Locale", "340.25", "17.01", "33.94", ""],
        vec!["2024-04-23", "Videotron", "118.90", "5.95", "11.86", ""],
        vec!["2024-04-26", "Nettoyage Pro", "95.73", "4.79", "9.55", ""],
        vec!["2024-05-01", "Quincaillerie Roy", "167.42", "8.37", "16.70", ""],
        vec!["2024-05-06", "Transport Gagnon", "221.08", "11.05", "22.05", ""],
        // A row the normalizer will reject.
        vec!["not-a-date", "Broken Import", "99.00", "4.95", "9.88", ""],
    ];
    let table = RawTable::new(headers, rows);

    let engine = AuditEngine::new();
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
    let report = engine.run_as_of(&table, as_of).expect("valid configuration");

    println!(
        "Audited {} transactions ({} rows excluded)\n",
        report.transactions_audited,
        report.row_errors.len()
    );

    for error in &report.row_errors {
        println!("  excluded {error}");
    }
    if !report.row_errors.is_empty() {
        println!();
    }

    println!("{} anomalies, total impact ${:.2}\n", report.anomalies.len(), report.total_impact());

    for anomaly in &report.anomalies {
        println!(
            "[{}] {} — {}",
            anomaly.risk_tier, anomaly.kind, anomaly.vendor
        );
        println!("    {}", anomaly.description);
        println!(
            "    impact ${:.2} | confidence {:.0}/100",
            anomaly.impact_estimate, anomaly.confidence
        );
        println!("    -> {}\n", anomaly.recommendation);
    }
}
