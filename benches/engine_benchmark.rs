use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ledger_audit::{duplicates, normalizer, AuditConfig, AuditEngine, RawTable};

/// Synthetic ledger with a spread of vendors, amounts and dates, plus a few
/// seeded duplicates so the pairwise scan has real work to do.
fn synthetic_table(rows: usize) -> RawTable {
    let vendors = [
        "Amazon AWS",
        "Bell Canada",
        "Hydro Quebec",
        "Equipment Depot",
        "Consulting Plus",
        "Depanneur Chez Luc",
    ];

    let mut data = Vec::with_capacity(rows);
    for i in 0..rows {
        let vendor = vendors[i % vendors.len()];
        let debit = 50.0 + (i % 97) as f64 * 13.37;
        let tps = debit * 0.05;
        let tvq = debit * 0.09975;
        let day = 1 + (i % 28);
        let month = 1 + (i / 28) % 12;
        data.push(vec![
            format!("2024-{month:02}-{day:02}"),
            vendor.to_string(),
            format!("{debit:.2}"),
            format!("{tps:.2}"),
            format!("{tvq:.2}"),
        ]);
    }
    // Seeded duplicate pairs.
    for i in 0..rows / 50 {
        let source = data[i * 50].clone();
        data.push(source);
    }

    RawTable::new(
        vec![
            "DATE".to_string(),
            "DESCRIPTION".to_string(),
            "DEBIT".to_string(),
            "TPS".to_string(),
            "TVQ".to_string(),
        ],
        data,
    )
}

fn bench_full_run(c: &mut Criterion) {
    let engine = AuditEngine::new();
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut group = c.benchmark_group("audit_run");
    for size in [100usize, 500, 2000] {
        let table = synthetic_table(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| engine.run_as_of(table, as_of).unwrap());
        });
    }
    group.finish();
}

fn bench_duplicate_scan(c: &mut Criterion) {
    let config = AuditConfig::default();

    let mut group = c.benchmark_group("duplicate_scan");
    for size in [100usize, 500, 2000] {
        let table = synthetic_table(size);
        let (transactions, _) = normalizer::normalize(&table).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &transactions,
            |b, txns| {
                b.iter(|| duplicates::detect(txns, &config));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_full_run, bench_duplicate_scan);
criterion_main!(benches);
