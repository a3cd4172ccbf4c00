//! Reconstruction throughput over a synthetic status log.

use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};

use synctrace::flow::group_flows;
use synctrace::model::{ExecutionRecord, StatusEvent, SyncStatus};
use synctrace::reconcile::reconcile_window;

fn synthetic_log(cycles: i64) -> Vec<StatusEvent> {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut events = Vec::new();
    for cycle in 0..cycles {
        let start = base + Duration::minutes(cycle * 30);
        for (step, status) in [
            SyncStatus::FullLoad,
            SyncStatus::InProgress,
            SyncStatus::InProgress,
            SyncStatus::ListeningChanges,
        ]
        .into_iter()
        .enumerate()
        {
            events.push(StatusEvent {
                id: cycle * 4 + i64::try_from(step).unwrap() + 1,
                schema_name: "public".to_string(),
                table_name: "orders".to_string(),
                db_engine: "postgres".to_string(),
                status,
                processed_at: start + Duration::minutes(i64::try_from(step).unwrap()),
                record_count: Some(cycle * 100),
                message: None,
            });
        }
    }
    events
}

fn synthetic_runs(pairs: i64) -> Vec<ExecutionRecord> {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut records = Vec::new();
    for pair in 0..pairs {
        let start = base + Duration::minutes(pair * 20);
        records.push(ExecutionRecord {
            id: pair * 2 + 1,
            status: SyncStatus::InProgress,
            start_time: start,
            end_time: None,
            duration_seconds: None,
        });
        records.push(ExecutionRecord {
            id: pair * 2 + 2,
            status: SyncStatus::Success,
            start_time: start + Duration::minutes(5),
            end_time: Some(start + Duration::minutes(6)),
            duration_seconds: Some(360),
        });
    }
    records
}

fn bench_reconstruction(c: &mut Criterion) {
    let log = synthetic_log(2_500);
    c.bench_function("group_flows_10k_events", |b| {
        b.iter(|| group_flows(black_box(&log), 50));
    });

    let runs = synthetic_runs(500);
    c.bench_function("reconcile_1k_records", |b| {
        b.iter(|| reconcile_window(black_box(&runs), Duration::hours(24)));
    });
}

criterion_group!(benches, bench_reconstruction);
criterion_main!(benches);
