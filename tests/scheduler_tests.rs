//! Integration tests for the build scheduler's pool semantics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stackpilot::orchestrator::{BuildScheduler, Job, SchedulerSettings};
use stackpilot::report::{ProgressEvent, ProgressSink};

fn pool(workers: usize, subprocesses: usize) -> BuildScheduler {
    BuildScheduler::new(
        &SchedulerSettings {
            worker_threads: workers,
            subprocesses_per_worker: subprocesses,
        },
        None,
    )
    .expect("valid pool shape")
}

#[tokio::test]
async fn test_capacity_invariant_across_expansion() {
    let scheduler = pool(2, 2);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    for i in 0..10 {
        let in_flight = Arc::clone(&in_flight);
        let violations = Arc::clone(&violations);
        let scheduler_probe = scheduler.clone();
        scheduler
            .enqueue(Job::new(format!("svc-{i}"), move |_ctx| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                let (_, _, limit) = scheduler_probe.snapshot();
                if now > limit {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok("ok".to_string())
            }))
            .expect("enqueue");
        if i == 4 {
            // Mid-flight expansion with queued jobs must keep the
            // invariant against the new, larger limit.
            scheduler.expand_capacity();
        }
    }

    scheduler.drain().await;
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.results().len(), 10);
}

#[tokio::test]
async fn test_drain_resolves_immediately_when_idle() {
    let scheduler = pool(2, 2);
    tokio::time::timeout(Duration::from_millis(50), scheduler.drain())
        .await
        .expect("idle pool must not block drain");
}

#[tokio::test]
async fn test_one_idle_signal_wakes_all_waiters() {
    let scheduler = pool(1, 1);
    scheduler
        .enqueue(Job::new("api", |_ctx| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("done".to_string())
        }))
        .expect("enqueue");

    let first = {
        let s = scheduler.clone();
        tokio::spawn(async move { s.drain().await })
    };
    let second = {
        let s = scheduler.clone();
        tokio::spawn(async move { s.drain().await })
    };

    tokio::time::timeout(Duration::from_secs(2), async {
        first.await.expect("waiter one");
        second.await.expect("waiter two");
    })
    .await
    .expect("both waiters woke");
}

#[tokio::test]
async fn test_two_phase_schedule_defers_heavy_job() {
    // The coordinator's build policy: light jobs at base capacity, a
    // strict drain barrier, then the heavy job at expanded capacity.
    let starts: Arc<Mutex<Vec<(String, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_starts = Arc::clone(&starts);
    let sink: ProgressSink = Arc::new(move |event| {
        if let ProgressEvent::Start { service, limit, .. } = event {
            sink_starts.lock().unwrap().push((service, limit));
        }
    });

    let scheduler = BuildScheduler::new(
        &SchedulerSettings {
            worker_threads: 2,
            subprocesses_per_worker: 2,
        },
        Some(sink),
    )
    .unwrap();

    for name in ["a", "b"] {
        scheduler
            .enqueue(Job::new(name, |_ctx| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok("built".to_string())
            }))
            .unwrap();
    }
    scheduler.drain().await;

    scheduler.expand_capacity();
    scheduler
        .enqueue(Job::new("heavy", |_ctx| async { Ok("built".to_string()) }))
        .unwrap();
    scheduler.drain().await;

    let results = scheduler.results();
    assert_eq!(results.len(), 3, "three-entry result summary");

    let starts = starts.lock().unwrap().clone();
    assert_eq!(starts.len(), 3);
    // Light jobs started under the base limit; heavy under the expanded.
    assert!(starts[0].1 == 2 && starts[1].1 == 2);
    assert_eq!(starts[2], ("heavy".to_string(), 4));
    // The drain barrier means the heavy start is strictly last.
    assert!(
        results
            .iter()
            .filter(|r| r.id != "heavy")
            .all(|r| r.finished_at <= results.iter().find(|h| h.id == "heavy").unwrap().started_at)
    );
}

#[tokio::test]
async fn test_fifo_admission_order() {
    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let scheduler = pool(1, 1);

    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        scheduler
            .enqueue(Job::new(name, move |ctx| async move {
                order.lock().unwrap().push(ctx.service().to_string());
                Ok("ok".to_string())
            }))
            .unwrap();
    }
    scheduler.drain().await;

    assert_eq!(
        order.lock().unwrap().clone(),
        vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string()
        ]
    );
}

#[tokio::test]
async fn test_job_timing_recorded() {
    let scheduler = pool(1, 1);
    let handle = scheduler
        .enqueue(Job::new("api", |_ctx| async {
            tokio::time::sleep(Duration::from_millis(15)).await;
            Ok("ok".to_string())
        }))
        .unwrap();

    let result = handle.wait().await.expect("job settled");
    assert!(result.duration_ms >= 10);
    assert!(result.finished_at >= result.started_at);
}
