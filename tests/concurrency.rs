//! Concurrency and drain behavior under contention

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linelog::MultiFileWriter;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn count_lines(path: &std::path::Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flood_then_dispose_loses_nothing() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("flood.log");
    let registry = MultiFileWriter::new();

    let writer = registry.create(&path).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let producer = {
        let writer = Arc::clone(&writer);
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || {
            let mut produced = 0u64;
            while !stop.load(Ordering::Relaxed) {
                writer.write_line(&format!("flood-{produced}")).unwrap();
                produced += 1;
                if produced % 100 == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            produced
        })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    stop.store(true, Ordering::Relaxed);
    let produced = producer.await.expect("producer thread panicked") as usize;

    // Producer stopped before dispose, so nothing races the shutdown:
    // every enqueued line must be flushed before dispose returns.
    writer.dispose().await.unwrap();

    assert_eq!(writer.pending_writes(), 0);
    assert_eq!(
        count_lines(&path),
        produced,
        "dispose returned before all enqueued lines were applied"
    );
    assert!(!registry.is_worker_alive().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_on_separate_files() {
    init_tracing();
    let dir = tempdir().unwrap();
    let registry = MultiFileWriter::new();

    let mut handles = Vec::new();
    for (name, n) in [("n.log", 200usize), ("m.log", 300usize)] {
        let writer = registry.create(dir.path().join(name)).await.unwrap();
        handles.push(tokio::spawn(async move {
            for i in 0..n {
                writer.write_line(&format!("{name} {i}")).unwrap();
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            writer.dispose().await.unwrap();
            n
        }));
    }

    for handle in handles {
        handle.await.expect("producer task panicked");
    }

    assert_eq!(count_lines(&dir.path().join("n.log")), 200);
    assert_eq!(count_lines(&dir.path().join("m.log")), 300);
    assert!(!registry.is_worker_alive().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispose_and_registry_dispose() {
    init_tracing();
    let dir = tempdir().unwrap();
    let registry = MultiFileWriter::new();

    let w1 = registry.create(dir.path().join("a.log")).await.unwrap();
    let w2 = registry.create(dir.path().join("b.log")).await.unwrap();
    w1.write_line("a").unwrap();
    w2.write_line("b").unwrap();

    // Individual dispose racing registry.dispose must not deadlock or error
    let individual = tokio::spawn({
        let w1 = Arc::clone(&w1);
        async move { w1.dispose().await }
    });
    registry.dispose().await.unwrap();
    individual
        .await
        .expect("dispose task panicked")
        .expect("individual dispose failed");

    assert!(registry.active_file_paths().await.is_empty());
    assert!(!registry.is_worker_alive().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_registries_stay_isolated() {
    let dir = tempdir().unwrap();
    let r1 = MultiFileWriter::new();
    let r2 = MultiFileWriter::new();

    let w1 = r1.create(dir.path().join("r1.log")).await.unwrap();
    let w2 = r2.create(dir.path().join("r2.log")).await.unwrap();
    w1.write_line("one").unwrap();
    w2.write_line("two").unwrap();

    // Stopping r1's worker must not affect r2
    w1.dispose().await.unwrap();
    assert!(!r1.is_worker_alive().await);
    assert!(r2.is_worker_alive().await);

    w2.write_line("still running").unwrap();
    w2.dispose().await.unwrap();

    assert_eq!(count_lines(&dir.path().join("r1.log")), 1);
    assert_eq!(count_lines(&dir.path().join("r2.log")), 2);
}
