// ==========================================
// 并发导入测试
// ==========================================
// 测试目标: 批内并发上限、批间串行、单运行保护、协作式取消
// ==========================================


use catalog_import::config::ImportConfig;
use catalog_import::domain::ImportPhase;
use catalog_import::importer::ImportError;
use catalog_import::logging;
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_helpers::{numbered_csv, numbered_name, pipeline_with, CallEvent, MockCreator};
use tokio_util::sync::CancellationToken;

fn config_with_batch(batch_size: usize) -> ImportConfig {
    ImportConfig {
        batch_size,
        ..ImportConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_bounded_by_batch_size() {
    logging::init_test();
    let creator = Arc::new(MockCreator::new().with_delay(Duration::from_millis(30)));
    let pipeline = pipeline_with(creator.clone(), config_with_batch(4));

    let report = pipeline.run(&numbered_csv(10)).await.unwrap();

    assert_eq!(report.stats.success, 10);
    assert!(creator.max_in_flight() <= 4, "max in flight = {}", creator.max_in_flight());
    assert!(creator.max_in_flight() >= 2, "batch members should overlap");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batches_settle_before_next_batch_starts() {
    let batch_size = 3;
    let creator = Arc::new(
        MockCreator::new()
            .with_delay(Duration::from_millis(10))
            .sleeping_on(&numbered_name(2), Duration::from_millis(80))
            .sleeping_on(&numbered_name(4), Duration::from_millis(60)),
    );
    let pipeline = pipeline_with(creator.clone(), config_with_batch(batch_size));

    pipeline.run(&numbered_csv(8)).await.unwrap();

    let events = creator.events();
    let batch_of = |name: &str| -> usize {
        let n: usize = name.trim_start_matches("Produto ").parse().unwrap();
        (n - 1) / batch_size
    };

    for batch in 0..2 {
        let last_finish = events
            .iter()
            .rposition(|e| matches!(e, CallEvent::Finished(n) if batch_of(n) == batch))
            .unwrap();
        let first_start_next = events
            .iter()
            .position(|e| matches!(e, CallEvent::Started(n) if batch_of(n) == batch + 1))
            .unwrap();
        assert!(
            last_finish < first_start_next,
            "batch {} overlapped with the next one: {:?}",
            batch + 1,
            events
        );
    }
}

#[tokio::test]
async fn test_second_run_rejected_while_running() {
    let creator = Arc::new(MockCreator::new().with_delay(Duration::from_millis(100)));
    let pipeline = Arc::new(pipeline_with(creator.clone(), config_with_batch(2)));
    let mut rx = pipeline.subscribe();

    let first = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.run(&numbered_csv(4)).await })
    };

    // 等待第一次运行进入导入阶段
    loop {
        rx.changed().await.unwrap();
        if rx.borrow_and_update().phase == ImportPhase::Importing {
            break;
        }
    }
    assert!(pipeline.is_running());

    let err = pipeline.run(&numbered_csv(1)).await.unwrap_err();
    assert!(matches!(err, ImportError::AlreadyRunning));

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.stats.success, 4);
    assert!(!pipeline.is_running());

    // 运行结束后可以再次导入
    let again = pipeline.run(&numbered_csv(1)).await.unwrap();
    assert_eq!(again.stats.total, 1);
    assert_eq!(creator.calls().len(), 5);
}

#[tokio::test]
async fn test_cancel_stops_between_batches() {
    let cancel = CancellationToken::new();
    let creator = Arc::new(
        MockCreator::new()
            .with_delay(Duration::from_millis(20))
            .cancel_after(2, cancel.clone()),
    );
    let pipeline = pipeline_with(creator.clone(), config_with_batch(2));

    let report = pipeline
        .run_with_cancel(&numbered_csv(7), cancel)
        .await
        .unwrap();

    // 进行中的第一批完整结算，后续批次不再派发
    assert!(report.cancelled);
    assert_eq!(report.stats.total, 7);
    assert_eq!(report.stats.success, 2);
    assert_eq!(report.skipped(), 5);
    assert_eq!(creator.calls().len(), 2);

    let session = pipeline.session();
    assert_eq!(session.phase, ImportPhase::Completed);
    assert_eq!(session.progress, 100);
    assert!(session.cancelled);
}

#[tokio::test]
async fn test_inter_batch_delay_applied_between_batches() {
    let creator = Arc::new(MockCreator::new());
    let config = ImportConfig {
        batch_size: 2,
        inter_batch_delay_ms: 40,
        ..ImportConfig::default()
    };
    let pipeline = pipeline_with(creator, config);

    let started = Instant::now();
    let report = pipeline.run(&numbered_csv(6)).await.unwrap();

    assert_eq!(report.stats.success, 6);
    // 3 批 → 2 次间隔
    assert!(started.elapsed() >= Duration::from_millis(80));
}
