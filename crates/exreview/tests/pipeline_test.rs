//! End-to-end tests for review runs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;

use exreview::input::{JsonFileSource, MemorySource};
use exreview::llm::MockModel;
use exreview::store::{ProcessedIdTracker, SinkTable};
use exreview::{
    BatchCoordinator, FailureKind, ReviewError, RunConfig, RunPhase, SourceConfig,
};

fn exercise(id: u64, category: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Exercise {}", id),
        "instruction": "Translate the sentence",
        "instruction_elements": "[\"Guten Morgen\"]",
        "answer_elements": "[\"Good morning\"]",
        "type": "translate",
        "category_id": category
    })
}

fn config(dir: &TempDir, fetch_count: usize) -> RunConfig {
    RunConfig {
        fetch_count,
        delay_ms: 0,
        output_dir: dir.path().join("responses"),
        ..Default::default()
    }
}

/// Reply with valid JSON echoing the record ID, except for `prose_for`.
fn reviewer(prose_for: &'static str) -> MockModel {
    MockModel::with_responder(move |prompt| {
        let id = ["100047", "100048", "100049", "100050"]
            .into_iter()
            .find(|id| prompt.contains(&format!("\"id\": \"{}\"", id)))
            .unwrap_or("unknown");
        if id == prose_for {
            Ok("I think this exercise is mostly fine, nothing to add.".to_string())
        } else {
            Ok(format!(
                "```json\n{{\"id\": \"{}\", \"correctness\": 0.9, \"suggestion\": \"Fine as is for {}\"}}\n```",
                id, id
            ))
        }
    })
}

fn write_export(dir: &TempDir, values: &[Value]) -> std::path::PathBuf {
    let path = dir.path().join("exercises.json");
    std::fs::write(&path, serde_json::to_vec(values).unwrap()).unwrap();
    path
}

// =============================================================================
// Run outcomes
// =============================================================================

#[tokio::test]
async fn test_two_successes_one_extraction_failure() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values([
        exercise(100047, 1),
        exercise(100048, 1),
        exercise(100049, 1),
    ]);
    let coordinator =
        BatchCoordinator::new(config(&dir, 3), Arc::new(reviewer("100049"))).unwrap();

    let report = coordinator.run(&source).await.unwrap();

    assert_eq!(report.phase, RunPhase::Done);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.succeeded, vec!["100047", "100048"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "100049");
    assert_eq!(report.failed[0].error, FailureKind::ExtractionFailed);

    let sink = SinkTable::load(coordinator.config().sink_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sink.row_count(), 2);
    assert_eq!(sink.column_values("id").unwrap(), vec!["100047", "100048"]);
    assert_eq!(sink.column_values("status").unwrap(), vec!["success", "success"]);
    assert_eq!(sink.column_values("correctness").unwrap(), vec!["0.9", "0.9"]);
    assert_eq!(
        sink.column_values("suggestion").unwrap(),
        vec!["Fine as is for 100047", "Fine as is for 100048"]
    );

    let failures = SinkTable::load(coordinator.config().failures_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failures.column_values("id").unwrap(), vec!["100049"]);
    assert_eq!(failures.column_values("error").unwrap(), vec!["extraction_failed"]);
    assert!(failures.column_values("raw_response").unwrap()[0].contains("mostly fine"));
}

#[tokio::test]
async fn test_second_run_skips_reviewed_and_retries_failed() {
    let dir = TempDir::new().unwrap();
    let export = write_export(
        &dir,
        &[exercise(100047, 1), exercise(100048, 1), exercise(100049, 1)],
    );
    let source = JsonFileSource::new(&export);

    let first = BatchCoordinator::new(config(&dir, 3), Arc::new(reviewer("100049"))).unwrap();
    first.run(&source).await.unwrap();

    let model = reviewer("none");
    let second = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();
    let report = second.run(&source).await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.succeeded, vec!["100049"]);
    assert_eq!(model.calls(), 1);

    let processed = ProcessedIdTracker::new(second.config().sink_path())
        .load()
        .await
        .unwrap();
    assert_eq!(processed.len(), 3);

    // Nothing left to do: the sink is not rewritten and no model call is made.
    let before = std::fs::read(second.config().sink_path()).unwrap();
    let model = reviewer("none");
    let third = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();
    let report = third.run(&source).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert!(report.sink.is_none());
    assert_eq!(model.calls(), 0);
    assert_eq!(std::fs::read(third.config().sink_path()).unwrap(), before);
}

#[tokio::test]
async fn test_fetch_count_limits_candidates() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values((100047..100051).map(|id| exercise(id, 1)));
    let model = reviewer("none");
    let coordinator = BatchCoordinator::new(config(&dir, 2), Arc::new(model.clone())).unwrap();

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100047", "100048"]);

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100049", "100050"]);
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn test_mismatched_model_id_is_not_reviewed_again() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values([exercise(100047, 1)]);
    let model = MockModel::with_response(
        "{\"id\": \"100099\", \"correctness\": 0.7, \"suggestion\": \"Tighten the wording\"}",
    );
    let coordinator = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100047"]);

    let sink = SinkTable::load(coordinator.config().sink_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sink.column_values("id").unwrap(), vec!["100099"]);
    assert_eq!(sink.column_values("original_id").unwrap(), vec!["100047"]);

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_cursor_and_category_filters() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values([
        exercise(100047, 5),
        exercise(100048, 5),
        exercise(100049, 9),
        exercise(100050, 5),
    ]);
    let config = RunConfig {
        starting_id: Some("100048".to_string()),
        category_id: Some("5".to_string()),
        ..config(&dir, 10)
    };
    let coordinator = BatchCoordinator::new(config, Arc::new(reviewer("none"))).unwrap();

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100048", "100050"]);
}

#[tokio::test]
async fn test_mismatched_id_is_reviewed_once_without_original_id_column() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values([exercise(100047, 1)]);
    let model = MockModel::with_response(
        "{\"id\": \"100099\", \"correctness\": 0.7, \"suggestion\": \"Reword it\"}",
    );
    let config = RunConfig {
        columns: ["id", "status", "correctness", "suggestion"]
            .map(String::from)
            .to_vec(),
        ..config(&dir, 3)
    };

    for _ in 0..3 {
        let coordinator = BatchCoordinator::new(config.clone(), Arc::new(model.clone())).unwrap();
        coordinator.run(&source).await.unwrap();
    }

    assert_eq!(model.calls(), 1);
    let sink = SinkTable::load(config.sink_path()).await.unwrap().unwrap();
    assert_eq!(sink.row_count(), 1);
    assert_eq!(sink.column_values("id").unwrap(), vec!["100099"]);
    assert_eq!(sink.column_values("original_id").unwrap(), vec!["100047"]);
}

#[tokio::test]
async fn test_existing_sink_rows_and_columns_survive() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 3);
    std::fs::create_dir_all(&config.output_dir).unwrap();
    std::fs::write(
        config.sink_path(),
        "id,status,reviewer\n100047,success,alice\n200001,success,bob\n",
    )
    .unwrap();

    let source = MemorySource::from_values([exercise(100047, 1), exercise(100048, 1)]);
    let coordinator = BatchCoordinator::new(config, Arc::new(reviewer("none"))).unwrap();
    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100048"]);

    let sink = SinkTable::load(coordinator.config().sink_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&sink.headers[..3], &["id", "status", "reviewer"]);
    assert_eq!(sink.column_values("id").unwrap(), vec!["100047", "200001", "100048"]);
    assert_eq!(sink.column_values("reviewer").unwrap(), vec!["alice", "bob", ""]);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_in_flight_calls_never_exceed_concurrency() {
    for concurrency in [1, 2, 4] {
        let dir = TempDir::new().unwrap();
        let source = MemorySource::from_values((0..8).map(|n| exercise(100100 + n, 1)));
        let model = MockModel::new().with_latency(Duration::from_secs(2));
        let config = RunConfig {
            concurrency,
            delay_ms: 300,
            ..config(&dir, 8)
        };
        let coordinator = BatchCoordinator::new(config, Arc::new(model.clone())).unwrap();

        let report = coordinator.run(&source).await.unwrap();

        assert_eq!(report.succeeded.len(), 8);
        assert_eq!(model.calls(), 8);
        assert_eq!(model.peak_in_flight(), concurrency);
    }
}

#[tokio::test(start_paused = true)]
async fn test_delay_precedes_every_admitted_record() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values((0..4).map(|n| exercise(100100 + n, 1)));
    let config = RunConfig {
        concurrency: 1,
        delay_ms: 300,
        ..config(&dir, 4)
    };
    let coordinator = BatchCoordinator::new(config, Arc::new(MockModel::new())).unwrap();

    let started = tokio::time::Instant::now();
    let report = coordinator.run(&source).await.unwrap();

    assert_eq!(report.succeeded.len(), 4);
    assert!(started.elapsed() >= Duration::from_millis(4 * 300));
}

#[tokio::test(start_paused = true)]
async fn test_zero_delay_adds_no_time() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values((0..4).map(|n| exercise(100100 + n, 1)));
    let config = RunConfig {
        concurrency: 1,
        ..config(&dir, 4)
    };
    let coordinator = BatchCoordinator::new(config, Arc::new(MockModel::new())).unwrap();

    let started = tokio::time::Instant::now();
    let report = coordinator.run(&source).await.unwrap();

    assert_eq!(report.succeeded.len(), 4);
    assert!(started.elapsed() < Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_keep_candidate_order() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values((0..5).map(|n| exercise(100100 + n, 1)));
    let model = MockModel::new().with_latency(Duration::from_millis(500));
    let config = RunConfig {
        concurrency: 5,
        ..config(&dir, 5)
    };
    let coordinator = BatchCoordinator::new(config, Arc::new(model)).unwrap();

    let report = coordinator.run(&source).await.unwrap();
    assert_eq!(
        report.succeeded,
        vec!["100100", "100101", "100102", "100103", "100104"]
    );
}

// =============================================================================
// Failure isolation and fatal errors
// =============================================================================

#[tokio::test]
async fn test_one_bad_record_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let mut broken = exercise(100048, 1);
    broken["answer_elements"] = json!("[not json");
    let source = MemorySource::from_values([exercise(100047, 1), broken, exercise(100049, 1)]);
    let model = reviewer("none");
    let coordinator = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();

    let report = coordinator.run(&source).await.unwrap();

    assert_eq!(report.succeeded, vec!["100047", "100049"]);
    assert_eq!(report.failed[0].id, "100048");
    assert_eq!(report.failed[0].error, FailureKind::ParsingFailed);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_model_outage_fails_every_record_but_run_completes() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::from_values([exercise(100047, 1), exercise(100048, 1)]);
    let coordinator =
        BatchCoordinator::new(config(&dir, 3), Arc::new(MockModel::failing("503 unavailable")))
            .unwrap();

    let report = coordinator.run(&source).await.unwrap();

    assert_eq!(report.phase, RunPhase::Done);
    assert!(report.succeeded.is_empty());
    assert!(report
        .failed
        .iter()
        .all(|f| f.error == FailureKind::AiRequestFailed));

    let sink = SinkTable::load(coordinator.config().sink_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sink.row_count(), 0);

    let summary = coordinator.sink().unwrap().summary().await.unwrap();
    assert_eq!(summary.reviewed, 0);
    assert_eq!(summary.failed_attempts, 2);
}

#[tokio::test]
async fn test_unreadable_source_is_fatal() {
    let dir = TempDir::new().unwrap();
    let model = MockModel::new();
    let coordinator = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();
    let source = SourceConfig::Json {
        path: dir.path().join("missing.json"),
    };

    let result = coordinator.run_with(&source).await;

    assert!(matches!(result, Err(ReviewError::Source(_))));
    assert_eq!(model.calls(), 0);
    assert!(!coordinator.config().sink_path().exists());
}

#[tokio::test]
async fn test_corrupt_sink_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 3);
    std::fs::create_dir_all(&config.output_dir).unwrap();
    std::fs::write(config.sink_path(), b"id,status\n\xff\xfe,success\n").unwrap();

    let model = MockModel::new();
    let coordinator = BatchCoordinator::new(config, Arc::new(model.clone())).unwrap();
    let source = MemorySource::from_values([exercise(100047, 1)]);

    assert!(coordinator.run(&source).await.is_err());
    assert_eq!(model.calls(), 0);
}

// =============================================================================
// SQLite source
// =============================================================================

#[tokio::test]
async fn test_sqlite_source_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("exercises.db");
    let url = format!("sqlite://{}?mode=rwc", db.display());

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "CREATE TABLE exercises (
            id INTEGER PRIMARY KEY,
            title TEXT,
            instruction TEXT,
            instruction_elements TEXT,
            answer_elements TEXT,
            type TEXT,
            category_id INTEGER
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    for id in [100047, 100048, 100049] {
        sqlx::query("INSERT INTO exercises VALUES (?, 'Title', 'Do it', '[\"a\"]', '[\"b\"]', 'quiz', 1)")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    let source = SourceConfig::Sqlite {
        url,
        table: "exercises".to_string(),
    };
    let model = reviewer("100049");
    let coordinator = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();

    let report = coordinator.run_with(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100047", "100048"]);

    let model = reviewer("none");
    let coordinator = BatchCoordinator::new(config(&dir, 3), Arc::new(model.clone())).unwrap();
    let report = coordinator.run_with(&source).await.unwrap();
    assert_eq!(report.succeeded, vec!["100049"]);
    assert_eq!(model.calls(), 1);
}
