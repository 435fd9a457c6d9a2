/// End-to-end tests for routing and running the built-in pipeline

use companyhq_pipeline::config::{DataSource, PipelineConfig};
use companyhq_pipeline::router::Envelope;
use companyhq_pipeline::tools::builtin::{Analysis, ANALYSIS_FILE, CLEAN_FILE, RAW_FILE, REPORT_FILE};
use companyhq_pipeline::trigger::{Dispatcher, ExitKind, RUNS_DIR};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh scratch directory under the system temp dir
fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "companyhq-pipeline-{}-{}-{}-{}",
        label,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn test_full_pipeline_from_file_source() {
    let dir = scratch_dir("full");
    let source = dir.join("source.json");
    std::fs::write(
        &source,
        json!([
            {"region": " north ", "sales": 10},
            {"region": "south", "sales": 30, "note": null},
            null,
            {"empty": null}
        ])
        .to_string(),
    )
    .unwrap();

    let config = PipelineConfig::default()
        .with_tmp_dir(dir.join("work"))
        .with_data_source(DataSource::Path(source));
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let outcome = dispatcher.dispatch(Envelope::default()).await;

    assert_eq!(outcome.kind, ExitKind::Pipeline);
    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.http_status(), 200);
    assert_eq!(outcome.to_json()["pipeline_exit"], 0);

    let work = dir.join("work");
    for file in [RAW_FILE, CLEAN_FILE, ANALYSIS_FILE, REPORT_FILE] {
        assert!(work.join(file).exists(), "{} missing", file);
    }

    let analysis: Analysis =
        serde_json::from_str(&std::fs::read_to_string(work.join(ANALYSIS_FILE)).unwrap()).unwrap();
    assert_eq!(analysis.record_count, 2);
    assert_eq!(analysis.fields["sales"].numeric.as_ref().unwrap().mean, 20.0);

    let report = std::fs::read_to_string(work.join(REPORT_FILE)).unwrap();
    assert!(report.contains("Records: 2"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_single_tool_without_input_fails() {
    let dir = scratch_dir("single");
    let config = PipelineConfig::default().with_tmp_dir(&dir);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let outcome = dispatcher.dispatch(Envelope::for_action("analyze")).await;

    assert_eq!(outcome.kind, ExitKind::Tool);
    assert_eq!(outcome.code, 2);
    assert_eq!(outcome.http_status(), 500);
    assert_eq!(outcome.to_json()["tool_exit"], 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_pipeline_stops_at_missing_source() {
    let dir = scratch_dir("missing");
    let config = PipelineConfig::default()
        .with_tmp_dir(&dir)
        .with_data_source(DataSource::Path(dir.join("does-not-exist.json")));
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let outcome = dispatcher.dispatch(Envelope::for_action("full_pipeline")).await;

    assert_eq!(outcome.code, 2);
    assert_eq!(outcome.http_status(), 500);
    assert!(!dir.join(CLEAN_FILE).exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_bogus_action_runs_full_pipeline() {
    let dir = scratch_dir("bogus");
    let config = PipelineConfig::default().with_tmp_dir(&dir);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let outcome = dispatcher.dispatch(Envelope::for_action("bogus")).await;

    assert_eq!(outcome.route.tool, "full_pipeline");
    assert!(outcome.route.route.fallback);
    assert_eq!(outcome.kind, ExitKind::Pipeline);
    assert_eq!(outcome.code, 0);

    std::fs::remove_dir_all(&dir).ok();
}

fn pipeline_with_records(count: usize) -> Envelope {
    let records: Vec<_> = (0..count).map(|i| json!({"n": i})).collect();
    serde_json::from_value(json!({
        "action": "full_pipeline",
        "payload": {"records": records}
    }))
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_pipelines_do_not_mix_files() {
    let dir = scratch_dir("concurrent");
    let config = PipelineConfig::default().with_tmp_dir(&dir);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let (small, large) = tokio::join!(
        dispatcher.dispatch(pipeline_with_records(2)),
        dispatcher.dispatch(pipeline_with_records(3))
    );
    assert_eq!(small.code, 0);
    assert_eq!(large.code, 0);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(RAW_FILE)).unwrap()).unwrap();
    let analysis: Analysis =
        serde_json::from_str(&std::fs::read_to_string(dir.join(ANALYSIS_FILE)).unwrap()).unwrap();
    let published = raw.as_array().unwrap().len();
    assert!(published == 2 || published == 3);
    assert_eq!(analysis.record_count, published);

    let leftover_runs = std::fs::read_dir(dir.join(RUNS_DIR))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover_runs, 0);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_failed_pipeline_keeps_previous_artifacts() {
    let dir = scratch_dir("keep");
    let config = PipelineConfig::default().with_tmp_dir(&dir);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    assert_eq!(dispatcher.dispatch(pipeline_with_records(3)).await.code, 0);

    let broken = Dispatcher::from_config(
        &PipelineConfig::default()
            .with_tmp_dir(&dir)
            .with_data_source(DataSource::Path(dir.join("absent.json"))),
    )
    .unwrap();
    assert_ne!(broken.dispatch(Envelope::for_action("full_pipeline")).await.code, 0);

    let analysis: Analysis =
        serde_json::from_str(&std::fs::read_to_string(dir.join(ANALYSIS_FILE)).unwrap()).unwrap();
    assert_eq!(analysis.record_count, 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_payload_records_are_ingested_without_source() {
    let dir = scratch_dir("payload");
    let config = PipelineConfig::default().with_tmp_dir(&dir);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let envelope: Envelope = serde_json::from_value(json!({
        "action": "ingest_data",
        "payload": {"records": [{"a": 1}, {"a": 2}, {"a": 3}]}
    }))
    .unwrap();
    let outcome = dispatcher.dispatch(envelope).await;
    assert_eq!(outcome.code, 0);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(RAW_FILE)).unwrap()).unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_health_check() {
    let dir = scratch_dir("health");
    let healthy = Dispatcher::from_config(&PipelineConfig::default().with_tmp_dir(dir.join("tmp"))).unwrap();

    let outcome = healthy.dispatch(Envelope::for_action("health_check")).await;
    assert_eq!(outcome.kind, ExitKind::Health);
    assert_eq!(outcome.code, 0);
    assert!(dir.join("tmp").is_dir());

    let broken = Dispatcher::from_config(
        &PipelineConfig::default()
            .with_tmp_dir(dir.join("tmp"))
            .with_data_source(DataSource::Path(dir.join("absent.csv"))),
    )
    .unwrap();
    let outcome = broken.dispatch(Envelope::for_action("health_check")).await;
    assert_ne!(outcome.code, 0);
    assert_eq!(outcome.http_status(), 503);
    assert_eq!(outcome.to_json()["health_exit"], outcome.code);

    std::fs::remove_dir_all(&dir).ok();
}
