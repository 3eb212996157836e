//! E2E tests for log capture: per-stream sinks, the combined sink,
//! timestamping, and append-across-restart behavior

use oversee_e2e_tests::{sh_spec, unique_unit_name, TestEngine};
use oversee_engine::domain::{LogConfig, RestartPolicy, UnitState};
use std::time::Duration;

fn log_config(dir: &tempfile::TempDir) -> LogConfig {
    LogConfig {
        out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
        error_file: Some(dir.path().join("err.log").to_str().unwrap().to_string()),
        log_file: Some(dir.path().join("all.log").to_str().unwrap().to_string()),
        date_format: None,
    }
}

#[tokio::test]
async fn test_streams_land_in_their_sinks() {
    let engine = TestEngine::start();
    let dir = tempfile::tempdir().unwrap();
    let name = unique_unit_name("logs");

    let spec = sh_spec(&name, "echo out-line; echo err-line 1>&2")
        .log(log_config(&dir))
        .build()
        .unwrap();
    engine.add_unit(spec).await;
    engine.registry.start_unit().execute(&name).await.unwrap();

    engine
        .wait_for_unit(&name, Duration::from_secs(5), |u| {
            u.state() == UnitState::Stopped
        })
        .await
        .expect("unit did not finish");
    // Let the stream forwarders drain
    tokio::time::sleep(Duration::from_millis(300)).await;

    let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
    let err = std::fs::read_to_string(dir.path().join("err.log")).unwrap();
    let all = std::fs::read_to_string(dir.path().join("all.log")).unwrap();

    assert_eq!(out, "out-line\n");
    assert_eq!(err, "err-line\n");
    assert!(all.contains("out-line"));
    assert!(all.contains("err-line"));
}

#[tokio::test]
async fn test_logs_append_across_restarts() {
    let engine = TestEngine::start();
    let dir = tempfile::tempdir().unwrap();
    let name = unique_unit_name("append");

    let log = LogConfig {
        out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
        error_file: None,
        log_file: None,
        date_format: None,
    };
    let spec = sh_spec(&name, "echo tick; exit 1")
        .log(log)
        .restart_policy(RestartPolicy::Always)
        .restart_delay_sec(0)
        .max_restarts(2)
        .start_limit_interval_sec(60)
        .build()
        .unwrap();
    engine.add_unit(spec).await;
    engine.registry.start_unit().execute(&name).await.unwrap();

    engine
        .wait_for_unit(&name, Duration::from_secs(10), |u| {
            u.state() == UnitState::Stopped
        })
        .await
        .expect("unit was not parked");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Earlier incarnations' output survives every restart
    let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
    let ticks = out.matches("tick").count();
    assert!(ticks >= 2, "expected output from every run, got: {}", out);
}

#[tokio::test]
async fn test_timestamp_prefix_applied() {
    let engine = TestEngine::start();
    let dir = tempfile::tempdir().unwrap();
    let name = unique_unit_name("stamped");

    let log = LogConfig {
        out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
        error_file: None,
        log_file: None,
        date_format: Some("YYYY-MM-DD HH:mm:ss".to_string()),
    };
    let spec = sh_spec(&name, "echo stamped-line").log(log).build().unwrap();
    engine.add_unit(spec).await;
    engine.registry.start_unit().execute(&name).await.unwrap();

    engine
        .wait_for_unit(&name, Duration::from_secs(5), |u| {
            u.state() == UnitState::Stopped
        })
        .await
        .expect("unit did not finish");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
    // "2026-08-06 12:00:00: stamped-line" shape
    assert!(out.starts_with("20"), "missing timestamp prefix: {}", out);
    assert!(out.contains(": stamped-line"));
}
