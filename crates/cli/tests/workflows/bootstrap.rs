//! Initial packaging and the full watch loop

use crate::common::{EventLog, RecordingPackager, RecordingPlatform, TestProject};
use cli_lib::{DevelopEvent, LoopState, Orchestrator};
use indicatif::ProgressBar;
use sdev_core::{ChangeEvent, DevelopError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use watcher::ChangeStream;

fn setup(project: &TestProject) -> (Arc<RecordingPackager>, Arc<RecordingPlatform>, EventLog, Orchestrator) {
    let packager = Arc::new(RecordingPackager::new(project.root()));
    let platform = Arc::new(RecordingPlatform::new().with_endpoint("https://abc.example.com/dev"));
    let log = EventLog::new();
    let orchestrator = Orchestrator::new(project.session(&[]), packager.clone(), platform.clone(), log.sink());
    (packager, platform, log, orchestrator)
}

#[tokio::test]
async fn test_prepare_packages_entry_and_closure() {
    let project = TestProject::new();
    let (packager, platform, _log, mut orchestrator) = setup(&project);

    let summary = orchestrator.prepare(&ProgressBar::hidden()).await.unwrap();
    assert_eq!(summary.packaged, vec!["api".to_string(), "other".to_string()]);
    assert!(summary.is_success());
    assert_eq!(orchestrator.state(), LoopState::Idle);

    let calls = packager.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.full));

    let api = &calls[0];
    assert_eq!(api.function, "api");
    assert_eq!(api.files[0], PathBuf::from("handlers/api.js"));
    assert_eq!(api.files.len(), 3);
    assert!(api.files.contains(&PathBuf::from("services/wait.js")));
    assert!(api.files.contains(&PathBuf::from("services/clock.js")));

    assert_eq!(calls[1].files, vec![PathBuf::from("handlers/other.js")]);

    // Bootstrap packages, it does not deploy
    assert!(platform.replaced().is_empty());
    assert_eq!(orchestrator.session().base_endpoint(), Some("https://abc.example.com/dev"));
}

#[tokio::test]
async fn test_prepare_ships_runtime_dependencies() {
    let project = TestProject::new();
    project.write("node_modules/lodash/index.js", "module.exports = {};\n");
    project.write(
        "handlers/other.js",
        "const _ = require('lodash');\nexports.main = async () => _.now();\n",
    );
    let (packager, _platform, _log, mut orchestrator) = setup(&project);

    orchestrator.prepare(&ProgressBar::hidden()).await.unwrap();

    let calls = packager.calls();
    assert_eq!(
        calls[1].files,
        vec![PathBuf::from("handlers/other.js"), PathBuf::from("node_modules")]
    );
    assert_eq!(calls[0].files.last(), Some(&PathBuf::from("node_modules")));
}

#[tokio::test]
async fn test_base_endpoint_resolved_once() {
    let project = TestProject::new();
    let (_packager, platform, _log, mut orchestrator) = setup(&project);

    orchestrator.prepare(&ProgressBar::hidden()).await.unwrap();
    orchestrator.resolve_endpoint().await;
    orchestrator.handle_event(project.modified("services/wait.js")).await;
    orchestrator.settle().await;

    assert_eq!(platform.describe_calls(), vec!["svc-dev".to_string()]);
    assert_eq!(platform.replaced_ids(), vec!["svc-dev-api".to_string()]);
}

#[tokio::test]
async fn test_prepare_reports_and_skips_broken_function() {
    let project = TestProject::new();
    project.write("handlers/other.js", "import x from './gone.js';\n");
    let (packager, _platform, log, mut orchestrator) = setup(&project);

    let summary = orchestrator.prepare(&ProgressBar::hidden()).await.unwrap();

    assert_eq!(summary.packaged, vec!["api".to_string()]);
    assert_eq!(summary.failed, vec!["other".to_string()]);
    assert_eq!(packager.calls().len(), 1);
    assert_eq!(log.errors().len(), 1);
    assert_eq!(log.errors()[0].function(), Some("other"));
}

#[tokio::test]
async fn test_package_single_function() {
    let project = TestProject::new();
    let (packager, _platform, _log, orchestrator) = setup(&project);

    let summary = orchestrator
        .package_all(Some("other"), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(summary.packaged, vec!["other".to_string()]);
    assert_eq!(packager.calls().len(), 1);

    let err = orchestrator
        .package_all(Some("nope"), &ProgressBar::hidden())
        .await
        .unwrap_err();
    assert!(matches!(err, DevelopError::Configuration(_)));
}

#[tokio::test]
async fn test_run_drains_stream_and_settles() {
    let project = TestProject::new();
    let (packager, platform, log, mut orchestrator) = setup(&project);

    let (tx, rx) = mpsc::channel(8);
    tx.send(ChangeEvent::ready()).await.unwrap();
    tx.send(project.modified("handlers/api.js")).await.unwrap();
    drop(tx);

    orchestrator.run(ChangeStream::from_receiver(rx)).await;

    assert_eq!(log.events()[0], DevelopEvent::Ready);
    assert_eq!(packager.calls().len(), 1);
    assert_eq!(platform.replaced_ids(), vec!["svc-dev-api".to_string()]);
    assert_eq!(orchestrator.in_flight(), 0);
    assert_eq!(orchestrator.state(), LoopState::Watching);
}
