//! Change cycles: middleware, impact resolution and per-function chains

use crate::common::{EventLog, RecordingPackager, RecordingPlatform, TestProject};
use cli_lib::{DevelopEvent, LoopState, Orchestrator};
use sdev_core::ChangeEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    project: TestProject,
    packager: Arc<RecordingPackager>,
    platform: Arc<RecordingPlatform>,
    log: EventLog,
    orchestrator: Orchestrator,
}

impl Harness {
    fn new(project: TestProject, middleware: &[&str], packager: RecordingPackager, platform: RecordingPlatform) -> Self {
        let packager = Arc::new(packager);
        let platform = Arc::new(platform);
        let log = EventLog::new();
        let orchestrator = Orchestrator::new(
            project.session(middleware),
            packager.clone(),
            platform.clone(),
            log.sink(),
        );
        Self {
            project,
            packager,
            platform,
            log,
            orchestrator,
        }
    }

    fn simple() -> Self {
        let project = TestProject::new();
        let packager = RecordingPackager::new(project.root());
        Self::new(project, &[], packager, RecordingPlatform::new())
    }

    /// Make `other` depend on `services/clock.js` too
    fn share_clock(&self) {
        self.project.write(
            "handlers/other.js",
            "const { now } = require('../services/clock.js');\nexports.main = async () => now();\n",
        );
    }

    async fn change(&mut self, relative: &str) {
        let event = self.project.modified(relative);
        self.orchestrator.handle_event(event).await;
    }

    async fn settle(&mut self) {
        tokio::time::timeout(Duration::from_secs(10), self.orchestrator.settle())
            .await
            .expect("in-flight chains did not settle");
    }
}

#[tokio::test]
async fn test_ready_event_triggers_no_packaging() {
    let mut h = Harness::simple();

    h.orchestrator.handle_event(ChangeEvent::ready()).await;
    h.settle().await;

    assert!(h.packager.calls().is_empty());
    assert!(h.platform.replaced().is_empty());
    assert_eq!(h.log.events(), vec![DevelopEvent::Ready]);
}

#[tokio::test]
async fn test_dependency_change_redeploys_dependent_function() {
    let project = TestProject::new();
    let packager = RecordingPackager::new(project.root());
    let platform = RecordingPlatform::new().with_endpoint("https://abc.example.com/dev");
    let mut h = Harness::new(project, &[], packager, platform);

    h.orchestrator.resolve_endpoint().await;
    h.change("services/wait.js").await;
    assert_eq!(h.orchestrator.state(), LoopState::Watching);
    h.settle().await;

    let calls = h.packager.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function, "api");
    assert_eq!(calls[0].files, vec![PathBuf::from("services/wait.js")]);
    assert!(!calls[0].full);

    let replaced = h.platform.replaced();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].0, "svc-dev-api");
    assert_eq!(replaced[0].1, b"services/wait.js\n".to_vec());

    assert_eq!(
        h.log.for_function("api"),
        vec![
            DevelopEvent::Impacted {
                function: "api".to_string(),
                files: vec![PathBuf::from("services/wait.js")],
            },
            DevelopEvent::PackagingStarted {
                function: "api".to_string()
            },
            DevelopEvent::Packaged {
                function: "api".to_string()
            },
            DevelopEvent::Deployed {
                function: "api".to_string(),
                function_id: "svc-dev-api".to_string(),
            },
            DevelopEvent::Endpoint {
                function: "api".to_string(),
                url: "https://abc.example.com/dev/api/wait".to_string(),
            },
        ]
    );
    assert!(h.log.for_function("other").is_empty());
}

#[tokio::test]
async fn test_transitive_dependency_change() {
    let mut h = Harness::simple();

    h.change("services/clock.js").await;
    h.settle().await;

    assert_eq!(h.platform.replaced_ids(), vec!["svc-dev-api".to_string()]);
}

#[tokio::test]
async fn test_entry_change_only_impacts_owner() {
    let mut h = Harness::simple();

    h.change("handlers/other.js").await;
    h.settle().await;

    let calls = h.packager.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function, "other");
    assert_eq!(calls[0].files, vec![PathBuf::from("handlers/other.js")]);
    assert_eq!(h.platform.replaced_ids(), vec!["svc-dev-other".to_string()]);
}

#[tokio::test]
async fn test_unrelated_file_impacts_nothing() {
    let mut h = Harness::simple();
    h.project.write("README.md", "# svc\n");

    h.change("README.md").await;
    h.settle().await;

    assert!(h.packager.calls().is_empty());
    assert!(h.log.errors().is_empty());
    assert_eq!(h.orchestrator.state(), LoopState::Watching);
}

#[tokio::test]
async fn test_failing_middleware_aborts_cycle() {
    let project = TestProject::new();
    project.script("lint.sh", "exit 1");
    project.script("typecheck.sh", "touch typechecked");
    let packager = RecordingPackager::new(project.root());
    let mut h = Harness::new(project, &["./lint.sh", "./typecheck.sh"], packager, RecordingPlatform::new());

    h.change("services/wait.js").await;
    h.settle().await;

    assert!(h.packager.calls().is_empty());
    assert!(!h.project.exists("typechecked"));
    assert!(h.log.contains(&DevelopEvent::MiddlewareStarted {
        command: "./lint.sh".to_string()
    }));
    assert!(!h.log.contains(&DevelopEvent::MiddlewareStarted {
        command: "./typecheck.sh".to_string()
    }));

    let errors = h.log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].function(), None);
    assert_eq!(h.orchestrator.state(), LoopState::Watching);

    // The loop keeps going once the middleware passes again
    h.project.script("lint.sh", "exit 0");
    h.change("services/wait.js").await;
    h.settle().await;

    assert!(h.project.exists("typechecked"));
    assert_eq!(h.packager.calls().len(), 1);
}

#[tokio::test]
async fn test_impacted_functions_do_not_block_each_other() {
    let project = TestProject::new();
    // Each package call waits until both are in flight
    let packager = RecordingPackager::new(project.root()).with_barrier(2);
    let mut h = Harness::new(project, &[], packager, RecordingPlatform::new());
    h.share_clock();

    h.change("services/clock.js").await;
    h.settle().await;

    let mut deployed = h.platform.replaced_ids();
    deployed.sort();
    assert_eq!(deployed, vec!["svc-dev-api".to_string(), "svc-dev-other".to_string()]);
}

#[tokio::test]
async fn test_same_function_chains_are_serialized() {
    let project = TestProject::new();
    let packager = RecordingPackager::new(project.root()).with_delay(Duration::from_millis(50));
    let mut h = Harness::new(project, &[], packager, RecordingPlatform::new());

    h.change("services/wait.js").await;
    h.change("services/wait.js").await;
    assert!(h.orchestrator.in_flight() <= 2);
    h.settle().await;

    assert_eq!(
        h.packager.journal(),
        vec!["start:api", "end:api", "start:api", "end:api"]
    );
    assert_eq!(h.platform.replaced().len(), 2);
}

#[tokio::test]
async fn test_graph_failure_excludes_only_that_function() {
    let mut h = Harness::simple();
    h.share_clock();
    h.project
        .write("handlers/other.js", "require('./missing');\nexports.main = () => 1;\n");

    h.change("services/clock.js").await;
    h.settle().await;

    assert_eq!(h.platform.replaced_ids(), vec!["svc-dev-api".to_string()]);
    let errors = h.log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].function(), Some("other"));

    // Retried on the next event
    h.share_clock();
    h.change("services/clock.js").await;
    h.settle().await;

    assert_eq!(h.log.errors().len(), 1);
    assert!(h.platform.replaced_ids().contains(&"svc-dev-other".to_string()));
}

#[tokio::test]
async fn test_packaging_failure_is_scoped() {
    let project = TestProject::new();
    let packager = RecordingPackager::new(project.root()).failing("api");
    let mut h = Harness::new(project, &[], packager, RecordingPlatform::new());
    h.share_clock();

    h.change("services/clock.js").await;
    h.settle().await;

    assert_eq!(h.platform.replaced_ids(), vec!["svc-dev-other".to_string()]);
    let errors = h.log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].function(), Some("api"));
    assert!(!h.log.contains(&DevelopEvent::Packaged {
        function: "api".to_string()
    }));
}

#[tokio::test]
async fn test_deployment_failure_is_scoped() {
    let project = TestProject::new();
    let packager = RecordingPackager::new(project.root());
    let platform = RecordingPlatform::new().rejecting("svc-dev-api");
    let mut h = Harness::new(project, &[], packager, platform);
    h.share_clock();

    h.change("services/clock.js").await;
    h.settle().await;

    assert_eq!(h.platform.replaced_ids(), vec!["svc-dev-other".to_string()]);
    assert!(h.log.contains(&DevelopEvent::Deployed {
        function: "other".to_string(),
        function_id: "svc-dev-other".to_string(),
    }));

    let errors = h.log.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].function(), Some("api"));
    assert!(errors[0].to_string().contains("Function not found"));
}
