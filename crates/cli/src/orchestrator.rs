//! The develop loop
//!
//! `Idle -> Watching -> (per event) Resolving -> Building -> Deploying -> Watching`
//!
//! Each change event runs the middleware, rebuilds the dependency graphs it
//! needs, resolves the impact set and hands every impacted function to its own
//! package+deploy chain. Chains of different functions overlap freely; chains
//! of the same function are serialized by the session's flight lock. The loop
//! goes back to watching as soon as the chains are dispatched.

use crate::events::{DevelopEvent, EventSink};
use crate::session::Session;
use deploy::{AwsCliPlatform, Deployer, MiddlewareRunner, Packager, Platform, ZipPackager};
use futures::future::join_all;
use indicatif::ProgressBar;
use sdev_core::{
    ChangeEvent, DependencyGraph, DevelopError, FunctionDescriptor, GraphBuilder, ImpactResolver,
    ImpactedFunction, Result,
};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use ulid::Ulid;
use watcher::ChangeStream;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Bootstrapping, not yet watching
    Idle,
    Watching,
    /// Running middleware, building graphs, computing the impact set
    Resolving,
    /// Dispatching package chains
    Building,
    /// Chains dispatched for the current event
    Deploying,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoopState::Idle => "idle",
            LoopState::Watching => "watching",
            LoopState::Resolving => "resolving",
            LoopState::Building => "building",
            LoopState::Deploying => "deploying",
        };
        f.write_str(label)
    }
}

/// Outcome of packaging every function from scratch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    pub packaged: Vec<String>,
    pub failed: Vec<String>,
}

impl PrepareSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What one package+deploy chain needs, cloned into each spawned task
#[derive(Clone)]
struct Pipeline {
    session: Arc<Session>,
    packager: Arc<dyn Packager>,
    deployer: Deployer,
    sink: EventSink,
}

impl Pipeline {
    fn emit(&self, event: DevelopEvent) {
        (self.sink)(event);
    }

    /// Package then deploy one impacted function
    async fn run_chain(self, item: ImpactedFunction) {
        let name = item.function.name.clone();
        let lock = self.session.flight_lock(&name);
        let _flight = lock.lock().await;

        self.emit(DevelopEvent::PackagingStarted {
            function: name.clone(),
        });
        let archive = match self.packager.package(&name, &item.changed_files).await {
            Ok(archive) => archive,
            Err(e) => {
                warn!("Packaging {} failed: {}", name, e);
                self.emit(DevelopEvent::error(Some(name.as_str()), e));
                return;
            }
        };
        self.emit(DevelopEvent::Packaged {
            function: name.clone(),
        });

        match self
            .deployer
            .deploy(&item.function, &archive, self.session.base_endpoint())
            .await
        {
            Ok(endpoints) => {
                self.emit(DevelopEvent::Deployed {
                    function: name.clone(),
                    function_id: self.deployer.function_id(&name),
                });
                for endpoint in endpoints {
                    self.emit(DevelopEvent::Endpoint {
                        function: name.clone(),
                        url: endpoint.url,
                    });
                }
            }
            Err(e) => {
                warn!("Deploying {} failed: {}", name, e);
                self.emit(DevelopEvent::error(Some(name.as_str()), e));
            }
        }
    }
}

/// Drives change events through middleware, impact resolution and deploys
pub struct Orchestrator {
    pipeline: Pipeline,
    middleware: MiddlewareRunner,
    resolver: ImpactResolver,
    graphs: GraphBuilder,
    state: LoopState,
    inflight: JoinSet<()>,
}

impl Orchestrator {
    pub fn new(
        session: Arc<Session>,
        packager: Arc<dyn Packager>,
        platform: Arc<dyn Platform>,
        sink: EventSink,
    ) -> Self {
        let config = session.config();
        let deployer = Deployer::new(platform, &config.service.name, &config.service.stage);
        let middleware = MiddlewareRunner::new(
            config.develop.middleware.clone(),
            &config.project_root,
            config.develop.verbose,
        );
        let resolver = ImpactResolver::new(session.mapper().clone());
        let graphs = GraphBuilder::new(session.mapper().graph_root());

        Self {
            pipeline: Pipeline {
                session,
                packager,
                deployer,
                sink,
            },
            middleware,
            resolver,
            graphs,
            state: LoopState::Idle,
            inflight: JoinSet::new(),
        }
    }

    /// Orchestrator using the configured archiver and the `aws` client
    pub fn from_session(session: Arc<Session>, sink: EventSink) -> Result<Self> {
        let config = session.config();
        let packager = ZipPackager::new(
            &config.project_root,
            &config.package_dir(),
            &config.develop.archive_command,
            config.develop.verbose,
        )?;
        let platform = AwsCliPlatform::new(
            &config.service.region,
            config.service.profile.as_deref(),
            config.project_root.clone(),
        );
        Ok(Self::new(session, Arc::new(packager), Arc::new(platform), sink))
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.pipeline.session
    }

    /// Chains dispatched but not yet reaped
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Bootstrap: resolve the base endpoint, then package every function
    pub async fn prepare(&mut self, progress: &ProgressBar) -> Result<PrepareSummary> {
        self.transition(LoopState::Idle);
        self.resolve_endpoint().await;
        self.package_all(None, progress).await
    }

    /// Look up the base endpoint once per session
    ///
    /// A failed lookup is reported and leaves the session without endpoint;
    /// deploys still work, they just print no URLs.
    pub async fn resolve_endpoint(&self) {
        let session = &self.pipeline.session;
        if session.base_endpoint_resolved() {
            return;
        }

        match self.pipeline.deployer.resolve_base_endpoint().await {
            Ok(endpoint) => session.set_base_endpoint(endpoint),
            Err(e) => {
                self.emit(DevelopEvent::error(None, format!("cannot resolve base endpoint: {}", e)));
                session.set_base_endpoint(None);
            }
        }
    }

    /// Rebuild archives from scratch, sequentially in declaration order
    ///
    /// `only` restricts packaging to one function. Per-function failures are
    /// reported and collected; only an unknown function name is an error.
    pub async fn package_all(&self, only: Option<&str>, progress: &ProgressBar) -> Result<PrepareSummary> {
        let session = &self.pipeline.session;
        let targets: Vec<FunctionDescriptor> = match only {
            Some(name) => {
                let function = session
                    .function(name)
                    .ok_or_else(|| DevelopError::config(format!("unknown function '{}'", name)))?;
                vec![function.clone()]
            }
            None => session.functions().to_vec(),
        };

        progress.set_length(targets.len() as u64);
        let mut summary = PrepareSummary::default();

        for (index, function) in targets.iter().enumerate() {
            if session.verbose() {
                let percent = index * 100 / targets.len();
                info!("[{}%] Packaging {}...", percent, function.name);
            }
            self.emit(DevelopEvent::PackagingStarted {
                function: function.name.clone(),
            });

            match self.package_full(function).await {
                Ok(()) => {
                    self.emit(DevelopEvent::Packaged {
                        function: function.name.clone(),
                    });
                    summary.packaged.push(function.name.clone());
                }
                Err(e) => {
                    self.emit(DevelopEvent::error(Some(function.name.as_str()), e));
                    summary.failed.push(function.name.clone());
                }
            }
            progress.inc(1);
        }

        progress.finish_with_message("Artifacts built!");
        Ok(summary)
    }

    /// Dependency graph of `function`'s compiled entry, built off the loop thread
    pub async fn build_graph(&self, function: &FunctionDescriptor) -> Result<DependencyGraph> {
        let builder = self.graphs.clone();
        let entry = function.entry_abs.clone();

        let graph = tokio::task::spawn_blocking(move || builder.build(&entry))
            .await
            .map_err(|e| DevelopError::GraphBuild {
                entry: function.entry_abs.clone(),
                reason: format!("graph task failed: {}", e),
            })??;

        if self.pipeline.session.verbose() {
            info!("Dependency tree of {}: {}", function.name, graph.to_pretty_json());
        }
        Ok(graph)
    }

    /// Consume the watcher until it stops, then wait for in-flight chains
    pub async fn run(&mut self, mut stream: ChangeStream) {
        self.transition(LoopState::Watching);
        while let Some(event) = stream.next().await {
            self.handle_event(event).await;
        }
        debug!("Change stream ended");
        self.settle().await;
    }

    /// Process one change event
    ///
    /// Returns once the event's chains are dispatched, not once they finish.
    pub async fn handle_event(&mut self, event: ChangeEvent) {
        self.reap();

        if event.is_ready() {
            self.emit(DevelopEvent::Ready);
            return;
        }

        let span = info_span!("cycle", id = %Ulid::new());
        self.cycle(event).instrument(span).await;
        self.transition(LoopState::Watching);
    }

    /// Wait for every dispatched chain to finish
    pub async fn settle(&mut self) {
        while let Some(result) = self.inflight.join_next().await {
            if let Err(e) = result {
                warn!("Chain task failed: {}", e);
            }
        }
    }

    async fn cycle(&mut self, event: ChangeEvent) {
        self.emit(DevelopEvent::ChangeDetected {
            path: event.path().to_path_buf(),
            kind: event.kind,
        });
        self.transition(LoopState::Resolving);

        if let Err(e) = self.run_middleware().await {
            warn!("Skipping cycle: {}", e);
            self.emit(DevelopEvent::error(None, e));
            return;
        }

        let graphs = self.build_graphs(&event).await;
        let impact = self
            .resolver
            .resolve(&event, self.pipeline.session.functions(), &graphs);

        if impact.is_empty() {
            debug!("{} impacts no function", event.path().display());
            return;
        }

        self.transition(LoopState::Building);
        let span = tracing::Span::current();
        for item in impact {
            self.emit(DevelopEvent::Impacted {
                function: item.function.name.clone(),
                files: item.changed_files.clone(),
            });
            let pipeline = self.pipeline.clone();
            self.inflight
                .spawn(pipeline.run_chain(item).instrument(span.clone()));
        }
        self.transition(LoopState::Deploying);
    }

    async fn run_middleware(&self) -> Result<()> {
        if self.middleware.is_empty() {
            return Ok(());
        }
        let on_start = self.pipeline.sink.clone();
        let on_finish = self.pipeline.sink.clone();
        self.middleware
            .run(
                move |command| {
                    on_start(DevelopEvent::MiddlewareStarted {
                        command: command.to_string(),
                    })
                },
                move |command| {
                    on_finish(DevelopEvent::MiddlewareFinished {
                        command: command.to_string(),
                    })
                },
            )
            .await
    }

    /// Graphs for every function whose impact depends on one
    ///
    /// A failed build is reported and leaves that function out of this cycle
    /// only; the next event tries again.
    async fn build_graphs(&self, event: &ChangeEvent) -> HashMap<String, DependencyGraph> {
        let pending: Vec<&FunctionDescriptor> = self
            .pipeline
            .session
            .functions()
            .iter()
            .filter(|f| self.resolver.needs_graph(event, f))
            .collect();

        let results = join_all(pending.iter().map(|f| self.build_graph(f))).await;

        let mut graphs = HashMap::new();
        for (function, result) in pending.into_iter().zip(results) {
            match result {
                Ok(graph) => {
                    graphs.insert(function.name.clone(), graph);
                }
                Err(e) => {
                    warn!("Excluding {} from this cycle: {}", function.name, e);
                    self.emit(DevelopEvent::error(Some(function.name.as_str()), e));
                }
            }
        }
        graphs
    }

    async fn package_full(&self, function: &FunctionDescriptor) -> Result<()> {
        let graph = self.build_graph(function).await?;
        let mapper = self.pipeline.session.mapper();

        // Entry, its local closure, then third-party packages the graph skips
        let mut files: Vec<PathBuf> = vec![mapper.relative(&function.entry)];
        let closure = graph
            .dependencies(graph.entry())
            .unwrap_or_default()
            .iter()
            .map(|key| mapper.from_graph_path(key));
        let runtime = self.pipeline.session.config().runtime_paths();
        for path in closure.chain(runtime) {
            if !files.contains(&path) {
                files.push(path);
            }
        }

        self.pipeline.packager.package_full(&function.name, &files).await?;
        Ok(())
    }

    fn reap(&mut self) {
        while let Some(result) = self.inflight.try_join_next() {
            if let Err(e) = result {
                warn!("Chain task failed: {}", e);
            }
        }
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!("{} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn emit(&self, event: DevelopEvent) {
        self.pipeline.emit(event);
    }
}
