//! Per-session context shared by every change cycle

use dashmap::DashMap;
use sdev_core::{DevelopConfig, FunctionDescriptor, PathMapper, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

/// Everything fixed at startup, passed by reference through the loop
///
/// The base endpoint is resolved at most once, during bootstrap. Flight
/// locks serialize package+deploy chains of the same function.
pub struct Session {
    config: DevelopConfig,
    functions: Vec<FunctionDescriptor>,
    mapper: PathMapper,
    base_endpoint: OnceLock<Option<String>>,
    flights: DashMap<String, Arc<Mutex<()>>>,
}

impl Session {
    pub fn new(config: DevelopConfig) -> Result<Self> {
        let functions = config.descriptors()?;
        let mapper = config.mapper();
        Ok(Self {
            config,
            functions,
            mapper,
            base_endpoint: OnceLock::new(),
            flights: DashMap::new(),
        })
    }

    pub fn config(&self) -> &DevelopConfig {
        &self.config
    }

    /// Function descriptors in declaration order
    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub fn verbose(&self) -> bool {
        self.config.develop.verbose
    }

    /// Record the base endpoint; later calls are ignored
    pub fn set_base_endpoint(&self, endpoint: Option<String>) {
        let _ = self.base_endpoint.set(endpoint);
    }

    pub fn base_endpoint(&self) -> Option<&str> {
        self.base_endpoint.get().and_then(|e| e.as_deref())
    }

    pub fn base_endpoint_resolved(&self) -> bool {
        self.base_endpoint.get().is_some()
    }

    /// Single-flight lock for `function`
    ///
    /// Waiters are served in FIFO order, so the latest change deploys last.
    pub fn flight_lock(&self, function: &str) -> Arc<Mutex<()>> {
        self.flights
            .entry(function.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
