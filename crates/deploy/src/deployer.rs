//! Code replacement and endpoint composition

use crate::packager::ArchiveHandle;
use crate::platform::Platform;
use bytes::Bytes;
use sdev_core::{DevelopError, FunctionDescriptor, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Stack output holding the service's base URL
pub const SERVICE_ENDPOINT_OUTPUT: &str = "ServiceEndpoint";

/// One externally reachable route of a deployed function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: String,
    pub url: String,
}

/// Pushes archives to the remote platform
#[derive(Clone)]
pub struct Deployer {
    platform: Arc<dyn Platform>,
    service: String,
    stage: String,
}

impl Deployer {
    pub fn new(platform: Arc<dyn Platform>, service: &str, stage: &str) -> Self {
        Self {
            platform,
            service: service.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Remote identifier of `function` (`<service>-<stage>-<function>`)
    pub fn function_id(&self, function: &str) -> String {
        format!("{}-{}-{}", self.service, self.stage, function)
    }

    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.service, self.stage)
    }

    /// Look up the service's base endpoint
    ///
    /// Called once per session. `Ok(None)` when the stack exists but exposes
    /// no HTTP endpoint.
    pub async fn resolve_base_endpoint(&self) -> Result<Option<String>> {
        let stack = self.stack_name();
        let outputs = self.platform.describe_stack_outputs(&stack).await?;
        let endpoint = outputs
            .get(SERVICE_ENDPOINT_OUTPUT)
            .map(|url| url.trim_end_matches('/').to_string());

        match &endpoint {
            Some(url) => info!("Base endpoint for {}: {}", stack, url),
            None => debug!("Stack {} has no {} output", stack, SERVICE_ENDPOINT_OUTPUT),
        }
        Ok(endpoint)
    }

    /// Replace the function's remote code with the archive's current bytes
    ///
    /// Returns the function's HTTP endpoints composed under `base_endpoint`;
    /// empty when the function has no HTTP routes or no base is known.
    pub async fn deploy(
        &self,
        function: &FunctionDescriptor,
        archive: &ArchiveHandle,
        base_endpoint: Option<&str>,
    ) -> Result<Vec<Endpoint>> {
        let code = tokio::fs::read(&archive.path)
            .await
            .map_err(|e| DevelopError::Deployment {
                function: function.name.clone(),
                message: format!("cannot read archive {}: {}", archive.path.display(), e),
            })?;

        let function_id = self.function_id(&function.name);
        debug!("Replacing code of {} ({} bytes)", function_id, code.len());

        self.platform
            .replace_function_code(&function_id, Bytes::from(code))
            .await
            .map_err(|e| DevelopError::Deployment {
                function: function.name.clone(),
                message: match e {
                    DevelopError::Platform { message, .. } => message,
                    other => other.to_string(),
                },
            })?;

        Ok(endpoints(function, base_endpoint))
    }
}

/// HTTP endpoints of `function` under `base_endpoint`
pub fn endpoints(function: &FunctionDescriptor, base_endpoint: Option<&str>) -> Vec<Endpoint> {
    let Some(base) = base_endpoint else {
        return Vec::new();
    };
    function
        .routes
        .iter()
        .map(|route| Endpoint {
            method: route.method.clone(),
            url: route.url(base),
        })
        .collect()
}
