//! Remote platform requests
//!
//! The develop loop issues exactly two kinds of request: reading the deployed
//! stack's outputs and replacing one function's code.

use crate::process::run_program;
use async_trait::async_trait;
use bytes::Bytes;
use sdev_core::{DevelopError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Remote cloud platform
#[async_trait]
pub trait Platform: Send + Sync {
    /// Key/value outputs of a deployed stack
    async fn describe_stack_outputs(&self, stack: &str) -> Result<HashMap<String, String>>;

    /// Replace the code of `function_id` with the archive `code`
    async fn replace_function_code(&self, function_id: &str, code: Bytes) -> Result<()>;
}

/// Platform backed by the `aws` command line client
#[derive(Debug, Clone)]
pub struct AwsCliPlatform {
    program: String,
    region: String,
    profile: Option<String>,
    cwd: PathBuf,
}

impl AwsCliPlatform {
    pub fn new(region: &str, profile: Option<&str>, cwd: PathBuf) -> Self {
        Self {
            program: "aws".to_string(),
            region: region.to_string(),
            profile: profile.map(str::to_string),
            cwd,
        }
    }

    /// Use a different client binary (same argument conventions)
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec!["--region".to_string(), self.region.clone(), "--output".to_string(), "json".to_string()];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }

    async fn call(&self, operation: &str, mut args: Vec<String>, stdin: Option<Bytes>) -> Result<String> {
        args.extend(self.common_args());
        debug!("{} {}", self.program, args.join(" "));

        let result = run_program(&self.program, &args, &self.cwd, stdin)
            .await
            .map_err(|e| platform_error(operation, format!("cannot run `{}`: {}", self.program, e)))?;

        if !result.success() {
            let message = result.stderr.trim();
            return Err(platform_error(
                operation,
                if message.is_empty() {
                    format!("`{}` exited with {:?}", self.program, result.exit_code)
                } else {
                    message.to_string()
                },
            ));
        }
        Ok(result.stdout)
    }
}

#[async_trait]
impl Platform for AwsCliPlatform {
    async fn describe_stack_outputs(&self, stack: &str) -> Result<HashMap<String, String>> {
        let args = vec![
            "cloudformation".to_string(),
            "describe-stacks".to_string(),
            "--stack-name".to_string(),
            stack.to_string(),
        ];
        let stdout = self.call("describe-stacks", args, None).await?;
        parse_stack_outputs(&stdout)
    }

    async fn replace_function_code(&self, function_id: &str, code: Bytes) -> Result<()> {
        let args = vec![
            "lambda".to_string(),
            "update-function-code".to_string(),
            "--function-name".to_string(),
            function_id.to_string(),
            "--zip-file".to_string(),
            "fileb:///dev/stdin".to_string(),
        ];
        self.call("update-function-code", args, Some(code)).await?;
        Ok(())
    }
}

/// Extract `OutputKey -> OutputValue` from a `describe-stacks` response
pub fn parse_stack_outputs(json: &str) -> Result<HashMap<String, String>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| platform_error("describe-stacks", format!("invalid response: {}", e)))?;

    let stack = value
        .get("Stacks")
        .and_then(Value::as_array)
        .and_then(|stacks| stacks.first())
        .ok_or_else(|| platform_error("describe-stacks", "response contains no stack"))?;

    let outputs = stack
        .get("Outputs")
        .and_then(Value::as_array)
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|output| {
                    let key = output.get("OutputKey")?.as_str()?;
                    let value = output.get("OutputValue")?.as_str()?;
                    Some((key.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(outputs)
}

fn platform_error(operation: &str, message: impl Into<String>) -> DevelopError {
    DevelopError::Platform {
        operation: operation.to_string(),
        message: message.into(),
    }
}
