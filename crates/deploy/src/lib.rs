//! Build and deploy steps for the develop loop
//!
//! - [`MiddlewareRunner`]: fail-fast pre-build shell commands
//! - [`Packager`]: incremental and full function archives
//! - [`Platform`]: the two remote requests the loop needs
//! - [`Deployer`]: code replacement plus endpoint composition

pub mod deployer;
pub mod middleware;
pub mod packager;
pub mod platform;
pub mod process;

pub use deployer::{endpoints, Deployer, Endpoint, SERVICE_ENDPOINT_OUTPUT};
pub use middleware::MiddlewareRunner;
pub use packager::{ArchiveHandle, Packager, ZipPackager};
pub use platform::{AwsCliPlatform, Platform};
pub use process::{run_program, run_shell, ProcessResult};
