//! App/engine/framework materialization.
//!
//! Walks every environment of a freshly created configuration, resolves
//! each declared descriptor, downloads the ones that are not present
//! locally, then verifies tracker fields and runs one-time post-install
//! hooks. This is the most failure-prone part of provisioning (store
//! mounts, schema drift), so each descriptor is attempted independently
//! and the run fails at the end with a summary naming the casualties.

use crate::descriptor::{BundleDescriptor, Descriptor};
use crate::error::{Result, SlateError};
use crate::pipeline::PipelineConfiguration;
use crate::remote::TrackerClient;
use tracing::{error, info};

/// Materialize every descriptor referenced by the configuration's
/// environments.
pub fn install_environments(
    pc: &PipelineConfiguration,
    client: &dyn TrackerClient,
) -> Result<()> {
    let mut descriptors = Vec::new();
    for env_name in pc.environment_names()? {
        let env = pc.environment(&env_name)?;
        info!("Installing items for environment {}...", env.name);
        for (kind, spec) in env.all_descriptors() {
            descriptors.push(BundleDescriptor::new(kind, spec, pc.root()));
        }
    }

    let mut failures: Vec<String> = Vec::new();
    let mut succeeded = 0usize;

    for descriptor in &descriptors {
        match materialize(descriptor, client) {
            Ok(()) => succeeded += 1,
            Err(e) => {
                error!("{} failed to install: {}", descriptor.display_name(), e);
                failures.push(format!("{} ({})", descriptor.display_name(), e));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(SlateError::BundleInstall(format!(
            "{} of {} items installed; the following failed: {}",
            succeeded,
            descriptors.len(),
            failures.join("; ")
        )))
    }
}

fn materialize(descriptor: &BundleDescriptor, client: &dyn TrackerClient) -> Result<()> {
    if descriptor.exists_local() {
        info!("Item {} is already locally installed.", descriptor.display_name());
    } else {
        info!(
            "Downloading {} to the local install location...",
            descriptor.display_name()
        );
        descriptor.download_local()?;
    }

    descriptor.ensure_tracker_fields_exist(client)?;
    descriptor.run_post_install()
}
