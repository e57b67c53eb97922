//! Load-time checks of the topology.
//!
//! Only what later stages rely on is checked: unique join keys, at least
//! one container per service, and environment names usable as directory
//! names. Cross-references are not checked here; unresolved lookups are
//! reported as warnings during compilation.

use std::collections::HashSet;

use topoc_common::error::{Result, TopocError};

use crate::model::Topology;

/// Validates a topology for structural correctness.
///
/// # Checks performed
///
/// 1. No duplicate environment names.
/// 2. Environment names are non-empty, contain no path separator, and are
///    not `.` or `..`.
/// 3. No duplicate service names.
/// 4. Every service declares at least one container.
///
/// # Errors
///
/// Returns [`TopocError::Schema`] describing the first failed check.
pub fn validate(topology: &Topology) -> Result<()> {
    tracing::debug!("validating topology");
    check_environment_names(topology)?;
    check_duplicate_services(topology)?;
    check_containers_present(topology)?;
    Ok(())
}

fn check_environment_names(topology: &Topology) -> Result<()> {
    let mut seen = HashSet::new();
    for env in &topology.environments {
        if env.name.trim().is_empty()
            || env.name.contains(['/', '\\'])
            || matches!(env.name.as_str(), "." | "..")
        {
            return Err(TopocError::schema(format!(
                "environment name \"{}\" cannot be used as a directory name",
                env.name
            )));
        }
        if !seen.insert(env.name.as_str()) {
            return Err(TopocError::schema(format!(
                "duplicate environment name: \"{}\"",
                env.name
            )));
        }
    }
    Ok(())
}

fn check_duplicate_services(topology: &Topology) -> Result<()> {
    let mut seen = HashSet::new();
    for service in &topology.services {
        if !seen.insert(service.name.as_str()) {
            return Err(TopocError::schema(format!(
                "duplicate service name: \"{}\"",
                service.name
            )));
        }
    }
    Ok(())
}

fn check_containers_present(topology: &Topology) -> Result<()> {
    for service in &topology.services {
        if service.containers.is_empty() {
            return Err(TopocError::schema(format!(
                "service \"{}\" declares no containers",
                service.name
            )));
        }
    }
    Ok(())
}
