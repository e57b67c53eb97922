//! Loading of the multi-document topology stream.
//!
//! The input holds one `EnvironmentDetails` and one `ServiceDetails`
//! document, in any order, alongside any number of unrelated documents.
//! Sections are located by their `kind` tag, never by position.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use topoc_common::constants::{ENVIRONMENT_DETAILS_KIND, SERVICE_DETAILS_KIND};
use topoc_common::error::{Result, TopocError};

use crate::model::{Environment, Service, Topology};
use crate::validator;

/// Discriminant of a topology section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Environments,
    Services,
}

impl SectionKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            ENVIRONMENT_DETAILS_KIND => Some(Self::Environments),
            SERVICE_DETAILS_KIND => Some(Self::Services),
            _ => None,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Environments => ENVIRONMENT_DETAILS_KIND,
            Self::Services => SERVICE_DETAILS_KIND,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvironmentDetails {
    #[serde(default)]
    environments: Vec<Environment>,
}

#[derive(Debug, Deserialize)]
struct ServiceDetails {
    #[serde(default)]
    services: Vec<Service>,
}

/// Parses and validates a topology from a YAML document stream.
///
/// # Errors
///
/// Returns [`TopocError::Schema`] if either section is missing or appears
/// more than once, [`TopocError::Parse`] if a section does not match the
/// model, or any error raised by [`validator::validate`].
pub fn load(input: &str) -> Result<Topology> {
    let mut environments: Option<Value> = None;
    let mut services: Option<Value> = None;

    for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = Value::deserialize(document)?;
        let Some(tag) = value.get("kind").and_then(Value::as_str) else {
            tracing::debug!(index, "skipping document without kind");
            continue;
        };
        let Some(kind) = SectionKind::from_tag(tag) else {
            tracing::debug!(index, kind = tag, "skipping unrelated document");
            continue;
        };
        let slot = match kind {
            SectionKind::Environments => &mut environments,
            SectionKind::Services => &mut services,
        };
        if slot.is_some() {
            return Err(TopocError::schema(format!(
                "more than one {} document (second at index {index})",
                kind.tag()
            )));
        }
        *slot = Some(value);
    }

    let environments: EnvironmentDetails =
        serde_yaml::from_value(require(environments, SectionKind::Environments)?)?;
    let services: ServiceDetails =
        serde_yaml::from_value(require(services, SectionKind::Services)?)?;

    let topology = Topology {
        environments: environments.environments,
        services: services.services,
    };
    validator::validate(&topology)?;
    tracing::info!(
        environments = topology.environments.len(),
        services = topology.services.len(),
        "loaded topology"
    );
    Ok(topology)
}

/// Reads and loads a topology file.
///
/// # Errors
///
/// Returns [`TopocError::Io`] if the file cannot be read, otherwise any
/// error from [`load`].
pub fn load_path(path: &Path) -> Result<Topology> {
    tracing::debug!(path = %path.display(), "reading topology document");
    let content = std::fs::read_to_string(path).map_err(|e| TopocError::io(path, e))?;
    load(&content)
}

fn require(section: Option<Value>, kind: SectionKind) -> Result<Value> {
    section.ok_or_else(|| TopocError::schema(format!("no {} document found", kind.tag())))
}
