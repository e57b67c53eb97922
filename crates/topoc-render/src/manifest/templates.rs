//! Base templates for manifest documents.
//!
//! Four templates are embedded in the binary. A directory may override any
//! of them by providing a file with the same name.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use topoc_common::error::{Result, TopocError};

/// Deployment + Service.
pub const DEPLOYMENT_TEMPLATE: &str = "k8s_template.yaml";
/// Deployment + Service + Ingress.
pub const INGRESS_TEMPLATE: &str = "k8s_template_ingress.yaml";
/// Standard volume claim.
pub const VOLUME_CLAIM_TEMPLATE: &str = "k8s_template_volume_claim.yaml";
/// Volume claim for the network-isolated environment.
pub const RESTRICTED_VOLUME_CLAIM_TEMPLATE: &str = "k8s_template_volume_claim_restricted.yaml";

/// The manifest template set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    deployment: String,
    ingress: String,
    volume_claim: String,
    restricted_volume_claim: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Templates {
    /// The templates shipped with the compiler.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            deployment: include_str!("../../templates/k8s_template.yaml").to_string(),
            ingress: include_str!("../../templates/k8s_template_ingress.yaml").to_string(),
            volume_claim: include_str!("../../templates/k8s_template_volume_claim.yaml")
                .to_string(),
            restricted_volume_claim: include_str!(
                "../../templates/k8s_template_volume_claim_restricted.yaml"
            )
            .to_string(),
        }
    }

    /// Embedded templates overridden by files found in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Io`] if a present template cannot be read.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut templates = Self::embedded();
        for (name, slot) in [
            (DEPLOYMENT_TEMPLATE, &mut templates.deployment),
            (INGRESS_TEMPLATE, &mut templates.ingress),
            (VOLUME_CLAIM_TEMPLATE, &mut templates.volume_claim),
            (
                RESTRICTED_VOLUME_CLAIM_TEMPLATE,
                &mut templates.restricted_volume_claim,
            ),
        ] {
            let path = dir.join(name);
            if path.exists() {
                tracing::debug!(path = %path.display(), "using template override");
                *slot = std::fs::read_to_string(&path).map_err(|e| TopocError::io(&path, e))?;
            }
        }
        Ok(templates)
    }

    /// Parses the service template (with or without ingress).
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Template`] if the template lacks a Deployment
    /// or Service document, or an Ingress document when one is requested.
    pub fn service_documents(&self, with_ingress: bool) -> Result<ServiceDocuments> {
        let (name, text) = if with_ingress {
            (INGRESS_TEMPLATE, &self.ingress)
        } else {
            (DEPLOYMENT_TEMPLATE, &self.deployment)
        };
        let documents = parse_all(text)?;
        let find = |kind: &str| {
            documents
                .iter()
                .position(|d| d.get("kind").and_then(Value::as_str) == Some(kind))
        };
        let deployment = find("Deployment")
            .ok_or_else(|| TopocError::template(name, "no Deployment document"))?;
        let service =
            find("Service").ok_or_else(|| TopocError::template(name, "no Service document"))?;
        let ingress = find("Ingress");
        if with_ingress && ingress.is_none() {
            return Err(TopocError::template(name, "no Ingress document"));
        }
        Ok(ServiceDocuments {
            template: name,
            documents,
            deployment,
            service,
            ingress,
        })
    }

    /// Parses the volume claim template.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Template`] if the template holds no document.
    pub fn volume_claim(&self, restricted: bool) -> Result<(&'static str, Value)> {
        let (name, text) = if restricted {
            (RESTRICTED_VOLUME_CLAIM_TEMPLATE, &self.restricted_volume_claim)
        } else {
            (VOLUME_CLAIM_TEMPLATE, &self.volume_claim)
        };
        let claim = parse_all(text)?
            .into_iter()
            .next()
            .ok_or_else(|| TopocError::template(name, "no document"))?;
        Ok((name, claim))
    }
}

/// Parsed service template with the positions of its documents.
#[derive(Debug, Clone)]
pub struct ServiceDocuments {
    /// Template file name, for error messages.
    pub template: &'static str,
    /// Documents in template order.
    pub documents: Vec<Value>,
    /// Index of the Deployment document.
    pub deployment: usize,
    /// Index of the Service document.
    pub service: usize,
    /// Index of the Ingress document, if any.
    pub ingress: Option<usize>,
}

fn parse_all(text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}
