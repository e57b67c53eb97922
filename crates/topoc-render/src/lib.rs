//! # topoc-render
//!
//! Renders resolved containers and services into artifact text.
//!
//! Handles:
//! - **Script**: One container-launch script per container, plus the
//!   deduplicated image pull list of an environment.
//! - **Manifest**: Deployment, Service, Ingress, and volume-claim documents
//!   built from fixed templates, normalized before serialization.
//!
//! Nothing here touches the filesystem except [`manifest::Templates::from_dir`].

pub mod manifest;
pub mod script;

pub use manifest::{RenderedManifest, Templates, render_manifest};
pub use script::{LaunchScript, PullList, render_launch_script};
