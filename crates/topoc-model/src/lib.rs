//! # topoc-model
//!
//! Immutable in-memory representation of a deployment topology.
//!
//! Handles:
//! - **Document**: Locating the `EnvironmentDetails` and `ServiceDetails`
//!   sections of a multi-document YAML stream by their `kind` tag.
//! - **Model**: Environments, services, containers, ports, volumes, and
//!   variables, deserialized with `serde`.
//! - **Validator**: Presence and uniqueness checks performed at load time.
//! - **Graph**: The read-only architecture view consumed by diagram tooling.

pub mod document;
pub mod graph;
pub mod model;
pub mod scalar;
pub mod validator;

pub use document::{load, load_path};
pub use model::{
    ApiMonitor, Category, Container, Environment, NonApiMonitor, PortMapping, Service, Topology,
    VariableDeclaration, VariableOverride, VolumeMapping,
};
pub use scalar::ScalarValue;
