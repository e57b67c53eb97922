//! # topoc-resolve
//!
//! Computes, for one environment, service, and container, every value the
//! generators emit.
//!
//! Handles:
//! - **Scope**: The `(environment, service, container)` tuple under resolution.
//! - **Env**: Ordered variable list with a per-form collision policy.
//! - **Variables**: The ordered resolution rules for both output forms.
//! - **Image**: Fully qualified image references.
//! - **Memory**: The memory-limit special case for search workloads.

pub mod env;
pub mod image;
pub mod memory;
pub mod scope;
pub mod variables;

pub use env::{CollisionPolicy, EnvList, EnvVar};
pub use scope::{OutputForm, Scope, ServiceScope};
pub use variables::resolve_variables;
