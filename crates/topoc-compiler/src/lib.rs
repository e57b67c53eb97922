//! # topoc-compiler
//!
//! Drives a compilation run over a loaded topology.
//!
//! Every environment is rendered in memory first, so a rendering error
//! leaves the disk untouched. Writing then replaces each environment
//! directory in turn. An I/O error part way through aborts the run and
//! can leave a partially written directory behind; there is no rollback.
//! Publishing monitoring settings is a separate, optional step.

pub mod driver;
pub mod monitoring;
pub mod writer;

pub use driver::{CompilePlan, CompileReport, Compiler, EnvironmentOutput, GeneratedFile};
pub use monitoring::{MemoryStore, MonitoringSettings, RedisStore, SettingsStore};
