//! Ordered environment variable lists.
//!
//! Resolution rules append to an [`EnvList`] in rule order. What happens
//! when a name is emitted twice depends on the output form: launch scripts
//! keep every `-e` flag (the runtime honours the last one), manifests keep
//! one entry per name and overwrite its value in place.

use serde::Serialize;

/// What to do when a name is emitted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Keep every entry; the last one wins at launch time.
    Append,
    /// Overwrite the value of the existing entry, keeping its position.
    Replace,
}

/// One emitted variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Rendered value.
    pub value: String,
}

/// Variables in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvList {
    policy: CollisionPolicy,
    vars: Vec<EnvVar>,
}

impl EnvList {
    /// Creates an empty list with the given collision policy.
    #[must_use]
    pub const fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            vars: Vec::new(),
        }
    }

    /// Emits a variable according to the collision policy.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if self.policy == CollisionPolicy::Replace {
            if let Some(existing) = self.vars.iter_mut().find(|v| v.name == name) {
                existing.value = value;
                return;
            }
        }
        self.vars.push(EnvVar { name, value });
    }

    /// Value the runtime ends up with for `name`.
    #[must_use]
    pub fn effective(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    /// Number of entries whose name is `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.vars.iter().filter(|v| v.name == name).count()
    }

    /// Iterates over entries in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, EnvVar> {
        self.vars.iter()
    }

    /// Returns `true` if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }
}

impl<'a> IntoIterator for &'a EnvList {
    type Item = &'a EnvVar;
    type IntoIter = std::slice::Iter<'a, EnvVar>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}
