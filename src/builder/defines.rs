//! CMake `-D` cache entries.

use std::fmt;

use serde::Serialize;

use crate::core::errors::BuildError;
use crate::core::request::OptionOverride;

/// A single `-DNAME=VALUE` cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `ON`/`OFF` boolean entry.
    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Define::new(name, if value { "ON" } else { "OFF" })
    }

    /// Argument as passed to cmake (unquoted; quoting is the caller's job).
    pub fn to_arg(&self) -> String {
        format!("-D{}={}", self.name, self.value)
    }
}

impl From<&OptionOverride> for Define {
    fn from(o: &OptionOverride) -> Self {
        Define::new(o.key.clone(), o.value.clone())
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

/// An ordered set of defines in which every name is configured once.
///
/// Setting a name twice means two resolver rules fight over the same cache
/// variable; that is a defect, reported as [`BuildError::Unreachable`]
/// rather than letting the later value silently win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineSet {
    entries: Vec<Define>,
}

impl DefineSet {
    pub fn new() -> Self {
        DefineSet {
            entries: Vec::new(),
        }
    }

    /// Append a define, failing if its name is already present.
    pub fn set(&mut self, define: Define) -> Result<(), BuildError> {
        if let Some(existing) = self.get(&define.name) {
            return Err(BuildError::Unreachable(format!(
                "double configuration of {}: `{}` then `{}`",
                define.name, existing, define.value
            )));
        }
        self.entries.push(define);
        Ok(())
    }

    /// Append several defines in order.
    pub fn extend(&mut self, defines: impl IntoIterator<Item = Define>) -> Result<(), BuildError> {
        for define in defines {
            self.set(define)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Define> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Define> {
        self.entries
    }
}
