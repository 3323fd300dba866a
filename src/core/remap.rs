//! Host ↔ consumer path translation.
//!
//! A [`PathRemap`] says "what the host calls `from`, the other side calls
//! `to`". Container bind mounts are identity remaps; invocation-record
//! rewrites are non-identity ones. A [`RemapSet`] keeps the whole mapping
//! one-to-one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::PreconditionError;

/// A single path translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathRemap {
    from: PathBuf,
    to: PathBuf,
}

impl PathRemap {
    /// Create a remap. Both sides must be non-empty absolute paths; they are
    /// stored component-wise, so `/opt/ndk/` and `/opt/ndk` are the same side.
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Result<Self, PreconditionError> {
        let from = normalize_side(from.into())?;
        let to = normalize_side(to.into())?;
        Ok(PathRemap { from, to })
    }

    /// The mapping of `path` onto itself.
    pub fn identity(path: impl Into<PathBuf>) -> Result<Self, PreconditionError> {
        let path = path.into();
        Self::new(path.clone(), path)
    }

    pub fn from(&self) -> &Path {
        &self.from
    }

    pub fn to(&self) -> &Path {
        &self.to
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

fn normalize_side(side: PathBuf) -> Result<PathBuf, PreconditionError> {
    if side.as_os_str().is_empty() {
        return Err(PreconditionError::ConflictingRemap {
            reason: "empty path in remap".to_string(),
        });
    }
    if !side.has_root() {
        return Err(PreconditionError::ConflictingRemap {
            reason: format!("remap path is not absolute: {}", side.display()),
        });
    }
    Ok(side.components().collect())
}

/// An ordered, one-to-one collection of remaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapSet {
    remaps: Vec<PathRemap>,
}

impl RemapSet {
    pub fn new() -> Self {
        RemapSet { remaps: Vec::new() }
    }

    /// Add a remap. Exact duplicates are ignored; a second mapping for an
    /// existing source or onto an existing destination is rejected.
    pub fn insert(&mut self, remap: PathRemap) -> Result<(), PreconditionError> {
        if self.remaps.contains(&remap) {
            return Ok(());
        }
        if let Some(existing) = self.remaps.iter().find(|r| r.from == remap.from) {
            return Err(PreconditionError::ConflictingRemap {
                reason: format!(
                    "{} maps to both {} and {}",
                    remap.from.display(),
                    existing.to.display(),
                    remap.to.display()
                ),
            });
        }
        if let Some(existing) = self.remaps.iter().find(|r| r.to == remap.to) {
            return Err(PreconditionError::ConflictingRemap {
                reason: format!(
                    "{} and {} both map to {}",
                    existing.from.display(),
                    remap.from.display(),
                    remap.to.display()
                ),
            });
        }
        self.remaps.push(remap);
        Ok(())
    }

    /// Whether exactly this remap is already in the set.
    pub fn contains(&self, remap: &PathRemap) -> bool {
        self.remaps.contains(remap)
    }

    pub fn len(&self) -> usize {
        self.remaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaps.is_empty()
    }

    pub fn into_vec(self) -> Vec<PathRemap> {
        self.remaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_separators_are_dropped() {
        let remap = PathRemap::new("/opt/ndk/", "/home/dev/ndk//").unwrap();
        assert_eq!(remap.from(), Path::new("/opt/ndk"));
        assert_eq!(remap.to(), Path::new("/home/dev/ndk"));
        assert_eq!(remap.from().to_str(), Some("/opt/ndk"));
        assert_eq!(remap.to().to_str(), Some("/home/dev/ndk"));
        assert!(PathRemap::new("/opt/ndk/", "/opt/ndk").unwrap().is_identity());
    }

    #[test]
    fn relative_paths_are_rejected() {
        assert!(PathRemap::new("ndk", "/opt/ndk").is_err());
        assert!(PathRemap::new("/opt/ndk", "").is_err());
    }

    #[test]
    fn set_rejects_non_bijective_entries() {
        let mut set = RemapSet::new();
        set.insert(PathRemap::new("/a", "/x").unwrap()).unwrap();
        set.insert(PathRemap::new("/a", "/x").unwrap()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.insert(PathRemap::new("/a", "/y").unwrap()).is_err());
        assert!(set.insert(PathRemap::new("/b", "/x").unwrap()).is_err());
        set.insert(PathRemap::new("/b", "/y").unwrap()).unwrap();
        assert!(set.contains(&PathRemap::new("/b/", "/y").unwrap()));
        assert_eq!(set.len(), 2);
    }
}
