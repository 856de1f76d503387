//! Logical path normalization.
//!
//! Every lookup key in the overlay is a [`VfsPath`]: forward-slash separated,
//! lowercased, with no empty, `.` or `..` segments and no leading or trailing
//! slash. The empty path is the root directory.
//!
//! The engine treats `Textures\Wall.TGA` and `textures/wall.tga` as the same
//! file, so both normalize to the same key. The original spelling is kept
//! separately by [`normalize_display`] for listings and extraction output.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Normalized, case-insensitive logical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VfsPath(String);

impl VfsPath {
    /// The root directory (empty path).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a raw path into a lookup key.
    ///
    /// Backslashes count as separators, repeated separators collapse, `.` is
    /// dropped and `..` removes the previous segment. Fails with
    /// [`Error::InvalidPath`] if `..` would climb above the root or the path
    /// contains a NUL byte.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self(normalize_display(raw)?.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the path segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<VfsPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append a raw relative path and normalize the result.
    pub fn join(&self, raw: &str) -> Result<VfsPath> {
        if self.is_root() {
            return Self::parse(raw);
        }
        Self::parse(&format!("{}/{}", self.0, raw))
    }

    /// Append a segment that is already normalized (lowercase, no separators).
    pub(crate) fn join_normalized(&self, segment: &str) -> VfsPath {
        if self.is_root() {
            Self(segment.to_string())
        } else {
            Self(format!("{}/{}", self.0, segment))
        }
    }

    /// Whether `self` lies strictly below `dir`.
    pub fn is_descendant_of(&self, dir: &VfsPath) -> bool {
        if dir.is_root() {
            return !self.is_root();
        }
        self.0.len() > dir.0.len()
            && self.0.starts_with(dir.0.as_str())
            && self.0.as_bytes()[dir.0.len()] == b'/'
    }

    /// Every proper ancestor, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = VfsPath> + '_ {
        let mut current = self.parent();
        std::iter::from_fn(move || {
            let next = current.take()?;
            current = next.parent();
            Some(next)
        })
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl AsRef<str> for VfsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VfsPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for VfsPath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

/// Normalize separators and `.`/`..` segments while preserving case.
///
/// `VfsPath::parse(raw)` is exactly `normalize_display(raw)` lowercased, so the
/// two always have the same segments.
pub fn normalize_display(raw: &str) -> Result<String> {
    if raw.contains('\0') {
        return Err(Error::InvalidPath {
            path: raw.to_string(),
            reason: "contains a NUL byte",
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::InvalidPath {
                        path: raw.to_string(),
                        reason: "escapes the archive root",
                    });
                }
            }
            s => segments.push(s),
        }
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_separator_and_case() {
        let a = VfsPath::parse("Textures\\Wall\\STONE.TGA").unwrap();
        let b = VfsPath::parse("textures/wall/stone.tga").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "textures/wall/stone.tga");
    }

    #[test]
    fn test_parse_dot_segments() {
        let path = VfsPath::parse("/_work//data/./scripts/../Textures/x.tex/").unwrap();
        assert_eq!(path.as_str(), "_work/data/textures/x.tex");
    }

    #[test]
    fn test_parse_escape_root() {
        let err = VfsPath::parse("textures/../../x.tex").unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_parse_nul() {
        assert!(VfsPath::parse("a\0b").is_err());
    }

    #[test]
    fn test_root() {
        let root = VfsPath::parse("/").unwrap();
        assert!(root.is_root());
        assert_eq!(root, VfsPath::root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.file_name(), None);
        assert_eq!(root.segments().count(), 0);
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn test_parent_and_file_name() {
        let path = VfsPath::parse("scripts/content/gothic.src").unwrap();
        assert_eq!(path.file_name(), Some("gothic.src"));
        assert_eq!(path.parent().unwrap().as_str(), "scripts/content");

        let top = VfsPath::parse("readme.txt").unwrap();
        assert_eq!(top.parent(), Some(VfsPath::root()));
    }

    #[test]
    fn test_ancestors() {
        let path = VfsPath::parse("a/b/c").unwrap();
        let ancestors: Vec<String> = path.ancestors().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, vec!["a/b", "a", "/"]);
    }

    #[test]
    fn test_descendant() {
        let dir = VfsPath::parse("scripts").unwrap();
        assert!(VfsPath::parse("scripts/a.d").unwrap().is_descendant_of(&dir));
        assert!(!VfsPath::parse("scripts2/a.d").unwrap().is_descendant_of(&dir));
        assert!(!dir.is_descendant_of(&dir));
        assert!(dir.is_descendant_of(&VfsPath::root()));
    }

    #[test]
    fn test_join() {
        let dir = VfsPath::parse("Meshes").unwrap();
        assert_eq!(dir.join("Level\\World.MSH").unwrap().as_str(), "meshes/level/world.msh");
        assert_eq!(VfsPath::root().join("a").unwrap().as_str(), "a");
        assert_eq!(dir.join("..").unwrap(), VfsPath::root());
    }

    #[test]
    fn test_display_preserves_case() {
        assert_eq!(
            normalize_display("\\_WORK\\Data\\Anims\\").unwrap(),
            "_WORK/Data/Anims"
        );
    }

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_][A-Za-z0-9_.-]{0,7}".prop_filter("not a dot segment", |s| s != "." && s != "..")
    }

    proptest! {
        #[test]
        fn prop_case_and_separator_insensitive(segments in prop::collection::vec(segment(), 1..6)) {
            let forward = segments.join("/");
            let backward = segments.join("\\").to_uppercase();
            prop_assert_eq!(VfsPath::parse(&forward).unwrap(), VfsPath::parse(&backward).unwrap());
        }

        #[test]
        fn prop_parse_is_idempotent(segments in prop::collection::vec(segment(), 0..6)) {
            let once = VfsPath::parse(&segments.join("/")).unwrap();
            let twice = VfsPath::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_display_matches_key(segments in prop::collection::vec(segment(), 0..6)) {
            let raw = segments.join("\\");
            let display = normalize_display(&raw).unwrap();
            let parsed = VfsPath::parse(&raw).unwrap();
            prop_assert_eq!(display.to_lowercase(), parsed.as_str());
        }
    }
}
