//! Path resolution and directory listing over the mounted archives.
//!
//! # Resolution
//!
//! [`OverlayResolver::resolve`] normalizes the path and walks the ranked
//! snapshot from the top. The first archive containing the path wins; every
//! later archive that also contains it is recorded in
//! [`ResolvedEntry::shadowed_by`], in rank order. Cost is O(M) hash lookups for
//! M mounted archives.
//!
//! # Listing
//!
//! Directories are implicit: a path is a directory if it is a strict prefix of
//! some entry. [`OverlayResolver::list_directory`] takes the *union* of the
//! immediate children across all archives, regardless of which archive wins
//! any individual file. Names are deduplicated case-insensitively and shown
//! with the spelling of the highest-ranked archive that has them. Listing uses
//! each archive's precomputed children index, which lives inside the immutable
//! [`ArchiveIndex`] and therefore can never go stale across mount/unmount.
//!
//! Every public method reads exactly one snapshot, so its answer is consistent
//! even while other threads mount or unmount.

use crate::archive::{ArchiveId, ArchiveIndex, EntryMetadata};
use crate::error::{Error, Result};
use crate::mount_table::{MountSnapshot, MountTable};
use crate::path::VfsPath;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// The authoritative entry for a path, plus the archives it shadows.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntry {
    /// Normalized path that was resolved.
    pub path: VfsPath,
    /// Archive whose entry wins.
    pub winning_archive: ArchiveId,
    /// Metadata of the winning entry.
    pub metadata: EntryMetadata,
    /// Lower-ranked archives that also contain the path, highest first.
    pub shadowed_by: Vec<ArchiveId>,
    /// Keeps the winning archive alive for extraction after an unmount.
    #[serde(skip)]
    archive: Arc<ArchiveIndex>,
}

impl ResolvedEntry {
    /// The archive that owns the winning entry.
    pub fn archive(&self) -> &Arc<ArchiveIndex> {
        &self.archive
    }

    pub fn is_conflicted(&self) -> bool {
        !self.shadowed_by.is_empty()
    }
}

impl PartialEq for ResolvedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.winning_archive == other.winning_archive
            && self.metadata == other.metadata
            && self.shadowed_by == other.shadowed_by
    }
}

impl Eq for ResolvedEntry {}

impl fmt::Debug for ResolvedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEntry")
            .field("path", &self.path)
            .field("winning_archive", &self.winning_archive)
            .field("byte_size", &self.metadata.byte_size)
            .field("shadowed_by", &self.shadowed_by)
            .finish()
    }
}

/// One item of a merged directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// Child name as spelled by the highest-ranked archive that has it.
    pub name: String,
    /// Normalized full path of the child.
    pub path: VfsPath,
    /// Some archive has a file at this path.
    pub is_file: bool,
    /// Some archive has entries below this path.
    pub is_directory: bool,
}

/// Answers path queries against a [`MountTable`].
#[derive(Clone, Copy)]
pub struct OverlayResolver<'t> {
    table: &'t MountTable,
}

impl<'t> OverlayResolver<'t> {
    pub fn new(table: &'t MountTable) -> Self {
        Self { table }
    }

    /// Find the authoritative entry for `path`.
    ///
    /// Fails with [`Error::NotFound`] if no mounted archive contains it.
    pub fn resolve(&self, path: &str) -> Result<ResolvedEntry> {
        self.resolve_path(&VfsPath::parse(path)?)
    }

    pub fn resolve_path(&self, path: &VfsPath) -> Result<ResolvedEntry> {
        let snapshot = self.table.snapshot();
        let resolved =
            resolve_in(&snapshot, path).ok_or_else(|| Error::NotFound(path.to_string()))?;

        tracing::debug!(
            "Resolved '{}' -> '{}' (shadowing {})",
            path,
            resolved.winning_archive,
            resolved.shadowed_by.len()
        );
        Ok(resolved)
    }

    /// Whether any mounted archive has a file at `path`.
    pub fn exists(&self, path: &str) -> bool {
        let Ok(path) = VfsPath::parse(path) else {
            return false;
        };
        self.table
            .snapshot()
            .iter()
            .any(|m| m.archive().contains(&path))
    }

    /// Merged immediate children of `dir`, sorted by normalized name.
    ///
    /// The root always lists (possibly empty). Any other path must be a
    /// directory in at least one archive: a path that only exists as a file is
    /// [`Error::NotADirectory`], anything else [`Error::NotFound`].
    pub fn list_directory(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let dir = VfsPath::parse(dir)?;
        let snapshot = self.table.snapshot();
        list_in(&snapshot, &dir)
    }

    /// Every winning file below `dir`, sorted by path.
    ///
    /// Fails like [`list_directory`](Self::list_directory) if `dir` is not a
    /// directory.
    pub fn walk(&self, dir: &str) -> Result<Vec<ResolvedEntry>> {
        let dir = VfsPath::parse(dir)?;
        walk_in(&self.table.snapshot(), &dir)
    }

    pub(crate) fn snapshot(&self) -> Arc<MountSnapshot> {
        self.table.snapshot()
    }
}

/// Resolve `path` against one snapshot.
pub(crate) fn resolve_in(snapshot: &MountSnapshot, path: &VfsPath) -> Option<ResolvedEntry> {
    let mut winner: Option<(&Arc<ArchiveIndex>, &EntryMetadata)> = None;
    let mut shadowed_by = Vec::new();

    for mount in snapshot.iter() {
        let archive = mount.archive();
        let Some(meta) = archive.get(path) else {
            continue;
        };
        if winner.is_none() {
            winner = Some((archive, meta));
        } else {
            shadowed_by.push(archive.id().clone());
        }
    }

    winner.map(|(archive, meta)| ResolvedEntry {
        path: path.clone(),
        winning_archive: archive.id().clone(),
        metadata: meta.clone(),
        shadowed_by,
        archive: Arc::clone(archive),
    })
}

/// Every winning file below `dir` in one snapshot, sorted by path.
pub(crate) fn walk_in(snapshot: &MountSnapshot, dir: &VfsPath) -> Result<Vec<ResolvedEntry>> {
    ensure_directory(snapshot, dir)?;

    let mut paths: BTreeSet<&VfsPath> = BTreeSet::new();
    for mount in snapshot.iter() {
        paths.extend(mount.archive().paths().filter(|p| p.is_descendant_of(dir)));
    }

    Ok(paths
        .into_iter()
        .filter_map(|p| resolve_in(snapshot, p))
        .collect())
}

/// Display name of child `key` of `dir`, as [`list_in`] spells it: taken from
/// the highest-ranked archive that has the child.
pub(crate) fn child_name_in<'s>(
    snapshot: &'s MountSnapshot,
    dir: &VfsPath,
    key: &str,
) -> Option<&'s str> {
    snapshot
        .iter()
        .find_map(|m| m.archive().child(dir, key))
        .map(|child| child.name.as_str())
}

/// Merge the children of `dir` across one snapshot.
pub(crate) fn list_in(snapshot: &MountSnapshot, dir: &VfsPath) -> Result<Vec<DirEntry>> {
    ensure_directory(snapshot, dir)?;

    let mut merged: BTreeMap<&str, DirEntry> = BTreeMap::new();
    for mount in snapshot.iter() {
        let Some(children) = mount.archive().children(dir) else {
            continue;
        };
        for child in children {
            merged
                .entry(child.key.as_str())
                .and_modify(|e| {
                    e.is_file |= child.is_file;
                    e.is_directory |= child.is_directory;
                })
                .or_insert_with(|| DirEntry {
                    name: child.name.clone(),
                    path: dir.join_normalized(&child.key),
                    is_file: child.is_file,
                    is_directory: child.is_directory,
                });
        }
    }

    Ok(merged.into_values().collect())
}

fn ensure_directory(snapshot: &MountSnapshot, dir: &VfsPath) -> Result<()> {
    if dir.is_root() || snapshot.iter().any(|m| m.archive().is_directory(dir)) {
        return Ok(());
    }
    if snapshot.iter().any(|m| m.archive().contains(dir)) {
        return Err(Error::NotADirectory(dir.to_string()));
    }
    Err(Error::NotFound(dir.to_string()))
}
