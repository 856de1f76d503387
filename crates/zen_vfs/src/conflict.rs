//! Mod conflict diagnostics.
//!
//! A conflict is a path present in more than one mounted archive. Only the
//! winner's content is ever served; the report exists so a front end can warn
//! that one mod silently overrides another. It never affects resolution.

use crate::archive::ArchiveId;
use crate::mount_table::{MountSnapshot, MountTable};
use crate::path::VfsPath;
use crate::resolver::{resolve_in, ResolvedEntry};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// How many paths one archive shadows in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub winner: ArchiveId,
    pub shadowed: ArchiveId,
    pub paths: usize,
}

/// Conflict sweep over a [`MountTable`].
pub struct ConflictReport<'t> {
    table: &'t MountTable,
}

impl<'t> ConflictReport<'t> {
    pub fn new(table: &'t MountTable) -> Self {
        Self { table }
    }

    /// Every path contained in more than one archive, resolved, sorted by
    /// normalized path.
    ///
    /// Runs against a single snapshot in O(total distinct paths). Two calls
    /// against an unchanged table return identical results in identical order.
    pub fn detect_conflicts(&self) -> Vec<ResolvedEntry> {
        let snapshot = self.table.snapshot();
        let conflicts = detect_in(&snapshot);
        tracing::debug!(
            "Conflict sweep over {} archives found {} conflicting paths",
            snapshot.len(),
            conflicts.len()
        );
        conflicts
    }

    /// Per `(winner, shadowed)` archive pair, the number of shadowed paths.
    /// Sorted by winner, then shadowed archive id.
    pub fn summarize(&self) -> Vec<ConflictSummary> {
        summarize(&self.detect_conflicts())
    }
}

pub(crate) fn detect_in(snapshot: &MountSnapshot) -> Vec<ResolvedEntry> {
    let mut counts: HashMap<&VfsPath, usize> = HashMap::new();
    for mount in snapshot.iter() {
        for path in mount.archive().paths() {
            *counts.entry(path).or_default() += 1;
        }
    }

    let mut conflicted: Vec<&VfsPath> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(path, _)| path)
        .collect();
    conflicted.sort_unstable();

    conflicted
        .into_iter()
        .filter_map(|path| resolve_in(snapshot, path))
        .collect()
}

/// Aggregate resolved conflicts into per-archive-pair counts.
pub fn summarize(conflicts: &[ResolvedEntry]) -> Vec<ConflictSummary> {
    let mut pairs: BTreeMap<(&ArchiveId, &ArchiveId), usize> = BTreeMap::new();
    for entry in conflicts {
        for shadowed in &entry.shadowed_by {
            *pairs.entry((&entry.winning_archive, shadowed)).or_default() += 1;
        }
    }

    pairs
        .into_iter()
        .map(|((winner, shadowed), paths)| ConflictSummary {
            winner: winner.clone(),
            shadowed: shadowed.clone(),
            paths,
        })
        .collect()
}
