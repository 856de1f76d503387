//! Mount table: which archives are visible, and in what order.
//!
//! The table publishes an immutable [`MountSnapshot`] behind an `Arc`. Queries
//! grab the current snapshot once and read it without further locking, so a
//! query observes the table either before or after a concurrent mount/unmount,
//! never halfway. Writers build a new snapshot under the write lock and swap it
//! in as their last step; a failed mutation publishes nothing.
//!
//! # Ordering
//!
//! Entries are ranked by `(priority desc, mount_order desc)`: higher priority
//! wins, and among equal priorities the most recently mounted archive wins.
//! `mount_order` is unique per table, so the order is total.

use crate::archive::{ArchiveId, ArchiveIndex};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Handle returned by [`MountTable::mount`], used to unmount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MountHandle(u64);

impl fmt::Display for MountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One mounted archive.
#[derive(Debug, Clone)]
pub struct MountEntry {
    handle: MountHandle,
    archive: Arc<ArchiveIndex>,
    priority: i32,
    mount_order: u64,
}

impl MountEntry {
    pub fn handle(&self) -> MountHandle {
        self.handle
    }

    pub fn archive(&self) -> &Arc<ArchiveIndex> {
        &self.archive
    }

    pub fn archive_id(&self) -> &ArchiveId {
        self.archive.id()
    }

    /// Higher wins.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Registration sequence number; later mounts have larger values.
    pub fn mount_order(&self) -> u64 {
        self.mount_order
    }
}

/// Immutable, ranked view of the mount table.
#[derive(Debug, Default)]
pub struct MountSnapshot {
    entries: Vec<MountEntry>,
    generation: u64,
}

impl MountSnapshot {
    /// Entries from highest to lowest rank.
    pub fn iter(&self) -> std::slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful mutations that led to this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, handle: MountHandle) -> Option<&MountEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    /// Look up a mounted archive by id (case-insensitive).
    pub fn find(&self, archive_id: &str) -> Option<&MountEntry> {
        self.entries.iter().find(|e| e.archive.id().matches(archive_id))
    }
}

impl<'a> IntoIterator for &'a MountSnapshot {
    type Item = &'a MountEntry;
    type IntoIter = std::slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

struct TableState {
    current: Arc<MountSnapshot>,
    next_order: u64,
}

/// Owns the set of mounted archives.
///
/// Create one per overlay and pass it explicitly to
/// [`OverlayResolver`](crate::OverlayResolver),
/// [`ConflictReport`](crate::ConflictReport) and friends. All methods take
/// `&self`; the table can be shared between threads.
pub struct MountTable {
    state: RwLock<TableState>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TableState {
                current: Arc::new(MountSnapshot::default()),
                next_order: 0,
            }),
        }
    }

    /// Register an archive with the given priority.
    ///
    /// Fails with [`Error::DuplicateMount`] if an archive with the same id
    /// (compared case-insensitively) is already mounted; the table is left
    /// unchanged in that case.
    pub fn mount(&self, archive: impl Into<Arc<ArchiveIndex>>, priority: i32) -> Result<MountHandle> {
        let archive = archive.into();
        let mut state = self.state.write();

        if state.current.find(archive.id().as_str()).is_some() {
            tracing::warn!("Refusing to mount '{}': already mounted", archive.id());
            return Err(Error::DuplicateMount {
                archive: archive.id().clone(),
            });
        }

        let mount_order = state.next_order;
        let handle = MountHandle(mount_order);

        let mut entries = state.current.entries.clone();
        entries.push(MountEntry {
            handle,
            archive: Arc::clone(&archive),
            priority,
            mount_order,
        });
        rank(&mut entries);

        state.next_order += 1;
        state.current = Arc::new(MountSnapshot {
            entries,
            generation: state.current.generation + 1,
        });

        tracing::info!(
            "Mounted '{}' ({:?}, {} entries) priority={} order={} handle={}",
            archive.id(),
            archive.kind(),
            archive.len(),
            priority,
            mount_order,
            handle
        );

        Ok(handle)
    }

    /// Remove a mounted archive and return it.
    ///
    /// Fails with [`Error::UnknownMount`] if the handle is stale. Extractions
    /// that already resolved an entry keep their own reference to the archive,
    /// so its resources are only released once they finish.
    pub fn unmount(&self, handle: MountHandle) -> Result<Arc<ArchiveIndex>> {
        let removed = {
            let mut state = self.state.write();
            let Some(pos) = state.current.entries.iter().position(|e| e.handle == handle) else {
                tracing::debug!("Unmount of unknown handle {}", handle);
                return Err(Error::UnknownMount(handle));
            };

            let mut entries = state.current.entries.clone();
            let removed = entries.remove(pos);
            state.current = Arc::new(MountSnapshot {
                entries,
                generation: state.current.generation + 1,
            });
            removed
        };

        let outstanding = Arc::strong_count(&removed.archive) - 1;
        if outstanding > 0 {
            tracing::warn!(
                "Unmounted '{}' while {} reader(s) still hold it; resources are released when they finish",
                removed.archive.id(),
                outstanding
            );
        } else {
            tracing::info!("Unmounted '{}' handle={}", removed.archive.id(), handle);
        }

        Ok(removed.archive)
    }

    /// Unmount by archive id (case-insensitive).
    pub fn unmount_id(&self, archive_id: &str) -> Result<Arc<ArchiveIndex>> {
        let handle = self
            .snapshot()
            .find(archive_id)
            .map(|e| e.handle)
            .ok_or_else(|| Error::NotMounted(ArchiveId::new(archive_id)))?;
        self.unmount(handle)
    }

    /// Current ranked view. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<MountSnapshot> {
        Arc::clone(&self.state.read().current)
    }

    pub fn len(&self) -> usize {
        self.state.read().current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().current.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().current.generation
    }
}

fn rank(entries: &mut [MountEntry]) {
    entries.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.mount_order.cmp(&a.mount_order))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::MemoryArchiveBuilder;

    fn archive(id: &str) -> ArchiveIndex {
        MemoryArchiveBuilder::new(id)
            .file("textures/x.tex", id.to_string())
            .build()
            .unwrap()
    }

    fn ranked_ids(table: &MountTable) -> Vec<String> {
        table
            .snapshot()
            .iter()
            .map(|e| e.archive_id().to_string())
            .collect()
    }

    #[test]
    fn test_mount_orders_by_priority_then_recency() {
        let table = MountTable::new();
        table.mount(archive("base.zip"), 0).unwrap();
        table.mount(archive("patch.zip"), 5).unwrap();
        table.mount(archive("late.zip"), 0).unwrap();
        table.mount(archive("top.zip"), 10).unwrap();

        assert_eq!(
            ranked_ids(&table),
            vec!["top.zip", "patch.zip", "late.zip", "base.zip"]
        );
    }

    #[test]
    fn test_mount_orders_are_increasing() {
        let table = MountTable::new();
        let a = table.mount(archive("a"), 0).unwrap();
        let b = table.mount(archive("b"), 0).unwrap();
        let snapshot = table.snapshot();
        assert!(snapshot.get(b).unwrap().mount_order() > snapshot.get(a).unwrap().mount_order());
    }

    #[test]
    fn test_duplicate_mount_leaves_table_unchanged() {
        let table = MountTable::new();
        let handle = table.mount(archive("Speech.zip"), 1).unwrap();
        let generation = table.generation();

        let err = table.mount(archive("SPEECH.zip"), 7).unwrap_err();
        assert!(matches!(err, Error::DuplicateMount { .. }));

        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.iter().next().unwrap().handle(), handle);
        assert_eq!(snapshot.iter().next().unwrap().priority(), 1);
        assert_eq!(table.generation(), generation);
    }

    #[test]
    fn test_unmount() {
        let table = MountTable::new();
        let a = table.mount(archive("a"), 0).unwrap();
        let b = table.mount(archive("b"), 0).unwrap();

        let removed = table.unmount(a).unwrap();
        assert_eq!(removed.id().as_str(), "a");
        assert_eq!(ranked_ids(&table), vec!["b"]);

        assert!(matches!(table.unmount(a), Err(Error::UnknownMount(h)) if h == a));
        table.unmount(b).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_remount_after_unmount() {
        let table = MountTable::new();
        let first = table.mount(archive("a"), 0).unwrap();
        table.unmount(first).unwrap();

        let second = table.mount(archive("a"), 0).unwrap();
        assert_ne!(first, second);
        assert!(matches!(table.unmount(first), Err(Error::UnknownMount(_))));
    }

    #[test]
    fn test_unmount_id() {
        let table = MountTable::new();
        table.mount(archive("Worlds.zip"), 0).unwrap();
        table.unmount_id("worlds.ZIP").unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.unmount_id("worlds.zip"),
            Err(Error::NotMounted(ref id)) if id.as_str() == "worlds.zip"
        ));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let table = MountTable::new();
        table.mount(archive("a"), 0).unwrap();
        let before = table.snapshot();

        table.mount(archive("b"), 0).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(table.snapshot().len(), 2);
        assert!(table.snapshot().generation() > before.generation());
    }

    #[test]
    fn test_unmount_keeps_archive_alive_for_holders() {
        let table = MountTable::new();
        let handle = table.mount(archive("a"), 0).unwrap();
        let held = Arc::clone(table.snapshot().get(handle).unwrap().archive());

        table.unmount(handle).unwrap();
        assert_eq!(held.id().as_str(), "a");
        assert_eq!(held.len(), 1);
    }
}
