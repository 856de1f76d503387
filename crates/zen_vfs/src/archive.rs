//! Immutable per-archive entry index.
//!
//! An [`ArchiveIndex`] is the uniform shape every archive takes once a reader
//! (see [`readers`](crate::readers)) has enumerated it: a map from normalized
//! [`VfsPath`] to [`EntryMetadata`], plus a reverse prefix index of immediate
//! children per directory so listings never rescan every entry.
//!
//! The index is built once and never mutated. It is shared through
//! `Arc<ArchiveIndex>` between the mount table, in-flight resolutions and
//! extractions, so dropping it from the table never invalidates a read that
//! already holds a reference.
//!
//! Content lives behind a closed set of backings ([`ArchiveKind`]). A
//! [`ContentHandle`] is only meaningful for the index that issued it.

use crate::error::{Error, Result};
use crate::path::{normalize_display, VfsPath};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};

/// Stable archive identifier, usually the archive's file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArchiveId(String);

impl ArchiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Archive ids follow the same case rules as paths.
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchiveId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArchiveId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque reference to one entry's content inside its owning archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHandle(pub(crate) usize);

/// Metadata for one file entry.
///
/// Only files are stored. Whether a path is a directory is derived from the
/// children index ([`ArchiveIndex::is_directory`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Normalized lookup key.
    pub path: VfsPath,
    /// Path as spelled inside the archive, with `/` separators.
    pub display_path: String,
    /// Uncompressed content size in bytes.
    pub byte_size: u64,
    /// xxHash3 digest of the uncompressed content.
    pub checksum: u64,
    #[serde(skip)]
    pub handle: ContentHandle,
}

/// Kind of backing store an archive was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArchiveKind {
    /// Loose files below a directory on disk.
    Directory,
    /// A ZIP container on disk.
    Zip,
    /// Buffers held in memory.
    Memory,
}

/// Where entry bytes are read from. One variant per [`ArchiveKind`].
pub(crate) enum Backing {
    /// `files[handle]` is relative to `root`.
    Directory {
        root: Utf8PathBuf,
        files: Vec<Utf8PathBuf>,
    },
    /// `handle` is the ZIP entry index.
    Zip { path: Utf8PathBuf },
    /// `blobs[handle]` is the content.
    Memory { blobs: Vec<Vec<u8>> },
}

impl Backing {
    fn kind(&self) -> ArchiveKind {
        match self {
            Backing::Directory { .. } => ArchiveKind::Directory,
            Backing::Zip { .. } => ArchiveKind::Zip,
            Backing::Memory { .. } => ArchiveKind::Memory,
        }
    }
}

/// Raw entry as enumerated by a reader, before normalization.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    pub raw_path: String,
    pub byte_size: u64,
    pub checksum: u64,
    pub handle: ContentHandle,
}

/// An immediate child of a directory inside one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNode {
    /// Normalized (lowercase) segment.
    pub key: String,
    /// Segment as spelled in the archive.
    pub name: String,
    /// A file entry exists at this path.
    pub is_file: bool,
    /// Some entry lies below this path.
    pub is_directory: bool,
}

/// Immutable snapshot of one archive's entries.
pub struct ArchiveIndex {
    id: ArchiveId,
    backing: Backing,
    entries: HashMap<VfsPath, EntryMetadata>,
    /// Directory -> children keyed by normalized segment.
    children: HashMap<VfsPath, BTreeMap<String, ChildNode>>,
    total_bytes: u64,
}

impl ArchiveIndex {
    /// Normalize raw entries and build both indexes.
    ///
    /// Fails with [`Error::DuplicateEntry`] when two raw paths normalize to the
    /// same key, and with [`Error::InvalidPath`] for paths that cannot be
    /// normalized or that normalize to the root.
    pub(crate) fn new(id: ArchiveId, backing: Backing, raw: Vec<RawEntry>) -> Result<Self> {
        let mut entries: HashMap<VfsPath, EntryMetadata> = HashMap::with_capacity(raw.len());
        let mut total_bytes = 0u64;

        for entry in raw {
            let display_path = normalize_display(&entry.raw_path)?;
            if display_path.is_empty() {
                return Err(Error::InvalidPath {
                    path: entry.raw_path,
                    reason: "names the archive root",
                });
            }
            let path = VfsPath::parse(&display_path)?;

            if entries.contains_key(&path) {
                return Err(Error::DuplicateEntry {
                    archive: id,
                    path: display_path,
                });
            }

            tracing::trace!("Indexed '{}' in archive '{}'", display_path, id);
            total_bytes += entry.byte_size;
            entries.insert(
                path.clone(),
                EntryMetadata {
                    path,
                    display_path,
                    byte_size: entry.byte_size,
                    checksum: entry.checksum,
                    handle: entry.handle,
                },
            );
        }

        let children = build_children_index(&entries);

        tracing::debug!(
            "Archive '{}' indexed: {} entries, {} directories, {} bytes",
            id,
            entries.len(),
            children.len(),
            total_bytes
        );

        Ok(Self {
            id,
            backing,
            entries,
            children,
            total_bytes,
        })
    }

    pub fn id(&self) -> &ArchiveId {
        &self.id
    }

    pub fn kind(&self) -> ArchiveKind {
        self.backing.kind()
    }

    /// Number of file entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn get(&self, path: &VfsPath) -> Option<&EntryMetadata> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &VfsPath) -> bool {
        self.entries.contains_key(path)
    }

    /// All file entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &EntryMetadata> {
        self.entries.values()
    }

    /// All file paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &VfsPath> {
        self.entries.keys()
    }

    /// Whether `path` is a strict-prefix ancestor of at least one entry.
    /// The root counts as a directory of every non-empty archive.
    pub fn is_directory(&self, path: &VfsPath) -> bool {
        self.children.contains_key(path)
    }

    /// Immediate children of `dir`, sorted by normalized name.
    /// `None` if `dir` is not a directory in this archive.
    pub fn children(&self, dir: &VfsPath) -> Option<impl Iterator<Item = &ChildNode>> {
        self.children.get(dir).map(|c| c.values())
    }

    /// Child `key` (a normalized segment) of `dir`.
    pub fn child(&self, dir: &VfsPath, key: &str) -> Option<&ChildNode> {
        self.children.get(dir)?.get(key)
    }

    /// Run `f` with a reader over the entry's content.
    ///
    /// Each call opens the content afresh; nothing is cached between calls.
    pub(crate) fn with_content<T>(
        &self,
        handle: ContentHandle,
        f: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<T> {
        self.read_content(handle, None, f)
    }

    /// Like [`with_content`](Self::with_content), but parsed containers are
    /// taken from and kept in `cache` for the next read.
    pub(crate) fn with_cached_content<T>(
        &self,
        handle: ContentHandle,
        cache: &mut ContainerCache,
        f: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<T> {
        self.read_content(handle, Some(cache), f)
    }

    fn read_content<T>(
        &self,
        handle: ContentHandle,
        cache: Option<&mut ContainerCache>,
        f: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<T> {
        match &self.backing {
            Backing::Directory { root, files } => {
                let rel = files
                    .get(handle.0)
                    .ok_or_else(|| Error::InvalidHandle(self.id.clone()))?;
                let file = std::fs::File::open(root.join(rel).as_std_path())?;
                let mut reader = BufReader::new(file);
                f(&mut reader)
            }
            Backing::Zip { path } => match cache {
                Some(cache) => {
                    let archive = match cache.zips.entry(self.id.clone()) {
                        Entry::Occupied(slot) => slot.into_mut(),
                        Entry::Vacant(slot) => slot.insert(open_zip(path)?),
                    };
                    self.read_zip_entry(archive, handle, f)
                }
                None => self.read_zip_entry(&mut open_zip(path)?, handle, f),
            },
            Backing::Memory { blobs } => {
                let blob = blobs
                    .get(handle.0)
                    .ok_or_else(|| Error::InvalidHandle(self.id.clone()))?;
                let mut reader: &[u8] = blob.as_slice();
                f(&mut reader)
            }
        }
    }

    fn read_zip_entry<T>(
        &self,
        archive: &mut ZipReader,
        handle: ContentHandle,
        f: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<T> {
        if handle.0 >= archive.len() {
            return Err(Error::InvalidHandle(self.id.clone()));
        }
        let mut entry = archive.by_index(handle.0)?;
        f(&mut entry)
    }
}

type ZipReader = zip::ZipArchive<BufReader<File>>;

fn open_zip(path: &Utf8Path) -> Result<ZipReader> {
    let file = File::open(path.as_std_path())?;
    Ok(zip::ZipArchive::new(BufReader::new(file))?)
}

/// Parsed containers reused across the reads of one batch.
///
/// Parsing a ZIP central directory costs O(entries), so a batch that reads
/// many entries from one container keeps it open here. Owned by a single
/// worker; drop it when the batch ends so later reads see the file afresh.
#[derive(Default)]
pub(crate) struct ContainerCache {
    zips: HashMap<ArchiveId, ZipReader>,
}

impl ContainerCache {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.zips.len()
    }
}

impl fmt::Debug for ArchiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveIndex")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("entries", &self.entries.len())
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

/// Build `directory -> immediate children` for every ancestor of every entry.
///
/// When one archive spells the same directory with different casing, the
/// lexicographically smallest spelling is kept so the result does not depend
/// on hash map iteration order.
fn build_children_index(
    entries: &HashMap<VfsPath, EntryMetadata>,
) -> HashMap<VfsPath, BTreeMap<String, ChildNode>> {
    let mut children: HashMap<VfsPath, BTreeMap<String, ChildNode>> = HashMap::new();

    for meta in entries.values() {
        let keys: Vec<&str> = meta.path.segments().collect();
        let names: Vec<&str> = meta.display_path.split('/').collect();
        debug_assert_eq!(keys.len(), names.len());

        let mut dir = VfsPath::root();
        for (depth, (key, name)) in keys.iter().zip(names.iter()).enumerate() {
            let is_leaf = depth + 1 == keys.len();
            let node = children
                .entry(dir.clone())
                .or_default()
                .entry((*key).to_string())
                .or_insert_with(|| ChildNode {
                    key: (*key).to_string(),
                    name: (*name).to_string(),
                    is_file: false,
                    is_directory: false,
                });

            if *name < node.name.as_str() {
                node.name = (*name).to_string();
            }
            if is_leaf {
                node.is_file = true;
            } else {
                node.is_directory = true;
            }

            dir = dir.join_normalized(key);
        }
    }

    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    fn memory_index(files: &[(&str, &str)]) -> Result<ArchiveIndex> {
        let mut blobs = Vec::new();
        let mut raw = Vec::new();
        for (i, (path, content)) in files.iter().enumerate() {
            let bytes = content.as_bytes();
            raw.push(RawEntry {
                raw_path: path.to_string(),
                byte_size: bytes.len() as u64,
                checksum: checksum(bytes),
                handle: ContentHandle(i),
            });
            blobs.push(bytes.to_vec());
        }
        ArchiveIndex::new(ArchiveId::new("test.zip"), Backing::Memory { blobs }, raw)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let index = memory_index(&[("Textures/Wall.TGA", "tga")]).unwrap();
        let meta = index.get(&VfsPath::parse("textures\\wall.tga").unwrap()).unwrap();
        assert_eq!(meta.display_path, "Textures/Wall.TGA");
        assert_eq!(meta.byte_size, 3);
        assert_eq!(index.kind(), ArchiveKind::Memory);
        assert_eq!(index.total_bytes(), 3);
    }

    #[test]
    fn test_duplicate_entry() {
        let err = memory_index(&[("a/B.txt", "1"), ("A\\b.TXT", "2")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { .. }));
    }

    #[test]
    fn test_root_entry_rejected() {
        let err = memory_index(&[("./", "1")]).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_children_index() {
        let index = memory_index(&[
            ("Scripts/Content/Story.d", "x"),
            ("Scripts/Content/AI.d", "y"),
            ("Scripts/readme.txt", "z"),
        ])
        .unwrap();

        let root: Vec<&ChildNode> = index.children(&VfsPath::root()).unwrap().collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "Scripts");
        assert!(root[0].is_directory);
        assert!(!root[0].is_file);

        let scripts = VfsPath::parse("scripts").unwrap();
        let names: Vec<&str> = index
            .children(&scripts)
            .unwrap()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Content", "readme.txt"]);

        assert!(index.is_directory(&scripts));
        assert!(!index.is_directory(&VfsPath::parse("scripts/readme.txt").unwrap()));
        assert!(index.children(&VfsPath::parse("meshes").unwrap()).is_none());
    }

    #[test]
    fn test_children_casing_is_deterministic() {
        let index = memory_index(&[("textures/a.tga", "1"), ("TEXTURES/b.tga", "2")]).unwrap();
        let root: Vec<&ChildNode> = index.children(&VfsPath::root()).unwrap().collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "TEXTURES");
    }

    #[test]
    fn test_with_content_memory() {
        let index = memory_index(&[("a.txt", "hello")]).unwrap();
        let meta = index.get(&VfsPath::parse("a.txt").unwrap()).unwrap();
        let content = index
            .with_content(meta.handle, |r| {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                Ok(buf)
            })
            .unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn test_invalid_handle() {
        let index = memory_index(&[("a.txt", "hello")]).unwrap();
        let err = index.with_content(ContentHandle(7), |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::InvalidHandle(_)));
    }

    #[test]
    fn test_cached_zip_reads_parse_once() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("Anims.zip")).unwrap();
        let mut writer = zip::ZipWriter::new(File::create(path.as_std_path()).unwrap());
        for (name, content) in [("a.mds", "first"), ("b.mds", "second")] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();

        let index = crate::readers::load_zip(&path).unwrap();
        let mut cache = ContainerCache::default();
        let mut read = |name: &str| {
            let meta = index.get(&VfsPath::parse(name).unwrap()).unwrap();
            index
                .with_cached_content(meta.handle, &mut cache, |r| {
                    let mut buf = String::new();
                    r.read_to_string(&mut buf)?;
                    Ok(buf)
                })
                .unwrap()
        };

        assert_eq!(read("a.mds"), "first");
        assert_eq!(read("b.mds"), "second");
        assert_eq!(read("a.mds"), "first");
        assert_eq!(cache.len(), 1);
    }
}
