//! In-memory archive builder.

use crate::archive::{ArchiveId, ArchiveIndex, Backing, ContentHandle, RawEntry};
use crate::checksum::checksum;
use crate::error::Result;

/// Builds an [`ArchiveIndex`] over buffers held in memory.
///
/// ```
/// use zen_vfs::readers::MemoryArchiveBuilder;
///
/// let index = MemoryArchiveBuilder::new("Patch.zip")
///     .file("Scripts/Content/Story.d", b"func void story() {};".to_vec())
///     .build()
///     .unwrap();
/// assert_eq!(index.len(), 1);
/// ```
pub struct MemoryArchiveBuilder {
    id: ArchiveId,
    blobs: Vec<Vec<u8>>,
    raw: Vec<RawEntry>,
}

impl MemoryArchiveBuilder {
    pub fn new(id: impl Into<ArchiveId>) -> Self {
        Self {
            id: id.into(),
            blobs: Vec::new(),
            raw: Vec::new(),
        }
    }

    /// Add a file; size and checksum are computed from `content`.
    pub fn file(self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let byte_size = content.len() as u64;
        let digest = checksum(&content);
        self.file_with_metadata(path, content, byte_size, digest)
    }

    /// Add a file whose recorded size and checksum are given explicitly.
    ///
    /// Lets callers describe content that disagrees with its index entry, the
    /// way a damaged archive would.
    pub fn file_with_metadata(
        mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        byte_size: u64,
        checksum: u64,
    ) -> Self {
        self.raw.push(RawEntry {
            raw_path: path.into(),
            byte_size,
            checksum,
            handle: ContentHandle(self.blobs.len()),
        });
        self.blobs.push(content.into());
        self
    }

    pub fn build(self) -> Result<ArchiveIndex> {
        ArchiveIndex::new(self.id, Backing::Memory { blobs: self.blobs }, self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::VfsPath;

    #[test]
    fn test_build() {
        let index = MemoryArchiveBuilder::new("a.zip")
            .file("x/y.txt", "hello")
            .file("z.txt", "")
            .build()
            .unwrap();

        assert_eq!(index.len(), 2);
        let meta = index.get(&VfsPath::parse("x/y.txt").unwrap()).unwrap();
        assert_eq!(meta.byte_size, 5);
        assert_eq!(meta.checksum, checksum(b"hello"));
    }

    #[test]
    fn test_declared_metadata_is_kept() {
        let index = MemoryArchiveBuilder::new("a.zip")
            .file_with_metadata("x.bin", vec![1, 2, 3], 4, 0xdead)
            .build()
            .unwrap();

        let meta = index.get(&VfsPath::parse("x.bin").unwrap()).unwrap();
        assert_eq!(meta.byte_size, 4);
        assert_eq!(meta.checksum, 0xdead);
    }
}
