//! Archive readers.
//!
//! A reader enumerates one archive and produces an [`ArchiveIndex`]. The overlay
//! core never looks at a container format; it only sees the index. Three
//! readers are provided:
//!
//! - [`load_directory`]: loose files below a directory (the `_work/Data`
//!   layout used while developing a mod).
//! - [`load_zip`]: a ZIP container, the usual way mods are distributed.
//! - [`MemoryArchiveBuilder`]: buffers held in memory, for tests and embedding.
//!
//! Every reader fills in size and checksum for every entry. Entry order is not
//! significant.

mod directory;
mod memory;
mod zip_archive;

pub use directory::load_directory;
pub use memory::MemoryArchiveBuilder;
pub use zip_archive::load_zip;

use crate::archive::ArchiveIndex;
use crate::error::{Error, Result};
use camino::Utf8Path;

/// Load an archive from disk, picking the reader from what `path` points at.
///
/// Directories go through [`load_directory`], `.zip` files through
/// [`load_zip`]. Anything else (including the engine's own `.vdf`/`.mod`
/// volumes) is rejected with [`Error::UnsupportedArchive`].
pub fn load_archive(path: &Utf8Path) -> Result<ArchiveIndex> {
    if path.as_std_path().is_dir() {
        return load_directory(path);
    }

    if !path.as_std_path().exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("archive not found: {}", path),
        )));
    }

    match path.extension().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "zip" => load_zip(path),
        _ => Err(Error::UnsupportedArchive(path.to_path_buf())),
    }
}

/// Archive id derived from a path: its file name, or the whole path if it has none.
pub(crate) fn archive_id_for(path: &Utf8Path) -> String {
    path.file_name()
        .map(str::to_string)
        .unwrap_or_else(|| path.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_archive_directory() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().join("MyMod")).unwrap();
        fs::create_dir_all(root.join("Scripts")).unwrap();
        fs::write(root.join("Scripts/a.d"), b"func void a() {};").unwrap();

        let index = load_archive(&root).unwrap();
        assert_eq!(index.id().as_str(), "MyMod");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_load_archive_unsupported() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("Textures.vdf")).unwrap();
        fs::write(&path, b"PSVDSC_V2.00").unwrap();

        let err = load_archive(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchive(_)));
    }

    #[test]
    fn test_load_archive_missing() {
        let err = load_archive(Utf8Path::new("/definitely/not/here.zip")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_archive_id_for() {
        assert_eq!(archive_id_for(Utf8Path::new("data/Anims.zip")), "Anims.zip");
    }
}
