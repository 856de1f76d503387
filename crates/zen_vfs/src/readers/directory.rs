//! Loose-file directory reader.

use crate::archive::{ArchiveId, ArchiveIndex, Backing, ContentHandle, RawEntry};
use crate::checksum::checksum_reader;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::BufReader;
use walkdir::WalkDir;

/// Index every regular file below `root`.
///
/// The archive id is the directory name. Paths are taken relative to `root`.
/// Non-UTF-8 paths are skipped with a warning; symlinks are not followed.
pub fn load_directory(root: &Utf8Path) -> Result<ArchiveIndex> {
    let id = ArchiveId::new(super::archive_id_for(root));
    tracing::info!("Indexing directory archive '{}' at {}", id, root);

    let mut files: Vec<Utf8PathBuf> = Vec::new();
    let mut raw: Vec<RawEntry> = Vec::new();

    for entry in WalkDir::new(root.as_std_path()).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = match Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };

        let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let file = std::fs::File::open(path.as_std_path())?;
        let (byte_size, checksum) = checksum_reader(&mut BufReader::new(file))?;

        raw.push(RawEntry {
            raw_path: rel.as_str().to_string(),
            byte_size,
            checksum,
            handle: ContentHandle(files.len()),
        });
        files.push(rel);
    }

    let index = ArchiveIndex::new(
        id,
        Backing::Directory {
            root: root.to_path_buf(),
            files,
        },
        raw,
    )?;

    tracing::info!(
        "Directory archive '{}' indexed: {} files, {} bytes",
        index.id(),
        index.len(),
        index.total_bytes()
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveKind;
    use crate::checksum::checksum;
    use crate::path::VfsPath;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_data_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let data = dir.path().join("Data");

        let anims = data.join("_work").join("Anims");
        fs::create_dir_all(&anims).unwrap();
        fs::write(anims.join("Humans.MDS"), b"Model (\"HuS\")").unwrap();

        let scripts = data.join("_work").join("Scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("Gothic.src"), b"_intern\\*.d").unwrap();

        dir
    }

    #[test]
    fn test_load_directory() {
        let dir = create_test_data_dir();
        let root = Utf8PathBuf::from_path_buf(dir.path().join("Data")).unwrap();

        let index = load_directory(&root).unwrap();
        assert_eq!(index.id().as_str(), "Data");
        assert_eq!(index.kind(), ArchiveKind::Directory);
        assert_eq!(index.len(), 2);

        let meta = index
            .get(&VfsPath::parse("_work/anims/humans.mds").unwrap())
            .unwrap();
        assert_eq!(meta.display_path, "_work/Anims/Humans.MDS");
        assert_eq!(meta.byte_size, 13);
        assert_eq!(meta.checksum, checksum(b"Model (\"HuS\")"));
    }

    #[test]
    fn test_load_directory_empty() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let index = load_directory(&root).unwrap();
        assert!(index.is_empty());
        assert!(!index.is_directory(&VfsPath::root()));
    }

    #[test]
    fn test_load_directory_missing() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().join("missing")).unwrap();
        assert!(load_directory(&root).is_err());
    }
}
