//! ZIP container reader.

use crate::archive::{ArchiveId, ArchiveIndex, Backing, ContentHandle, RawEntry};
use crate::checksum::checksum_reader;
use crate::error::Result;
use crate::path::normalize_display;
use camino::Utf8Path;
use std::io::BufReader;
use zip::ZipArchive;

/// Index every file entry of a ZIP container.
///
/// Directory entries are skipped (directories are derived from file paths).
/// Entries whose names escape the archive root are skipped with a warning.
/// Each file is decompressed once here to compute its checksum; extraction
/// re-opens the container on every read.
pub fn load_zip(path: &Utf8Path) -> Result<ArchiveIndex> {
    let id = ArchiveId::new(super::archive_id_for(path));
    tracing::info!("Indexing ZIP archive '{}' at {}", id, path);

    let file = std::fs::File::open(path.as_std_path())?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut raw: Vec<RawEntry> = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        match normalize_display(&name) {
            Ok(normalized) if !normalized.is_empty() => {}
            _ => {
                tracing::warn!("Skipping unsafe ZIP entry name '{}' in '{}'", name, id);
                continue;
            }
        }

        let declared = entry.size();
        let (byte_size, checksum) = checksum_reader(&mut entry)?;
        if byte_size != declared {
            tracing::warn!(
                "ZIP entry '{}' in '{}' declares {} bytes but decompresses to {}",
                name,
                id,
                declared,
                byte_size
            );
        }

        raw.push(RawEntry {
            raw_path: name,
            byte_size,
            checksum,
            handle: ContentHandle(i),
        });
    }

    let index = ArchiveIndex::new(
        id,
        Backing::Zip {
            path: path.to_path_buf(),
        },
        raw,
    )?;

    tracing::info!(
        "ZIP archive '{}' indexed: {} files, {} bytes",
        index.id(),
        index.len(),
        index.total_bytes()
    );

    Ok(index)
}
