//! Streaming extraction of resolved entries.
//!
//! [`ExtractionService::extract`] copies the winning entry's bytes from its
//! archive into any [`Write`] sink, buffer by buffer. Single extractions reopen
//! the container on every call. [`ExtractionService::export_tree`] lets each
//! worker keep its parsed containers until the export ends.
//!
//! # Integrity
//!
//! The streamed byte count must equal [`EntryMetadata::byte_size`]
//! (`Error::CorruptEntry` otherwise). With checksum verification enabled the
//! xxHash3 digest is computed on the fly and compared after the full read
//! (`Error::ChecksumMismatch`). A ZIP entry whose stored CRC-32 fails is
//! `Error::ContainerChecksumMismatch`, whatever the options say. On any of
//! these the sink may already hold partial output and the caller must discard
//! it; [`extract_to_file`] does that for files.
//!
//! # Cancellation
//!
//! A [`CancelToken`] is polled between buffers. A sink that starts failing
//! also stops the stream. Neither touches any shared state: the entry holds its
//! own reference to the archive.
//!
//! [`EntryMetadata::byte_size`]: crate::archive::EntryMetadata::byte_size
//! [`extract_to_file`]: ExtractionService::extract_to_file

use crate::archive::ContainerCache;
use crate::checksum::ChecksumHasher;
use crate::error::{Error, Result};
use crate::mount_table::MountSnapshot;
use crate::path::VfsPath;
use crate::resolver::{child_name_in, walk_in, OverlayResolver, ResolvedEntry};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{self, BufWriter, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Shared flag for cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Extraction settings.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    verify_checksum: bool,
    cancel: Option<CancelToken>,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute and compare the content checksum on every extraction.
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksum = enabled;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn verify_checksum(&self) -> bool {
        self.verify_checksum
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Progress emitted by [`ExtractionService::export_tree`], once per finished file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    /// Display path of the file that just finished.
    pub current_file: String,
    /// Files finished so far, including failures.
    pub current: usize,
    pub total: usize,
}

/// A file that could not be exported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFailure {
    pub path: VfsPath,
    pub error: String,
}

/// Outcome of [`ExtractionService::export_tree`].
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub destination: Utf8PathBuf,
    pub files_written: usize,
    pub bytes_written: u64,
    pub failures: Vec<ExportFailure>,
    pub elapsed: Duration,
}

type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Streams resolved entries out of their archives.
#[derive(Clone, Default)]
pub struct ExtractionService {
    options: ExtractOptions,
    progress_callback: Option<ProgressCallback>,
}

impl ExtractionService {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            progress_callback: None,
        }
    }

    /// Register a progress callback for [`export_tree`](Self::export_tree).
    ///
    /// Called from worker threads, once per file, in completion order.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ExportProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Stream the winning entry into `sink`. Returns the number of bytes written.
    pub fn extract<W: Write + ?Sized>(&self, entry: &ResolvedEntry, sink: &mut W) -> Result<u64> {
        self.stream(entry, sink, None)
    }

    fn stream<W: Write + ?Sized>(
        &self,
        entry: &ResolvedEntry,
        sink: &mut W,
        cache: Option<&mut ContainerCache>,
    ) -> Result<u64> {
        let archive = entry.archive();
        let meta = &entry.metadata;
        let expected = meta.byte_size;

        let corrupt = |actual: u64| Error::CorruptEntry {
            path: meta.display_path.clone(),
            archive: entry.winning_archive.clone(),
            expected,
            actual,
        };

        let copy = |reader: &mut dyn Read| -> Result<(u64, Option<u64>)> {
            let mut hasher = self.options.verify_checksum.then(ChecksumHasher::new);
            let mut buf = vec![0u8; COPY_BUFFER_SIZE];
            let mut written = 0u64;

            loop {
                if self.options.is_cancelled() {
                    tracing::debug!("Extraction of '{}' cancelled after {} bytes", meta.path, written);
                    return Err(Error::Cancelled);
                }

                let n = match read_chunk(reader, &mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    // A ZIP reader verifies its CRC-32 on the final read.
                    Err(e) if e.kind() == io::ErrorKind::InvalidData && written == expected => {
                        tracing::warn!("Container check of '{}' failed: {}", meta.path, e);
                        return Err(Error::ContainerChecksumMismatch {
                            path: meta.display_path.clone(),
                            archive: entry.winning_archive.clone(),
                        });
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                        ) =>
                    {
                        tracing::warn!("Reading '{}' failed mid-stream: {}", meta.path, e);
                        return Err(corrupt(written));
                    }
                    Err(e) => return Err(e.into()),
                };

                written += n as u64;
                if written > expected {
                    return Err(corrupt(written));
                }

                sink.write_all(&buf[..n])?;
                if let Some(hasher) = hasher.as_mut() {
                    hasher.update(&buf[..n]);
                }
            }

            Ok((written, hasher.map(|h| h.finish())))
        };

        let (written, digest) = match cache {
            Some(cache) => archive.with_cached_content(meta.handle, cache, copy)?,
            None => archive.with_content(meta.handle, copy)?,
        };

        if written != expected {
            return Err(corrupt(written));
        }

        if let Some(actual) = digest {
            if actual != meta.checksum {
                return Err(Error::ChecksumMismatch {
                    path: meta.display_path.clone(),
                    archive: entry.winning_archive.clone(),
                    expected: meta.checksum,
                    actual,
                });
            }
        }

        sink.flush()?;

        tracing::debug!(
            "Extracted '{}' from '{}' ({} bytes)",
            meta.path,
            entry.winning_archive,
            written
        );
        Ok(written)
    }

    /// Extract into a fresh buffer.
    pub fn extract_to_vec(&self, entry: &ResolvedEntry) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(entry.metadata.byte_size.min(64 * 1024 * 1024) as usize);
        self.extract(entry, &mut buf)?;
        Ok(buf)
    }

    /// Extract into a file, creating parent directories.
    ///
    /// A partially written file is removed if extraction fails.
    pub fn extract_to_file(&self, entry: &ResolvedEntry, destination: &Utf8Path) -> Result<u64> {
        self.write_file(entry, destination, None)
    }

    fn write_file(
        &self,
        entry: &ResolvedEntry,
        destination: &Utf8Path,
        cache: Option<&mut ContainerCache>,
    ) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        let file = std::fs::File::create(destination.as_std_path())?;
        let mut writer = BufWriter::new(file);
        match self.stream(entry, &mut writer, cache) {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(writer);
                if let Err(remove_err) = std::fs::remove_file(destination.as_std_path()) {
                    tracing::warn!(
                        "Failed to remove partial output {}: {}",
                        destination,
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Extract every winning file below `dir` into `destination`.
    ///
    /// Files are written in parallel, at their path relative to `dir`. Directory
    /// names are spelled as [`OverlayResolver::list_directory`] spells them;
    /// file names keep the winning entry's spelling. Each worker keeps the
    /// containers it opened for the rest of the export.
    ///
    /// Per-file failures are collected in [`ExportSummary::failures`] and their
    /// partial output removed. Cancellation aborts the whole export with
    /// [`Error::Cancelled`].
    pub fn export_tree(
        &self,
        resolver: &OverlayResolver<'_>,
        dir: &str,
        destination: &Utf8Path,
    ) -> Result<ExportSummary> {
        let start_time = std::time::Instant::now();
        let dir_path = VfsPath::parse(dir)?;
        let snapshot = resolver.snapshot();
        let targets: Vec<(ResolvedEntry, Utf8PathBuf)> = walk_in(&snapshot, &dir_path)?
            .into_iter()
            .map(|entry| {
                let relative = export_relative_path(&snapshot, &dir_path, &entry);
                (entry, relative)
            })
            .collect();
        let total = targets.len();

        tracing::info!(
            "Exporting {} files from '{}' to {}",
            total,
            dir_path,
            destination
        );

        std::fs::create_dir_all(destination.as_std_path())?;

        let finished = AtomicUsize::new(0);
        let bytes_written = AtomicU64::new(0);

        let results: Vec<(VfsPath, Result<u64>)> = targets
            .par_iter()
            .map_init(ContainerCache::default, |cache, (entry, relative)| {
                if self.options.is_cancelled() {
                    return (entry.path.clone(), Err(Error::Cancelled));
                }

                let result = self.write_file(entry, &destination.join(relative), Some(cache));

                if let Ok(written) = result {
                    bytes_written.fetch_add(written, Ordering::Relaxed);
                }
                let current = finished.fetch_add(1, Ordering::Relaxed) + 1;
                self.emit_progress(ExportProgress {
                    current_file: entry.metadata.display_path.clone(),
                    current,
                    total,
                });

                (entry.path.clone(), result)
            })
            .collect();

        let mut files_written = 0;
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(_) => files_written += 1,
                Err(Error::Cancelled) => {
                    tracing::info!("Export to {} cancelled", destination);
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    tracing::warn!("Failed to export '{}': {}", path, e);
                    failures.push(ExportFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = ExportSummary {
            destination: destination.to_path_buf(),
            files_written,
            bytes_written: bytes_written.into_inner(),
            failures,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Export finished: {} files, {} bytes, {} failures in {:?}",
            summary.files_written,
            summary.bytes_written,
            summary.failures.len(),
            summary.elapsed
        );

        Ok(summary)
    }

    fn emit_progress(&self, progress: ExportProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }
}

/// Output path of `entry` relative to the exported directory `dir`.
fn export_relative_path(
    snapshot: &MountSnapshot,
    dir: &VfsPath,
    entry: &ResolvedEntry,
) -> Utf8PathBuf {
    let keys: Vec<&str> = entry.path.segments().collect();
    let skip = dir.segments().count();
    let mut relative = Utf8PathBuf::new();

    if let Some((_, dirs)) = keys[skip..].split_last() {
        let mut parent = dir.clone();
        for &key in dirs {
            relative.push(child_name_in(snapshot, &parent, key).unwrap_or(key));
            parent = parent.join_normalized(key);
        }
    }

    let file_name = entry
        .metadata
        .display_path
        .rsplit('/')
        .next()
        .unwrap_or_default();
    relative.push(file_name);
    relative
}

fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
