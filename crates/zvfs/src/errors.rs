use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("No archives mounted")]
    #[diagnostic(
        code(mount::empty),
        help("Pass --archive <path>[@priority] or --profile <file>, or set a default profile with `zvfs config set-profile`")
    )]
    NothingMounted,

    #[error("Archive '{archive}' is mounted twice")]
    #[diagnostic(
        code(mount::duplicate),
        help("Each archive id (file or directory name) may only be mounted once. Remove the duplicate from the profile or command line.")
    )]
    DuplicateMount { archive: String },

    #[error("Unknown mount: {handle}")]
    #[diagnostic(code(mount::unknown))]
    UnknownMount { handle: String },

    #[error("Archive '{archive}' is not mounted")]
    #[diagnostic(code(mount::not_mounted), help("Run `zvfs mounts` to list the mounted archive ids"))]
    NotMounted { archive: String },

    #[error("File not present in any mounted data: {path}")]
    #[diagnostic(
        code(vfs::not_found),
        help("Paths are case-insensitive and relative to the data root, e.g. _work/data/scripts/content/gothic.src")
    )]
    NotFound { path: String },

    #[error("Not a directory: {path}")]
    #[diagnostic(code(vfs::not_a_directory), help("Use `resolve` or `extract` for files"))]
    NotADirectory { path: String },

    #[error("Invalid path: {path}")]
    #[diagnostic(code(vfs::invalid_path), help("{reason}"))]
    InvalidPath { path: String, reason: String },

    #[error("Corrupt entry '{path}' in archive '{archive}'")]
    #[diagnostic(
        code(extract::corrupt_entry),
        help("The index promised {expected} bytes but the archive yielded {actual}. It was probably truncated or replaced after it was mounted; remount it. Any partial output has been discarded.")
    )]
    CorruptEntry {
        path: String,
        archive: String,
        expected: u64,
        actual: u64,
    },

    #[error("Checksum mismatch for '{path}' in archive '{archive}'")]
    #[diagnostic(
        code(extract::checksum_mismatch),
        help("Expected {expected:016x}, computed {actual:016x}. The archive content is damaged; any partial output has been discarded.")
    )]
    ChecksumMismatch {
        path: String,
        archive: String,
        expected: u64,
        actual: u64,
    },

    #[error("Container checksum mismatch for '{path}' in archive '{archive}'")]
    #[diagnostic(
        code(extract::container_checksum),
        help("All bytes were read but the ZIP's own CRC-32 check failed, so the stored data is damaged. Re-download or repack the archive; any partial output has been discarded.")
    )]
    ContainerChecksumMismatch { path: String, archive: String },

    #[error("Unsupported archive: {path}")]
    #[diagnostic(
        code(archive::unsupported),
        help("Only directories and .zip containers can be mounted. Unpack .vdf/.mod volumes first.")
    )]
    UnsupportedArchive { path: Utf8PathBuf },

    #[error("Failed to load archive: {path}")]
    #[diagnostic(code(archive::load_failed))]
    ArchiveLoadFailed {
        path: Utf8PathBuf,
        #[source]
        source: zen_vfs::Error,
    },

    #[error("Mount profile not found: {path}")]
    #[diagnostic(
        code(profile::not_found),
        help("Create a TOML file with one [[archive]] table per archive (path, priority)")
    )]
    ProfileNotFound { path: Utf8PathBuf },

    #[error("Mount profile error: {path}")]
    #[diagnostic(
        code(profile::parse_error),
        help("Check the profile for syntax errors. Each [[archive]] needs a `path`; `priority` defaults to 0.")
    )]
    ProfileParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid archive argument: {value}")]
    #[diagnostic(
        code(args::invalid_archive),
        help("Use <path> or <path>@<priority>, e.g. Data/Textures.zip@10")
    )]
    InvalidArchiveArg { value: String },

    #[error("{failed} of {total} files could not be exported")]
    #[diagnostic(code(export::partial_failure))]
    ExportIncomplete { failed: usize, total: usize },

    #[error("Operation cancelled")]
    #[diagnostic(code(extract::cancelled))]
    Cancelled,

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Overlay error")]
    #[diagnostic(code(vfs::error))]
    Vfs {
        #[source]
        source: zen_vfs::Error,
    },
}

impl CliError {
    pub fn archive_load_failed(path: Utf8PathBuf, source: zen_vfs::Error) -> Self {
        match source {
            zen_vfs::Error::UnsupportedArchive(path) => Self::UnsupportedArchive { path },
            source => Self::ArchiveLoadFailed { path, source },
        }
    }
}

/// Map library errors to user-facing diagnostics.
impl From<zen_vfs::Error> for CliError {
    fn from(err: zen_vfs::Error) -> Self {
        use zen_vfs::Error;

        match err {
            Error::DuplicateMount { archive } => CliError::DuplicateMount {
                archive: archive.to_string(),
            },
            Error::UnknownMount(handle) => CliError::UnknownMount {
                handle: handle.to_string(),
            },
            Error::NotMounted(archive) => CliError::NotMounted {
                archive: archive.to_string(),
            },
            Error::NotFound(path) => CliError::NotFound { path },
            Error::NotADirectory(path) => CliError::NotADirectory { path },
            Error::InvalidPath { path, reason } => CliError::InvalidPath {
                path,
                reason: reason.to_string(),
            },
            Error::CorruptEntry {
                path,
                archive,
                expected,
                actual,
            } => CliError::CorruptEntry {
                path,
                archive: archive.to_string(),
                expected,
                actual,
            },
            Error::ChecksumMismatch {
                path,
                archive,
                expected,
                actual,
            } => CliError::ChecksumMismatch {
                path,
                archive: archive.to_string(),
                expected,
                actual,
            },
            Error::ContainerChecksumMismatch { path, archive } => {
                CliError::ContainerChecksumMismatch {
                    path,
                    archive: archive.to_string(),
                }
            }
            Error::UnsupportedArchive(path) => CliError::UnsupportedArchive { path },
            Error::Cancelled => CliError::Cancelled,
            Error::Io(source) => CliError::IoError { source },
            source => CliError::Vfs { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found() {
        let err: CliError = zen_vfs::Error::NotFound("scripts/x.d".to_string()).into();
        assert!(matches!(err, CliError::NotFound { ref path } if path == "scripts/x.d"));
    }

    #[test]
    fn maps_integrity_failures() {
        let err: CliError = zen_vfs::Error::CorruptEntry {
            path: "a".to_string(),
            archive: zen_vfs::ArchiveId::new("x.zip"),
            expected: 2,
            actual: 1,
        }
        .into();
        assert!(matches!(
            err,
            CliError::CorruptEntry {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn maps_container_checksum_failure() {
        let err: CliError = zen_vfs::Error::ContainerChecksumMismatch {
            path: "_work/data/tables.csv".to_string(),
            archive: zen_vfs::ArchiveId::new("Tables.zip"),
        }
        .into();
        assert!(matches!(
            err,
            CliError::ContainerChecksumMismatch { ref archive, .. } if archive == "Tables.zip"
        ));
    }

    #[test]
    fn maps_unmount_of_unknown_archive() {
        let err: CliError = zen_vfs::Error::NotMounted(zen_vfs::ArchiveId::new("Old.zip")).into();
        assert!(matches!(err, CliError::NotMounted { ref archive } if archive == "Old.zip"));
    }

    #[test]
    fn maps_unsupported_archive_on_load() {
        let err = CliError::archive_load_failed(
            Utf8PathBuf::from("Speech.vdf"),
            zen_vfs::Error::UnsupportedArchive(Utf8PathBuf::from("Speech.vdf")),
        );
        assert!(matches!(err, CliError::UnsupportedArchive { .. }));
    }
}
