//! Mount profiles and the session built from them.
//!
//! A profile is a TOML file listing the archives of one game setup:
//!
//! ```toml
//! verify_checksums = true
//!
//! [[archive]]
//! path = "Data/Textures.zip"
//!
//! [[archive]]
//! path = "Data/BetterWalls.zip"
//! priority = 10
//! ```
//!
//! Relative archive paths are resolved against the profile's directory.

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use std::str::FromStr;
use zen_vfs::readers::load_archive;
use zen_vfs::{ExtractOptions, MountTable};

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MountProfile {
    /// Overrides `verify_checksums` from config.toml.
    #[serde(default)]
    pub verify_checksums: Option<bool>,
    #[serde(default, rename = "archive")]
    pub archives: Vec<ArchiveSource>,
}

/// One archive to mount.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    pub path: Utf8PathBuf,
    #[serde(default)]
    pub priority: i32,
}

impl FromStr for ArchiveSource {
    type Err = CliError;

    /// Parses `<path>` or `<path>@<priority>`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CliError::InvalidArchiveArg {
            value: value.to_string(),
        };

        let (path, priority) = match value.rsplit_once('@') {
            Some((path, priority)) => (path, priority.trim().parse().map_err(|_| invalid())?),
            None => (value, 0),
        };

        if path.trim().is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            path: Utf8PathBuf::from(path),
            priority,
        })
    }
}

impl MountProfile {
    pub fn parse(content: &str, path: &Utf8Path) -> Result<Self, CliError> {
        toml::from_str(content).map_err(|source| CliError::ProfileParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a profile and makes its archive paths absolute relative to the file.
    pub fn load(path: &Utf8Path) -> Result<Self, CliError> {
        let content = fs::read_to_string(path).map_err(|_| CliError::ProfileNotFound {
            path: path.to_path_buf(),
        })?;
        let mut profile = Self::parse(&content, path)?;

        let base = path.parent().unwrap_or(Utf8Path::new(""));
        for archive in &mut profile.archives {
            if archive.path.is_relative() {
                archive.path = base.join(&archive.path);
            }
        }

        Ok(profile)
    }
}

/// Mounted archives plus the extraction settings that apply to them.
pub struct Session {
    pub table: MountTable,
    pub options: ExtractOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Mounts the profile's archives, then the command-line ones, in order.
    ///
    /// Without an explicit profile the configured default profile is used,
    /// but only when no `--archive` was given either.
    pub fn open(
        config: &AppConfig,
        profile: Option<&Utf8Path>,
        archives: &[ArchiveSource],
    ) -> Result<Self, CliError> {
        let profile_path = profile
            .map(Utf8Path::to_path_buf)
            .or_else(|| {
                if archives.is_empty() {
                    config.default_profile.clone()
                } else {
                    None
                }
            });

        let profile = match &profile_path {
            Some(path) => {
                tracing::debug!("Loading mount profile {}", path);
                MountProfile::load(path)?
            }
            None => MountProfile::default(),
        };

        let verify = profile.verify_checksums.unwrap_or(config.verify_checksums);
        let table = MountTable::new();
        for archive in profile.archives.iter().chain(archives) {
            let index = load_archive(&archive.path)
                .map_err(|e| CliError::archive_load_failed(archive.path.clone(), e))?;
            table.mount(index, archive.priority)?;
        }

        if table.is_empty() {
            return Err(CliError::NothingMounted);
        }

        Ok(Self {
            table,
            options: ExtractOptions::new().with_checksum_verification(verify),
        })
    }
}
