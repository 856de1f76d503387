//! Archive overlay filesystem for Gothic (ZenGin) mod data.
//!
//! The engine loads game data from several archives at once, and mods work by
//! shipping archives that contain the same paths as the base game. This crate
//! models that overlay:
//!
//! - **Mounting**: register archives with a priority ([`MountTable`])
//! - **Resolution**: find the archive that wins a path ([`OverlayResolver`])
//! - **Listing**: merged directory listings across every archive
//! - **Conflict detection**: report which mods shadow which ([`ConflictReport`])
//! - **Extraction**: stream a winning entry with integrity checks ([`ExtractionService`])
//!
//! Archives are read by the [`readers`] module into a uniform [`ArchiveIndex`];
//! the overlay itself never depends on a container format.
//!
//! # Example
//!
//! ```
//! use zen_vfs::readers::MemoryArchiveBuilder;
//! use zen_vfs::{ExtractOptions, ExtractionService, MountTable, OverlayResolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = MountTable::new();
//! table.mount(
//!     MemoryArchiveBuilder::new("Textures.zip")
//!         .file("_work/Data/Textures/Wall.tga", b"base".to_vec())
//!         .build()?,
//!     0,
//! )?;
//! table.mount(
//!     MemoryArchiveBuilder::new("BetterWalls.zip")
//!         .file("_WORK/DATA/TEXTURES/WALL.TGA", b"modded".to_vec())
//!         .build()?,
//!     10,
//! )?;
//!
//! let resolver = OverlayResolver::new(&table);
//! let entry = resolver.resolve("_work\\data\\textures\\wall.tga")?;
//! assert_eq!(entry.winning_archive.as_str(), "BetterWalls.zip");
//! assert_eq!(entry.shadowed_by.len(), 1);
//!
//! let service = ExtractionService::new(ExtractOptions::new().with_checksum_verification(true));
//! assert_eq!(service.extract_to_vec(&entry)?, b"modded");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod checksum;
pub mod conflict;
pub mod error;
pub mod extract;
pub mod mount_table;
pub mod path;
pub mod readers;
pub mod resolver;

// Re-export main types
pub use archive::{ArchiveId, ArchiveIndex, ArchiveKind, EntryMetadata};
pub use conflict::{ConflictReport, ConflictSummary};
pub use error::{Error, Result};
pub use extract::{
    CancelToken, ExportFailure, ExportProgress, ExportSummary, ExtractOptions, ExtractionService,
};
pub use mount_table::{MountEntry, MountHandle, MountSnapshot, MountTable};
pub use path::VfsPath;
pub use resolver::{DirEntry, OverlayResolver, ResolvedEntry};
