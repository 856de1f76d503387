mod config;
mod conflicts;
mod extract;
mod ls;
mod mounts;
mod resolve;

pub use config::{set_default_profile, set_verify_checksums, show_config};
pub use conflicts::{show_conflicts, ConflictsArgs};
pub use extract::{export_tree, extract_file, ExportArgs, ExtractArgs};
pub use ls::{list_directory, ListArgs};
pub use mounts::show_mounts;
pub use resolve::{resolve_path, ResolveArgs};
