use crate::println_pad;
use crate::utils::format_size;
use crate::utils::profile::Session;
use colored::Colorize;
use miette::Result;
use zen_vfs::ArchiveKind;

pub fn show_mounts(session: &Session) -> Result<()> {
    let snapshot = session.table.snapshot();

    println_pad!(
        "{} {}",
        "🗂".bright_blue(),
        format!("{} mounted archives, highest priority first", snapshot.len())
            .bright_white()
            .bold()
    );

    for entry in snapshot.iter() {
        let archive = entry.archive();
        let kind = match archive.kind() {
            ArchiveKind::Directory => "dir",
            ArchiveKind::Zip => "zip",
            ArchiveKind::Memory => "mem",
        };

        println_pad!(
            "  {} {} {} {} {}",
            format!("{:>4}", entry.priority()).bright_yellow(),
            kind.bright_black(),
            archive.id().as_str().bright_green().bold(),
            format!("{} files", archive.len()).bright_white(),
            format_size(archive.total_bytes()).bright_black()
        );
    }

    Ok(())
}
