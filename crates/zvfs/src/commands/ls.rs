use crate::errors::CliError;
use crate::println_pad;
use crate::utils::format_size;
use crate::utils::profile::Session;
use colored::Colorize;
use miette::Result;
use zen_vfs::{DirEntry, OverlayResolver};

pub struct ListArgs {
    pub dir: String,
}

pub fn list_directory(session: &Session, args: ListArgs) -> Result<()> {
    let resolver = OverlayResolver::new(&session.table);
    let listing = resolver.list_directory(&args.dir).map_err(CliError::from)?;

    let shown = if args.dir.is_empty() { "/" } else { &args.dir };
    println_pad!(
        "{} {} {}",
        "📁".bright_yellow(),
        shown.bright_white().bold(),
        format!("({} entries)", listing.len()).bright_black()
    );

    for entry in &listing {
        for line in entry_lines(&resolver, entry) {
            println_pad!("  {}", line);
        }
    }

    Ok(())
}

/// One line for the directory side of `entry`, one for the file side.
/// A name can be both when archives disagree.
fn entry_lines(resolver: &OverlayResolver<'_>, entry: &DirEntry) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);

    if entry.is_directory {
        lines.push(format!("{}/", entry.name).bright_blue().bold().to_string());
    }
    if !entry.is_file {
        return lines;
    }

    let marker = if entry.is_directory {
        format!(" {}", "(also a directory)".bright_yellow())
    } else {
        String::new()
    };

    match resolver.resolve_path(&entry.path) {
        Ok(resolved) => {
            let shadows = if resolved.is_conflicted() {
                format!(
                    " {}",
                    format!("(shadows {})", resolved.shadowed_by.len()).bright_yellow()
                )
            } else {
                String::new()
            };
            lines.push(format!(
                "{} {} {}{}{}",
                entry.name.bright_white(),
                format_size(resolved.metadata.byte_size).bright_black(),
                resolved.winning_archive.as_str().bright_green(),
                shadows,
                marker
            ));
        }
        // Unmounted between listing and resolving.
        Err(_) => lines.push(format!("{}{}", entry.name.bright_white(), marker)),
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use zen_vfs::readers::MemoryArchiveBuilder;
    use zen_vfs::MountTable;

    #[test]
    fn file_and_directory_shows_both_sides() {
        let table = MountTable::new();
        table
            .mount(
                MemoryArchiveBuilder::new("Base.zip")
                    .file("Music/Theme", "old theme")
                    .build()
                    .unwrap(),
                0,
            )
            .unwrap();
        table
            .mount(
                MemoryArchiveBuilder::new("Mod.zip")
                    .file("Music/Theme/Intro.sgt", "intro")
                    .build()
                    .unwrap(),
                5,
            )
            .unwrap();

        let resolver = OverlayResolver::new(&table);
        let listing = resolver.list_directory("music").unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].is_file && listing[0].is_directory);

        let lines = entry_lines(&resolver, &listing[0]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Theme/"));
        assert!(lines[1].contains("Base.zip"));
        assert!(lines[1].contains("also a directory"));
    }

    #[test]
    fn plain_file_shows_winner() {
        let table = MountTable::new();
        table
            .mount(
                MemoryArchiveBuilder::new("Base.zip")
                    .file("Scripts/Startup.d", "func void startup() {};")
                    .build()
                    .unwrap(),
                0,
            )
            .unwrap();

        let resolver = OverlayResolver::new(&table);
        let listing = resolver.list_directory("scripts").unwrap();
        let lines = entry_lines(&resolver, &listing[0]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Startup.d"));
        assert!(lines[0].contains("Base.zip"));
    }
}
