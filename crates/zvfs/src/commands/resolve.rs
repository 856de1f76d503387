use crate::errors::CliError;
use crate::utils::profile::Session;
use crate::utils::{format_size, print_ansi_boxed_lines};
use colored::Colorize;
use miette::Result;
use zen_vfs::OverlayResolver;

pub struct ResolveArgs {
    pub path: String,
}

pub fn resolve_path(session: &Session, args: ResolveArgs) -> Result<()> {
    let resolved = OverlayResolver::new(&session.table)
        .resolve(&args.path)
        .map_err(CliError::from)?;

    let mut lines = vec![
        format!(
            "{} {}",
            "Path:".bright_white().bold(),
            resolved.metadata.display_path.bright_cyan()
        ),
        format!(
            "{} {}",
            "Winner:".bright_white().bold(),
            resolved.winning_archive.as_str().bright_green().bold()
        ),
        format!(
            "{} {} ({} bytes)",
            "Size:".bright_white().bold(),
            format_size(resolved.metadata.byte_size),
            resolved.metadata.byte_size
        ),
        format!(
            "{} {:016x}",
            "Checksum:".bright_white().bold(),
            resolved.metadata.checksum
        ),
    ];

    if resolved.shadowed_by.is_empty() {
        lines.push(format!("{}", "No conflicts".bright_black()));
    } else {
        lines.push(format!("{}", "Shadows:".bright_white().bold()));
        for archive in &resolved.shadowed_by {
            lines.push(format!("  {} {}", "•".bright_yellow(), archive.as_str()));
        }
    }

    println!();
    print_ansi_boxed_lines(&lines);
    println!();

    Ok(())
}
