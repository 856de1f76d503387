use crate::errors::CliError;
use crate::println_pad;
use crate::utils::format_size;
use crate::utils::profile::Session;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;
use zen_vfs::{ExtractionService, OverlayResolver};

pub struct ExtractArgs {
    pub path: String,
    pub output: Option<String>,
}

pub struct ExportArgs {
    pub dir: String,
    pub output_dir: String,
    pub quiet: bool,
}

/// Output file when `-o` is omitted: the entry's file name in the working directory.
fn default_output_file(display_path: &str) -> Utf8PathBuf {
    let name = display_path.rsplit('/').next().unwrap_or(display_path);
    Utf8PathBuf::from(name)
}

pub fn extract_file(session: &Session, args: ExtractArgs) -> Result<()> {
    let resolved = OverlayResolver::new(&session.table)
        .resolve(&args.path)
        .map_err(CliError::from)?;

    let output = args
        .output
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| default_output_file(&resolved.metadata.display_path));

    println_pad!(
        "{} {} {} {}",
        "📦 Extracting:".bright_blue().bold(),
        resolved.metadata.display_path.bright_cyan().bold(),
        "from".bright_black(),
        resolved.winning_archive.as_str().bright_green()
    );

    let service = ExtractionService::new(session.options.clone());
    let written = service
        .extract_to_file(&resolved, &output)
        .map_err(CliError::from)?;

    println_pad!(
        "{} {} {}",
        "✅ Wrote".bright_green().bold(),
        output.as_str().bright_white().bold(),
        format!("({})", format_size(written)).bright_black()
    );

    Ok(())
}

pub fn export_tree(session: &Session, args: ExportArgs) -> Result<()> {
    let destination = Utf8Path::new(&args.output_dir);
    let shown = if args.dir.is_empty() { "/" } else { &args.dir };

    println_pad!(
        "{} {}",
        "📤 Exporting:".bright_blue().bold(),
        shown.bright_cyan().bold()
    );
    println_pad!(
        "{} {}",
        "📁 Exporting to:".bright_yellow(),
        destination.as_str().bright_white().bold()
    );

    let mut service = ExtractionService::new(session.options.clone());
    if !args.quiet {
        service = service.with_progress(|progress| {
            println_pad!(
                "  {} {}",
                format!("[{}/{}]", progress.current, progress.total).bright_black(),
                progress.current_file
            );
        });
    }

    let resolver = OverlayResolver::new(&session.table);
    let summary = service
        .export_tree(&resolver, &args.dir, destination)
        .map_err(CliError::from)?;

    for failure in &summary.failures {
        println_pad!(
            "  {} {} {}",
            "✗".bright_red(),
            failure.path.as_str().bright_white(),
            failure.error.bright_red()
        );
    }

    let total = summary.files_written + summary.failures.len();
    if !summary.failures.is_empty() {
        return Err(CliError::ExportIncomplete {
            failed: summary.failures.len(),
            total,
        }
        .into());
    }

    println_pad!(
        "{} {} {}",
        "✅ Export complete!".bright_green().bold(),
        format!(
            "{} files, {}",
            summary.files_written,
            format_size(summary.bytes_written)
        )
        .bright_white(),
        format!("in {:.2?}", summary.elapsed).bright_black()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_uses_file_name() {
        assert_eq!(
            default_output_file("_work/Data/Scripts/Content/Story.d"),
            Utf8PathBuf::from("Story.d")
        );
        assert_eq!(default_output_file("Readme.txt"), Utf8PathBuf::from("Readme.txt"));
    }
}
