use crate::println_pad;
use crate::utils::profile::Session;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use zen_vfs::conflict::summarize;
use zen_vfs::{ConflictReport, ConflictSummary, ResolvedEntry};

pub struct ConflictsArgs {
    pub json: bool,
    pub summary_only: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictsOutput<'a> {
    conflicts: &'a [ResolvedEntry],
    summary: &'a [ConflictSummary],
}

pub fn show_conflicts(session: &Session, args: ConflictsArgs) -> Result<()> {
    let conflicts = ConflictReport::new(&session.table).detect_conflicts();
    let summary = summarize(&conflicts);

    if args.json {
        let output = ConflictsOutput {
            conflicts: if args.summary_only {
                &conflicts[..0]
            } else {
                &conflicts[..]
            },
            summary: &summary,
        };
        let json = serde_json::to_string_pretty(&output).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }

    if conflicts.is_empty() {
        println_pad!("{}", "✓ No conflicts between mounted archives".bright_green());
        return Ok(());
    }

    println_pad!(
        "{} {}",
        "⚠".bright_yellow(),
        format!("{} conflicting paths", conflicts.len())
            .bright_yellow()
            .bold()
    );
    println!();

    for pair in &summary {
        println_pad!(
            "  {} {} {} {}",
            pair.winner.as_str().bright_green().bold(),
            "shadows".bright_black(),
            pair.shadowed.as_str().bright_red(),
            format!("({} files)", pair.paths).bright_black()
        );
    }

    if args.summary_only {
        return Ok(());
    }

    println!();
    for conflict in &conflicts {
        let shadowed: Vec<&str> = conflict.shadowed_by.iter().map(|a| a.as_str()).collect();
        println_pad!(
            "  {} {} {}",
            conflict.metadata.display_path.bright_white(),
            conflict.winning_archive.as_str().bright_green(),
            format!("> {}", shadowed.join(", ")).bright_black()
        );
    }

    Ok(())
}
