use crate::utils::config;
use crate::utils::profile::MountProfile;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

fn update_config(update: impl FnOnce(&mut config::AppConfig)) -> Result<()> {
    let mut cfg = config::load_config();
    update(&mut cfg);
    config::save_config(&cfg).map_err(|e| miette::miette!("Failed to save config: {}", e))
}

pub fn show_config() -> Result<()> {
    let cfg = config::load_config();
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);

    match &cfg.default_profile {
        Some(p) => {
            let status = if MountProfile::load(p).is_ok() {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", "default_profile:".bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                "default_profile:".bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }

    println!(
        "  {} {}",
        "verify_checksums:".bright_white(),
        cfg.verify_checksums
    );
    println!();
    Ok(())
}

pub fn set_default_profile(path: String) -> Result<()> {
    let path = Utf8PathBuf::from(&path);
    // Surface parse errors now rather than on the next command.
    MountProfile::load(&path)?;

    let path = path.canonicalize_utf8().unwrap_or(path);
    update_config(|cfg| cfg.default_profile = Some(path.clone()))?;

    println!(
        "{}",
        "✓ Default profile set successfully!".bright_green().bold()
    );
    println!();
    println!(
        "  {} {}",
        "Profile:".bright_white().bold(),
        path.as_str().bright_green()
    );

    Ok(())
}

pub fn set_verify_checksums(enabled: bool) -> Result<()> {
    update_config(|cfg| cfg.verify_checksums = enabled)?;

    let state = if enabled { "enabled" } else { "disabled" };
    println!(
        "{}",
        format!("✓ Checksum verification {}", state)
            .bright_green()
            .bold()
    );
    Ok(())
}
