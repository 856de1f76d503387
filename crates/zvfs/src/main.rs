use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    export_tree, extract_file, list_directory, resolve_path, set_default_profile,
    set_verify_checksums, show_config, show_conflicts, show_mounts, ConflictsArgs, ExportArgs,
    ExtractArgs, ListArgs, ResolveArgs,
};
use miette::Result;
use tracing_subscriber::EnvFilter;
use utils::profile::{ArchiveSource, Session};

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Mount profile (TOML) listing the archives to mount
    #[arg(short, long, global = true)]
    profile: Option<Utf8PathBuf>,

    /// Archive to mount, as <path> or <path>@<priority>. Repeatable; mounted after the profile
    #[arg(short, long = "archive", global = true)]
    archives: Vec<ArchiveSource>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the merged contents of a directory
    Ls {
        /// Directory to list, relative to the data root
        #[arg(default_value = "")]
        dir: String,
    },
    /// Show which archive provides a file and which archives it shadows
    Resolve {
        /// File path, case-insensitive
        path: String,
    },
    /// List every path provided by more than one archive
    Conflicts {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Only print per-archive totals
        #[arg(long)]
        summary: bool,
    },
    /// Extract the winning version of a single file
    Extract {
        /// File path, case-insensitive
        path: String,

        /// Output file, defaults to the file name in the current directory
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Extract the merged view of a directory
    Export {
        /// Directory to export, defaults to the data root
        #[arg(default_value = "")]
        dir: String,

        /// The directory to export to
        #[arg(short, long, default_value = "exported")]
        output_dir: String,

        /// Do not print a line per exported file
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the mounted archives in priority order
    Mounts,
    /// Show or change the tool configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set the mount profile used when no archives are given
    SetProfile {
        /// Path to the profile TOML file
        path: String,
    },
    /// Enable or disable checksum verification on extraction
    SetVerify {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn parse_args() -> Result<Args> {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).map_err(|e| miette::miette!("{}", e))
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "zen_vfs=debug,zvfs=debug"
    } else {
        "zen_vfs=info,zvfs=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose);

    let open_session = || {
        let config = utils::config::load_config();
        Session::open(&config, args.profile.as_deref(), &args.archives)
    };

    match args.command {
        Commands::Ls { dir } => list_directory(&open_session()?, ListArgs { dir }),
        Commands::Resolve { path } => resolve_path(&open_session()?, ResolveArgs { path }),
        Commands::Conflicts { json, summary } => show_conflicts(
            &open_session()?,
            ConflictsArgs {
                json,
                summary_only: summary,
            },
        ),
        Commands::Extract { path, output } => {
            extract_file(&open_session()?, ExtractArgs { path, output })
        }
        Commands::Export {
            dir,
            output_dir,
            quiet,
        } => export_tree(
            &open_session()?,
            ExportArgs {
                dir,
                output_dir,
                quiet,
            },
        ),
        Commands::Mounts => show_mounts(&open_session()?),
        Commands::Config { command } => match command {
            None | Some(ConfigCommands::Show) => show_config(),
            Some(ConfigCommands::SetProfile { path }) => set_default_profile(path),
            Some(ConfigCommands::SetVerify { enabled }) => set_verify_checksums(enabled),
        },
    }
}
