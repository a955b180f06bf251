use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use debrepo_core::{IndexFamily, StripConvention};
use tracing_subscriber::EnvFilter;

mod completion;
mod config;
mod dispatch;
mod render;

use config::{load_config_file, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "debrepoctl")]
#[command(
    about = "Mirror Debian package indices into a tree of one stanza file per package",
    long_about = None
)]
struct Cli {
    /// Config file; defaults to ./debrepo.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the command report as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,
    /// Repeat for more log output (info, then debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Strip convention for binary (Packages) indices.
    #[arg(long, global = true, value_parser = parse_strip_convention)]
    binary_strip: Option<StripConvention>,
    /// Strip convention for source (Sources) indices.
    #[arg(long, global = true, value_parser = parse_strip_convention)]
    source_strip: Option<StripConvention>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every dist/component/arch index from a remote archive and mirror it.
    ImportRepo {
        /// Archive base URL, e.g. https://deb.debian.org/debian/
        url: Option<String>,
        #[command(flatten)]
        selection: ArchiveSelection,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Mirror every Packages.gz / Sources.gz found below a local directory.
    ImportLocal {
        dir: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write the concatenated stanza files of a tree to stdout.
    Export {
        #[arg(long)]
        input_dir: PathBuf,
    },
    /// Remove the Package=Version identifiers read from stdin from a tree.
    Remove {
        #[arg(long)]
        output_dir: PathBuf,
        /// Index family of the tree; inferred from the directory name otherwise.
        #[arg(long, value_parser = parse_family)]
        family: Option<IndexFamily>,
    },
    /// Copy the Package=Version identifiers read from stdin from one tree to another.
    Copy {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long, value_parser = parse_family)]
        family: Option<IndexFamily>,
        /// Copy every record instead of reading identifiers from stdin.
        #[arg(long)]
        all: bool,
    },
    /// Print a shell completion script.
    Completions { shell: Shell },
}

#[derive(Args, Debug, Default)]
struct ArchiveSelection {
    #[arg(long = "dist", value_delimiter = ',')]
    distributions: Option<Vec<String>>,
    #[arg(long = "comp", value_delimiter = ',')]
    components: Option<Vec<String>>,
    #[arg(long = "arch", value_delimiter = ',')]
    architectures: Option<Vec<String>>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let file = load_config_file(cli.config.as_deref())?;
    let settings = Settings::resolve(file, overrides_from_cli(&cli))?;
    init_logging(cli.verbose, &settings.log_level);

    let summary = dispatch::run(cli.command, &settings, cli.json)?;
    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn overrides_from_cli(cli: &Cli) -> Overrides {
    let mut overrides = Overrides {
        binary_strip: cli.binary_strip,
        source_strip: cli.source_strip,
        ..Overrides::default()
    };
    match &cli.command {
        Commands::ImportRepo {
            url,
            selection,
            output_dir,
        } => {
            overrides.base_url = url.clone();
            overrides.output_dir = output_dir.clone();
            overrides.distributions = selection.distributions.clone();
            overrides.components = selection.components.clone();
            overrides.architectures = selection.architectures.clone();
        }
        Commands::ImportLocal { output_dir, .. } => {
            overrides.output_dir = output_dir.clone();
        }
        _ => {}
    }
    overrides
}

fn init_logging(verbose: u8, configured_level: &str) {
    let level = match verbose {
        0 => configured_level,
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_strip_convention(input: &str) -> Result<StripConvention, String> {
    StripConvention::parse(input).map_err(|err| err.to_string())
}

fn parse_family(input: &str) -> Result<IndexFamily, String> {
    IndexFamily::parse(input).ok_or_else(|| format!("unknown index family '{input}'"))
}
