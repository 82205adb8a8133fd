//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jarpipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (also raises log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Number of worker threads (default: one per CPU)
    #[arg(short = 't', long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the classes and resources of a JAR
    List(ListArgs),
    /// Read a JAR, apply entry filters, and write it back out
    Repack(RepackArgs),
    /// Merge several JARs into one
    Merge(MergeArgs),
    /// Print or extract a single entry
    Find(FindArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the JAR file
    #[arg(value_name = "JAR")]
    pub jar: PathBuf,

    /// Show entry kind and size
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,
}

#[derive(clap::Args)]
pub struct RepackArgs {
    /// Path to the source JAR
    #[arg(value_name = "JAR")]
    pub jar: PathBuf,

    /// Output JAR path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Compression level (0 = stored, 1-9 = deflate)
    #[arg(short = 'l', long, default_value = "6", value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Drop every class entry
    #[arg(long)]
    pub strip_classes: bool,

    /// Drop every resource entry
    #[arg(long)]
    pub strip_resources: bool,

    /// Drop entries whose name starts with PREFIX (can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PREFIX")]
    pub exclude: Vec<String>,

    /// Move classes under FROM to TO, given as FROM=TO (can be repeated)
    #[arg(long = "relocate", value_name = "FROM=TO", value_parser = parse_relocation)]
    pub relocate: Vec<(String, String)>,

    /// Overwrite output file if it exists
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct MergeArgs {
    /// Output JAR path (must end in .jar)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source JARs, in priority order
    #[arg(value_name = "JAR", required = true)]
    pub jars: Vec<PathBuf>,

    /// Compression level (0 = stored, 1-9 = deflate)
    #[arg(short = 'l', long, default_value = "6", value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Keep the first manifest's bytes instead of rewriting its Main-Class
    #[arg(long)]
    pub preserve_manifest: bool,

    /// Overwrite output file if it exists
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct FindArgs {
    /// Path to the JAR file
    #[arg(value_name = "JAR")]
    pub jar: PathBuf,

    /// Entry name, e.g. META-INF/MANIFEST.MF
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Write the entry to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse a `FROM=TO` relocation
fn parse_relocation(s: &str) -> Result<(String, String), String> {
    let (from, to) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FROM=TO, got '{s}'"))?;
    if from.is_empty() {
        return Err("relocation source prefix is empty".to_string());
    }
    Ok((from.to_string(), to.to_string()))
}
