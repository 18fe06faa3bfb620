//! `fatutil` — a command-line tool for inspecting and mutating FAT12/16
//! super-floppy disk images.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ffat::{FileAttributes, FormatOptions};

#[derive(Parser)]
#[command(name = "fatutil", version, about = "Inspect and mutate FAT12/16 disk images")]
struct Cli {
    /// Increase log verbosity. Repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Accepted, and ignored, for command-line compatibility with classic
/// mtools-style invocations that address a drive letter after the path.
#[derive(clap::Args)]
struct DriveToken {
    #[arg(value_name = "::")]
    drive: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a volume's geometry.
    Info {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        #[command(flatten)]
        drive: DriveToken,
    },
    /// List the root directory's contents.
    List {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        /// Include hidden and system entries.
        #[arg(short = 'a', long = "all")]
        all: bool,
        #[command(flatten)]
        drive: DriveToken,
    },
    /// Format a new 1.44MB FAT12 image (or reuse an existing file's size).
    Format {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
    },
    /// Copy a host file's directory entry and contents into the root.
    CopyIn {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        #[arg(long)]
        overwrite: bool,
        source: PathBuf,
    },
    /// Mark a root directory entry deleted and free its cluster chain.
    Delete {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        name: String,
    },
    /// Create a subdirectory entry in the root directory.
    Mkdir {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        name: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

/// Renders the classic six-character attribute string (`R`/`H`/`S`/`V`/`D`/`A`,
/// `-` for unset), in on-disk bit order.
fn attribute_string(attrs: FileAttributes) -> String {
    const BITS: [(FileAttributes, char); 6] = [
        (FileAttributes::READ_ONLY, 'R'),
        (FileAttributes::HIDDEN, 'H'),
        (FileAttributes::SYSTEM, 'S'),
        (FileAttributes::VOLUME_LABEL, 'V'),
        (FileAttributes::DIRECTORY, 'D'),
        (FileAttributes::ARCHIVE, 'A'),
    ];
    BITS.iter()
        .map(|&(bit, ch)| if attrs.contains(bit) { ch } else { '-' })
        .collect()
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Info { image, .. } => {
            let info = ffat::ops::info(&image)?;
            println!("Bytes/sector      {}", info.bytes_per_sector);
            println!("Sec/cluster       {}", info.sectors_per_cluster);
            println!("Number of FATs    {}", info.num_fats);
            println!("Root entries      {}", info.root_entry_count);
            println!("Total sectors     {}", info.total_sectors);
            println!("Cluster count     {}", info.cluster_count);
            println!("Guessed FAT type  {}", info.fat_type);
        }
        Command::List { image, all, .. } => {
            let entries = ffat::ops::list(&image, all)?;
            for e in entries {
                println!(
                    "{:<12} {:>10}  {}",
                    e.name,
                    e.size,
                    attribute_string(e.attributes)
                );
            }
        }
        Command::Format { image } => {
            ffat::ops::format(&image, FormatOptions::default())?;
        }
        Command::CopyIn {
            image,
            source,
            overwrite,
        } => {
            ffat::ops::copy_in(&image, &source, overwrite)?;
        }
        Command::Delete { image, name } => {
            ffat::ops::delete(&image, &name)?;
        }
        Command::Mkdir { image, name } => {
            ffat::ops::mkdir(&image, &name)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatutil: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
