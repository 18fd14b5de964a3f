use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use pesym::debuginfo::breakpad::read_breakpad_metadata;
use pesym::debuginfo::mapping::{find_pdb, MappingMetadata};
use pesym::debuginfo::{remove_build_id_duplicates, PeFileMetadata, SourceType};

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Options {
    dry_run: bool,
    replace_existing: bool,
    json: bool,
}

fn is_breakpad_sym(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("sym"))
}

fn read_metadata(path: &Path) -> Result<PeFileMetadata> {
    if is_breakpad_sym(path) {
        return Ok(read_breakpad_metadata(path)?);
    }

    let metadata = PeFileMetadata::from_path(path)?;
    if !metadata.is_pe {
        bail!("Input location {} is not a PE file", path.display());
    }
    if let Some(ref error) = metadata.error {
        bail!("Error reading PE file {}: {}", path.display(), error);
    }
    if !metadata.has_pdb_info {
        bail!(
            "Skipped {} because it has no debug info, nor symbols",
            path.display()
        );
    }

    Ok(metadata)
}

/// Collects the metadata of all usable files in a location.
///
/// In a directory, unusable files are reported and skipped. A single file that cannot be used is an
/// error.
fn collect_location(location: &Path) -> Result<Vec<PeFileMetadata>> {
    let stat = std::fs::metadata(location)
        .with_context(|| format!("Invalid symbols location {}", location.display()))?;

    if !stat.is_dir() {
        return Ok(vec![read_metadata(location)?]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(location) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!("Skipped unreadable entry: {error}");
                continue;
            }
        };

        // Folders will be recursed into automatically
        if !entry.file_type().is_file() {
            continue;
        }

        tracing::trace!(path = ?entry.path());
        match read_metadata(entry.path()) {
            Ok(metadata) => files.push(metadata),
            Err(error) => tracing::warn!("{error:#}"),
        }
    }

    Ok(files)
}

fn process_file(file: &PeFileMetadata, options: &Options) -> Result<bool> {
    let mapping = MappingMetadata::new(file, VERSION, options.replace_existing);

    let symbol_file = match file.source_type {
        SourceType::BreakpadSym => Some(file.path.clone()),
        SourceType::PeBinary => find_pdb(&file.path, &file.filename),
    };

    let Some(symbol_file) = symbol_file else {
        tracing::warn!(
            "Skipped {} because its PDB {} was not found",
            file.path.display(),
            file.filename
        );
        return Ok(false);
    };

    if options.dry_run {
        println!("[DRYRUN] {}", mapping.render_upload(&file.path));
    }
    tracing::debug!(symbol_file = %symbol_file.display(), "using symbol file");

    if options.json {
        println!("{}", mapping.to_json()?);
    }

    Ok(true)
}

fn execute(matches: &ArgMatches) -> Result<()> {
    let options = Options {
        dry_run: matches.get_flag("dry_run"),
        replace_existing: matches.get_flag("replace_existing"),
        json: matches.get_flag("json"),
    };

    if !options.dry_run {
        bail!("uploading is not supported by this tool, rerun with --dry-run");
    }

    let mut files = Vec::new();
    for location in matches.get_many::<PathBuf>("locations").unwrap_or_default() {
        files.extend(collect_location(location)?);
    }

    let files = remove_build_id_duplicates(files).files;

    let mut processed = 0;
    let mut skipped = 0;
    for file in &files {
        if process_file(file, &options)? {
            processed += 1;
        } else {
            skipped += 1;
        }
    }

    println!("Processed {processed} files, skipped {skipped}");
    Ok(())
}

fn main() -> Result<()> {
    // Tracing subscriber controlled by `RUST_LOG`
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .event_format(
            tracing_subscriber::fmt::format()
                .compact()
                .with_target(false)
                .without_time(),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("pe-symbols-debug")
        .about("Shows the PDB upload events for Windows binaries and Breakpad symbol files")
        .arg(
            Arg::new("locations")
                .required(true)
                .action(ArgAction::Append)
                .value_name("LOCATION")
                .value_parser(value_parser!(PathBuf))
                .help("Files or directories to search for binaries")
                .index(1),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .action(ArgAction::Set)
                .value_parser(value_parser!(bool))
                .num_args(0..=1)
                .default_value("true")
                .default_missing_value("true")
                .help("Only print what would be uploaded"),
        )
        .arg(
            Arg::new("replace_existing")
                .long("replace-existing")
                .action(ArgAction::SetTrue)
                .help("Replace debug information already stored for the same build id"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the upload event payloads as JSON"),
        )
        .get_matches();

    execute(&matches)
}
