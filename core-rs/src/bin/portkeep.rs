//! portkeep: per-project development port registry
//!
//! Command-line surface over the port registry core: every subcommand maps
//! directly onto the resolver/store contracts and performs no allocation
//! logic of its own.

use std::collections::BTreeSet;
use std::env;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use portkeep_core::{resolve_port, PortRecord, PortStore};

#[derive(Parser)]
#[command(
    name = "portkeep",
    version,
    about = "Track and assign consistent development ports per project directory",
    long_about = "Track and assign consistent development ports per project directory.

Storage location: ~/.config/portkeep/ports.db

Port ranges by type:
  dev          3100-3999   Development servers
  pg/postgres  5500-5599   PostgreSQL databases
  db           5600-5699   Generic databases
  redis        6400-6499   Redis servers
  mongo        27100-27199 MongoDB servers
  (other)      9100-9999   Catch-all for custom types

Examples:
  $ portkeep get dev          # Get/create dev port for current project
  $ portkeep get pg --desc \"local postgres\"
  $ portkeep list             # Show all port assignments
  $ portkeep list --json      # Output as JSON
  $ portkeep info             # Show ports for current project
  $ portkeep env              # Print ports as KEY=value lines
  $ portkeep rm redis         # Remove redis port assignment
  $ portkeep cleanup          # Remove stale entries"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get or create a port for a service type in the current project
    #[command(visible_alias = "add")]
    Get {
        /// Service type (dev, pg, postgres, redis, mongo, db, or any label)
        #[arg(value_name = "TYPE")]
        service_type: String,
        /// Target directory instead of the current working directory
        #[arg(short, long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Optional description for the port assignment
        #[arg(long, value_name = "TEXT")]
        desc: Option<String>,
    },
    /// Show all assigned ports across projects
    List {
        /// Show full absolute paths instead of basenames
        #[arg(short, long)]
        verbose: bool,
        /// Output as JSON array
        #[arg(long)]
        json: bool,
    },
    /// Show all ports assigned to the current project
    Info {
        /// Target directory instead of the current working directory
        #[arg(short, long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a port assignment for a service type
    Rm {
        /// Service type to remove (omit when using --all)
        #[arg(value_name = "TYPE")]
        service_type: Option<String>,
        /// Target directory instead of the current working directory
        #[arg(short, long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Prompt for confirmation before removing
        #[arg(short, long)]
        interactive: bool,
        /// Remove every assignment for the directory
        #[arg(long)]
        all: bool,
    },
    /// Remove entries for deleted project directories
    Cleanup {
        /// Show what would be removed without removing
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Prompt for confirmation before removing
        #[arg(short, long)]
        interactive: bool,
    },
    /// Print the project's ports as KEY=value lines for a .env file
    Env {
        /// Target directory instead of the current working directory
        #[arg(short, long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Prefix for generated variable names
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,
    },
}

fn main() {
    // RUST_LOG controls diagnostics; command output stays on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = PortStore::open_default()?;

    match cli.command {
        Commands::Get { service_type, dir, desc } => {
            cmd_get(&store, &service_type, dir, desc.as_deref())
        }
        Commands::List { verbose, json } => cmd_list(&store, verbose, json),
        Commands::Info { dir, json } => cmd_info(&store, dir, json),
        Commands::Rm { service_type, dir, interactive, all } => {
            cmd_rm(&store, service_type, dir, interactive, all)
        }
        Commands::Cleanup { dry_run, interactive } => cmd_cleanup(&store, dry_run, interactive),
        Commands::Env { dir, prefix } => cmd_env(&store, dir, prefix.as_deref()),
    }
}

// ===== GET =====

fn cmd_get(
    store: &PortStore,
    service_type: &str,
    dir: Option<PathBuf>,
    desc: Option<&str>,
) -> anyhow::Result<()> {
    let service_type = validated_type(service_type)?;
    let directory = target_directory(dir, true)?;

    let port = resolve_port(store, &directory, &service_type, desc)?;

    // Just the number, for scripting
    println!("{port}");
    Ok(())
}

// ===== LIST =====

/// Row shape for `list` output (table and JSON share it).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    port: u16,
    #[serde(rename = "type")]
    service_type: String,
    directory: String,
    full_path: String,
    description: Option<String>,
}

fn cmd_list(store: &PortStore, verbose: bool, json: bool) -> anyhow::Result<()> {
    let entries: Vec<ListEntry> = store
        .find_all()?
        .into_iter()
        .map(|record| ListEntry {
            port: record.port,
            service_type: record.service_type,
            directory: if verbose {
                record.directory.clone()
            } else {
                basename(&record.directory)
            },
            full_path: record.directory,
            description: record.description,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No ports have been assigned yet.");
        return Ok(());
    }

    let mut table = new_table(vec!["PORT", "TYPE", "DIRECTORY", "DESCRIPTION"]);
    align_column(&mut table, 0, CellAlignment::Right);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.port),
            Cell::new(&entry.service_type),
            Cell::new(&entry.directory),
            Cell::new(entry.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

// ===== INFO =====

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoPort {
    #[serde(rename = "type")]
    service_type: String,
    port: u16,
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoOutput {
    directory: String,
    full_path: String,
    ports: Vec<InfoPort>,
}

fn cmd_info(store: &PortStore, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let full_path = target_directory(dir, true)?;

    let info = InfoOutput {
        directory: basename(&full_path),
        ports: store
            .find_all_for_directory(&full_path)?
            .into_iter()
            .map(|record| InfoPort {
                service_type: record.service_type,
                port: record.port,
                description: record.description,
            })
            .collect(),
        full_path,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if info.ports.is_empty() {
        println!("No ports have been assigned to {}.", info.directory);
        println!("  Path: {}", info.full_path);
        println!();
        println!("Use \"portkeep get <type>\" to assign a port.");
        return Ok(());
    }

    println!("Project: {}", info.directory);
    println!("Path: {}", info.full_path);
    println!();

    let mut table = new_table(vec!["TYPE", "PORT", "DESCRIPTION"]);
    align_column(&mut table, 1, CellAlignment::Right);
    for port in &info.ports {
        table.add_row(vec![
            Cell::new(&port.service_type),
            Cell::new(port.port),
            Cell::new(port.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

// ===== RM =====

fn cmd_rm(
    store: &PortStore,
    service_type: Option<String>,
    dir: Option<PathBuf>,
    interactive: bool,
    all: bool,
) -> anyhow::Result<()> {
    // No existence requirement: assignments for vanished directories must
    // stay removable by hand.
    let directory = target_directory(dir, false)?;

    if all {
        let records = store.find_all_for_directory(&directory)?;
        if records.is_empty() {
            bail!("no port assignments found in '{directory}'");
        }

        if interactive {
            let noun = entry_noun(records.len());
            let question =
                format!("Remove {} {} from {}?", records.len(), noun, directory);
            if !confirm(&question)? {
                println!("Cancelled.");
                return Ok(());
            }
        }

        for record in store.remove_all_for_directory(&directory)? {
            println!("{}", record.port);
        }
        return Ok(());
    }

    let Some(raw_type) = service_type else {
        bail!("specify a service type to remove, or pass --all");
    };
    let service_type = validated_type(&raw_type)?;

    let Some(existing) = store.find(&directory, &service_type)? else {
        bail!("no port assignment found for type '{service_type}' in directory '{directory}'");
    };

    if interactive {
        let question = format!(
            "Remove port {} ({}) from {}?",
            existing.port, service_type, directory
        );
        if !confirm(&question)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if let Some(removed) = store.remove(&directory, &service_type)? {
        println!("{}", removed.port);
    }
    Ok(())
}

// ===== CLEANUP =====

fn cmd_cleanup(store: &PortStore, dry_run: bool, interactive: bool) -> anyhow::Result<()> {
    let stale: Vec<PortRecord> = store
        .find_all()?
        .into_iter()
        .filter(|record| !Path::new(&record.directory).is_dir())
        .collect();

    if stale.is_empty() {
        println!("No stale entries found. All directories exist.");
        return Ok(());
    }

    let noun = entry_noun(stale.len());
    println!("Found {} stale {}:", stale.len(), noun);
    println!();
    for record in &stale {
        println!(
            "  - {} ({}: {})",
            record.directory, record.service_type, record.port
        );
    }
    println!();

    if dry_run {
        println!("Would remove {} {}.", stale.len(), noun);
        return Ok(());
    }

    if interactive {
        let question = format!("Remove {} stale {}?", stale.len(), noun);
        if !confirm(&question)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    // Stale records are removed per vanished directory; records whose
    // directory still exists are never touched.
    let directories: BTreeSet<&str> = stale.iter().map(|r| r.directory.as_str()).collect();
    let mut removed = 0;
    for directory in directories {
        removed += store.remove_all_for_directory(directory)?.len();
    }
    println!("Removed {} stale {}.", removed, entry_noun(removed));
    Ok(())
}

// ===== ENV =====

fn cmd_env(store: &PortStore, dir: Option<PathBuf>, prefix: Option<&str>) -> anyhow::Result<()> {
    let directory = target_directory(dir, true)?;

    // No assignments prints nothing, so appending to a .env file stays safe
    for record in store.find_all_for_directory(&directory)? {
        println!("{}={}", env_var_name(&record.service_type, prefix), record.port);
    }
    Ok(())
}

/// Derive an environment variable name from a service type: runs of hyphens
/// and whitespace become a single underscore, a `_PORT` suffix is appended
/// unless the name already ends in `_port`, the optional prefix is prepended,
/// and the result is uppercased. "my-api" with prefix "app" → "APP_MY_API_PORT".
fn env_var_name(service_type: &str, prefix: Option<&str>) -> String {
    let mut name = String::with_capacity(service_type.len() + 8);
    let mut previous_was_separator = false;
    for c in service_type.chars() {
        if c == '-' || c.is_whitespace() {
            if !previous_was_separator {
                name.push('_');
            }
            previous_was_separator = true;
        } else {
            name.push(c);
            previous_was_separator = false;
        }
    }

    if !name.to_lowercase().ends_with("_port") {
        name.push_str("_PORT");
    }
    if let Some(prefix) = prefix {
        name = format!("{prefix}_{name}");
    }
    name.to_uppercase()
}

// ===== SHARED HELPERS =====

/// Normalize and validate a service type before it reaches the core.
fn validated_type(raw: &str) -> anyhow::Result<String> {
    let service_type = raw.trim().to_lowercase();
    if service_type.is_empty() {
        bail!("service type cannot be empty");
    }
    Ok(service_type)
}

/// Resolve the target directory (cwd if not specified) to an absolute,
/// lexically-normalized path string. Symlinks are not resolved; the stored
/// key is the literal absolute path.
fn target_directory(dir: Option<PathBuf>, must_exist: bool) -> anyhow::Result<String> {
    let cwd = env::current_dir().context("failed to determine current working directory")?;
    let absolute = match dir {
        Some(path) if path.is_absolute() => path,
        Some(path) => cwd.join(path),
        None => cwd,
    };
    let path = normalize_path(&absolute);

    if must_exist && !path.is_dir() {
        bail!("directory does not exist: {}", path.display());
    }
    Ok(path.to_string_lossy().into_owned())
}

/// Lexical normalization: drops `.` components and resolves `..` without
/// touching the filesystem, so `-d .` and no `-d` yield the same key.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn entry_noun(count: usize) -> &'static str {
    if count == 1 {
        "entry"
    } else {
        "entries"
    }
}

/// Ask a yes/no question on stdin. Defaults to no.
fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
