//! CLI entry point for the `booster` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use booster_index::cli::commands;
use booster_index::types::{BoosterError, EntityType, IndexConfig};

#[derive(Parser)]
#[command(
    name = "booster",
    about = "Booster index CLI: game-entity posting lists for chess databases"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty .bidx file
    Create {
        /// Path to the .bidx file to create
        file: PathBuf,
        /// Comma-separated entity types (default: all)
        #[arg(long)]
        types: Option<String>,
        /// Postings per block
        #[arg(long)]
        capacity: Option<usize>,
        /// TOML config file; --types and --capacity override it
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Display information about a .bidx file
    Info {
        /// Path to the .bidx file
        file: PathBuf,
    },
    /// Set game counts for one entity
    Update {
        /// Path to the .bidx file
        file: PathBuf,
        /// Entity type: player, source, tournament, annotator, team, game_tag
        #[arg(value_name = "TYPE")]
        entity_type: String,
        /// Entity id
        entity_id: u32,
        /// Comma-separated game:count pairs; count 0 removes the game
        changes: String,
    },
    /// Apply game header changes from a JSON file
    Ingest {
        /// Path to the .bidx file
        file: PathBuf,
        /// Path to the JSON file
        json_file: PathBuf,
    },
    /// List the games an entity appears in
    Games {
        /// Path to the .bidx file
        file: PathBuf,
        /// Entity type
        #[arg(value_name = "TYPE")]
        entity_type: String,
        /// Entity id
        entity_id: u32,
        /// Repeat each game id once per role count
        #[arg(long)]
        expand: bool,
    },
    /// Show block pool usage
    Blocks {
        /// Path to the .bidx file
        file: PathBuf,
    },
    /// Detailed statistics about the index
    Stats {
        /// Path to the .bidx file
        file: PathBuf,
    },
    /// Check checksums and chain structure
    Verify {
        /// Path to the .bidx file
        file: PathBuf,
    },
    /// Export all posting lists as JSON
    Export {
        /// Path to the .bidx file
        file: PathBuf,
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn parse_type(name: &str) -> EntityType {
    match EntityType::from_name(name) {
        Some(et) => et,
        None => {
            eprintln!("Invalid entity type: {}", name);
            process::exit(3);
        }
    }
}

fn build_config(
    types: Option<String>,
    capacity: Option<usize>,
    config: Option<PathBuf>,
) -> Result<IndexConfig, BoosterError> {
    let mut cfg = match config {
        Some(path) => IndexConfig::load(&path)?,
        None => IndexConfig::default(),
    };
    if let Some(types) = types {
        cfg.entity_types = types.split(',').map(|t| parse_type(t.trim())).collect();
    }
    if let Some(capacity) = capacity {
        cfg.block_capacity = capacity;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Create {
            file,
            types,
            capacity,
            config,
        } => build_config(types, capacity, config).and_then(|cfg| commands::cmd_create(&file, cfg)),
        Commands::Info { file } => commands::cmd_info(&file, json),
        Commands::Update {
            file,
            entity_type,
            entity_id,
            changes,
        } => {
            let et = parse_type(&entity_type);
            let changes = match commands::parse_changes(&changes) {
                Some(c) => c,
                None => {
                    eprintln!("Invalid changes (expected game:count,...): {}", changes);
                    process::exit(3);
                }
            };
            commands::cmd_update(&file, et, entity_id, &changes, json)
        }
        Commands::Ingest { file, json_file } => commands::cmd_ingest(&file, &json_file, json),
        Commands::Games {
            file,
            entity_type,
            entity_id,
            expand,
        } => commands::cmd_games(&file, parse_type(&entity_type), entity_id, expand, json),
        Commands::Blocks { file } => commands::cmd_blocks(&file, json),
        Commands::Stats { file } => commands::cmd_stats(&file, json),
        Commands::Verify { file } => commands::cmd_verify(&file, json),
        Commands::Export { file, pretty } => commands::cmd_export(&file, pretty),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            BoosterError::Io(_) => 1,
            BoosterError::InvalidMagic
            | BoosterError::UnsupportedVersion(_)
            | BoosterError::Truncated
            | BoosterError::Corrupt(_)
            | BoosterError::ChecksumMismatch(_)
            | BoosterError::Compression(_)
            | BoosterError::CorruptChain { .. } => 2,
            BoosterError::InvalidConfig(_)
            | BoosterError::Config(_)
            | BoosterError::Json(_)
            | BoosterError::UnknownEntityType(_) => 3,
            BoosterError::EntityOutOfRange { .. } => 4,
        };
        process::exit(code);
    }
}
