//! CLI command implementations.

use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::{GameChange, WriteEngine};
use crate::format::{IndexReader, IndexWriter, MmapReader};
use crate::index::GameEntityIndex;
use crate::types::{BoosterResult, EntityId, EntityType, GameId, IndexConfig};

/// Create a new empty .bidx file.
pub fn cmd_create(path: &Path, config: IndexConfig) -> BoosterResult<()> {
    let index = GameEntityIndex::new(config)?;
    IndexWriter::new().write_to_file(&index, path)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Display information about a .bidx file.
pub fn cmd_info(path: &Path, json: bool) -> BoosterResult<()> {
    let reader = MmapReader::open(path)?;
    let header = *reader.header();
    let file_size = std::fs::metadata(path)?.len();

    let mut extents = Vec::with_capacity(reader.entity_types().len());
    for &et in reader.entity_types() {
        extents.push((et, reader.known_count(et)?));
    }

    if json {
        let types: serde_json::Map<String, serde_json::Value> = extents
            .iter()
            .map(|(et, n)| (et.name().to_string(), serde_json::json!(n)))
            .collect();
        let info = serde_json::json!({
            "file": path.display().to_string(),
            "version": header.version,
            "block_capacity": header.block_capacity,
            "num_blocks": header.num_blocks,
            "deleted_blocks": header.deleted_count,
            "created_at": header.created_at,
            "file_size": file_size,
            "entity_types": types,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&info).unwrap_or_default()
        );
    } else {
        println!("File: {}", path.display());
        println!("Version: {}", header.version);
        println!("Block capacity: {}", header.block_capacity);
        println!("Blocks: {}", header.num_blocks);
        println!("Deleted blocks: {}", header.deleted_count);
        println!("Written: {}", format_timestamp(header.created_at));
        println!("File size: {}", format_size(file_size));
        println!("Entity types:");
        for (et, n) in &extents {
            println!("  {}: {} known", et, n);
        }
    }
    Ok(())
}

/// Set game counts for one entity.
pub fn cmd_update(
    path: &Path,
    entity_type: EntityType,
    entity_id: EntityId,
    changes: &BTreeMap<GameId, u32>,
    json: bool,
) -> BoosterResult<()> {
    let mut index = IndexReader::read_from_file(path)?;
    index.update_entity(entity_id, entity_type, changes)?;
    IndexWriter::new().write_to_file(&index, path)?;

    let games = index.get_game_ids(entity_id, entity_type, false)?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "type": entity_type.name(),
                "entity": entity_id,
                "games": games.len(),
                "num_blocks": index.num_blocks(),
                "deleted_blocks": index.deleted_block_ids().len(),
            })
        );
    } else {
        println!(
            "Updated {} {} ({} games, {} blocks, {} deleted)",
            entity_type,
            entity_id,
            games.len(),
            index.num_blocks(),
            index.deleted_block_ids().len()
        );
    }
    Ok(())
}

/// Apply game header changes from a JSON file.
pub fn cmd_ingest(path: &Path, json_path: &Path, json: bool) -> BoosterResult<()> {
    let raw = std::fs::read_to_string(json_path)?;
    let changes: Vec<GameChange> = serde_json::from_str(&raw)?;

    let mut index = IndexReader::read_from_file(path)?;
    let report = WriteEngine::new().apply(&mut index, &changes)?;
    IndexWriter::new().write_to_file(&index, path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "games": changes.len(),
                "entities_updated": report.updated.len(),
                "postings_changed": report.postings_changed,
            })
        );
    } else {
        println!(
            "Applied {} games: {} entities updated, {} postings changed",
            changes.len(),
            report.updated.len(),
            report.postings_changed
        );
    }
    Ok(())
}

/// List the games an entity appears in.
pub fn cmd_games(
    path: &Path,
    entity_type: EntityType,
    entity_id: EntityId,
    expand: bool,
    json: bool,
) -> BoosterResult<()> {
    let reader = MmapReader::open(path)?;
    let games = reader.get_game_ids(entity_id, entity_type, expand)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "type": entity_type.name(),
                "entity": entity_id,
                "games": games,
            })
        );
    } else if games.is_empty() {
        println!("No games for {} {}", entity_type, entity_id);
    } else {
        let list: Vec<String> = games.iter().map(|g| g.to_string()).collect();
        println!("{} {}: {}", entity_type, entity_id, list.join(", "));
    }
    Ok(())
}

/// Show block pool usage.
pub fn cmd_blocks(path: &Path, json: bool) -> BoosterResult<()> {
    let reader = MmapReader::open(path)?;
    let deleted = reader.deleted_block_ids()?;
    let num_blocks = reader.num_blocks();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "num_blocks": num_blocks,
                "live_blocks": num_blocks as usize - deleted.len(),
                "deleted": deleted,
            })
        );
    } else {
        println!("Blocks: {}", num_blocks);
        println!("Live: {}", num_blocks as usize - deleted.len());
        println!("Deleted: {:?}", deleted);
    }
    Ok(())
}

/// Detailed statistics about the index.
pub fn cmd_stats(path: &Path, json: bool) -> BoosterResult<()> {
    let index = IndexReader::read_from_file(path)?;
    let stats = index.stats()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).unwrap_or_default()
        );
    } else {
        println!("Block capacity: {}", stats.block_capacity);
        println!(
            "Blocks: {} ({} live, {} deleted)",
            stats.num_blocks, stats.live_blocks, stats.deleted_blocks
        );
        println!("Postings: {}", stats.total_postings);
        println!("Longest chain: {} blocks", stats.longest_chain);
        for t in &stats.types {
            println!(
                "  {}: {} known, {} with games, {} postings",
                t.entity_type, t.known_count, t.non_empty, t.postings
            );
        }
    }
    Ok(())
}

/// Load the whole file and check every chain.
pub fn cmd_verify(path: &Path, json: bool) -> BoosterResult<()> {
    // The reader verifies checksums and chain structure while loading.
    let index = IndexReader::read_from_file(path)?;
    if json {
        println!(
            "{}",
            serde_json::json!({"ok": true, "num_blocks": index.num_blocks()})
        );
    } else {
        println!("{}: OK ({} blocks)", path.display(), index.num_blocks());
    }
    Ok(())
}

/// Export every non-empty posting list as JSON.
pub fn cmd_export(path: &Path, pretty: bool) -> BoosterResult<()> {
    let index = IndexReader::read_from_file(path)?;

    let mut entities = Vec::new();
    for (entity_type, entity_id, _) in index.heads().chains() {
        let postings = index.postings(entity_id, entity_type)?;
        entities.push(serde_json::json!({
            "type": entity_type.name(),
            "entity": entity_id,
            "postings": postings,
        }));
    }
    let output = serde_json::json!({
        "block_capacity": index.block_capacity(),
        "entity_types": index.entity_types(),
        "entities": entities,
    });

    if pretty {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("{}", serde_json::to_string(&output).unwrap_or_default());
    }
    Ok(())
}

/// Parse `game:count` pairs such as `2:1,3:0,4:2`.
pub fn parse_changes(s: &str) -> Option<BTreeMap<GameId, u32>> {
    let mut changes = BTreeMap::new();
    for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (game, count) = pair.split_once(':')?;
        changes.insert(game.trim().parse().ok()?, count.trim().parse().ok()?);
    }
    Some(changes)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_timestamp(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} us", micros),
    }
}
