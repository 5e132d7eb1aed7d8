//! CLI command for inspecting shard discovery

use std::path::Path;

use super::base_dir;
use super::list::format_size;
use crate::config::Config;
use crate::streamdb::{ShardSet, find_base_dir};

pub fn execute(source: &Path, base: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let base = base_dir(base, config)
        .map(Path::to_path_buf)
        .or_else(|| find_base_dir(source));
    let Some(base) = base else {
        println!("No base directory found for: {}", source.display());
        println!("Pass --base or set one with `unstream config set --game-base`");
        return Ok(());
    };

    let set = ShardSet::discover(source, Some(&base), &config.priority_shards);
    if set.is_empty() {
        println!("No shards found under: {}", base.display());
        return Ok(());
    }

    println!("Shards for {} (search order):", source.display());
    for (index, shard) in set.shards().iter().enumerate() {
        let stored: u64 = shard.entries().iter().map(|e| u64::from(e.compressed_size)).sum();
        let display = shard
            .path()
            .strip_prefix(&base)
            .unwrap_or(shard.path())
            .display();
        println!(
            "  {:>2}. {display}  ({} payloads, {})",
            index + 1,
            shard.len(),
            format_size(stored)
        );
    }

    Ok(())
}
