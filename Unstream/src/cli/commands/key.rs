//! CLI command for deriving stream keys

use std::path::PathBuf;

use anyhow::Context;

use crate::streamdb::{ShardSet, retry_key, stream_key};

/// Parse a hex identity hash, with or without a `0x` prefix.
fn parse_identity(text: &str) -> anyhow::Result<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid identity hash: {text}"))
}

pub fn execute(identity: &str, variants: i32, shards: &[PathBuf]) -> anyhow::Result<()> {
    let identity = parse_identity(identity)?;
    let key = stream_key(identity, variants);

    println!("Identity: {identity:#018x}");
    println!("Variants: {variants}");
    println!("Key:      {key:#018x}");
    println!("Retry:    {:#018x}", retry_key(key));

    if shards.is_empty() {
        return Ok(());
    }

    println!();
    let set = ShardSet::load(shards);
    match set.locate("identity", identity, variants) {
        Ok(found) => println!(
            "Found in {} at {:#x} ({} bytes, key {:#018x})",
            found.shard.path().display(),
            found.entry.offset,
            found.entry.compressed_size,
            found.key
        ),
        Err(e) => println!("{e}"),
    }

    Ok(())
}
