//! Streamed-data databases (`.streamdb` shards)
//!
//! Large payloads such as top mips of textures live outside the container in
//! shard files, addressed by a key derived from the entry's identity hash.

pub mod key;
pub mod package_map;
pub mod resolver;
pub mod shard;

pub use key::{retry_key, stream_key};
pub use package_map::PackageMap;
pub use resolver::{Located, MOD_SHARD, ShardSet, find_base_dir, shard_paths};
pub use shard::{STREAMDB_MAGIC, ShardEntry, StreamDb, build_streamdb};
