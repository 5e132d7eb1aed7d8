use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::compression::{Decompressor, Lz4Block, OodleLibrary, Unavailable};
use crate::config::Config;

pub mod batch;
pub mod config;
pub mod export;
pub mod key;
pub mod list;
pub mod shards;

#[derive(Subcommand)]
pub enum Commands {
    /// List archive entries
    List {
        /// Archive file (.resources, .pk5, .wad7)
        #[arg(short, long)]
        source: PathBuf,

        /// Show detailed info (type, version, sizes)
        #[arg(short, long)]
        detailed: bool,

        /// Only list entries matching glob pattern (e.g., "*.decl")
        #[arg(long)]
        filter: Option<String>,

        /// Only show count of matching entries
        #[arg(short, long)]
        count: bool,
    },

    /// Export archive entries
    Export {
        /// Archive file (.resources, .pk5, .wad7)
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory (defaults to the configured output directory)
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Only export entries matching glob pattern (e.g., "*.tga")
        #[arg(long, conflicts_with = "file")]
        filter: Option<String>,

        /// Export a single entry by name
        #[arg(long, conflicts_with = "filter")]
        file: Option<String>,

        /// Shard files to resolve streamed payloads against, in priority order
        /// (discovered from the package map when omitted)
        #[arg(long = "shard")]
        shards: Vec<PathBuf>,

        #[command(flatten)]
        codec: CodecArgs,

        /// Deepest nested container level to unpack
        #[arg(long)]
        max_depth: Option<usize>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the shards an archive resolves against
    Shards {
        /// Archive file
        #[arg(short, long)]
        source: PathBuf,

        /// The game's base directory (defaults to config, then the archive's ancestors)
        #[arg(long)]
        base: Option<PathBuf>,
    },

    /// Derive the stream key for an identity hash
    Key {
        /// Identity hash (hex, with or without 0x)
        identity: String,

        /// Mip/variant count
        #[arg(short, long, default_value_t = 0)]
        variants: i32,

        /// Look the key up in these shards
        #[arg(long = "shard")]
        shards: Vec<PathBuf>,
    },

    /// Export every archive under a directory
    Batch {
        /// Directory to search for archives
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,

        #[command(flatten)]
        codec: CodecArgs,

        /// Deepest nested container level to unpack
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Codec and shard discovery flags shared by export commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CodecArgs {
    /// Path to the Oodle shared library (defaults to config)
    #[arg(long)]
    pub oodle: Option<PathBuf>,

    /// Decode payloads as LZ4 blocks instead of Oodle
    #[arg(long, conflicts_with = "oodle")]
    pub lz4: bool,

    /// The game's base directory (defaults to config, then the archive's ancestors)
    #[arg(long)]
    pub base: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,

    /// Print the config file location
    Path,

    /// Update settings
    Set {
        /// Path to the Oodle shared library
        #[arg(long)]
        oodle: Option<PathBuf>,

        /// The game's base directory
        #[arg(long)]
        game_base: Option<PathBuf>,

        /// Default output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Shard file names to consult first (replaces the list)
        #[arg(long = "priority-shard")]
        priority_shards: Option<Vec<String>>,
    },

    /// Reset all settings to defaults
    Reset,
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = Config::load();
        match self {
            Commands::List {
                source,
                detailed,
                filter,
                count,
            } => list::execute(source, *detailed, filter.as_deref(), *count),
            Commands::Export {
                source,
                destination,
                filter,
                file,
                shards,
                codec,
                max_depth,
                quiet,
            } => export::execute(
                source,
                destination.as_deref(),
                filter.as_deref(),
                file.as_deref(),
                shards,
                codec,
                *max_depth,
                !*quiet,
                &config,
            ),
            Commands::Shards { source, base } => shards::execute(source, base.as_deref(), &config),
            Commands::Key {
                identity,
                variants,
                shards,
            } => key::execute(identity, *variants, shards),
            Commands::Batch {
                source,
                destination,
                codec,
                max_depth,
            } => batch::execute(source, destination, codec, *max_depth, &config),
            Commands::Config { command } => command.execute(config),
        }
    }
}

impl ConfigCommands {
    pub fn execute(&self, config: Config) -> anyhow::Result<()> {
        match self {
            ConfigCommands::Show => config::show(&config),
            ConfigCommands::Path => config::path(),
            ConfigCommands::Set {
                oodle,
                game_base,
                output,
                priority_shards,
            } => config::set(
                config,
                oodle.clone(),
                game_base.clone(),
                output.clone(),
                priority_shards.clone(),
            ),
            ConfigCommands::Reset => config::reset(),
        }
    }
}

/// Pick the decompression primitive: `--lz4`, then `--oodle`, then the
/// configured library. Without one, stored payloads still export.
pub(crate) fn load_codec(args: &CodecArgs, config: &Config) -> Box<dyn Decompressor> {
    if args.lz4 {
        return Box::new(Lz4Block);
    }

    let Some(path) = args.oodle.as_ref().or(config.oodle_library.as_ref()) else {
        tracing::warn!("No Oodle library configured; compressed entries will fail");
        return Box::new(Unavailable::new(
            "no Oodle library configured (use --oodle or `unstream config set --oodle`)",
        ));
    };

    match OodleLibrary::load(path) {
        Ok(library) => Box::new(library),
        Err(e) => {
            tracing::warn!("{e}");
            Box::new(Unavailable::new(e.to_string()))
        }
    }
}

/// Base directory override: the flag, then the configured game base.
pub(crate) fn base_dir<'a>(flag: Option<&'a Path>, config: &'a Config) -> Option<&'a Path> {
    flag.or(config.game_base.as_deref())
}
