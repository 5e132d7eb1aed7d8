//! CLI commands for persisted settings

use std::path::PathBuf;

use anyhow::Context;

use crate::config::Config;

fn show_path(label: &str, path: Option<&PathBuf>) {
    match path {
        Some(path) => println!("{label:<16} {}", path.display()),
        None => println!("{label:<16} (not set)"),
    }
}

pub fn show(config: &Config) -> anyhow::Result<()> {
    show_path("Oodle library:", config.oodle_library.as_ref());
    show_path("Game base:", config.game_base.as_ref());
    show_path("Output dir:", config.output_dir.as_ref());
    if config.priority_shards.is_empty() {
        println!("{:<16} (none)", "Priority shards:");
    } else {
        println!("{:<16} {}", "Priority shards:", config.priority_shards.join(", "));
    }
    Ok(())
}

pub fn path() -> anyhow::Result<()> {
    let path = Config::config_path().context("no platform config directory")?;
    println!("{}", path.display());
    Ok(())
}

pub fn set(
    mut config: Config,
    oodle: Option<PathBuf>,
    game_base: Option<PathBuf>,
    output: Option<PathBuf>,
    priority_shards: Option<Vec<String>>,
) -> anyhow::Result<()> {
    if oodle.is_some() {
        config.oodle_library = oodle;
    }
    if game_base.is_some() {
        config.game_base = game_base;
    }
    if output.is_some() {
        config.output_dir = output;
    }
    if let Some(shards) = priority_shards {
        config.priority_shards = shards;
    }

    let path = config.save()?;
    println!("Saved {}", path.display());
    show(&config)
}

pub fn reset() -> anyhow::Result<()> {
    let path = Config::default().save()?;
    println!("Reset {}", path.display());
    Ok(())
}
