//! CLI command for batch export

use std::path::Path;
use std::time::Instant;

use super::{CodecArgs, base_dir, load_codec};
use crate::cli::progress::{LOOKING_GLASS, TRUCK, print_done, print_step, simple_bar};
use crate::config::Config;
use crate::export::{ExportOptions, batch_export, find_archives};

pub fn execute(
    source: &Path,
    dest: &Path,
    codec_args: &CodecArgs,
    max_depth: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 2, LOOKING_GLASS, &format!("Searching {}...", source.display()));
    let archives = find_archives(source);
    if archives.is_empty() {
        println!("No archives found in: {}", source.display());
        return Ok(());
    }

    print_step(2, 2, TRUCK, &format!("Exporting {} archives...", archives.len()));
    let codec = load_codec(codec_args, config);
    let options = ExportOptions::new().with_max_depth(max_depth);

    let pb = simple_bar(archives.len() as u64, "Exporting");
    let result = batch_export(
        &archives,
        dest,
        codec.as_ref(),
        &options,
        base_dir(codec_args.base.as_deref(), config),
        &config.priority_shards,
        |progress| {
            pb.set_position(progress.current as u64);
            if let Some(ref name) = progress.current_file {
                pb.set_message(name.clone());
            }
        },
    );
    pb.finish_and_clear();

    println!();
    println!("Batch export complete:");
    println!("  Success: {}", result.success_count);
    println!("  Failed: {}", result.fail_count);

    if result.fail_count > 0 {
        println!();
        println!("Failures:");
        for msg in result.results.iter().filter(|m| !m.starts_with("Exported")) {
            println!("  {msg}");
        }
    }

    print_done(started.elapsed());
    Ok(())
}
