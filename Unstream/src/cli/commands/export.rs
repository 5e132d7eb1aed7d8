//! CLI command for exporting archive entries

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;

use super::list::entry_matches;
use super::{CodecArgs, base_dir, load_codec};
use crate::cli::progress::{DISK, LINK, LOOKING_GLASS, print_done, print_step, simple_bar, update_bar};
use crate::config::Config;
use crate::export::{ExportOptions, ExportReport, Selection, select_all};
use crate::session::ResourceSession;

pub fn execute(
    source: &Path,
    destination: Option<&Path>,
    filter: Option<&str>,
    file: Option<&str>,
    shards: &[PathBuf],
    codec_args: &CodecArgs,
    max_depth: Option<usize>,
    show_progress: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let destination = destination
        .or(config.output_dir.as_deref())
        .context("no output directory given (use --destination or `unstream config set --output`)")?;

    print_step(1, 3, LOOKING_GLASS, &format!("Reading {}...", source.display()));
    let session = if shards.is_empty() {
        ResourceSession::open_discover(
            source,
            base_dir(codec_args.base.as_deref(), config),
            &config.priority_shards,
        )?
    } else {
        ResourceSession::open(source, shards)?
    };

    print_step(
        2,
        3,
        LINK,
        &format!("{} entries, {} shards", session.entries().len(), session.shards().len()),
    );

    let selection: Vec<Selection> = match (filter, file) {
        (Some(pattern), _) => session
            .entries()
            .iter()
            .filter(|e| !e.is_empty() && entry_matches(pattern, e))
            .map(Selection::of)
            .collect(),
        (None, Some(name)) => {
            let entry = session
                .archive()
                .find(name)
                .with_context(|| format!("no entry named {name}"))?;
            vec![Selection::of(entry)]
        }
        (None, None) => select_all(session.entries()),
    };

    if selection.is_empty() {
        println!("No matching entries");
        return Ok(());
    }

    let codec = load_codec(codec_args, config);
    let options = ExportOptions::new().with_max_depth(max_depth);

    print_step(3, 3, DISK, &format!("Exporting {} entries...", selection.len()));
    let pb = simple_bar(selection.len() as u64, "Exporting");
    if !show_progress {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let report = session.export(&selection, destination, codec.as_ref(), options, &|progress| {
        update_bar(&pb, progress);
    })?;
    pb.finish_and_clear();

    print_summary(&report);
    print_done(started.elapsed());
    Ok(())
}

fn print_summary(report: &ExportReport) {
    println!();
    println!("Export complete:");
    println!("  Exported: {}", report.exported_count());
    println!("  Skipped (empty): {}", report.skipped.len());
    println!("  Failed: {}", report.failed_count());
    if report.cancelled {
        println!("  Cancelled before all jobs ran");
    }

    let failures = report.failures();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for (name, message) in failures {
            println!("  {name}: {message}");
        }
    }
}
