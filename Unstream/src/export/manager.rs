//! Export orchestration
//!
//! Each work unit is an archive plus the selection to export from it. A unit
//! is classified into jobs, the jobs run in order, and nested containers
//! found along the way push new units onto an explicit stack instead of
//! re-entering the manager.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::options::ExportOptions;
use super::paths::{build_output_path, resource_folder};
use super::types::{
    ExportJob, ExportPhase, ExportProgress, ExportReport, ExportType, JobOutcome, JobReport,
    ProgressCallback, Selection,
};
use crate::compression::Decompressor;
use crate::container::{Archive, ArchiveKind, Entry, resources};
use crate::error::Result;
use crate::reconstruct::sinks::create_parent;
use crate::reconstruct::{ImageSource, decode_compressed_blob, read_entry_bytes, reconstruct_image};
use crate::streamdb::ShardSet;

/// Type tag of a nested compressed blob that is unpacked further.
const COMPFILE_TYPE: &str = "compfile";

struct WorkUnit<'a> {
    archive: Cow<'a, Archive>,
    selection: Vec<Selection>,
    /// The archive is a temporary flat file produced by unpacking a nested
    /// container; outputs replace it.
    in_place: bool,
    depth: usize,
}

/// Runs export requests against one shard set and codec.
pub struct ExportManager<'a> {
    codec: &'a dyn Decompressor,
    shards: &'a ShardSet,
    options: ExportOptions,
}

impl<'a> ExportManager<'a> {
    #[must_use]
    pub fn new(codec: &'a dyn Decompressor, shards: &'a ShardSet, options: ExportOptions) -> Self {
        Self {
            codec,
            shards,
            options,
        }
    }

    /// Export the selected entries of `archive` under `output_root`.
    ///
    /// An empty selection is not accepted and touches nothing. Job failures
    /// are recorded in the report and never abort the request.
    ///
    /// # Errors
    /// Only errors that prevent the request as a whole are returned; there
    /// are none once the archive is open.
    pub fn export(
        &self,
        archive: &Archive,
        selection: &[Selection],
        output_root: &Path,
        progress: ProgressCallback,
    ) -> Result<ExportReport> {
        if selection.is_empty() {
            tracing::info!("Empty selection for {}, nothing to export", archive.path.display());
            return Ok(ExportReport::default());
        }

        let mut report = ExportReport {
            accepted: true,
            ..Default::default()
        };
        let mut stack = vec![WorkUnit {
            archive: Cow::Borrowed(archive),
            selection: selection.to_vec(),
            in_place: false,
            depth: 0,
        }];
        let mut queued = 0;
        let mut current = 0;

        while let Some(unit) = stack.pop() {
            progress(&ExportProgress::with_file(
                ExportPhase::Classifying,
                current,
                queued,
                unit.archive.path.to_string_lossy(),
            ));
            let jobs = self.queue_jobs(&unit, output_root, &mut report.skipped);
            queued += jobs.len();

            for job in jobs {
                if self.options.cancel.is_cancelled() {
                    tracing::info!("Export cancelled after {current} of {queued} jobs");
                    report.cancelled = true;
                    progress(&ExportProgress::new(ExportPhase::Complete, current, queued));
                    return Ok(report);
                }

                current += 1;
                progress(&ExportProgress::with_file(
                    ExportPhase::Exporting,
                    current,
                    queued,
                    job.entry.name.clone(),
                ));

                let outcome = match self.run_job(&unit, &job, &mut stack, progress) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!("Failed to export {}: {e}", job.entry.name);
                        JobOutcome::Failed(e.to_string())
                    }
                };

                report.jobs.push(JobReport {
                    name: job.entry.name,
                    export_type: job.export_type,
                    output_path: job.output_path,
                    depth: unit.depth,
                    outcome,
                });
            }
        }

        progress(&ExportProgress::new(ExportPhase::Complete, current, queued));
        tracing::info!(
            "Exported {} files ({} failed, {} skipped)",
            report.exported_count(),
            report.failed_count(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Match the unit's entries against its selection, bucketed by type.
    fn queue_jobs(&self, unit: &WorkUnit<'_>, output_root: &Path, skipped: &mut Vec<String>) -> Vec<ExportJob> {
        let mut buckets: HashMap<ExportType, HashSet<&str>> = HashMap::new();
        for selected in &unit.selection {
            buckets
                .entry(selected.export_type())
                .or_default()
                .insert(selected.name.as_str());
        }

        let folder = resource_folder(&unit.archive.path);
        let extension = self.options.texture_sink.extension();
        let mut jobs = Vec::new();

        for entry in &unit.archive.entries {
            let export_type = ExportType::of(entry);
            let selected = buckets
                .get(&export_type)
                .is_some_and(|names| names.contains(entry.name.as_str()));
            if !selected {
                continue;
            }
            if entry.is_empty() {
                tracing::debug!("Skipping {}: no payload", entry.name);
                skipped.push(entry.name.clone());
                continue;
            }

            jobs.push(ExportJob {
                output_path: build_output_path(output_root, &folder, &entry.name, export_type, extension),
                entry: entry.clone(),
                export_type,
            });
        }

        tracing::debug!(
            "{}: {} jobs at depth {}",
            unit.archive.path.display(),
            jobs.len(),
            unit.depth
        );
        jobs
    }

    fn run_job<'s>(
        &self,
        unit: &WorkUnit<'_>,
        job: &ExportJob,
        stack: &mut Vec<WorkUnit<'s>>,
        progress: ProgressCallback,
    ) -> Result<JobOutcome> {
        let source = unit.archive.path.as_path();
        let entry = &job.entry;

        match job.export_type {
            ExportType::Declaration | ExportType::Raw => {
                let data = read_entry_bytes(source, entry, self.codec)?;
                write_file(&job.output_path, &data)?;
                Ok(JobOutcome::Exported(job.output_path.clone()))
            }
            ExportType::CompressedBlob => {
                let stored = read_entry_bytes(source, entry, self.codec)?;
                let data = decode_compressed_blob(&stored, self.codec, &entry.name)?;
                let target = if unit.in_place {
                    source.to_path_buf()
                } else {
                    job.output_path.clone()
                };
                write_file(&target, &data)?;
                Ok(JobOutcome::Exported(target))
            }
            ExportType::Image => self.export_image(unit, job),
            ExportType::ModelEmbedded | ExportType::ModelStreamed => {
                let data = read_entry_bytes(source, entry, self.codec)?;
                self.options.model_sink.write(entry, &data, &job.output_path)?;
                Ok(JobOutcome::Exported(job.output_path.clone()))
            }
            ExportType::Nested => {
                progress(&ExportProgress::with_file(
                    ExportPhase::Unpacking,
                    0,
                    0,
                    entry.name.clone(),
                ));
                self.unpack_nested(unit, job, stack)
            }
        }
    }

    fn export_image(&self, unit: &WorkUnit<'_>, job: &ExportJob) -> Result<JobOutcome> {
        let source = unit.archive.path.as_path();
        let entry = &job.entry;
        let sink = &self.options.texture_sink;

        if unit.in_place {
            let data = fs::read(source)?;
            let split = (entry.data_size as usize).min(data.len());
            let (header, trailing) = data.split_at(split);
            let image_source = if trailing.is_empty() {
                ImageSource::Streamed {
                    shards: self.shards,
                    stream_hash: entry.stream_hash,
                }
            } else {
                ImageSource::InPlace { trailing }
            };

            let image = reconstruct_image(header, &image_source, self.codec, &entry.name)?;
            let target = source.with_extension(sink.extension());
            fs::remove_file(source)?;
            sink.write(image, &target)?;
            return Ok(JobOutcome::Exported(target));
        }

        let header = read_entry_bytes(source, entry, self.codec)?;
        let image_source = ImageSource::Streamed {
            shards: self.shards,
            stream_hash: entry.stream_hash,
        };
        let image = reconstruct_image(&header, &image_source, self.codec, &entry.name)?;
        sink.write(image, &job.output_path)?;
        Ok(JobOutcome::Exported(job.output_path.clone()))
    }

    /// Write a nested container to its output path, then decide from its
    /// first sub-entry whether to unpack it further.
    fn unpack_nested<'s>(
        &self,
        unit: &WorkUnit<'_>,
        job: &ExportJob,
        stack: &mut Vec<WorkUnit<'s>>,
    ) -> Result<JobOutcome> {
        let path = &job.output_path;
        let data = read_entry_bytes(&unit.archive.path, &job.entry, self.codec)?;
        write_file(path, &data)?;

        if self.options.max_depth.is_some_and(|max| unit.depth >= max) {
            tracing::debug!("Not unpacking {}: depth limit reached", job.entry.name);
            return Ok(JobOutcome::Exported(path.clone()));
        }

        let sub_entries = resources::parse(path)?;
        let Some(first) = sub_entries.first() else {
            tracing::debug!("{} holds no sub-entries", job.entry.name);
            return Ok(JobOutcome::Exported(path.clone()));
        };

        let split_asset = matches!(first.version, 21 | 67);
        let unpack = split_asset || (first.version == 1 && first.type_name == COMPFILE_TYPE);

        if unpack {
            let mut combined = read_entry_bytes(path, first, self.codec)?;
            if split_asset && let Some(second) = sub_entries.get(1) {
                combined.extend(read_entry_bytes(path, second, self.codec)?);
            }
            write_file(path, &combined)?;

            let flat = Entry {
                data_offset: 0,
                data_size: first.data_size_uncompressed,
                ..first.clone()
            };
            let selection = vec![Selection::new(flat.name.clone(), flat.version, false)];
            stack.push(WorkUnit {
                archive: Cow::Owned(Archive::from_entries(
                    path.clone(),
                    ArchiveKind::Resources,
                    vec![flat],
                )),
                selection,
                in_place: true,
                depth: unit.depth + 1,
            });
            return Ok(JobOutcome::Unpacked(path.clone()));
        }

        if sub_entries.len() == 1 {
            let payload = read_entry_bytes(path, first, self.codec)?;
            write_file(path, &payload)?;
        }
        Ok(JobOutcome::Exported(path.clone()))
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    create_parent(path)?;
    fs::write(path, data)?;
    Ok(())
}

/// Select every entry of `entries` that has a payload.
#[must_use]
pub fn select_all(entries: &[Entry]) -> Vec<Selection> {
    entries
        .iter()
        .filter(|e| !e.is_empty())
        .map(Selection::of)
        .collect()
}

/// Select entries by name, keeping each entry's own type.
#[must_use]
pub fn select_names(entries: &[Entry], names: &[&str]) -> Vec<Selection> {
    entries
        .iter()
        .filter(|e| names.contains(&e.name.as_str()))
        .map(Selection::of)
        .collect()
}
