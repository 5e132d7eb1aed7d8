mod common;

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use unstream::export::{ExportPhase, ExportProgress};
use unstream::prelude::*;
use unstream::reconstruct::comp::encode_compressed_blob;
use unstream::reconstruct::image::build_image_header;
use unstream::streamdb::build_streamdb;

use common::{
    ContainerEntry, IndexFile, build_container, build_pk5, build_wad7, dds_len, rgba_pixels,
    streamed_image_header, write,
};

const IMAGE_HASH: u64 = 0x0123_4567_89AB_CDEF;
const ENTITIES: &[u8] = b"entity { classname = \"info_player_start\" }";

/// Declaration without payload, stored compressed blob, streamed image.
fn scenario_archive(dir: &Path) -> PathBuf {
    write(
        dir,
        "base/e1m1_intro.resources",
        &build_container(&[
            ContainerEntry::empty("generated/decls/weapon/shotgun.decl", "rs_streamfile", 0),
            ContainerEntry::stored(
                "maps/e1m1_intro.entities",
                "compfile",
                1,
                encode_compressed_blob(ENTITIES, ENTITIES.len(), false),
            ),
            ContainerEntry::stored("art/wall.tga", "image", 21, streamed_image_header())
                .with_stream_hash(IMAGE_HASH),
        ]),
    )
}

fn pixel_shard(dir: &Path, key: u64) -> PathBuf {
    let packed = lz4_flex::block::compress(&rgba_pixels());
    write(dir, "base/e1m1_intro.streamdb", &build_streamdb(&[(key, &packed)]))
}

fn no_progress() -> impl Fn(&ExportProgress) + Sync + Send {
    |_| {}
}

#[test]
fn test_export_scenario() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let shard = pixel_shard(dir.path(), stream_key(IMAGE_HASH, 1));
    let out = dir.path().join("out");

    let session = ResourceSession::open(&archive, &[&shard]).unwrap();
    let selection: Vec<Selection> = session.entries().iter().map(Selection::of).collect();
    let report = session
        .export(&selection, &out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();

    assert!(report.accepted);
    assert!(report.is_complete());
    assert_eq!(report.exported_count(), 2);
    assert_eq!(report.skipped, vec!["generated/decls/weapon/shotgun.decl".to_string()]);

    let entities = out.join("e1m1_intro/maps/e1m1_intro.entities");
    assert_eq!(fs::read(entities).unwrap(), ENTITIES);

    let dds = fs::read(out.join("e1m1_intro/art/wall.tga.dds")).unwrap();
    assert_eq!(dds.len() as u64, dds_len(64));
    assert_eq!(&dds[..4], b"DDS ");
    assert!(dds.ends_with(&rgba_pixels()));

    assert!(!out.join("e1m1_intro/generated").exists());
}

#[test]
fn test_empty_selection_is_not_accepted() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let out = dir.path().join("out");

    let session = ResourceSession::open(&archive, &[] as &[PathBuf]).unwrap();
    let report = session
        .export(&[], &out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();

    assert!(!report.accepted);
    assert!(report.jobs.is_empty());
    assert!(!out.exists());
}

#[test]
fn test_retry_key_resolves() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let shard = pixel_shard(dir.path(), stream_key(IMAGE_HASH, 1) - 1);
    let out = dir.path().join("out");

    let session = ResourceSession::open(&archive, &[&shard]).unwrap();
    let report = session
        .export_names(&["art/wall.tga"], &out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();

    assert_eq!(report.failed_count(), 0);
    assert!(out.join("e1m1_intro/art/wall.tga.dds").is_file());
}

#[test]
fn test_resolution_miss_fails_only_that_job() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let shard = pixel_shard(dir.path(), stream_key(IMAGE_HASH, 1) + 1);
    let out = dir.path().join("out");

    let session = ResourceSession::open(&archive, &[&shard]).unwrap();
    let report = session
        .export_all(&out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();

    assert!(report.accepted);
    assert_eq!(report.exported_count(), 1);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "art/wall.tga");
    assert!(failures[0].1.contains("art/wall.tga"));
    assert!(out.join("e1m1_intro/maps/e1m1_intro.entities").is_file());
    assert!(!out.join("e1m1_intro/art/wall.tga.dds").exists());
}

#[test]
fn test_shards_discovered_from_package_map() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    pixel_shard(dir.path(), stream_key(IMAGE_HASH, 1));
    write(
        dir.path(),
        "base/packagemapspec.json",
        br#"{
            "files": [{"name": "e1m1_intro.resources"}, {"name": "e1m1_intro.streamdb"}],
            "mapFileRefs": [{"file": 0, "map": 0}, {"file": 1, "map": 0}],
            "maps": [{"name": "e1m1_intro"}]
        }"#,
    );

    let session = ResourceSession::open_discover(&archive, None, &[]).unwrap();
    assert_eq!(session.shards().len(), 1);

    let out = dir.path().join("out");
    let report = session
        .export_all(&out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();
    assert!(report.is_complete());
    assert!(out.join("e1m1_intro/art/wall.tga.dds").is_file());
}

#[test]
fn test_stored_payloads_export_without_codec() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let out = dir.path().join("out");

    let session = ResourceSession::open(&archive, &[] as &[PathBuf]).unwrap();
    let report = session
        .export_names(
            &["maps/e1m1_intro.entities"],
            &out,
            &Unavailable::default(),
            ExportOptions::default(),
            &no_progress(),
        )
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(fs::read(out.join("e1m1_intro/maps/e1m1_intro.entities")).unwrap(), ENTITIES);
}

#[test]
fn test_cancel_between_jobs() {
    let dir = tempdir().unwrap();
    let archive = scenario_archive(dir.path());
    let shard = pixel_shard(dir.path(), stream_key(IMAGE_HASH, 1));
    let out = dir.path().join("out");

    let cancel = CancelFlag::new();
    let options = ExportOptions::new().with_cancel(cancel.clone());
    let session = ResourceSession::open(&archive, &[&shard]).unwrap();
    let report = session
        .export_all(&out, &Lz4Block, options, &|progress: &ExportProgress| {
            if progress.phase == ExportPhase::Exporting {
                cancel.cancel();
            }
        })
        .unwrap();

    assert!(report.accepted);
    assert!(report.cancelled);
    assert_eq!(report.jobs.len(), 1);
    assert!(!report.is_complete());
}

// =============================================================================
// Index archives and nested containers
// =============================================================================

fn nested_image() -> Vec<u8> {
    let header = build_image_header(4, 4, 3, false, 0, &[(4, 4, 64, 64)]);
    build_container(&[
        ContainerEntry::stored("wall", "image", 21, header),
        ContainerEntry::stored("wall_mip0", "image", 21, rgba_pixels()),
    ])
}

fn nested_compfile() -> Vec<u8> {
    let packed = lz4_flex::block::compress(ENTITIES);
    build_container(&[ContainerEntry::stored(
        "game",
        "compfile",
        1,
        encode_compressed_blob(&packed, ENTITIES.len(), true),
    )])
}

fn index_files() -> Vec<IndexFile> {
    vec![
        IndexFile::new("decls/weapon.decl", b"declType( weapon ) {}".to_vec()),
        IndexFile::new("textures/wall.bimage", nested_image()),
        IndexFile::new("maps/game.entities", nested_compfile()),
        IndexFile::new("textures/unused.bimage", build_container(&[])),
    ]
}

#[test]
fn test_pk5_and_wad7_classify_identically() {
    let dir = tempdir().unwrap();
    let pk5 = write(dir.path(), "gen.pk5", &build_pk5(&index_files()));
    let wad7 = write(dir.path(), "gen.wad7", &build_wad7(&index_files()));

    let summarize = |path: &Path| -> Vec<(String, String, u32, bool, bool)> {
        Archive::open(path)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| (e.name, e.type_name, e.version, e.nested, e.placeholder))
            .collect()
    };

    let from_pk5 = summarize(&pk5);
    assert_eq!(from_pk5, summarize(&wad7));
    assert_eq!(
        from_pk5,
        vec![
            ("decls/weapon.decl".to_string(), "rs_streamfile".to_string(), 0, false, false),
            ("textures/wall.bimage".to_string(), "image".to_string(), 21, true, false),
            ("maps/game.entities".to_string(), "compfile".to_string(), 1, true, false),
            ("textures/unused.bimage".to_string(), "Empty File".to_string(), 9999, false, true),
        ]
    );
}

#[test]
fn test_malformed_nested_headers_degrade_identically() {
    let empty_first = build_container(&[
        ContainerEntry::empty("a.bimage", "image", 21),
        ContainerEntry::stored("b.bimage", "image", 21, vec![1, 2, 3]),
    ]);

    // addr_entries near u64::MAX
    let mut bad_records = build_container(&[ContainerEntry::stored("c.bimage", "image", 21, vec![4; 8])]);
    bad_records[0x50..0x58].copy_from_slice(&(u64::MAX - 0x10).to_le_bytes());

    // path tuple index of the first record out of range
    let mut bad_index = build_container(&[ContainerEntry::stored("d.bimage", "image", 21, vec![5; 8])]);
    bad_index[0x7C..0x84].copy_from_slice(&u64::MAX.to_le_bytes());

    let files = || {
        vec![
            IndexFile::new("decls/weapon.decl", b"declType( weapon ) {}".to_vec()),
            IndexFile::new("textures/empty_first.bimage", empty_first.clone()),
            IndexFile::new("textures/bad_records.bimage", bad_records.clone()),
            IndexFile::new("textures/bad_index.bimage", bad_index.clone()),
        ]
    };

    let dir = tempdir().unwrap();
    let pk5 = write(dir.path(), "gen.pk5", &build_pk5(&files()));
    let wad7 = write(dir.path(), "gen.wad7", &build_wad7(&files()));

    let summarize = |path: &Path| -> Vec<(String, String, u32, bool, bool)> {
        Archive::open(path)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| (e.name, e.type_name, e.version, e.nested, e.placeholder))
            .collect()
    };

    let from_pk5 = summarize(&pk5);
    assert_eq!(from_pk5, summarize(&wad7));
    assert_eq!(
        from_pk5,
        vec![
            ("decls/weapon.decl".to_string(), "rs_streamfile".to_string(), 0, false, false),
            ("textures/empty_first.bimage".to_string(), "Empty File".to_string(), 9999, false, true),
            ("textures/bad_records.bimage".to_string(), "raw".to_string(), 999, false, false),
            ("textures/bad_index.bimage".to_string(), "raw".to_string(), 999, false, false),
        ]
    );
}

#[test]
fn test_nested_containers_unpack() {
    let dir = tempdir().unwrap();
    let pk5 = write(dir.path(), "gen.pk5", &build_pk5(&index_files()));
    let out = dir.path().join("out");

    let session = ResourceSession::open(&pk5, &[] as &[PathBuf]).unwrap();
    let selection: Vec<Selection> = session.entries().iter().map(Selection::of).collect();
    let report = session
        .export(&selection, &out, &Lz4Block, ExportOptions::default(), &no_progress())
        .unwrap();

    assert_eq!(report.failed_count(), 0);
    assert_eq!(report.skipped, vec!["textures/unused.bimage".to_string()]);

    assert_eq!(
        fs::read(out.join("gen/decls/weapon.decl")).unwrap(),
        b"declType( weapon ) {}"
    );

    // Header and continuation are joined, then rebuilt as a DDS
    let dds = fs::read(out.join("gen/textures/wall.dds")).unwrap();
    assert_eq!(dds.len() as u64, dds_len(64));
    assert!(dds.ends_with(&rgba_pixels()));
    assert!(!out.join("gen/textures/wall.bimage").exists());

    // The compressed blob replaces its container in place
    assert_eq!(fs::read(out.join("gen/maps/game.entities")).unwrap(), ENTITIES);

    let unpacked = report
        .jobs
        .iter()
        .filter(|job| matches!(job.outcome, JobOutcome::Unpacked(_)))
        .count();
    assert_eq!(unpacked, 2);
    assert!(report.jobs.iter().any(|job| job.depth == 1));
}

#[test]
fn test_depth_limit_keeps_container() {
    let dir = tempdir().unwrap();
    let pk5 = write(dir.path(), "gen.pk5", &build_pk5(&index_files()));
    let out = dir.path().join("out");

    let session = ResourceSession::open(&pk5, &[] as &[PathBuf]).unwrap();
    let report = session
        .export_names(
            &["textures/wall.bimage"],
            &out,
            &Lz4Block,
            ExportOptions::new().with_max_depth(Some(0)),
            &no_progress(),
        )
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(fs::read(out.join("gen/textures/wall.bimage")).unwrap(), nested_image());
}

#[test]
fn test_batch_export() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("mods");
    write(&source, "a/gen.pk5", &build_pk5(&index_files()[..1]));
    write(
        &source,
        "b/meta.resources",
        &build_container(&[ContainerEntry::packed(
            "strings/english.lang",
            "lang",
            5,
            b"#str_intro \"Welcome\"",
        )]),
    );
    write(&source, "b/readme.txt", b"not an archive");

    let archives = find_archives(&source);
    assert_eq!(archives.len(), 2);

    let out = dir.path().join("out");
    let result = batch_export(&archives, &out, &Lz4Block, &ExportOptions::default(), None, &[], |_| {});

    assert_eq!(result.success_count, 2);
    assert_eq!(result.fail_count, 0);
    assert!(out.join("gen/decls/weapon.decl").is_file());
    assert_eq!(
        fs::read(out.join("meta/strings/english.lang")).unwrap(),
        b"#str_intro \"Welcome\""
    );
}
