//! Split/merge/verify against real temp directories.

use splitmerge::engine::{digest_file, digest_hex};
use splitmerge::{
    CancelToken, ChunkError, ManifestPolicy, MergeOpts, PartSize, SplitOpts, merge_chunks,
    split_file, verify_chunks,
};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "hashes.sha256";

fn split_opts(part_size: u64) -> SplitOpts {
    SplitOpts {
        part_size,
        min_part_size: 1,
        num_workers: Some(4),
        ..Default::default()
    }
}

fn merge_opts() -> MergeOpts {
    MergeOpts {
        num_workers: Some(4),
        ..Default::default()
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Write `len` bytes to `<tmp>/input.bin` and return (input path, chunk dir).
fn fixture(tmp: &Path, len: usize) -> (PathBuf, PathBuf) {
    let input = tmp.join("input.bin");
    fs::write(&input, pattern(len)).unwrap();
    (input, tmp.join("chunks"))
}

fn chunk_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("part_"))
        .collect();
    names.sort();
    names
}

// --- round trip ---

#[test]
fn test_round_trip_various_sizes() {
    for (len, part) in [(1, 7), (100, 7), (4096, 1000), (10_000, 333), (5000, 5000)] {
        let tmp = tempfile::tempdir().unwrap();
        let (input, chunks) = fixture(tmp.path(), len);
        let output = tmp.path().join("merged.bin");

        split_file(&input, &chunks, &split_opts(part)).unwrap();
        merge_chunks(&chunks, &output, &merge_opts()).unwrap();

        assert_eq!(fs::read(&output).unwrap(), pattern(len), "len={len} part={part}");
        assert_eq!(digest_file(&input).unwrap(), digest_file(&output).unwrap());
    }
}

#[test]
fn test_round_trip_more_than_ten_chunks() {
    // part_10 and part_11 must come after part_2, not lexically before it.
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1200);
    let output = tmp.path().join("merged.bin");

    let summary = split_file(&input, &chunks, &split_opts(100)).unwrap();
    assert_eq!(summary.chunk_count, 12);
    let merged = merge_chunks(&chunks, &output, &merge_opts()).unwrap();
    assert_eq!(merged.chunk_count, 12);
    assert_eq!(merged.total_bytes, 1200);
    assert_eq!(fs::read(&output).unwrap(), pattern(1200));
}

#[test]
fn test_round_trip_single_worker() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 2048);
    let output = tmp.path().join("merged.bin");
    let opts = SplitOpts {
        num_workers: Some(1),
        ..split_opts(128)
    };
    split_file(&input, &chunks, &opts).unwrap();
    let mopts = MergeOpts {
        num_workers: Some(1),
        ..merge_opts()
    };
    merge_chunks(&chunks, &output, &mopts).unwrap();
    assert_eq!(fs::read(&output).unwrap(), pattern(2048));
}

#[test]
fn test_empty_file_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 0);
    let output = tmp.path().join("merged.bin");

    let summary = split_file(&input, &chunks, &split_opts(64)).unwrap();
    assert_eq!(summary.chunk_count, 0);
    assert_eq!(fs::read_to_string(chunks.join(MANIFEST)).unwrap(), "");

    merge_chunks(&chunks, &output, &merge_opts()).unwrap();
    assert_eq!(fs::read(&output).unwrap().len(), 0);
    assert!(!chunks.join(MANIFEST).exists());
}

// --- chunk-size boundary ---

#[test]
fn test_exact_multiple_has_no_trailing_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1024);

    let summary = split_file(&input, &chunks, &split_opts(256)).unwrap();
    assert_eq!(summary.chunk_count, 4);
    assert_eq!(chunk_names(&chunks).len(), 4);
    for i in 0..4 {
        assert_eq!(fs::metadata(chunks.join(format!("part_{i}"))).unwrap().len(), 256);
    }
}

#[test]
fn test_one_extra_byte_adds_small_final_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1025);

    let summary = split_file(&input, &chunks, &split_opts(256)).unwrap();
    assert_eq!(summary.chunk_count, 5);
    assert_eq!(fs::metadata(chunks.join("part_4")).unwrap().len(), 1);
    assert_eq!(fs::read(chunks.join("part_4")).unwrap(), vec![pattern(1025)[1024]]);
}

#[test]
fn test_chunk_contents_match_source_slices() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    split_file(&input, &chunks, &split_opts(300)).unwrap();

    let data = pattern(1000);
    for (i, slice) in data.chunks(300).enumerate() {
        assert_eq!(fs::read(chunks.join(format!("part_{i}"))).unwrap(), slice);
    }
}

#[test]
fn test_part_size_clamped_to_minimum() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 250);
    let opts = SplitOpts {
        part_size: 10,
        min_part_size: 100,
        ..split_opts(10)
    };
    assert_eq!(opts.part_size(), PartSize::clamped(100, 100));

    let summary = split_file(&input, &chunks, &opts).unwrap();
    assert_eq!(summary.part_size.get(), 100);
    assert_eq!(summary.chunk_count, 3);
}

#[test]
fn test_default_minimum_is_one_mebibyte() {
    let opts = SplitOpts {
        part_size: 4096,
        ..Default::default()
    };
    assert_eq!(opts.part_size().get(), 1 << 20);
    assert_eq!(PartSize::clamped(0, 0).get(), 1);
    assert_eq!(PartSize::clamped(30 << 20, 1 << 20).get(), 30 << 20);
}

// --- manifest written by split ---

#[test]
fn test_manifest_lines_ascending_with_matching_digests() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1100);
    let summary = split_file(&input, &chunks, &split_opts(100)).unwrap();
    assert_eq!(summary.manifest_path, chunks.join(MANIFEST));

    let text = fs::read_to_string(chunks.join(MANIFEST)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    for (i, line) in lines.iter().enumerate() {
        let (digest, name) = line.split_once("  ").unwrap();
        assert_eq!(name, format!("part_{i}"));
        assert_eq!(digest.len(), 64);
        let bytes = fs::read(chunks.join(name)).unwrap();
        assert_eq!(digest, digest_hex(&bytes));
    }
    assert!(!chunks.join(format!("{MANIFEST}.tmp")).exists());
}

#[test]
fn test_split_creates_destination_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, _) = fixture(tmp.path(), 10);
    let nested = tmp.path().join("a").join("b");
    split_file(&input, &nested, &split_opts(4)).unwrap();
    assert_eq!(chunk_names(&nested).len(), 3);
}

// --- tamper detection ---

#[test]
fn test_tampered_chunk_fails_merge_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(200)).unwrap();

    let victim = chunks.join("part_1");
    let mut bytes = fs::read(&victim).unwrap();
    bytes[17] ^= 0x01;
    fs::write(&victim, bytes).unwrap();

    let err = merge_chunks(&chunks, &output, &merge_opts()).unwrap_err();
    assert!(err.is_verification());
    match err.root() {
        ChunkError::DigestMismatch { name, .. } => assert_eq!(name, "part_1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
    assert!(!tmp.path().join("merged.bin.tmp").exists());
    // Failed merge leaves everything in place.
    assert!(chunks.join(MANIFEST).exists());
    assert_eq!(chunk_names(&chunks).len(), 5);
}

#[test]
fn test_verify_detects_tampering() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 600);
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    fs::write(chunks.join("part_5"), b"not the original").unwrap();

    let err = verify_chunks(&chunks, &merge_opts()).unwrap_err();
    assert!(matches!(err.root(), ChunkError::DigestMismatch { .. }));
}

// --- manifest completeness ---

#[test]
fn test_chunk_without_manifest_entry_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 500);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let manifest = chunks.join(MANIFEST);
    let kept: String = fs::read_to_string(&manifest)
        .unwrap()
        .lines()
        .filter(|l| !l.ends_with("  part_2"))
        .map(|l| format!("{l}\n"))
        .collect();
    fs::write(&manifest, kept).unwrap();

    let err = merge_chunks(&chunks, &output, &merge_opts()).unwrap_err();
    assert!(err.is_verification());
    match err.root() {
        ChunkError::MissingDigest { name } => assert_eq!(name, "part_2"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_gap_in_chunk_indices_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 500);
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    fs::remove_file(chunks.join("part_1")).unwrap();

    let err = merge_chunks(&chunks, &tmp.path().join("out"), &merge_opts()).unwrap_err();
    match err {
        ChunkError::MissingChunk { name } => assert_eq!(name, "part_1"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_last_chunk_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 500);
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    fs::remove_file(chunks.join("part_4")).unwrap();

    let err = merge_chunks(&chunks, &tmp.path().join("out"), &merge_opts()).unwrap_err();
    match err {
        ChunkError::MissingChunk { name } => assert_eq!(name, "part_4"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_manifest_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 500);
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    fs::remove_file(chunks.join(MANIFEST)).unwrap();

    let err = merge_chunks(&chunks, &tmp.path().join("out"), &merge_opts()).unwrap_err();
    assert!(matches!(err, ChunkError::Io { .. }));
    assert_eq!(chunk_names(&chunks).len(), 5);
}

#[test]
fn test_unrelated_files_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 300);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    fs::write(chunks.join("notes.txt"), b"hello").unwrap();
    fs::write(chunks.join("part_x"), b"not a chunk").unwrap();

    merge_chunks(&chunks, &output, &merge_opts()).unwrap();
    assert_eq!(fs::read(&output).unwrap(), pattern(300));
    assert!(chunks.join("notes.txt").exists());
    assert!(chunks.join("part_x").exists());
}

// --- manifest policy ---

#[test]
fn test_malformed_manifest_line_strict_vs_lenient() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 300);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let manifest = chunks.join(MANIFEST);
    let mut text = fs::read_to_string(&manifest).unwrap();
    text.push_str("this line is junk\n");
    fs::write(&manifest, text).unwrap();

    let err = merge_chunks(&chunks, &output, &merge_opts()).unwrap_err();
    assert!(matches!(err, ChunkError::ManifestCorrupt { line: 4, .. }));
    assert!(!output.exists());

    let lenient = MergeOpts {
        manifest_policy: ManifestPolicy::Lenient,
        ..merge_opts()
    };
    merge_chunks(&chunks, &output, &lenient).unwrap();
    assert_eq!(fs::read(&output).unwrap(), pattern(300));
}

// --- cleanup ---

#[test]
fn test_successful_merge_removes_chunks_and_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 800);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let summary = merge_chunks(&chunks, &output, &merge_opts()).unwrap();
    assert_eq!(summary.cleanup_failures, 0);
    assert_eq!(summary.output_path, output);
    assert!(chunk_names(&chunks).is_empty());
    assert!(!chunks.join(MANIFEST).exists());
}

#[test]
fn test_keep_chunks_skips_cleanup() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 800);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let opts = MergeOpts {
        keep_chunks: true,
        ..merge_opts()
    };
    merge_chunks(&chunks, &output, &opts).unwrap();
    assert_eq!(chunk_names(&chunks).len(), 8);
    assert!(chunks.join(MANIFEST).exists());

    // Chunks are still good for a second merge.
    let again = tmp.path().join("again.bin");
    merge_chunks(&chunks, &again, &merge_opts()).unwrap();
    assert_eq!(fs::read(&again).unwrap(), pattern(800));
}

#[cfg(unix)]
#[test]
fn test_cleanup_failure_does_not_fail_merge() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 600);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    // Read-only directory: chunks stay readable but cannot be unlinked.
    fs::set_permissions(&chunks, fs::Permissions::from_mode(0o555)).unwrap();
    let enforced = fs::write(chunks.join("write_check"), b"").is_err();
    if !enforced {
        // Running with CAP_DAC_OVERRIDE (e.g. root): permissions cannot make removal fail.
        fs::set_permissions(&chunks, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = merge_chunks(&chunks, &output, &merge_opts());
    fs::set_permissions(&chunks, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = result.unwrap();
    assert_eq!(summary.cleanup_failures, 7);
    assert_eq!(fs::read(&output).unwrap(), pattern(600));
    assert_eq!(chunk_names(&chunks).len(), 6);
    assert!(chunks.join(MANIFEST).exists());
}

#[test]
fn test_verify_has_no_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 750);
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let summary = verify_chunks(&chunks, &merge_opts()).unwrap();
    assert_eq!(summary.chunk_count, 8);
    assert_eq!(summary.total_bytes, 750);
    assert_eq!(chunk_names(&chunks).len(), 8);
    assert!(chunks.join(MANIFEST).exists());
}

// --- split failures ---

#[test]
fn test_split_missing_source_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let chunks = tmp.path().join("chunks");
    let err = split_file(&tmp.path().join("nope.bin"), &chunks, &split_opts(10)).unwrap_err();
    assert!(matches!(err, ChunkError::Io { .. }));
    assert!(!chunks.exists());
}

#[test]
fn test_failed_chunk_write_rolls_back_split() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    // A directory where part_2 should go makes that write fail.
    fs::create_dir_all(chunks.join("part_2")).unwrap();

    let err = split_file(&input, &chunks, &split_opts(100)).unwrap_err();
    match err.root() {
        ChunkError::Io { path, .. } => assert_eq!(path, &chunks.join("part_2")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!chunks.join(MANIFEST).exists());
    assert!(!chunks.join(format!("{MANIFEST}.tmp")).exists());
    assert_eq!(chunk_names(&chunks), vec!["part_2".to_string()]);
}

#[test]
fn test_manifest_write_failure_rolls_back_split() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    let temp = chunks.join(format!("{MANIFEST}.tmp"));
    // Every chunk writes fine; the manifest temp file cannot be created.
    fs::create_dir_all(&temp).unwrap();

    let err = split_file(&input, &chunks, &split_opts(100)).unwrap_err();
    match &err {
        ChunkError::Io { path, .. } => assert_eq!(path, &temp),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(chunk_names(&chunks).is_empty());
    assert!(!chunks.join(MANIFEST).exists());
}

#[test]
fn test_failed_split_over_old_set_removes_its_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    split_file(&input, &chunks, &split_opts(100)).unwrap();
    assert!(chunks.join(MANIFEST).exists());

    let other = tmp.path().join("other.bin");
    fs::write(&other, vec![7u8; 450]).unwrap();
    fs::create_dir_all(chunks.join(format!("{MANIFEST}.tmp"))).unwrap();

    split_file(&other, &chunks, &split_opts(100)).unwrap_err();
    assert!(!chunks.join(MANIFEST).exists());
    // Old part_5..part_9 were never touched by the failed split.
    assert_eq!(chunk_names(&chunks).len(), 5);
    let err = verify_chunks(&chunks, &merge_opts()).unwrap_err();
    assert!(matches!(err, ChunkError::Io { .. }));
}

#[test]
fn test_cancelled_split_leaves_nothing_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 1000);
    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = SplitOpts {
        cancel,
        ..split_opts(100)
    };

    let err = split_file(&input, &chunks, &opts).unwrap_err();
    assert!(err.is_cancelled());
    assert!(chunk_names(&chunks).is_empty());
    assert!(!chunks.join(MANIFEST).exists());
}

#[test]
fn test_cancelled_merge_keeps_chunks() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, chunks) = fixture(tmp.path(), 500);
    let output = tmp.path().join("merged.bin");
    split_file(&input, &chunks, &split_opts(100)).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = MergeOpts {
        cancel,
        ..merge_opts()
    };
    let err = merge_chunks(&chunks, &output, &opts).unwrap_err();
    assert!(err.is_cancelled());
    assert!(!output.exists());
    assert_eq!(chunk_names(&chunks).len(), 5);
    assert!(chunks.join(MANIFEST).exists());
}
