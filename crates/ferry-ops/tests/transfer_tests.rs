//! End-to-end tests of transfer jobs against real temporary trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ferry_core::{TransferConfig, TransferError, TransferKind, TransferNode};
use ferry_ops::{
    Collector, ConflictPolicy, CreateResponse, DecisionOracle, ErrorPolicy, JobControl,
    PolicyOracle, ProgressSink, ReplaceResponse, SkipResponse, ThumbnailCache, TransferEnv,
    TransferJob, TransferOutcome, UndoableOperation,
};
use tempfile::TempDir;

/// Oracle answering replace questions from a fixed response, counting asks.
struct CountingOracle {
    replace: ReplaceResponse,
    asks: AtomicUsize,
}

impl CountingOracle {
    fn new(replace: ReplaceResponse) -> Self {
        Self {
            replace,
            asks: AtomicUsize::new(0),
        }
    }

    fn asks(&self) -> usize {
        self.asks.load(Ordering::SeqCst)
    }
}

impl DecisionOracle for CountingOracle {
    fn ask_replace(&self, _source: &Path, _target: &Path) -> ReplaceResponse {
        self.asks.fetch_add(1, Ordering::SeqCst);
        self.replace
    }

    fn ask_skip(&self, _message: &str) -> SkipResponse {
        SkipResponse::Skip
    }

    fn ask_create(&self, _message: &str) -> CreateResponse {
        CreateResponse::Cancel
    }
}

#[derive(Default)]
struct RecordingSink {
    percents: Mutex<Vec<f64>>,
    infos: Mutex<Vec<String>>,
    new_files: Mutex<Vec<PathBuf>>,
}

impl ProgressSink for RecordingSink {
    fn percent(&self, percent: f64) {
        self.percents.lock().unwrap().push(percent);
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn new_files(&self, files: &[PathBuf]) {
        self.new_files.lock().unwrap().extend_from_slice(files);
    }
}

#[derive(Default)]
struct RecordingThumbnails {
    copies: AtomicUsize,
    moves: AtomicUsize,
    deletes: AtomicUsize,
}

impl ThumbnailCache for RecordingThumbnails {
    fn notify_copy(&self, _source: &Path, _target: &Path) {
        self.copies.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_move(&self, _source: &Path, _target: &Path) {
        self.moves.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_delete(&self, _source: &Path) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build `root/tree` with nested files.
fn make_tree(root: &Path) -> PathBuf {
    let tree = root.join("tree");
    fs::create_dir_all(tree.join("sub/deeper")).unwrap();
    fs::write(tree.join("top.txt"), "top level").unwrap();
    fs::write(tree.join("sub/mid.txt"), "middle").unwrap();
    fs::write(tree.join("sub/deeper/leaf.bin"), vec![42u8; 3000]).unwrap();
    tree
}

/// Relative paths and contents under `root`, sorted.
fn snapshot(root: &Path) -> Vec<(PathBuf, Option<Vec<u8>>)> {
    let mut entries = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            if path.is_dir() {
                entries.push((rel, None));
                stack.push(path);
            } else {
                entries.push((rel, Some(fs::read(&path).unwrap())));
            }
        }
    }
    entries.sort();
    entries
}

fn no_space_check() -> TransferConfig {
    TransferConfig::builder()
        .check_free_space(false)
        .build()
        .unwrap()
}

fn run(job: TransferJob, oracle: &dyn DecisionOracle) -> Result<TransferOutcome, TransferError> {
    job.execute(&TransferEnv::new(oracle))
}

#[test]
fn test_duplicate_names_increase() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("F.txt");
    fs::write(&file, "original").unwrap();
    let oracle = PolicyOracle::skip();

    for n in 1..=3 {
        let job = TransferJob::new(vec![file.clone()], vec![file.clone()], TransferKind::Copy).unwrap();
        let outcome = run(job, &oracle).unwrap();
        let expected = temp.path().join(format!("F (copy {n}).txt"));
        assert_eq!(outcome.new_files, vec![expected.clone()]);
        assert_eq!(fs::read_to_string(expected).unwrap(), "original");
    }

    // The smallest free number is reused
    fs::remove_file(temp.path().join("F (copy 2).txt")).unwrap();
    let job = TransferJob::new(vec![file.clone()], vec![file.clone()], TransferKind::Copy).unwrap();
    let outcome = run(job, &oracle).unwrap();
    assert_eq!(outcome.new_files, vec![temp.path().join("F (copy 2).txt")]);
}

#[test]
fn test_duplicate_directory() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());

    let job = TransferJob::new(vec![tree.clone()], vec![tree.clone()], TransferKind::Copy).unwrap();
    let outcome = run(job, &PolicyOracle::skip()).unwrap();

    let copy = temp.path().join("tree (copy 1)");
    assert_eq!(outcome.new_files, vec![copy.clone()]);
    assert_eq!(snapshot(&copy), snapshot(&tree));
}

#[test]
fn test_size_accounting() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());

    let control = JobControl::new();
    let mut collector = Collector::new(&control);
    let mut node = TransferNode::new(&tree);
    collector.collect(&mut node).unwrap();

    let expected: u64 = node
        .iter()
        .map(|n| fs::symlink_metadata(&n.source).unwrap().len())
        .sum();
    assert_eq!(collector.total_size(), expected);
    assert_eq!(node.node_count(), 6);

    let dest = temp.path().join("dest");
    let job = TransferJob::new(vec![tree], vec![dest], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    let outcome = run(job, &PolicyOracle::skip()).unwrap();
    assert_eq!(outcome.bytes_total, expected);
    assert_eq!(outcome.bytes_transferred, 9 + 6 + 3000);
}

#[test]
fn test_move_falls_back_to_copy() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());
    let before = snapshot(&tree);
    let target = temp.path().join("elsewhere/tree");
    fs::create_dir(temp.path().join("elsewhere")).unwrap();

    let thumbnails = RecordingThumbnails::default();
    let oracle = PolicyOracle::skip();
    let job = TransferJob::new(vec![tree.clone()], vec![target.clone()], TransferKind::Move)
        .unwrap()
        .with_config(TransferConfig::copy_only());
    let outcome = job
        .execute(&TransferEnv::new(&oracle).thumbnails(&thumbnails))
        .unwrap();

    assert_eq!(snapshot(&target), before);
    assert!(!tree.exists());
    assert_eq!(outcome.new_files, vec![target.clone()]);
    assert_eq!(thumbnails.copies.load(Ordering::SeqCst), 6);
    assert_eq!(thumbnails.deletes.load(Ordering::SeqCst), 6);
    assert_eq!(thumbnails.moves.load(Ordering::SeqCst), 0);
    assert_eq!(
        outcome.undo,
        Some(UndoableOperation::FilesMoved {
            moves: vec![(tree, target)]
        })
    );
}

#[test]
fn test_direct_move() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());
    let before = snapshot(&tree);
    let target = temp.path().join("renamed");

    let thumbnails = RecordingThumbnails::default();
    let sink = RecordingSink::default();
    let oracle = PolicyOracle::skip();
    let job = TransferJob::new(vec![tree.clone()], vec![target.clone()], TransferKind::Move).unwrap();
    let outcome = job
        .execute(&TransferEnv::new(&oracle).thumbnails(&thumbnails).sink(&sink))
        .unwrap();

    assert_eq!(snapshot(&target), before);
    assert!(!tree.exists());
    assert_eq!(thumbnails.moves.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.bytes_total, 0);
    assert_eq!(*sink.new_files.lock().unwrap(), vec![target]);
    assert!(sink.infos.lock().unwrap()[0].starts_with("Trying to move"));
}

#[test]
fn test_skip_leaves_source() {
    for config in [TransferConfig::default(), TransferConfig::copy_only()] {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let target = temp.path().join("b.txt");
        fs::write(&source, "source").unwrap();
        fs::write(&target, "target").unwrap();

        let job = TransferJob::new(vec![source.clone()], vec![target.clone()], TransferKind::Move)
            .unwrap()
            .with_config(config);
        let outcome = run(job, &PolicyOracle::skip()).unwrap();

        assert!(outcome.new_files.is_empty());
        assert!(outcome.undo.is_none());
        assert_eq!(fs::read_to_string(&source).unwrap(), "source");
        assert_eq!(fs::read_to_string(&target).unwrap(), "target");
    }
}

#[test]
fn test_overwrite_records_replaced_files() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.txt");
    let target = temp.path().join("b.txt");
    fs::write(&source, "new").unwrap();
    fs::write(&target, "old").unwrap();

    let job = TransferJob::new(vec![source.clone()], vec![target.clone()], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    let outcome = run(job, &PolicyOracle::overwrite()).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    let undo = outcome.undo.unwrap();
    assert!(!undo.can_undo());
    assert_eq!(
        undo,
        UndoableOperation::FilesCopied {
            created: vec![target.clone()],
            overwritten: vec![target],
        }
    );
}

#[test]
fn test_rename_on_conflict() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src/report.txt");
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(&source, "fresh").unwrap();
    let target = temp.path().join("report.txt");
    fs::write(&target, "old").unwrap();
    fs::write(temp.path().join("report (1).txt"), "older").unwrap();

    for kind in [TransferKind::Copy, TransferKind::Move] {
        let oracle = PolicyOracle::skip().with_conflicts(ConflictPolicy::Rename);
        let job = TransferJob::new(vec![source.clone()], vec![target.clone()], kind).unwrap();
        let outcome = run(job, &oracle).unwrap();

        let renamed = outcome.new_files[0].clone();
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "fresh");
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
        assert_eq!(
            fs::read_to_string(temp.path().join("report (1).txt")).unwrap(),
            "older"
        );
        if kind == TransferKind::Copy {
            assert_eq!(renamed, temp.path().join("report (2).txt"));
        } else {
            assert_eq!(renamed, temp.path().join("report (3).txt"));
            assert!(!source.exists());
        }
    }
}

#[test]
fn test_yes_all_asks_once() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dst).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(src.join(name), "new").unwrap();
        fs::write(dst.join(name), "old").unwrap();
    }

    let oracle = CountingOracle::new(ReplaceResponse::YesAll);
    let sources: Vec<_> = ["a", "b", "c"].iter().map(|n| src.join(n)).collect();
    let targets: Vec<_> = ["a", "b", "c"].iter().map(|n| dst.join(n)).collect();
    let job = TransferJob::new(sources, targets, TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    run(job, &oracle).unwrap();

    assert_eq!(oracle.asks(), 1);
    for name in ["a", "b", "c"] {
        assert_eq!(fs::read_to_string(dst.join(name)).unwrap(), "new");
    }
}

#[test]
fn test_directories_merge_without_asking() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());
    let dest = temp.path().join("dest");
    fs::create_dir_all(dest.join("sub")).unwrap();
    fs::write(dest.join("sub/existing.txt"), "keep me").unwrap();

    let oracle = CountingOracle::new(ReplaceResponse::Cancel);
    let job = TransferJob::new(vec![tree], vec![dest.clone()], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    run(job, &oracle).unwrap();

    assert_eq!(oracle.asks(), 0);
    assert_eq!(fs::read_to_string(dest.join("sub/existing.txt")).unwrap(), "keep me");
    assert_eq!(fs::read_to_string(dest.join("sub/mid.txt")).unwrap(), "middle");
}

#[test]
fn test_confirmed_replace_reaches_children() {
    let temp = TempDir::new().unwrap();
    let tree = make_tree(temp.path());
    let dest = temp.path().join("dest");
    fs::create_dir_all(dest.join("sub")).unwrap();
    fs::write(dest.join("top.txt"), "stale").unwrap();
    fs::write(dest.join("sub/mid.txt"), "stale").unwrap();

    // The rename onto a non-empty directory fails, so the copy fallback runs
    let oracle = CountingOracle::new(ReplaceResponse::Yes);
    let job = TransferJob::new(vec![tree.clone()], vec![dest.clone()], TransferKind::Move)
        .unwrap()
        .with_config(no_space_check());
    run(job, &oracle).unwrap();

    assert_eq!(oracle.asks(), 1);
    assert_eq!(fs::read_to_string(dest.join("top.txt")).unwrap(), "top level");
    assert_eq!(fs::read_to_string(dest.join("sub/mid.txt")).unwrap(), "middle");
    assert!(!tree.exists());
}

#[test]
fn test_cancel_on_conflict() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a");
    let target = temp.path().join("b");
    fs::write(&source, "a").unwrap();
    fs::write(&target, "b").unwrap();

    let oracle = PolicyOracle::skip().with_conflicts(ConflictPolicy::Cancel);
    let job = TransferJob::new(vec![source], vec![target.clone()], TransferKind::Copy).unwrap();
    let err = run(job, &oracle).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(fs::read_to_string(target).unwrap(), "b");
}

/// Cancels the job when collection of the second pair starts.
struct CancelOnSecondCollect {
    control: JobControl,
    seen: AtomicUsize,
}

impl ProgressSink for CancelOnSecondCollect {
    fn percent(&self, _percent: f64) {}

    fn info(&self, message: &str) {
        if message == "Collecting files..." && self.seen.fetch_add(1, Ordering::SeqCst) == 1 {
            self.control.cancel();
        }
    }
}

#[test]
fn test_cancel_during_collection_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let first = make_tree(temp.path());
    let second = temp.path().join("second.txt");
    fs::write(&second, "second").unwrap();
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).unwrap();

    let control = JobControl::new();
    let sink = CancelOnSecondCollect {
        control: control.clone(),
        seen: AtomicUsize::new(0),
    };
    let oracle = PolicyOracle::skip();
    let job = TransferJob::new(
        vec![first, second],
        vec![dest.join("tree"), dest.join("second.txt")],
        TransferKind::Copy,
    )
    .unwrap();
    let err = job
        .execute(&TransferEnv::new(&oracle).sink(&sink).control(control))
        .unwrap_err();

    assert!(matches!(err, TransferError::Cancelled));
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
}

#[test]
fn test_progress_is_monotonic() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    for i in 0..5 {
        fs::write(src.join(format!("f{i}")), vec![i as u8; 20_000]).unwrap();
    }

    let config = TransferConfig::builder()
        .buffer_size(1000usize)
        .check_free_space(false)
        .build()
        .unwrap();
    let sink = RecordingSink::default();
    let oracle = PolicyOracle::skip();
    let job = TransferJob::new(vec![src], vec![temp.path().join("dst")], TransferKind::Copy)
        .unwrap()
        .with_config(config);
    job.execute(&TransferEnv::new(&oracle).sink(&sink)).unwrap();

    let percents = sink.percents.lock().unwrap();
    assert!(percents.len() > 10);
    assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
    for pair in percents.windows(2) {
        assert!(pair[1] - pair[0] >= 0.01, "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn test_root_pairs_are_dropped() {
    let temp = TempDir::new().unwrap();
    let job = TransferJob::new(
        vec![PathBuf::from("/"), temp.path().to_path_buf()],
        vec![temp.path().join("x"), PathBuf::from("/")],
        TransferKind::Copy,
    )
    .unwrap();
    assert!(job.is_empty());

    let outcome = run(job, &PolicyOracle::skip()).unwrap();
    assert!(outcome.new_files.is_empty());
    assert!(outcome.undo.is_none());
}

#[test]
fn test_self_move_is_dropped() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("same.txt");
    fs::write(&file, "x").unwrap();

    let job = TransferJob::new(vec![file.clone()], vec![file.clone()], TransferKind::Move).unwrap();
    assert!(job.is_empty());
    run(job, &PolicyOracle::skip()).unwrap();
    assert_eq!(fs::read_to_string(file).unwrap(), "x");
}

#[test]
fn test_reverse_move() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.txt");
    let target = temp.path().join("b.txt");
    fs::write(&source, "payload").unwrap();

    let oracle = PolicyOracle::skip();
    let job = TransferJob::new(vec![source.clone()], vec![target.clone()], TransferKind::Move).unwrap();
    let undo = run(job, &oracle).unwrap().undo.unwrap();
    assert!(!source.exists());

    let reverse = undo.reverse_job().unwrap().unwrap();
    run(reverse, &oracle).unwrap();
    assert_eq!(fs::read_to_string(&source).unwrap(), "payload");
    assert!(!target.exists());
}

fn make_trash(root: &Path, name: &str) -> (PathBuf, PathBuf) {
    let trash = root.join("Trash");
    fs::create_dir_all(trash.join("files")).unwrap();
    fs::create_dir_all(trash.join("info")).unwrap();
    fs::write(trash.join("files").join(name), "trashed").unwrap();
    fs::write(
        trash.join("info").join(format!("{name}.trashinfo")),
        "[Trash Info]\n",
    )
    .unwrap();
    (trash.clone(), trash.join("files").join(name))
}

#[test]
fn test_restore_from_trash_creates_parent() {
    let temp = TempDir::new().unwrap();
    let (trash, trashed) = make_trash(temp.path(), "doc.txt");
    let target = temp.path().join("gone/again/doc.txt");

    let config = TransferConfig::builder()
        .trash_dirs(vec![trash.clone()])
        .build()
        .unwrap();
    let oracle = PolicyOracle::skip().with_create_parents(true);
    let job = TransferJob::new(vec![trashed.clone()], vec![target.clone()], TransferKind::Move)
        .unwrap()
        .with_config(config);
    run(job, &oracle).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "trashed");
    assert!(!trashed.exists());
    assert!(!trash.join("info/doc.txt.trashinfo").exists());
}

#[test]
fn test_restore_cancelled_when_parent_refused() {
    let temp = TempDir::new().unwrap();
    let (trash, trashed) = make_trash(temp.path(), "doc.txt");
    let target = temp.path().join("gone/doc.txt");

    let config = TransferConfig::builder()
        .trash_dirs(vec![trash.clone()])
        .build()
        .unwrap();
    let job = TransferJob::new(vec![trashed.clone()], vec![target], TransferKind::Move)
        .unwrap()
        .with_config(config);
    let err = run(job, &PolicyOracle::skip()).unwrap_err();

    assert!(err.is_cancelled());
    assert!(trashed.exists());
    assert!(!temp.path().join("gone").exists());
    assert!(trash.join("info/doc.txt.trashinfo").exists());
}

#[cfg(unix)]
fn make_fifo(path: &Path) {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);
}

#[cfg(unix)]
#[test]
fn test_unsupported_entry_is_skipped() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("a.txt"), "a").unwrap();
    make_fifo(&src.join("pipe"));
    let dst = temp.path().join("dst");

    let job = TransferJob::new(vec![src.clone()], vec![dst.clone()], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    let outcome = run(job, &PolicyOracle::skip()).unwrap();

    assert_eq!(outcome.new_files, vec![dst.clone()]);
    assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
    assert!(fs::symlink_metadata(dst.join("pipe")).is_err());

    let job = TransferJob::new(vec![src], vec![temp.path().join("dst2")], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    let oracle = PolicyOracle::skip().with_errors(ErrorPolicy::Cancel);
    assert!(run(job, &oracle).unwrap_err().is_cancelled());
}

#[cfg(unix)]
#[test]
fn test_move_keeps_source_dir_with_skipped_child() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("a.txt"), "a").unwrap();
    make_fifo(&src.join("pipe"));
    let dst = temp.path().join("dst");

    let job = TransferJob::new(vec![src.clone()], vec![dst.clone()], TransferKind::Move)
        .unwrap()
        .with_config(TransferConfig::copy_only());
    run(job, &PolicyOracle::skip()).unwrap();

    // The directory still holds the skipped entry, so removing it was skipped too
    assert!(fs::symlink_metadata(src.join("pipe")).is_ok());
    assert!(!src.join("a.txt").exists());
    assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
}

#[test]
fn test_fat_safe_names() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("what?.txt"), "q").unwrap();
    fs::write(src.join("aux.log"), "d").unwrap();

    let config = TransferConfig::builder()
        .fat_safe_names(true)
        .check_free_space(false)
        .build()
        .unwrap();
    let dst = temp.path().join("usb");
    let job = TransferJob::new(vec![src], vec![dst.clone()], TransferKind::Copy)
        .unwrap()
        .with_config(config);
    run(job, &PolicyOracle::skip()).unwrap();

    assert_eq!(fs::read_to_string(dst.join("what_.txt")).unwrap(), "q");
    assert_eq!(fs::read_to_string(dst.join("__aux.log")).unwrap(), "d");
}

#[cfg(unix)]
#[test]
fn test_overwrite_replaces_symlink_not_its_target() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.txt");
    let victim = temp.path().join("victim.txt");
    let target = temp.path().join("b.txt");
    fs::write(&source, "new").unwrap();
    fs::write(&victim, "keep").unwrap();
    std::os::unix::fs::symlink(&victim, &target).unwrap();

    let job = TransferJob::new(vec![source], vec![target.clone()], TransferKind::Copy)
        .unwrap()
        .with_config(no_space_check());
    let oracle = CountingOracle::new(ReplaceResponse::Yes);
    let outcome = run(job, &oracle).unwrap();

    assert_eq!(oracle.asks(), 1);
    assert_eq!(outcome.new_files, vec![target.clone()]);
    assert!(fs::symlink_metadata(&target).unwrap().file_type().is_file());
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    assert_eq!(fs::read_to_string(&victim).unwrap(), "keep");
}
