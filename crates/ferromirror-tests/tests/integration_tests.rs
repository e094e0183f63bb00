//! Integration tests for FerroMirror
//!
//! These tests drive full snapshot, diff and apply cycles against real
//! temporary directories.

use ferromirror_config::ConfigBuilder;
use ferromirror_sync::{
    Applier, ChangeSet, Scheduler, SchedulerState, SnapshotBuilder, SyncEngine,
};
use ferromirror_tests::test_utils::{
    generate_content, read_dirs, read_tree, write_tree, MirrorFixture,
};
use ferromirror_types::FileIdentity;
use filetime::FileTime;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_new_file_is_created() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("a.txt", b"hi")])?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(report.added, 1);
    assert_eq!(fs::read(fixture.replica.join("a.txt"))?, b"hi");
    assert_eq!(fixture.log_messages(), vec!["File: a.txt was created"]);
    Ok(())
}

#[tokio::test]
async fn test_modified_file_is_overwritten() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("a.txt", b"hi")])?;
    write_tree(&fixture.replica, &[("a.txt", b"bye")])?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(report.modified, 1);
    assert_eq!(fs::read(fixture.replica.join("a.txt"))?, b"hi");
    assert_eq!(fixture.log_messages(), vec!["File: a.txt was modified"]);
    Ok(())
}

#[tokio::test]
async fn test_removed_file_is_deleted() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.replica, &[("old.txt", b"stale")])?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(report.deleted, 1);
    assert!(!fixture.replica.join("old.txt").exists());
    assert_eq!(fixture.log_messages(), vec!["File: old.txt was deleted"]);
    Ok(())
}

#[tokio::test]
async fn test_identical_file_is_left_alone() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("same.txt", b"same")])?;
    write_tree(&fixture.replica, &[("same.txt", b"same")])?;

    let replica_file = fixture.replica.join("same.txt");
    let old = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&replica_file, old)?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert!(!report.had_changes());
    assert!(fixture.log_messages().is_empty());
    let mtime = FileTime::from_last_modification_time(&fs::metadata(&replica_file)?);
    assert_eq!(mtime, old);
    Ok(())
}

#[tokio::test]
async fn test_cycle_converges_nested_tree() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    let big = generate_content(200 * 1024, 3);
    write_tree(
        &fixture.source,
        &[
            ("root.txt", b"root"),
            ("docs/readme.md", b"# readme"),
            ("docs/guide/intro.md", b"intro v2"),
            ("data/blob.bin", &big),
            ("empty.txt", b""),
        ],
    )?;
    write_tree(
        &fixture.replica,
        &[
            ("docs/guide/intro.md", b"intro v1"),
            ("docs/readme.md", b"# readme"),
            ("old/deep/gone.txt", b"gone"),
        ],
    )?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(read_tree(&fixture.source)?, read_tree(&fixture.replica)?);
    assert_eq!(report.modified, 1);
    assert_eq!(report.added, 3);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.stats.errors, 0);
    assert!(!fixture.replica.join("old").exists());
    Ok(())
}

#[tokio::test]
async fn test_second_cycle_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("a.txt", b"a"), ("b/c.txt", b"c")])?;
    write_tree(&fixture.replica, &[("x.txt", b"x")])?;

    let mut engine = fixture.engine(30).await?;
    engine.run_cycle().await?;
    let lines_after_first = fixture.log_messages().len();
    let tree_after_first = read_tree(&fixture.replica)?;

    let report = engine.run_cycle().await?;

    assert!(!report.had_changes());
    assert_eq!(fixture.log_messages().len(), lines_after_first);
    assert_eq!(read_tree(&fixture.replica)?, tree_after_first);
    Ok(())
}

#[tokio::test]
async fn test_shared_content_does_not_prevent_deletion() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("keep.txt", b"dup")])?;
    write_tree(
        &fixture.replica,
        &[("keep.txt", b"dup"), ("copy-of-keep.txt", b"dup")],
    )?;

    let mut engine = fixture.engine(30).await?;
    engine.run_cycle().await?;

    assert!(fixture.replica.join("keep.txt").exists());
    assert!(!fixture.replica.join("copy-of-keep.txt").exists());
    assert_eq!(
        fixture.log_messages(),
        vec!["File: copy-of-keep.txt was deleted"]
    );
    Ok(())
}

#[tokio::test]
async fn test_shared_content_does_not_prevent_creation() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("one.txt", b"dup"), ("two.txt", b"dup")])?;
    write_tree(&fixture.replica, &[("one.txt", b"dup")])?;

    let mut engine = fixture.engine(30).await?;
    engine.run_cycle().await?;

    assert_eq!(fs::read(fixture.replica.join("two.txt"))?, b"dup");
    assert_eq!(fixture.log_messages(), vec!["File: two.txt was created"]);
    Ok(())
}

#[tokio::test]
async fn test_log_order_is_modified_created_deleted() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("b.txt", b"new"), ("a.txt", b"added")])?;
    write_tree(&fixture.replica, &[("b.txt", b"old"), ("0.txt", b"removed")])?;

    let mut engine = fixture.engine(30).await?;
    engine.run_cycle().await?;

    assert_eq!(
        fixture.log_messages(),
        vec![
            "File: b.txt was modified",
            "File: a.txt was created",
            "File: 0.txt was deleted",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_nested_deletion_prunes_empty_directories() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("keep/file.txt", b"k")])?;
    write_tree(
        &fixture.replica,
        &[("keep/file.txt", b"k"), ("a/b/c/d.txt", b"d"), ("keep/sub/x.txt", b"x")],
    )?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(report.stats.directories_pruned, 4);
    assert_eq!(read_dirs(&fixture.replica), vec!["keep".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_vanished_source_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    let sink = ferromirror_sync::LogSink::open(&fixture.log_file, false).await?;
    let changes = ChangeSet {
        added: vec![FileIdentity::from_relative_path(Path::new("ghost.txt")).ok_or("bad identity")?],
        ..ChangeSet::default()
    };

    let stats = Applier::new(&fixture.source, &fixture.replica, &sink)
        .apply(&changes)
        .await;

    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.errors, 0);
    assert!(fixture.log_messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_path_changing_type_converges_in_one_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("was-dir", b"now a file"), ("was-file/inner.txt", b"nested")])?;
    write_tree(&fixture.replica, &[("was-dir/old.txt", b"old"), ("was-file", b"old")])?;

    let mut engine = fixture.engine(30).await?;
    let report = engine.run_cycle().await?;

    assert_eq!(report.stats.errors, 0);
    assert_eq!(read_tree(&fixture.replica)?, read_tree(&fixture.source)?);
    assert_eq!(
        fixture.log_messages(),
        vec![
            "File: was-dir was created",
            "File: was-file/inner.txt was created",
            "File: was-dir/old.txt was deleted",
            "File: was-file was deleted",
        ]
    );
    assert!(!engine.run_cycle().await?.had_changes());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_source_never_deletes_replica() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::fs::PermissionsExt;

    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("file.txt", b"f"), ("locked/inner.txt", b"i")])?;
    write_tree(&fixture.replica, &[("file.txt", b"f"), ("locked/inner.txt", b"i")])?;

    let locked_file = fixture.source.join("file.txt");
    let locked_dir = fixture.source.join("locked");
    fs::set_permissions(&locked_file, fs::Permissions::from_mode(0o000))?;
    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o000))?;
    let enforced = fs::read(&locked_file).is_err() && fs::read_dir(&locked_dir).is_err();

    let result = if enforced {
        let mut engine = fixture.engine(30).await?;
        Some(engine.run_cycle().await)
    } else {
        None
    };
    fs::set_permissions(&locked_file, fs::Permissions::from_mode(0o644))?;
    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755))?;

    // permission bits are not enforced for this user
    let Some(report) = result.transpose()? else {
        return Ok(());
    };
    assert_eq!(report.deleted, 0);
    assert_eq!(report.unreadable, 2);
    assert_eq!(read_tree(&fixture.replica)?.len(), 2);
    assert!(fixture.log_messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_engine_from_layered_config() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("a.txt", b"a")])?;
    let config_file = fixture.source.parent().ok_or("no parent")?.join("ferromirror.toml");
    fs::write(
        &config_file,
        format!(
            "source = {:?}\nreplica = {:?}\nlog_file = {:?}\ninterval_secs = 5\n",
            fixture.source.display().to_string(),
            fixture.replica.display().to_string(),
            fixture.log_file.display().to_string(),
        ),
    )?;

    let config = ConfigBuilder::new()
        .add_source_file(&config_file)
        .interval("2")
        .build()?;
    assert_eq!(config.interval_secs(), 2);

    let mut engine = SyncEngine::new(Arc::new(config)).await?;
    engine.run_cycle().await?;

    assert_eq!(fs::read(fixture.replica.join("a.txt"))?, b"a");
    Ok(())
}

#[tokio::test]
async fn test_scheduler_runs_until_stopped() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("first.txt", b"1")])?;

    let token = CancellationToken::new();
    let handle = Scheduler::new(fixture.engine(3600).await?, token.clone()).spawn();
    let mut reports = handle.subscribe_reports();

    timeout(WAIT, reports.wait_for(|r| r.is_some())).await??;
    assert!(fixture.replica.join("first.txt").exists());

    write_tree(&fixture.source, &[("second.txt", b"2")])?;
    handle.run_now().await?;
    timeout(
        WAIT,
        reports.wait_for(|r| r.as_ref().is_some_and(|r| r.cycle >= 2)),
    )
    .await??;
    assert!(fixture.replica.join("second.txt").exists());

    token.cancel();
    let mut state = handle.subscribe_state();
    timeout(WAIT, state.wait_for(|s| *s == SchedulerState::Stopped)).await??;
    timeout(WAIT, handle.join()).await??;

    assert_eq!(
        fixture.log_messages(),
        vec!["File: first.txt was created", "File: second.txt was created"]
    );
    Ok(())
}

#[tokio::test]
async fn test_scheduler_picks_up_new_interval() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    let handle = Scheduler::new(fixture.engine(3600).await?, CancellationToken::new()).spawn();
    let mut reports = handle.subscribe_reports();
    timeout(WAIT, reports.wait_for(|r| r.is_some())).await??;

    write_tree(&fixture.source, &[("later.txt", b"l")])?;
    handle.set_interval(Duration::from_millis(10)).await?;
    timeout(
        WAIT,
        reports.wait_for(|r| r.as_ref().is_some_and(|r| r.added == 1)),
    )
    .await??;

    assert!(fixture.replica.join("later.txt").exists());
    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_snapshot_matches_tree() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = MirrorFixture::new()?;
    write_tree(&fixture.source, &[("x/y.txt", b"y"), ("z.txt", b"z")])?;

    let snapshot = SnapshotBuilder::new(&fixture.source).build().await?;
    let names: Vec<&str> = snapshot.iter().map(|(id, _)| id.as_str()).collect();

    assert_eq!(names, vec!["x/y.txt", "z.txt"]);
    Ok(())
}

fn arb_tree() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let path = "[a-c]{1,2}(/[a-c]{1,2}){0,2}";
    let content = prop::collection::vec(0u8..4, 0..8);
    prop::collection::btree_map(path, content, 0..10)
}

/// Drop entries whose path is also a directory prefix of another entry
fn without_file_dir_clashes(tree: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, Vec<u8>> {
    let keys: Vec<String> = tree.keys().cloned().collect();
    tree.into_iter()
        .filter(|(path, _)| {
            !keys
                .iter()
                .any(|other| other.starts_with(&format!("{}/", path)))
        })
        .collect()
}

fn write_map(root: &Path, tree: &BTreeMap<String, Vec<u8>>) -> std::io::Result<()> {
    let files: Vec<(&str, &[u8])> = tree.iter().map(|(p, c)| (p.as_str(), c.as_slice())).collect();
    write_tree(root, &files)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_one_cycle_converges(source in arb_tree(), replica in arb_tree()) {
        let source = without_file_dir_clashes(source);
        let replica = without_file_dir_clashes(replica);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let fixture = MirrorFixture::new().unwrap();
            write_map(&fixture.source, &source).unwrap();
            write_map(&fixture.replica, &replica).unwrap();

            let mut engine = fixture.engine(30).await.unwrap();
            let first = engine.run_cycle().await.unwrap();
            prop_assert_eq!(first.stats.errors, 0);
            prop_assert_eq!(read_tree(&fixture.replica).unwrap(), source.clone());

            let second = engine.run_cycle().await.unwrap();
            prop_assert!(!second.had_changes());
            Ok(())
        })?;
    }
}
