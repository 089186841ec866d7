//! Git status collection against real repositories.

mod common;

use std::time::{Duration, Instant};

use common::TestRepo;
use promptline::exec::run_with_timeout;
use promptline::git::GitStatus;

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn clean_repository() {
    let repo = TestRepo::new();
    let status = GitStatus::collect(repo.root(), TIMEOUT);

    assert!(status.is_git_repo);
    assert_eq!(status.branch, "main");
    assert!(!status.is_detached);
    assert!(!status.is_dirty());
    assert!(!status.is_merging);
    assert!(!status.is_rebasing);
    assert_eq!((status.ahead, status.behind), (0, 0));
}

#[test]
fn non_repository_is_a_successful_negative() {
    let dir = tempfile::tempdir().unwrap();
    let status = GitStatus::collect(dir.path(), TIMEOUT);
    assert!(!status.is_git_repo);
    assert!(!status.timed_out);
    assert_eq!(status.staged + status.unstaged + status.untracked, 0);
}

#[test]
fn working_tree_counts() {
    let repo = TestRepo::new();

    // One staged, one modified-but-unstaged, one untracked.
    repo.write_file("staged.txt", "staged\n");
    repo.git(&["add", "staged.txt"]);
    repo.write_file("README.md", "# modified\n");
    repo.write_file("untracked.txt", "new\n");

    let status = GitStatus::collect(repo.root(), TIMEOUT);
    assert_eq!(status.staged, 1);
    assert_eq!(status.unstaged, 1);
    assert_eq!(status.untracked, 1);
    assert!(status.is_dirty());
}

#[test]
fn detached_head_reports_commit() {
    let repo = TestRepo::new();
    repo.write_file("second.txt", "2\n");
    repo.commit_all("second commit");
    let first = repo.git(&["rev-list", "--max-parents=0", "HEAD"]);
    repo.git(&["checkout", "--detach", first.trim()]);

    let status = GitStatus::collect(repo.root(), TIMEOUT);
    assert!(status.is_git_repo);
    assert!(status.is_detached);
    assert!(status.branch.is_empty());
    assert!(!status.commit_short.is_empty());
    assert!(first.trim().starts_with(&status.commit_short));
}

#[test]
fn merge_in_progress_is_detected() {
    let repo = TestRepo::new();

    repo.git(&["checkout", "-b", "feature"]);
    repo.write_file("README.md", "# feature change\n");
    repo.commit_all("feature edit");

    repo.git(&["checkout", "main"]);
    repo.write_file("README.md", "# main change\n");
    repo.commit_all("main edit");

    // Conflicting merge leaves MERGE_HEAD behind.
    let merge = repo
        .git_cmd(&["merge", "feature"])
        .output()
        .expect("failed to run git merge");
    assert!(!merge.status.success(), "merge should conflict");

    let status = GitStatus::collect(repo.root(), TIMEOUT);
    assert!(status.is_merging);
}

#[test]
fn ahead_behind_against_upstream() {
    let upstream = TestRepo::new();
    let clone_dir = tempfile::tempdir().unwrap();
    let clone_path = clone_dir.path().join("clone");

    let output = upstream
        .git_cmd(&[
            "clone",
            upstream.root().to_str().unwrap(),
            clone_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to clone");
    assert!(output.status.success());

    // One local commit in the clone -> ahead 1, behind 0.
    std::fs::write(clone_path.join("local.txt"), "local\n").unwrap();
    for args in [
        vec!["add", "."],
        vec!["-c", "user.name=T", "-c", "user.email=t@e", "commit", "-m", "local"],
    ] {
        let mut cmd = std::process::Command::new("git");
        cmd.arg("-C").arg(&clone_path).args(&args);
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_CONFIG_SYSTEM", "/dev/null");
        assert!(cmd.output().unwrap().status.success(), "git {args:?}");
    }

    let status = GitStatus::collect(&clone_path, TIMEOUT);
    assert_eq!(status.ahead, 1);
    assert_eq!(status.behind, 0);
}

#[test]
fn timed_out_subprocess_leaves_no_child_behind() {
    // A command that would run far longer than the timeout; the unusual
    // sleep duration doubles as a process-table marker.
    let marker = "sleep 4711";
    let start = Instant::now();
    let result = run_with_timeout("exec sleep 4711", Duration::from_millis(100)).unwrap();
    assert!(result.timed_out);
    assert!(start.elapsed() < Duration::from_secs(2));

    // Within a second of return, nothing matching the marker survives.
    std::thread::sleep(Duration::from_millis(200));
    let ps = run_with_timeout("ps -e -o args", Duration::from_secs(5)).unwrap();
    assert!(
        !ps.stdout.contains(marker),
        "timed-out child still alive:\n{}",
        ps.stdout
    );
}
