//! Async worker behavior: ordering, queue bounds, shutdown, git payloads.

mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel as chan;
use promptline::worker::{AsyncWorker, AsyncResponse, RequestKind, ResponseCode, MAX_QUEUE_SIZE};
use promptline::PromptError;

fn collecting_worker() -> (AsyncWorker, Arc<Mutex<Vec<AsyncResponse>>>) {
    let seen: Arc<Mutex<Vec<AsyncResponse>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let worker = AsyncWorker::start(Box::new(move |response| {
        sink.lock().unwrap().push(response.clone());
    }))
    .unwrap();
    (worker, seen)
}

#[test]
fn git_status_requests_complete_in_submission_order() {
    // A plain temp dir: not a repository. Each response must still be a
    // successful completion with is_git_repo == false.
    let dir = tempfile::tempdir().unwrap();
    let (mut worker, seen) = collecting_worker();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            worker
                .submit_git_status(dir.path(), Duration::from_secs(5))
                .unwrap(),
        );
    }

    worker.shutdown();
    worker.wait();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for (response, id) in seen.iter().zip(&ids) {
        assert_eq!(response.id, *id);
        assert_eq!(response.result, ResponseCode::Success);
        let status = response.git_status.as_ref().expect("git payload");
        assert!(!status.is_git_repo);
    }
    assert_eq!(worker.stats().total_completed(), 3);
}

#[test]
fn full_queue_rejects_with_resource_exhausted() {
    // Block the worker inside the first completion callback so the queue
    // can actually fill up.
    let (gate_tx, gate_rx) = chan::bounded::<()>(0);
    let worker = AsyncWorker::start(Box::new(move |_response| {
        let _ = gate_rx.recv();
    }))
    .unwrap();

    // First request is dequeued and parks in the callback.
    worker
        .submit(RequestKind::Custom, Path::new("/"), Duration::from_secs(1))
        .unwrap();
    // Give the worker a moment to pick it up.
    let deadline = Instant::now() + Duration::from_secs(2);
    while worker.pending_count() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    // Now fill the queue to the bound.
    for _ in 0..MAX_QUEUE_SIZE {
        worker
            .submit(RequestKind::Custom, Path::new("/"), Duration::from_secs(1))
            .unwrap();
    }

    let err = worker
        .submit(RequestKind::Custom, Path::new("/"), Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, PromptError::ResourceExhausted(_)));

    // Release the worker so everything drains; unblock every callback.
    drop(gate_tx);
    worker.shutdown();
}

#[test]
fn shutdown_completes_already_queued_work() {
    let (gate_tx, gate_rx) = chan::bounded::<()>(0);
    let completed: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completed);
    let first_blocks = Arc::new(Mutex::new(true));
    let flag = Arc::clone(&first_blocks);

    let mut worker = AsyncWorker::start(Box::new(move |response| {
        let mut blocks = flag.lock().unwrap();
        if *blocks {
            *blocks = false;
            drop(blocks);
            let _ = gate_rx.recv();
        }
        sink.lock().unwrap().push(response.id);
    }))
    .unwrap();

    let ids: Vec<u64> = (0..4)
        .map(|_| {
            worker
                .submit(RequestKind::Custom, Path::new("/"), Duration::from_secs(1))
                .unwrap()
        })
        .collect();

    // Shutdown while three requests are still queued behind the blocked one.
    worker.shutdown();
    drop(gate_tx);
    worker.wait();

    // All four completed despite the shutdown landing mid-stream.
    assert_eq!(*completed.lock().unwrap(), ids);
    assert_eq!(worker.stats().total_completed(), 4);
}

#[test]
fn real_repository_snapshot_through_worker() {
    let repo = common::TestRepo::new();
    repo.write_file("dirty.txt", "uncommitted\n");

    let (mut worker, seen) = collecting_worker();
    worker
        .submit_git_status(repo.root(), Duration::from_secs(10))
        .unwrap();
    worker.shutdown();
    worker.wait();

    let seen = seen.lock().unwrap();
    let status = seen[0].git_status.as_ref().unwrap();
    assert!(status.is_git_repo);
    assert_eq!(status.branch, "main");
    assert!(!status.is_detached);
    assert_eq!(status.untracked, 1);
    assert_eq!(status.staged, 0);
}
