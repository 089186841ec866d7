//! Background worker for async prompt data.
//!
//! A single thread drains a bounded FIFO of typed requests so that slow git
//! probes never block a prompt draw. Completion callbacks run on the worker
//! thread; the façade uses one to publish a fresh [`GitStatus`] snapshot that
//! the next render picks up.
//!
//! Lifecycle: `start` spawns the thread; `shutdown` stops new submissions and
//! lets the thread finish the requests already queued; `wait` joins. Dropping
//! the worker does both.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as chan;

use crate::error::PromptError;
use crate::git::GitStatus;

/// Upper bound on queued requests; submissions past this fail fast.
pub const MAX_QUEUE_SIZE: usize = 32;

/// What kind of data a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    GitStatus,
    /// Reserved for embedders; currently completes with
    /// [`ResponseCode::FeatureNotAvailable`].
    Custom,
}

/// A queued unit of work.
#[derive(Debug)]
struct AsyncRequest {
    id: u64,
    kind: RequestKind,
    cwd: PathBuf,
    timeout: Duration,
}

/// Completion status delivered to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    FeatureNotAvailable,
}

/// Delivered to the completion callback, on the worker thread.
#[derive(Debug, Clone)]
pub struct AsyncResponse {
    pub id: u64,
    pub result: ResponseCode,
    /// Present for completed `GitStatus` requests.
    pub git_status: Option<GitStatus>,
}

/// Callback invoked after each request completes. Runs on the worker thread;
/// must be non-blocking.
pub type CompletionCallback = Box<dyn Fn(&AsyncResponse) + Send + 'static>;

/// Informational counters, readable without locking.
#[derive(Debug, Default)]
pub struct WorkerStats {
    total_requests: AtomicU64,
    total_completed: AtomicU64,
    total_timeouts: AtomicU64,
}

impl WorkerStats {
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }
    pub fn total_completed(&self) -> u64 {
        self.total_completed.load(Ordering::Relaxed)
    }
    pub fn total_timeouts(&self) -> u64 {
        self.total_timeouts.load(Ordering::Relaxed)
    }
}

/// Single-threaded async request worker with a bounded queue.
pub struct AsyncWorker {
    tx: chan::Sender<AsyncRequest>,
    shutdown_tx: chan::Sender<()>,
    shutting_down: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    next_id: AtomicU64,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncWorker {
    /// Spawn the worker thread.
    pub fn start(on_complete: CompletionCallback) -> Result<Self, PromptError> {
        let (tx, rx) = chan::bounded::<AsyncRequest>(MAX_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = chan::bounded::<()>(1);
        let shutting_down = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(WorkerStats::default());

        let thread_running = Arc::clone(&running);
        let thread_stats = Arc::clone(&stats);
        let handle = std::thread::Builder::new()
            .name("promptline-worker".to_string())
            .spawn(move || {
                worker_main(rx, shutdown_rx, on_complete, thread_stats);
                thread_running.store(false, Ordering::Release);
            })
            .map_err(PromptError::SystemCall)?;

        Ok(Self {
            tx,
            shutdown_tx,
            shutting_down,
            running,
            next_id: AtomicU64::new(1),
            stats,
            handle: Some(handle),
        })
    }

    /// Queue a git status collection for `cwd`. Returns the request id.
    ///
    /// Fails with `ResourceExhausted` when the queue is full and
    /// `InvalidState` after shutdown.
    pub fn submit_git_status(&self, cwd: &Path, timeout: Duration) -> Result<u64, PromptError> {
        self.submit(RequestKind::GitStatus, cwd, timeout)
    }

    /// Queue a request of an arbitrary kind.
    pub fn submit(
        &self,
        kind: RequestKind,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<u64, PromptError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(PromptError::InvalidState("worker is shutting down"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = AsyncRequest {
            id,
            kind,
            cwd: cwd.to_path_buf(),
            timeout,
        };

        match self.tx.try_send(request) {
            Ok(()) => {
                self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
                Ok(id)
            }
            Err(chan::TrySendError::Full(_)) => {
                Err(PromptError::ResourceExhausted("async request queue full"))
            }
            Err(chan::TrySendError::Disconnected(_)) => {
                Err(PromptError::InvalidState("worker thread has exited"))
            }
        }
    }

    /// Stop accepting new requests; already-queued work still completes.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let _ = self.shutdown_tx.try_send(());
    }

    /// Block until the worker thread has exited. Call after [`shutdown`].
    ///
    /// [`shutdown`]: AsyncWorker::shutdown
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.shutting_down.load(Ordering::Acquire)
    }

    /// Requests queued but not yet picked up.
    pub fn pending_count(&self) -> usize {
        self.tx.len()
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        self.shutdown();
        self.wait();
    }
}

fn worker_main(
    rx: chan::Receiver<AsyncRequest>,
    shutdown_rx: chan::Receiver<()>,
    on_complete: CompletionCallback,
    stats: Arc<WorkerStats>,
) {
    loop {
        chan::select! {
            recv(rx) -> msg => match msg {
                Ok(request) => process(request, &on_complete, &stats),
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => {
                // Drain what was queued before the shutdown flag flipped,
                // then exit.
                while let Ok(request) = rx.try_recv() {
                    process(request, &on_complete, &stats);
                }
                break;
            }
        }
    }
}

fn process(request: AsyncRequest, on_complete: &CompletionCallback, stats: &WorkerStats) {
    let response = match request.kind {
        RequestKind::GitStatus => {
            let snapshot = GitStatus::collect(&request.cwd, request.timeout);
            if snapshot.timed_out {
                stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            AsyncResponse {
                id: request.id,
                result: ResponseCode::Success,
                git_status: Some(snapshot),
            }
        }
        RequestKind::Custom => AsyncResponse {
            id: request.id,
            result: ResponseCode::FeatureNotAvailable,
            git_status: None,
        },
    };

    // Counter first so stats are consistent by the time a callback observer
    // wakes whatever is watching them.
    stats.total_completed.fetch_add(1, Ordering::Relaxed);
    on_complete(&response);
}
