//! Supervised background fetch of texture payloads.
//!
//! A `FetchPool` owns a fixed set of worker threads fed through a job
//! channel. Every submitted job is tracked in a registry until it finishes,
//! and the caller keeps a `FetchHandle` to observe completion or cancel it.
//!
//! # Publication
//!
//! The worker writes the decoded image (or error) under the job's mutex and
//! only then stores the final status with `Ordering::Release`. Readers load
//! the status with `Ordering::Acquire`, so a `Completed` observation always
//! sees the payload that was written before it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::os::{ResourceLoader, Uri};
use crate::{engine_debug, engine_warn};

new_key_type! {
    /// Registry key of an in-flight fetch job
    pub struct FetchTaskKey;
}

// ============================================================================
// STATUS
// ============================================================================

/// Lifecycle of one fetch job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FetchStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl FetchStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => FetchStatus::Pending,
            1 => FetchStatus::Running,
            2 => FetchStatus::Completed,
            3 => FetchStatus::Failed,
            _ => FetchStatus::Cancelled,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, FetchStatus::Completed | FetchStatus::Failed | FetchStatus::Cancelled)
    }
}

/// RGBA8 pixels decoded from a fetched payload
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

/// Decode PNG/JPEG bytes into tightly packed RGBA8
pub fn decode_rgba8(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(Error::ResourceLoad("empty payload".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::ResourceLoad(format!("decode failed: {}", e)))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::ResourceLoad(format!("decoded image has {}x{} extent", width, height)));
    }
    Ok(DecodedImage {
        width,
        height,
        pixels: image.into_raw().into(),
    })
}

// ============================================================================
// SHARED JOB STATE
// ============================================================================

struct FetchShared {
    status: AtomicU8,
    cancelled: AtomicBool,
    image: Mutex<Option<DecodedImage>>,
    error: Mutex<Option<Error>>,
    finished: Mutex<bool>,
    finished_signal: Condvar,
}

impl FetchShared {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(FetchStatus::Pending as u8),
            cancelled: AtomicBool::new(false),
            image: Mutex::new(None),
            error: Mutex::new(None),
            finished: Mutex::new(false),
            finished_signal: Condvar::new(),
        }
    }

    fn status(&self) -> FetchStatus {
        FetchStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn publish(&self, status: FetchStatus) {
        self.status.store(status as u8, Ordering::Release);
        if status.is_finished() {
            let mut finished = lock(&self.finished);
            *finished = true;
            self.finished_signal.notify_all();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Caller-side view of a submitted fetch
#[derive(Clone)]
pub struct FetchHandle {
    key: FetchTaskKey,
    uri: Uri,
    shared: Arc<FetchShared>,
}

impl FetchHandle {
    pub fn key(&self) -> FetchTaskKey {
        self.key
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn status(&self) -> FetchStatus {
        self.shared.status()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Request cancellation; a job that already published keeps its result
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Block until the job reaches a final status
    pub fn wait(&self) -> FetchStatus {
        let mut finished = lock(&self.shared.finished);
        while !*finished {
            finished = match self.shared.finished_signal.wait(finished) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        self.status()
    }

    /// Decoded image, only once the job completed and until released
    pub fn image(&self) -> Option<DecodedImage> {
        if self.status() != FetchStatus::Completed {
            return None;
        }
        lock(&self.shared.image).clone()
    }

    /// Drop the decoded CPU copy
    pub fn release_image(&self) {
        lock(&self.shared.image).take();
    }

    pub fn error(&self) -> Option<Error> {
        lock(&self.shared.error).clone()
    }
}

// ============================================================================
// POOL
// ============================================================================

struct FetchJob {
    key: FetchTaskKey,
    uri: Uri,
    shared: Arc<FetchShared>,
}

type TaskRegistry = Arc<Mutex<SlotMap<FetchTaskKey, Arc<FetchShared>>>>;

/// Fixed-size pool of fetch workers
///
/// Dropping the pool cancels every tracked job, closes the job channel and
/// joins the workers.
pub struct FetchPool {
    sender: Option<flume::Sender<FetchJob>>,
    workers: Vec<JoinHandle<()>>,
    tasks: TaskRegistry,
}

impl FetchPool {
    /// Spawn `worker_count` workers (at least one) loading through `loader`
    pub fn new(worker_count: usize, loader: Arc<dyn ResourceLoader>) -> Result<Self> {
        let (sender, receiver) = flume::unbounded::<FetchJob>();
        let tasks: TaskRegistry = Arc::new(Mutex::new(SlotMap::with_key()));
        let mut workers = Vec::new();

        for index in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            let loader = loader.clone();
            let tasks = tasks.clone();
            let worker = std::thread::Builder::new()
                .name(format!("dank-fetch-{}", index))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        run_job(loader.as_ref(), &job);
                        lock(&tasks).remove(job.key);
                    }
                })
                .map_err(|e| Error::InitializationFailed(format!("Failed to spawn fetch worker: {}", e)))?;
            workers.push(worker);
        }

        engine_debug!("dank::FetchPool", "Started {} fetch workers", workers.len());

        Ok(Self {
            sender: Some(sender),
            workers,
            tasks,
        })
    }

    /// Queue a fetch for `uri`
    pub fn submit(&self, uri: Uri) -> FetchHandle {
        let shared = Arc::new(FetchShared::new());
        let key = lock(&self.tasks).insert(shared.clone());
        let handle = FetchHandle { key, uri: uri.clone(), shared: shared.clone() };

        let queued = self
            .sender
            .as_ref()
            .map(|sender| sender.send(FetchJob { key, uri, shared: shared.clone() }).is_ok())
            .unwrap_or(false);

        if !queued {
            lock(&self.tasks).remove(key);
            *lock(&shared.error) = Some(Error::ResourceLoad("fetch pool is shut down".to_string()));
            shared.publish(FetchStatus::Failed);
        }

        handle
    }

    /// Jobs submitted but not yet finished
    pub fn in_flight(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Cancel every tracked job
    pub fn cancel_all(&self) {
        for shared in lock(&self.tasks).values() {
            shared.cancelled.store(true, Ordering::Release);
        }
    }
}

impl Drop for FetchPool {
    fn drop(&mut self) {
        self.cancel_all();
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn run_job(loader: &dyn ResourceLoader, job: &FetchJob) {
    let shared = &job.shared;

    if shared.cancelled.load(Ordering::Acquire) {
        shared.publish(FetchStatus::Cancelled);
        return;
    }
    shared.publish(FetchStatus::Running);

    let result = loader.load(&job.uri).and_then(|bytes| decode_rgba8(&bytes));

    if shared.cancelled.load(Ordering::Acquire) {
        shared.publish(FetchStatus::Cancelled);
        return;
    }

    match result {
        Ok(image) => {
            engine_debug!("dank::FetchPool", "Fetched {} ({}x{})", job.uri, image.width, image.height);
            *lock(&shared.image) = Some(image);
            shared.publish(FetchStatus::Completed);
        }
        Err(e) => {
            engine_warn!("dank::FetchPool", "Fetch of {} failed: {}", job.uri, e);
            *lock(&shared.error) = Some(e);
            shared.publish(FetchStatus::Failed);
        }
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
