//! Unit tests for fetch.rs
//!
//! Tests decoding, completion, failure, cancellation and pool shutdown.

use super::*;
use crate::os::MemoryResourceLoader;
use std::io::Cursor;
use std::time::{Duration, Instant};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn memory_loader() -> Arc<MemoryResourceLoader> {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("mem://textures/a.png", png_bytes(2, 3));
    loader.insert("mem://textures/garbage.png", vec![1u8, 2, 3, 4]);
    loader.insert("mem://textures/empty.png", Vec::<u8>::new());
    loader
}

/// Loader that blocks every load until the gate is opened
struct GatedLoader {
    inner: Arc<MemoryResourceLoader>,
    open: Mutex<bool>,
    signal: Condvar,
}

impl GatedLoader {
    fn new(inner: Arc<MemoryResourceLoader>) -> Self {
        Self { inner, open: Mutex::new(false), signal: Condvar::new() }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.signal.notify_all();
    }
}

impl ResourceLoader for GatedLoader {
    fn load(&self, uri: &Uri) -> Result<Vec<u8>> {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.signal.wait(open).unwrap();
        }
        drop(open);
        self.inner.load(uri)
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

// ============================================================================
// DECODE
// ============================================================================

#[test]
fn test_decode_png_to_rgba8() {
    let image = decode_rgba8(&png_bytes(4, 2)).unwrap();
    assert_eq!((image.width, image.height), (4, 2));
    assert_eq!(image.pixels.len(), 4 * 2 * 4);
    assert_eq!(&image.pixels[0..4], &[10, 20, 30, 255]);
}

#[test]
fn test_decode_rejects_empty_and_garbage() {
    assert!(matches!(decode_rgba8(&[]), Err(Error::ResourceLoad(_))));
    assert!(matches!(decode_rgba8(&[0, 1, 2, 3]), Err(Error::ResourceLoad(_))));
}

// ============================================================================
// COMPLETION AND FAILURE
// ============================================================================

#[test]
fn test_fetch_completes_with_image() {
    let pool = FetchPool::new(2, memory_loader()).unwrap();
    let handle = pool.submit(Uri::parse("mem://textures/a.png"));

    assert_eq!(handle.wait(), FetchStatus::Completed);
    let image = handle.image().unwrap();
    assert_eq!((image.width, image.height), (2, 3));
    assert!(handle.error().is_none());
}

#[test]
fn test_fetch_missing_uri_fails() {
    let pool = FetchPool::new(1, memory_loader()).unwrap();
    let handle = pool.submit(Uri::parse("mem://textures/none.png"));

    assert_eq!(handle.wait(), FetchStatus::Failed);
    assert!(handle.image().is_none());
    assert!(matches!(handle.error(), Some(Error::ResourceLoad(_))));
}

#[test]
fn test_fetch_bad_payloads_fail() {
    let pool = FetchPool::new(1, memory_loader()).unwrap();
    let garbage = pool.submit(Uri::parse("mem://textures/garbage.png"));
    let empty = pool.submit(Uri::parse("mem://textures/empty.png"));

    assert_eq!(garbage.wait(), FetchStatus::Failed);
    assert_eq!(empty.wait(), FetchStatus::Failed);
}

#[test]
fn test_release_image_drops_payload() {
    let pool = FetchPool::new(1, memory_loader()).unwrap();
    let handle = pool.submit(Uri::parse("mem://textures/a.png"));
    handle.wait();

    handle.release_image();
    assert_eq!(handle.status(), FetchStatus::Completed);
    assert!(handle.image().is_none());
}

#[test]
fn test_registry_empties_after_completion() {
    let pool = FetchPool::new(2, memory_loader()).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| pool.submit(Uri::parse("mem://textures/a.png")))
        .collect();
    for handle in &handles {
        handle.wait();
    }
    assert!(wait_until(|| pool.in_flight() == 0));
}

#[test]
fn test_completed_status_always_sees_payload() {
    let pool = FetchPool::new(4, memory_loader()).unwrap();
    let handles: Vec<_> = (0..32)
        .map(|_| pool.submit(Uri::parse("mem://textures/a.png")))
        .collect();

    let mut remaining: Vec<_> = handles.iter().collect();
    assert!(wait_until(|| {
        remaining.retain(|handle| {
            if handle.status() == FetchStatus::Completed {
                assert!(handle.image().is_some());
                false
            } else {
                true
            }
        });
        remaining.is_empty()
    }));
}

// ============================================================================
// CANCELLATION AND SHUTDOWN
// ============================================================================

#[test]
fn test_cancel_queued_job() {
    let gate = Arc::new(GatedLoader::new(memory_loader()));
    let pool = FetchPool::new(1, gate.clone()).unwrap();

    let first = pool.submit(Uri::parse("mem://textures/a.png"));
    let second = pool.submit(Uri::parse("mem://textures/a.png"));
    second.cancel();
    assert!(second.is_cancel_requested());

    gate.open();
    assert_eq!(first.wait(), FetchStatus::Completed);
    assert_eq!(second.wait(), FetchStatus::Cancelled);
    assert!(second.image().is_none());
}

#[test]
fn test_cancel_running_job_discards_result() {
    let gate = Arc::new(GatedLoader::new(memory_loader()));
    let pool = FetchPool::new(1, gate.clone()).unwrap();

    let handle = pool.submit(Uri::parse("mem://textures/a.png"));
    assert!(wait_until(|| handle.status() == FetchStatus::Running));
    handle.cancel();
    gate.open();

    assert_eq!(handle.wait(), FetchStatus::Cancelled);
    assert!(handle.image().is_none());
}

#[test]
fn test_drop_pool_finishes_every_handle() {
    let gate = Arc::new(GatedLoader::new(memory_loader()));
    let pool = FetchPool::new(1, gate.clone()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| pool.submit(Uri::parse("mem://textures/a.png")))
        .collect();

    gate.open();
    drop(pool);

    for handle in &handles {
        assert!(handle.is_finished());
    }
}

#[test]
fn test_worker_count_at_least_one() {
    let pool = FetchPool::new(0, memory_loader()).unwrap();
    assert_eq!(pool.worker_count(), 1);
}
