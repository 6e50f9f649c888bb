use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::os::Uri;

/// URI-keyed byte fetch provided by the host
///
/// Called from fetch worker threads, never from the render thread.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, uri: &Uri) -> Result<Vec<u8>>;
}

/// Loads `file://` and protocol-less URIs relative to a root directory
#[derive(Debug, Clone)]
pub struct FileResourceLoader {
    root: PathBuf,
}

impl FileResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a URI resolves to
    pub fn resolve(&self, uri: &Uri) -> Result<PathBuf> {
        if !uri.protocol.is_empty() && uri.protocol != "file" {
            return Err(Error::InvalidUri(format!(
                "unsupported protocol '{}' in {}", uri.protocol, uri
            )));
        }
        let relative = uri.resource_path();
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            return Err(Error::InvalidUri(uri.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceLoader for FileResourceLoader {
    fn load(&self, uri: &Uri) -> Result<Vec<u8>> {
        let path = self.resolve(uri)?;
        std::fs::read(&path)
            .map_err(|e| Error::ResourceLoad(format!("{}: {}", path.display(), e)))
    }
}

/// In-memory asset table keyed by URI text
#[derive(Default)]
pub struct MemoryResourceLoader {
    entries: RwLock<FxHashMap<String, Arc<[u8]>>>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: &str, bytes: impl Into<Arc<[u8]>>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(Uri::parse(uri).to_string(), bytes.into());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, uri: &Uri) -> Result<Vec<u8>> {
        let entries = self.entries.read()
            .map_err(|_| Error::ResourceLoad("memory loader lock poisoned".to_string()))?;
        entries
            .get(&uri.to_string())
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| Error::ResourceLoad(format!("{} not found", uri)))
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
